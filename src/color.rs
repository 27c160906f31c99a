//! RGBA colors: decoding of host packed colors and of textual color descriptors.

use std::fmt;
use std::str::FromStr;

use crate::error::DeviceError;

/// RGBA color with 8-bit straight-alpha components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

const NAMED: &[(&str, Color)] = &[
    ("white", Color::WHITE),
    ("black", Color::BLACK),
    ("red", Color::RED),
    ("green", Color::rgb(0, 255, 0)),
    ("blue", Color::rgb(0, 0, 255)),
    ("yellow", Color::rgb(255, 255, 0)),
    ("cyan", Color::rgb(0, 255, 255)),
    ("magenta", Color::rgb(255, 0, 255)),
    ("gray", Color::rgb(190, 190, 190)),
    ("grey", Color::rgb(190, 190, 190)),
    ("darkgray", Color::rgb(169, 169, 169)),
    ("darkgrey", Color::rgb(169, 169, 169)),
    ("lightgray", Color::rgb(211, 211, 211)),
    ("lightgrey", Color::rgb(211, 211, 211)),
    ("orange", Color::rgb(255, 165, 0)),
    ("purple", Color::rgb(160, 32, 240)),
    ("brown", Color::rgb(165, 42, 42)),
    ("pink", Color::rgb(255, 192, 203)),
    ("navy", Color::rgb(0, 0, 128)),
    ("transparent", Color::TRANSPARENT),
    ("none", Color::TRANSPARENT),
];

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color (alpha = 255).
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Unpack a host color (`R | G << 8 | B << 16 | A << 24`).
    pub const fn from_host(packed: u32) -> Self {
        Self {
            r: (packed & 0xFF) as u8,
            g: ((packed >> 8) & 0xFF) as u8,
            b: ((packed >> 16) & 0xFF) as u8,
            a: ((packed >> 24) & 0xFF) as u8,
        }
    }

    pub const fn to_host(self) -> u32 {
        (self.r as u32) | ((self.g as u32) << 8) | ((self.b as u32) << 16) | ((self.a as u32) << 24)
    }

    pub const fn is_transparent(self) -> bool {
        self.a == 0
    }

    /// Components scaled to `0.0..=1.0`, in `(r, g, b, a)` order.
    pub fn to_unit(self) -> (f64, f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
            self.a as f64 / 255.0,
        )
    }

    /// `#rrggbb` without alpha; pair with [`Color::opacity`].
    pub fn to_hex_rgb(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn opacity(self) -> f64 {
        self.a as f64 / 255.0
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const TRANSPARENT: Color = Color::new(255, 255, 255, 0);
}

impl FromStr for Color {
    type Err = DeviceError;

    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let invalid = || DeviceError::InvalidColor(descriptor.to_string());
        let c = descriptor.trim();

        if let Some(hex) = c.strip_prefix('#') {
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
            return match hex.len() {
                3 => {
                    let nibble = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
                    Ok(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?))
                }
                6 => Ok(Color::rgb(
                    channel(&hex[0..2])?,
                    channel(&hex[2..4])?,
                    channel(&hex[4..6])?,
                )),
                8 => Ok(Color::new(
                    channel(&hex[0..2])?,
                    channel(&hex[2..4])?,
                    channel(&hex[4..6])?,
                    channel(&hex[6..8])?,
                )),
                _ => Err(invalid()),
            };
        }

        NAMED
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(c))
            .map(|(_, color)| *color)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_packing_is_abgr() {
        // Opaque red as the host packs it.
        let red = Color::from_host(0xFF00_00FF);
        assert_eq!(red, Color::RED);
        assert_eq!(red.to_host(), 0xFF00_00FF);
    }

    #[test]
    fn parses_hex_forms() {
        assert_eq!("#f00".parse::<Color>().unwrap(), Color::RED);
        assert_eq!("#00ff00".parse::<Color>().unwrap(), Color::rgb(0, 255, 0));
        assert_eq!("#0000ff80".parse::<Color>().unwrap(), Color::new(0, 0, 255, 128));
    }

    #[test]
    fn named_colors_ignore_case() {
        assert_eq!("White".parse::<Color>().unwrap(), Color::WHITE);
        assert!("transparent".parse::<Color>().unwrap().is_transparent());
    }

    #[test]
    fn malformed_descriptor_names_the_input() {
        let err = "#12345".parse::<Color>().unwrap_err();
        assert!(matches!(&err, DeviceError::InvalidColor(s) if s == "#12345"));
        assert!(err.to_string().contains("#12345"));
        assert!("chartreuse-ish".parse::<Color>().is_err());
    }

    #[test]
    fn hex_digits_only() {
        for bad in ["#+f+f+f", "#+ff+ff+ff", "#-1f", "#ff 000"] {
            assert!(matches!(bad.parse::<Color>(), Err(DeviceError::InvalidColor(_))), "{bad}");
        }
    }
}
