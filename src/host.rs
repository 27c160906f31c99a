//! The host plotting engine's side of the contract: style context, line codes, the
//! description a device registers, and the callback table a device implements.

use crate::api::{ImageData, LineCap, LineJoin, Point};
use crate::color::Color;
use crate::error::Result;

pub const LTY_BLANK: i32 = -1;
pub const LTY_SOLID: i32 = 0;
pub const LTY_DASHED: i32 = 4 + (4 << 4);
pub const LTY_DOTTED: i32 = 1 + (3 << 4);
pub const LTY_DOTDASH: i32 = 1 + (3 << 4) + (4 << 8) + (3 << 12);
pub const LTY_LONGDASH: i32 = 7 + (3 << 4);
pub const LTY_TWODASH: i32 = 2 + (2 << 4) + (6 << 8) + (2 << 12);

pub const GE_ROUND_CAP: i32 = 1;
pub const GE_BUTT_CAP: i32 = 2;
pub const GE_SQUARE_CAP: i32 = 3;

pub const GE_ROUND_JOIN: i32 = 1;
pub const GE_MITRE_JOIN: i32 = 2;
pub const GE_BEVEL_JOIN: i32 = 3;

/// Font face codes.
pub const FACE_PLAIN: i32 = 1;
pub const FACE_BOLD: i32 = 2;
pub const FACE_ITALIC: i32 = 3;
pub const FACE_BOLD_ITALIC: i32 = 4;
pub const FACE_SYMBOL: i32 = 5;

/// Style context passed with every drawing callback.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphicsContext {
    /// Packed pen color (see [`Color::from_host`]); `None` when the host leaves it undefined.
    pub col: Option<u32>,
    /// Packed fill color; `None` when the host leaves it undefined.
    pub fill: Option<u32>,
    pub gamma: f64,
    /// Line width in 1/96 inch.
    pub lwd: f64,
    /// Packed nibble line type, see [`LTY_DASHED`] and friends.
    pub lty: i32,
    pub lend: i32,
    pub ljoin: i32,
    pub lmitre: f64,
    pub cex: f64,
    /// Point size in big points.
    pub ps: f64,
    pub fontface: i32,
    pub fontfamily: String,
}

impl Default for GraphicsContext {
    fn default() -> Self {
        Self {
            col: Some(Color::BLACK.to_host()),
            fill: None,
            gamma: 1.0,
            lwd: 1.0,
            lty: LTY_SOLID,
            lend: GE_ROUND_CAP,
            ljoin: GE_ROUND_JOIN,
            lmitre: 10.0,
            cex: 1.0,
            ps: 12.0,
            fontface: FACE_PLAIN,
            fontfamily: String::new(),
        }
    }
}

impl GraphicsContext {
    /// Pen color if it is defined and visible.
    pub fn stroke_color(&self) -> Option<Color> {
        self.col.map(Color::from_host).filter(|c| !c.is_transparent())
    }

    /// Fill color if it is defined and visible.
    pub fn fill_color(&self) -> Option<Color> {
        self.fill.map(Color::from_host).filter(|c| !c.is_transparent())
    }

    pub fn line_cap(&self) -> LineCap {
        match self.lend {
            GE_BUTT_CAP => LineCap::Butt,
            GE_SQUARE_CAP => LineCap::Square,
            _ => LineCap::Round,
        }
    }

    pub fn line_join(&self) -> LineJoin {
        match self.ljoin {
            GE_MITRE_JOIN => LineJoin::Miter,
            GE_BEVEL_JOIN => LineJoin::Bevel,
            _ => LineJoin::Round,
        }
    }
}

/// Identifier the host assigns to a registered device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u32);

/// Capabilities advertised to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub can_clip: bool,
    /// Horizontal text adjustment is left to the host.
    pub can_h_adjust: bool,
    pub raster: bool,
    pub capture: bool,
    /// 2 = semi-transparent colors supported.
    pub have_transparency: u8,
    pub have_transparent_bg: u8,
    pub has_text_utf8: bool,
    pub want_symbol_utf8: bool,
}

/// Extent of the device in its own units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceExtent {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

/// Everything the host needs to know to drive a device.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceDescription {
    pub name: String,
    pub extent: DeviceExtent,
    /// Inches per raster unit, horizontal and vertical.
    pub ipr: [f64; 2],
    /// Nominal character width and height in raster units.
    pub cra: [f64; 2],
    pub x_char_offset: f64,
    pub y_char_offset: f64,
    pub y_line_bias: f64,
    pub start_ps: f64,
    /// Packed host colors.
    pub start_col: u32,
    pub start_fill: u32,
    pub start_lty: i32,
    pub start_font: i32,
    pub start_gamma: f64,
    pub capabilities: DeviceCapabilities,
}

/// The host's device table.
pub trait DeviceRegistry {
    /// Adds a device to the host; the error string explains a refusal.
    fn register(
        &mut self,
        description: &DeviceDescription,
    ) -> std::result::Result<DeviceId, String>;
}

/// Registry that accepts every device and numbers them sequentially.
#[derive(Debug, Default)]
pub struct NullRegistry {
    next: u32,
    pub registered: Vec<DeviceDescription>,
}

impl DeviceRegistry for NullRegistry {
    fn register(
        &mut self,
        description: &DeviceDescription,
    ) -> std::result::Result<DeviceId, String> {
        self.next += 1;
        self.registered.push(description.clone());
        Ok(DeviceId(self.next))
    }
}

/// Ascent, descent and advance width of one glyph, all non-negative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphMetrics {
    pub ascent: f64,
    pub descent: f64,
    pub width: f64,
}

/// Callback table through which the host drives a device.
pub trait GraphicsDevice {
    /// Starts a new page filled with `fill`, or the device background when `None`.
    fn new_page(&mut self, fill: Option<Color>) -> Result<()>;
    fn close(&mut self);
    fn clip(&mut self, left: f64, right: f64, bottom: f64, top: f64) -> Result<()>;
    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, gc: &GraphicsContext) -> Result<()>;
    fn polyline(&mut self, points: &[Point], gc: &GraphicsContext) -> Result<()>;
    fn polygon(&mut self, points: &[Point], gc: &GraphicsContext) -> Result<()>;
    fn rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, gc: &GraphicsContext) -> Result<()>;
    fn circle(&mut self, x: f64, y: f64, r: f64, gc: &GraphicsContext) -> Result<()>;
    /// Draws several closed contours as one shape; `winding` selects the nonzero rule.
    fn path(&mut self, contours: &[Vec<Point>], winding: bool, gc: &GraphicsContext) -> Result<()>;
    fn text(
        &mut self,
        x: f64,
        y: f64,
        text: &str,
        rot: f64,
        hadj: f64,
        gc: &GraphicsContext,
    ) -> Result<()>;
    /// Draws `image` with its bottom-left corner at `(x, y)`, scaled to `width` x `height`.
    #[allow(clippy::too_many_arguments)]
    fn raster(
        &mut self,
        image: &ImageData,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rot: f64,
        interpolate: bool,
        gc: &GraphicsContext,
    ) -> Result<()>;
    /// Metrics of one character; a negative `c` is a Unicode code point.
    fn metric_info(&mut self, c: i32, gc: &GraphicsContext) -> Result<GlyphMetrics>;
    fn strwidth(&mut self, text: &str, gc: &GraphicsContext) -> Result<f64>;
    fn size(&self) -> DeviceExtent;
    fn capture(&mut self) -> Result<ImageData>;
    /// 1 when the host starts a burst of drawing, 0 when it ends.
    fn mode(&mut self, mode: i32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_type_constants_pack_nibbles() {
        assert_eq!(LTY_DASHED, 0x44);
        assert_eq!(LTY_DOTTED, 0x31);
        assert_eq!(LTY_DOTDASH, 0x3431);
        assert_eq!(LTY_LONGDASH, 0x37);
        assert_eq!(LTY_TWODASH, 0x2622);
    }

    #[test]
    fn unknown_codes_fall_back_to_round() {
        let gc = GraphicsContext {
            lend: 42,
            ljoin: -3,
            ..GraphicsContext::default()
        };
        assert_eq!(gc.line_cap(), LineCap::Round);
        assert_eq!(gc.line_join(), LineJoin::Round);
    }

    #[test]
    fn transparent_pen_is_undefined() {
        let gc = GraphicsContext {
            col: Some(Color::TRANSPARENT.to_host()),
            fill: Some(0xFF00_00FF),
            ..GraphicsContext::default()
        };
        assert_eq!(gc.stroke_color(), None);
        assert_eq!(gc.fill_color(), Some(Color::RED));
    }

    #[test]
    fn null_registry_numbers_devices() {
        let mut registry = NullRegistry::default();
        let desc = DeviceDescription {
            name: "test".into(),
            extent: DeviceExtent { left: 0.0, right: 1.0, bottom: 1.0, top: 0.0 },
            ipr: [1.0 / 72.0; 2],
            cra: [10.8, 14.4],
            x_char_offset: 0.49,
            y_char_offset: 0.3333,
            y_line_bias: 0.2,
            start_ps: 12.0,
            start_col: Color::BLACK.to_host(),
            start_fill: Color::WHITE.to_host(),
            start_lty: LTY_SOLID,
            start_font: FACE_PLAIN,
            start_gamma: 1.0,
            capabilities: DeviceCapabilities {
                can_clip: true,
                can_h_adjust: false,
                raster: true,
                capture: true,
                have_transparency: 2,
                have_transparent_bg: 2,
                has_text_utf8: true,
                want_symbol_utf8: true,
            },
        };
        assert_eq!(registry.register(&desc), Ok(DeviceId(1)));
        assert_eq!(registry.register(&desc), Ok(DeviceId(2)));
        assert_eq!(registry.registered.len(), 2);
    }
}
