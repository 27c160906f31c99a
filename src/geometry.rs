//! Resize targets in the `WxH` / `WxH!` sense.

use std::fmt;

use crate::error::{DeviceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    /// `!` suffix: scale to exactly `width` x `height`.
    pub ignore_aspect: bool,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ignore_aspect: false,
        }
    }

    pub fn exact(mut self) -> Self {
        self.ignore_aspect = true;
        self
    }

    /// Target size for a source of `src_width` x `src_height`.
    ///
    /// Without `!` the result fits inside the box and keeps the source aspect ratio.
    pub fn resolve(&self, src_width: u32, src_height: u32) -> Result<(u32, u32)> {
        if src_width == 0 || src_height == 0 {
            return Err(DeviceError::InvalidGeometry(format!(
                "{self} applied to empty {src_width}x{src_height} source"
            )));
        }
        let (w, h) = if self.ignore_aspect {
            (self.width, self.height)
        } else {
            let (sw, sh) = (src_width as f64, src_height as f64);
            let scale = (self.width as f64 / sw).min(self.height as f64 / sh);
            ((sw * scale).round() as u32, (sh * scale).round() as u32)
        };
        Ok((w.max(1), h.max(1)))
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        if self.ignore_aspect {
            write!(f, "!")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bang_ignores_aspect_ratio() {
        let g = Geometry::new(100, 10).exact();
        assert_eq!(g.resolve(50, 50).unwrap(), (100, 10));
    }

    #[test]
    fn fits_inside_box_by_default() {
        assert_eq!(Geometry::new(100, 100).resolve(200, 100).unwrap(), (100, 50));
        assert_eq!(Geometry::new(40, 100).resolve(20, 10).unwrap(), (40, 20));
    }

    #[test]
    fn never_collapses_to_zero() {
        assert_eq!(Geometry::new(0, 0).exact().resolve(5, 5).unwrap(), (1, 1));
        assert_eq!(Geometry::new(100, 1).resolve(10, 1000).unwrap(), (1, 1));
    }

    #[test]
    fn empty_source_names_the_geometry() {
        let err = Geometry::new(30, 20).exact().resolve(0, 4).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidGeometry(ref s) if s.starts_with("30x20!")));
    }

    #[test]
    fn display_matches_descriptor_syntax() {
        assert_eq!(Geometry::new(30, 20).exact().to_string(), "30x20!");
        assert_eq!(Geometry::new(30, 20).to_string(), "30x20");
    }
}
