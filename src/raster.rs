//! Raster blits: host pixel buffers scaled, rotated and composited onto pages.

use crate::api::{CompositeOperation, ImageData, RenderingLibrary, ResizeFilter};
use crate::error::{DeviceError, Result};
use crate::frame::Frame;
use crate::geometry::Geometry;
use crate::text::normalize_rotation;

/// A raster draw as the host issues it. `(x, y)` is the bottom-left corner of the
/// unrotated destination box; a negative `height` extends it upwards.
#[derive(Clone, Copy, Debug)]
pub struct Blit<'a> {
    pub image: &'a ImageData,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rot: f64,
    pub interpolate: bool,
}

impl Blit<'_> {
    /// Destination box `(left, top, width, height)` in page pixels.
    pub fn destination(&self) -> (f64, f64, f64, f64) {
        let left = self.x.min(self.x + self.width);
        let top = self.y.min(self.y + self.height);
        (left, top, self.width.abs(), self.height.abs())
    }
}

/// An ephemeral canvas ready to be composited with its upper-left corner at `(x, y)`.
pub struct PreparedRaster<S> {
    pub surface: S,
    pub x: f64,
    pub y: f64,
}

fn target_px(v: f64) -> u32 {
    v.round().max(1.0) as u32
}

/// Builds the ephemeral canvas: scaled to the destination box, then turned about the
/// blit anchor `(x, y)`. The library rotates about the canvas center and grows the
/// canvas, so the placement follows that center around the anchor and backs off by
/// half the grown size.
pub fn prepare<L>(library: &mut L, blit: &Blit<'_>) -> Result<PreparedRaster<L::Surface>>
where
    L: RenderingLibrary,
{
    if !library.capabilities().raster {
        return Err(DeviceError::UnsupportedFeature(
            "raster images are not supported by this rendering library".into(),
        ));
    }
    let (left, top, width, height) = blit.destination();
    let source = library.canvas_from_rgba(blit.image)?;
    let geometry = Geometry::new(target_px(width), target_px(height)).exact();
    let filter = if blit.interpolate { ResizeFilter::Smooth } else { ResizeFilter::Point };
    let scaled = library.resize(&source, &geometry, filter)?;

    let angle = normalize_rotation(blit.rot);
    if angle == 0.0 {
        return Ok(PreparedRaster {
            surface: scaled,
            x: left,
            y: top,
        });
    }
    let (w, h) = library.dimensions(&scaled);
    let rotated = library.rotate(&scaled, angle)?;
    let (rw, rh) = library.dimensions(&rotated);
    let (dx, dy) = (left + w as f64 / 2.0 - blit.x, top + h as f64 / 2.0 - blit.y);
    let (sin, cos) = angle.to_radians().sin_cos();
    let center = (blit.x + dx * cos - dy * sin, blit.y + dx * sin + dy * cos);
    Ok(PreparedRaster {
        surface: rotated,
        x: center.0 - rw as f64 / 2.0,
        y: center.1 - rh as f64 / 2.0,
    })
}

impl<S> PreparedRaster<S> {
    pub fn composite_onto<L>(&self, library: &mut L, frame: &mut Frame<S>) -> Result<()>
    where
        L: RenderingLibrary<Surface = S>,
    {
        library.composite(
            &mut frame.surface,
            &frame.state,
            &self.surface,
            self.x,
            self.y,
            CompositeOperation::Over,
        )
    }
}
