//! A rendering library that records what it is asked to do instead of rasterizing.
//! Capabilities are configurable, so every flag combination can be exercised.

use crate::api::*;
use crate::color::Color;
use crate::error::{DeviceError, Result};
use crate::geometry::Geometry;

/// One command list together with the canvas state it was drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub drawables: Vec<Drawable>,
    pub state: CanvasState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    Created {
        width: u32,
        height: u32,
        background: Color,
    },
    FromImage {
        width: u32,
        height: u32,
    },
    Draw(Submission),
    Gamma(f64),
    Resized {
        width: u32,
        height: u32,
        filter: ResizeFilter,
    },
    Rotated(f64),
    Composite {
        x: f64,
        y: f64,
        op: CompositeOperation,
        source_width: u32,
        source_height: u32,
    },
}

#[derive(Debug, Clone)]
pub struct RecordedSurface {
    width: u32,
    height: u32,
    background: Color,
    ops: Vec<SurfaceOp>,
}

impl RecordedSurface {
    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<SurfaceOp> {
        self.ops
    }

    pub fn submissions(&self) -> Vec<&Submission> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                SurfaceOp::Draw(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Number of submitted drawables matching `pred`, across all command lists.
    pub fn count_drawables(&self, pred: impl Fn(&Drawable) -> bool) -> usize {
        self.submissions()
            .iter()
            .flat_map(|s| s.drawables.iter())
            .filter(|d| pred(*d))
            .count()
    }

    /// Index of the first op matching `pred`.
    pub fn position(&self, pred: impl Fn(&SurfaceOp) -> bool) -> Option<usize> {
        self.ops.iter().position(pred)
    }

    fn derived(&self, width: u32, height: u32, op: SurfaceOp) -> Self {
        let mut ops = self.ops.clone();
        ops.push(op);
        Self {
            width,
            height,
            background: self.background,
            ops,
        }
    }
}

pub struct RecordingLibrary {
    capabilities: Capabilities,
    queries: Vec<(String, CanvasState)>,
}

impl RecordingLibrary {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::default())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            queries: Vec::new(),
        }
    }

    /// Every metrics query made so far, with the canvas state it was made against.
    pub fn queries(&self) -> &[(String, CanvasState)] {
        &self.queries
    }

    fn require(&self, supported: bool, what: &str) -> Result<()> {
        if supported {
            Ok(())
        } else {
            Err(DeviceError::UnsupportedFeature(format!("{what} disabled on recording library")))
        }
    }
}

impl Default for RecordingLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderingLibrary for RecordingLibrary {
    type Surface = RecordedSurface;

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn create_canvas(&mut self, spec: &CanvasSpec) -> Result<RecordedSurface> {
        Ok(RecordedSurface {
            width: spec.width,
            height: spec.height,
            background: spec.background,
            ops: vec![SurfaceOp::Created {
                width: spec.width,
                height: spec.height,
                background: spec.background,
            }],
        })
    }

    fn canvas_from_rgba(&mut self, image: &ImageData) -> Result<RecordedSurface> {
        self.require(self.capabilities.raster, "raster")?;
        Ok(RecordedSurface {
            width: image.width,
            height: image.height,
            background: Color::TRANSPARENT,
            ops: vec![SurfaceOp::FromImage {
                width: image.width,
                height: image.height,
            }],
        })
    }

    fn dimensions(&self, surface: &RecordedSurface) -> (u32, u32) {
        (surface.width, surface.height)
    }

    fn draw(
        &mut self,
        surface: &mut RecordedSurface,
        state: &CanvasState,
        drawables: &[Drawable],
    ) -> Result<()> {
        let clips = drawables
            .iter()
            .any(|d| matches!(d, Drawable::PushClipPath(_) | Drawable::ClipPath(_)));
        if clips {
            self.require(self.capabilities.clip_paths, "clip paths")?;
        }
        surface.ops.push(SurfaceOp::Draw(Submission {
            drawables: drawables.to_vec(),
            state: state.clone(),
        }));
        Ok(())
    }

    fn type_metrics(
        &mut self,
        _surface: &RecordedSurface,
        state: &CanvasState,
        text: &str,
    ) -> Result<TypeMetrics> {
        self.queries.push((text.to_string(), state.clone()));
        let size = state.point_size;
        let descent = if self.capabilities.signed_descent { -0.25 * size } else { 0.25 * size };
        Ok(TypeMetrics {
            ascent: 0.75 * size,
            descent,
            text_width: 0.6 * size * text.chars().count() as f64,
        })
    }

    fn resize(
        &mut self,
        surface: &RecordedSurface,
        geometry: &Geometry,
        filter: ResizeFilter,
    ) -> Result<RecordedSurface> {
        self.require(self.capabilities.raster, "raster")?;
        let (width, height) = geometry.resolve(surface.width, surface.height)?;
        Ok(surface.derived(width, height, SurfaceOp::Resized { width, height, filter }))
    }

    fn rotate(&mut self, surface: &RecordedSurface, degrees: f64) -> Result<RecordedSurface> {
        self.require(self.capabilities.raster, "raster")?;
        let (width, height) = rotated_extent_px(surface.width, surface.height, degrees);
        Ok(surface.derived(width, height, SurfaceOp::Rotated(degrees)))
    }

    fn composite(
        &mut self,
        target: &mut RecordedSurface,
        _state: &CanvasState,
        source: &RecordedSurface,
        x: f64,
        y: f64,
        op: CompositeOperation,
    ) -> Result<()> {
        self.require(self.capabilities.raster, "raster")?;
        target.ops.push(SurfaceOp::Composite {
            x,
            y,
            op,
            source_width: source.width,
            source_height: source.height,
        });
        Ok(())
    }

    fn gamma(&mut self, surface: &mut RecordedSurface, gamma: f64) -> Result<()> {
        self.require(self.capabilities.gamma, "gamma")?;
        surface.ops.push(SurfaceOp::Gamma(gamma));
        Ok(())
    }

    /// Nothing is rasterized, so the export is the background color only.
    fn export_rgba(&self, surface: &RecordedSurface) -> Result<ImageData> {
        self.require(self.capabilities.capture, "capture")?;
        let bg = surface.background;
        let pixels = (surface.width as usize) * (surface.height as usize);
        let data = [bg.r, bg.g, bg.b, bg.a].repeat(pixels);
        ImageData::new(surface.width, surface.height, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_almost_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    fn spec() -> CanvasSpec {
        CanvasSpec {
            width: 30,
            height: 20,
            background: Color::WHITE,
            depth: 8,
            resolution: 72.0,
        }
    }

    #[test]
    fn records_submissions_in_order() {
        let mut lib = RecordingLibrary::new();
        let mut s = lib.create_canvas(&spec()).unwrap();
        let state = CanvasState::default();
        lib.draw(&mut s, &state, &[Drawable::StrokeWidth(1.0)]).unwrap();
        lib.draw(&mut s, &state, &[Drawable::Line { x1: 0.0, y1: 0.0, x2: 1.0, y2: 1.0 }]).unwrap();
        lib.gamma(&mut s, 2.2).unwrap();

        assert_eq!(s.ops().len(), 4);
        assert_eq!(s.submissions().len(), 2);
        assert_eq!(s.count_drawables(Drawable::is_geometry), 1);
        assert_eq!(s.ops().last(), Some(&SurfaceOp::Gamma(2.2)));
    }

    #[test]
    fn disabled_clip_paths_reject_clip_lists() {
        let mut lib = RecordingLibrary::with_capabilities(Capabilities {
            clip_paths: false,
            ..Capabilities::default()
        });
        let mut s = lib.create_canvas(&spec()).unwrap();
        let err = lib
            .draw(&mut s, &CanvasState::default(), &[Drawable::ClipPath("clip".into())])
            .unwrap_err();
        assert!(matches!(err, DeviceError::UnsupportedFeature(_)));
    }

    #[test]
    fn metrics_follow_point_size_and_descent_sign() {
        let state = CanvasState {
            point_size: 20.0,
            ..CanvasState::default()
        };
        let mut lib = RecordingLibrary::new();
        let s = lib.create_canvas(&spec()).unwrap();
        let tm = lib.type_metrics(&s, &state, "ab").unwrap();
        assert_almost_eq(tm.ascent, 15.0);
        assert_almost_eq(tm.descent, 5.0);
        assert_almost_eq(tm.text_width, 24.0);

        let mut signed = RecordingLibrary::with_capabilities(Capabilities {
            signed_descent: true,
            ..Capabilities::default()
        });
        assert_almost_eq(signed.type_metrics(&s, &state, "ab").unwrap().descent, -5.0);
        assert_eq!(lib.queries().len(), 1);
    }

    #[test]
    fn export_is_background_filled() {
        let mut lib = RecordingLibrary::new();
        let s = lib.create_canvas(&spec()).unwrap();
        let img = lib.export_rgba(&s).unwrap();
        assert_eq!((img.width, img.height), (30, 20));
        assert_eq!(img.pixel(29, 19), Some(Color::WHITE));
    }

    #[test]
    fn resize_and_rotate_track_dimensions() {
        let mut lib = RecordingLibrary::new();
        let s = lib.canvas_from_rgba(&ImageData::new(4, 2, vec![0; 32]).unwrap()).unwrap();
        let r = lib.resize(&s, &Geometry::new(40, 10).exact(), ResizeFilter::Point).unwrap();
        assert_eq!(lib.dimensions(&r), (40, 10));
        let t = lib.rotate(&r, 90.0).unwrap();
        assert_eq!(lib.dimensions(&t), (10, 40));
        assert_eq!(t.ops().len(), 3);
        assert_eq!(s.ops().len(), 1);
    }
}
