//! The rendering-library surface the device is a client of: drawable command lists,
//! canvas-level state, and the [`RenderingLibrary`] trait each backend implements.

use crate::color::Color;
use crate::error::{DeviceError, Result};
use crate::geometry::Geometry;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineJoin {
    Round,
    Bevel,
    Miter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// Font descriptor: family, slant and numeric weight (400 regular, 700 bold).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontSpec {
    pub family: String,
    pub style: FontStyle,
    pub weight: u16,
}

impl FontSpec {
    pub fn is_bold(&self) -> bool {
        self.weight >= 600
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Arial".into(),
            style: FontStyle::Normal,
            weight: 400,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    ClosePath,
}

/// One item of a drawable command list. Style items apply to every geometry item
/// that follows them in the same list.
#[derive(Clone, Debug, PartialEq)]
pub enum Drawable {
    /// `None` disables stroking.
    StrokeColor(Option<Color>),
    /// `None` disables filling.
    FillColor(Option<Color>),
    StrokeWidth(f64),
    StrokeLineCap(LineCap),
    StrokeLineJoin(LineJoin),
    MiterLimit(f64),
    /// Dash segment lengths; `[0.0]` means a solid line.
    DashArray(Vec<f64>),
    StrokeAntialias(bool),
    TextAntialias(bool),
    Font(FontSpec),
    PointSize(f64),
    Translate { x: f64, y: f64 },
    /// Clockwise rotation in degrees.
    Rotate(f64),
    Line { x1: f64, y1: f64, x2: f64, y2: f64 },
    Polyline(Vec<Point>),
    Polygon(Vec<Point>),
    /// Upper-left and lower-right corners.
    Rectangle { x0: f64, y0: f64, x1: f64, y1: f64 },
    /// Center plus any point on the circumference.
    Circle { cx: f64, cy: f64, px: f64, py: f64 },
    Path(Vec<PathCommand>),
    /// UTF-8 text with its baseline origin at `(x, y)`.
    Text { x: f64, y: f64, text: String },
    /// Starts the definition of the named clip path; geometry up to
    /// [`Drawable::PopClipPath`] forms its outline.
    PushClipPath(String),
    PopClipPath,
    /// Activates a previously defined clip path.
    ClipPath(String),
}

impl Drawable {
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            Drawable::Line { .. }
                | Drawable::Polyline(_)
                | Drawable::Polygon(_)
                | Drawable::Rectangle { .. }
                | Drawable::Circle { .. }
                | Drawable::Path(_)
                | Drawable::Text { .. }
        )
    }
}

/// Parameters for a new canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    /// Bits per channel.
    pub depth: u8,
    /// Dots per inch.
    pub resolution: f64,
}

/// Canvas-level state. Libraries read the font fields from here when rendering text,
/// so callers must set them before submitting a text command list.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasState {
    pub fill_rule: FillRule,
    pub font: FontSpec,
    pub point_size: f64,
    pub stroke: Option<Color>,
    pub fill: Option<Color>,
    pub stroke_antialias: bool,
    pub text_antialias: bool,
    pub resolution: f64,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            fill_rule: FillRule::NonZero,
            font: FontSpec::default(),
            point_size: 12.0,
            stroke: None,
            fill: Some(Color::BLACK),
            stroke_antialias: true,
            text_antialias: true,
            resolution: 72.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    /// Interleaved straight-alpha RGBA, `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| DeviceError::InvalidInput("image dimensions overflow".into()))?;
        if data.len() != expected {
            return Err(DeviceError::InvalidInput(format!(
                "RGBA buffer holds {} bytes, expected {width}x{height}x4 = {expected}",
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.data[idx..idx + 4];
        Some(Color::new(px[0], px[1], px[2], px[3]))
    }
}

/// Font metrics as reported by the library. `descent` may be signed depending on
/// [`Capabilities::signed_descent`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TypeMetrics {
    pub ascent: f64,
    pub descent: f64,
    pub text_width: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeFilter {
    /// Smoothing (triangle/bilinear) interpolation.
    Smooth,
    /// Nearest-neighbour sampling.
    Point,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeOperation {
    Over,
    Copy,
}

/// Feature set of a linked rendering library, resolved once when it is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub clip_paths: bool,
    /// Resize, rotate and composite of pixel buffers.
    pub raster: bool,
    /// Read-back of canvas pixels.
    pub capture: bool,
    pub gamma: bool,
    /// Joins on polylines render with artifacts and must not be requested.
    pub polyline_join_bug: bool,
    /// Font descent is reported as a negative offset below the baseline.
    pub signed_descent: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            clip_paths: true,
            raster: true,
            capture: true,
            gamma: true,
            polyline_join_bug: false,
            signed_descent: false,
        }
    }
}

pub trait RenderingLibrary {
    /// One drawing surface owned by the library.
    type Surface;

    /// Reports the feature set of this library build.
    fn capabilities(&self) -> Capabilities;

    /// Creates a canvas filled with the background color.
    fn create_canvas(&mut self, spec: &CanvasSpec) -> Result<Self::Surface>;

    /// Creates a transparent-background canvas holding the given pixels.
    fn canvas_from_rgba(&mut self, image: &ImageData) -> Result<Self::Surface>;

    /// Returns `(width, height)` of the surface in pixels.
    fn dimensions(&self, surface: &Self::Surface) -> (u32, u32);

    /// Renders one command list atomically.
    fn draw(
        &mut self,
        surface: &mut Self::Surface,
        state: &CanvasState,
        drawables: &[Drawable],
    ) -> Result<()>;

    /// Measures `text` using the font fields of `state`.
    fn type_metrics(
        &mut self,
        surface: &Self::Surface,
        state: &CanvasState,
        text: &str,
    ) -> Result<TypeMetrics>;

    /// Returns a resized copy of the surface.
    fn resize(
        &mut self,
        surface: &Self::Surface,
        geometry: &Geometry,
        filter: ResizeFilter,
    ) -> Result<Self::Surface>;

    /// Returns a copy rotated clockwise about its center, grown to the rotated bounding box.
    fn rotate(&mut self, surface: &Self::Surface, degrees: f64) -> Result<Self::Surface>;

    /// Composites `source` onto `target` with its upper-left corner at `(x, y)`.
    fn composite(
        &mut self,
        target: &mut Self::Surface,
        state: &CanvasState,
        source: &Self::Surface,
        x: f64,
        y: f64,
        op: CompositeOperation,
    ) -> Result<()>;

    /// Applies gamma correction to every color channel.
    fn gamma(&mut self, surface: &mut Self::Surface, gamma: f64) -> Result<()>;

    /// Reads the surface back as straight-alpha RGBA.
    fn export_rgba(&self, surface: &Self::Surface) -> Result<ImageData>;
}

/// Rotated bounding box of a `width` x `height` box turned by `degrees`.
pub fn rotated_extent(width: f64, height: f64, degrees: f64) -> (f64, f64) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    (width * cos + height * sin, width * sin + height * cos)
}

/// [`rotated_extent`] in whole pixels, ignoring floating-point noise at right angles.
pub fn rotated_extent_px(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let (w, h) = rotated_extent(width as f64, height as f64, degrees);
    let px = |v: f64| ((v - 1e-6).ceil().max(1.0)) as u32;
    (px(w), px(h))
}
