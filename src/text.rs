//! Font metrics and text rendering.
//!
//! Libraries resolve glyphs from the canvas-level font and fill rather than from the
//! items of a command list, so text is always drawn in two steps: first the canvas
//! state is set, then the command list is submitted. The color overrides are undone
//! afterwards.

use crate::api::{CanvasState, Drawable, FontSpec, RenderingLibrary};
use crate::color::Color;
use crate::error::{DeviceError, Result};
use crate::frame::Frame;
use crate::host::{GlyphMetrics, GraphicsContext};
use crate::style;

/// Sample used when the host asks for the metrics of character 0.
const DEFAULT_SAMPLE: &str = "M";

/// Host counter-clockwise degrees as a library clockwise angle in `[0, 360)`.
pub fn normalize_rotation(rot: f64) -> f64 {
    (-rot + 360.0).rem_euclid(360.0)
}

/// The string to measure for a host character code. Negative codes are Unicode code
/// points; non-negative ones are Latin-1 bytes.
pub fn metric_sample(c: i32) -> Result<String> {
    if c == 0 {
        return Ok(DEFAULT_SAMPLE.to_string());
    }
    let ch = if c < 0 {
        char::from_u32(c.unsigned_abs())
    } else if c <= 0xFF {
        Some(char::from(c as u8))
    } else {
        char::from_u32(c as u32)
    };
    ch.map(String::from).ok_or_else(|| {
        DeviceError::InvalidInput(format!("character code {c} is not a Unicode scalar value"))
    })
}

/// Writes the font of `gc` into the canvas state.
pub fn apply_font(state: &mut CanvasState, gc: &GraphicsContext) {
    state.font = style::font_spec(gc);
    state.point_size = style::point_size_px(gc, state.resolution);
}

pub fn metric_info<L>(
    library: &mut L,
    frame: &mut Frame<L::Surface>,
    c: i32,
    gc: &GraphicsContext,
) -> Result<GlyphMetrics>
where
    L: RenderingLibrary,
{
    let sample = metric_sample(c)?;
    apply_font(&mut frame.state, gc);
    let tm = library.type_metrics(&frame.surface, &frame.state, &sample)?;
    Ok(GlyphMetrics {
        ascent: tm.ascent,
        descent: tm.descent.abs(),
        width: tm.text_width,
    })
}

pub fn strwidth<L>(
    library: &mut L,
    frame: &mut Frame<L::Surface>,
    text: &str,
    gc: &GraphicsContext,
) -> Result<f64>
where
    L: RenderingLibrary,
{
    apply_font(&mut frame.state, gc);
    Ok(library.type_metrics(&frame.surface, &frame.state, text)?.text_width)
}

/// A text draw, resolved once from the host context and replayed on each target page.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub font: FontSpec,
    pub point_size: f64,
    pub color: Option<Color>,
    pub antialias: bool,
    pub drawables: Vec<Drawable>,
}

impl TextRun {
    pub fn new(
        x: f64,
        y: f64,
        text: &str,
        rot: f64,
        gc: &GraphicsContext,
        resolution: f64,
        antialias: bool,
    ) -> Self {
        let font = style::font_spec(gc);
        let point_size = style::point_size_px(gc, resolution);
        let color = gc.stroke_color();
        let angle = normalize_rotation(rot);

        let mut drawables = vec![
            Drawable::StrokeColor(None),
            Drawable::FillColor(color),
            Drawable::Font(font.clone()),
            Drawable::PointSize(point_size),
            Drawable::TextAntialias(antialias),
        ];
        if angle != 0.0 {
            drawables.push(Drawable::Translate { x, y });
            drawables.push(Drawable::Rotate(angle));
            drawables.push(Drawable::Translate { x: -x, y: -y });
        }
        drawables.push(Drawable::Text {
            x,
            y,
            text: text.to_string(),
        });

        Self {
            font,
            point_size,
            color,
            antialias,
            drawables,
        }
    }

    /// Sets the canvas font and colors, submits the run, then restores the colors.
    pub fn render<L>(&self, library: &mut L, frame: &mut Frame<L::Surface>) -> Result<()>
    where
        L: RenderingLibrary,
    {
        let saved = (frame.state.stroke, frame.state.fill, frame.state.text_antialias);
        frame.state.font = self.font.clone();
        frame.state.point_size = self.point_size;
        frame.state.stroke = None;
        frame.state.fill = self.color;
        frame.state.text_antialias = self.antialias;

        let result = frame.submit(library, &self.drawables);

        (frame.state.stroke, frame.state.fill, frame.state.text_antialias) = saved;
        result
    }
}
