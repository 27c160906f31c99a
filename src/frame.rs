//! Pages of a device: each frame pairs a library surface with the canvas-level state
//! the library reads while drawing on it.

use crate::api::{CanvasSpec, CanvasState, Drawable, ImageData, RenderingLibrary};
use crate::color::Color;
use crate::error::Result;

/// Bits per channel of every page a device opens.
pub const PAGE_DEPTH: u8 = 8;

pub struct Frame<S> {
    pub surface: S,
    pub state: CanvasState,
    pub width: u32,
    pub height: u32,
    pub background: Color,
    pub depth: u8,
}

impl<S> Frame<S> {
    /// Opens a blank page on `library`.
    pub fn create<L>(library: &mut L, spec: &CanvasSpec, antialias: bool) -> Result<Self>
    where
        L: RenderingLibrary<Surface = S>,
    {
        let surface = library.create_canvas(spec)?;
        Ok(Self {
            surface,
            state: CanvasState {
                stroke_antialias: antialias,
                text_antialias: antialias,
                resolution: spec.resolution,
                ..CanvasState::default()
            },
            width: spec.width,
            height: spec.height,
            background: spec.background,
            depth: spec.depth,
        })
    }

    /// Wraps an existing image as a page.
    pub fn from_image<L>(
        library: &mut L,
        image: &ImageData,
        resolution: f64,
        antialias: bool,
    ) -> Result<Self>
    where
        L: RenderingLibrary<Surface = S>,
    {
        let surface = library.canvas_from_rgba(image)?;
        Ok(Self {
            surface,
            state: CanvasState {
                stroke_antialias: antialias,
                text_antialias: antialias,
                resolution,
                ..CanvasState::default()
            },
            width: image.width,
            height: image.height,
            background: Color::TRANSPARENT,
            depth: PAGE_DEPTH,
        })
    }

    pub fn resolution(&self) -> f64 {
        self.state.resolution
    }

    /// Submits one command list against this page's current canvas state.
    pub fn submit<L>(&mut self, library: &mut L, drawables: &[Drawable]) -> Result<()>
    where
        L: RenderingLibrary<Surface = S>,
    {
        library.draw(&mut self.surface, &self.state, drawables)
    }
}
