//! The graphics device: owns the page stack and dispatches host callbacks to the
//! style, clip, text and raster components.

use std::sync::{Mutex, PoisonError};

use log::{debug, warn};

use crate::api::{CanvasSpec, Capabilities, Drawable, ImageData, Point, RenderingLibrary};
use crate::clip::{ClipRect, ClipTracker};
use crate::color::Color;
use crate::draw::{self, Primitive, StyleContext};
use crate::error::{DeviceError, Result};
use crate::frame::{Frame, PAGE_DEPTH};
use crate::host::{
    DeviceCapabilities, DeviceDescription, DeviceExtent, DeviceId, DeviceRegistry, FACE_PLAIN,
    GlyphMetrics, GraphicsContext, GraphicsDevice, LTY_SOLID,
};
use crate::options::DeviceOptions;
use crate::raster::{self, Blit};
use crate::text::{self, TextRun};

pub const DEVICE_NAME: &str = "raster-gd";

/// The device that most recently finished a drawing burst.
static LAST_ACTIVE: Mutex<Option<DeviceId>> = Mutex::new(None);

/// Takes the device that last finished a drawing burst, leaving the slot empty.
/// With several devices the last one to finish wins.
pub fn pop_last_active() -> Option<DeviceId> {
    LAST_ACTIVE.lock().unwrap_or_else(PoisonError::into_inner).take()
}

fn set_last_active(id: DeviceId) {
    *LAST_ACTIVE.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);
}

/// Description registered with the host for a `width` x `height` device.
pub fn describe(
    width: u32,
    height: u32,
    resolution: f64,
    options: &DeviceOptions,
    background: Color,
    caps: &Capabilities,
) -> DeviceDescription {
    let char_scale = options.pointsize * resolution / 72.0;
    DeviceDescription {
        name: DEVICE_NAME.to_string(),
        extent: DeviceExtent {
            left: 0.0,
            right: width as f64,
            bottom: height as f64,
            top: 0.0,
        },
        ipr: [1.0 / resolution; 2],
        cra: [0.9 * char_scale, 1.2 * char_scale],
        x_char_offset: 0.49,
        y_char_offset: 0.3333,
        y_line_bias: 0.2,
        start_ps: options.pointsize,
        start_col: Color::BLACK.to_host(),
        start_fill: background.to_host(),
        start_lty: LTY_SOLID,
        start_font: FACE_PLAIN,
        start_gamma: 1.0,
        capabilities: DeviceCapabilities {
            can_clip: options.clip,
            can_h_adjust: false,
            raster: caps.raster,
            capture: caps.capture,
            have_transparency: 2,
            have_transparent_bg: 2,
            has_text_utf8: true,
            want_symbol_utf8: true,
        },
    }
}

pub struct Device<L: RenderingLibrary> {
    library: L,
    caps: Capabilities,
    id: DeviceId,
    description: DeviceDescription,
    width: u32,
    height: u32,
    background: Color,
    resolution: f64,
    antialias: bool,
    multipage: bool,
    /// Every draw goes to all pages.
    drawing: bool,
    clip: ClipTracker,
    frames: Vec<Frame<L::Surface>>,
    in_burst: bool,
    closed: bool,
}

impl<L: RenderingLibrary> Device<L> {
    /// Opens a device with an empty page stack and registers it with the host.
    pub fn open(
        options: &DeviceOptions,
        library: L,
        registry: &mut dyn DeviceRegistry,
    ) -> Result<Self> {
        Self::start(options, library, registry, options.width, options.height, false)
    }

    /// Opens a device that draws onto existing images, one page per image. Every draw
    /// is applied to all of them.
    pub fn open_drawing(
        options: &DeviceOptions,
        library: L,
        registry: &mut dyn DeviceRegistry,
        images: &[ImageData],
    ) -> Result<Self> {
        let first = images.first().ok_or_else(|| {
            DeviceError::InvalidInput("drawing mode needs at least one image".into())
        })?;
        let mut device = Self::start(options, library, registry, first.width, first.height, true)?;
        for image in images {
            let frame = Frame::from_image(
                &mut device.library,
                image,
                device.resolution,
                device.antialias,
            )?;
            device.frames.push(frame);
        }
        Ok(device)
    }

    fn start(
        options: &DeviceOptions,
        library: L,
        registry: &mut dyn DeviceRegistry,
        width: u32,
        height: u32,
        drawing: bool,
    ) -> Result<Self> {
        let resolution = options.effective_resolution();
        let background: Color = options.background.parse()?;
        let caps = library.capabilities();
        if options.clip && !caps.clip_paths {
            return Err(DeviceError::UnsupportedFeature(
                "clipping requested but the rendering library has no clip paths".into(),
            ));
        }
        let description = describe(width, height, resolution, options, background, &caps);
        let id = registry.register(&description).map_err(DeviceError::DeviceInit)?;
        debug!("opened graphics device {:?}: {width}x{height} at {resolution} dpi", id);

        Ok(Self {
            library,
            caps,
            id,
            description,
            width,
            height,
            background,
            resolution,
            antialias: options.antialias,
            multipage: options.multipage,
            drawing,
            clip: ClipTracker::new(options.clip),
            frames: Vec::new(),
            in_burst: false,
            closed: false,
        })
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn description(&self) -> &DeviceDescription {
        &self.description
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        self.description.capabilities
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    pub fn frames(&self) -> &[Frame<L::Surface>] {
        &self.frames
    }

    pub fn page_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Exports page `index` as RGBA.
    pub fn capture_frame(&self, index: usize) -> Result<ImageData> {
        self.ensure_open()?;
        self.ensure_capture()?;
        let frame = self.frames.get(index).ok_or_else(|| {
            DeviceError::InvalidInput(format!(
                "no page {index}; device has {} pages",
                self.frames.len()
            ))
        })?;
        self.library.export_rgba(&frame.surface)
    }

    /// Closes the device and hands the page stack to the caller.
    pub fn finish(mut self) -> Vec<Frame<L::Surface>> {
        self.shutdown()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(DeviceError::InvalidState("graphics device is closed".into()))
        } else {
            Ok(())
        }
    }

    fn ensure_capture(&self) -> Result<()> {
        if self.caps.capture {
            Ok(())
        } else {
            Err(DeviceError::UnsupportedFeature(
                "the rendering library cannot read back pixels".into(),
            ))
        }
    }

    /// Runs `f` on the pages a draw goes to: all of them in drawing mode, the last one
    /// otherwise. Drawing mode then applies `gamma` to every page.
    fn broadcast<F>(&mut self, gamma: f64, mut f: F) -> Result<()>
    where
        F: FnMut(&mut L, &mut Frame<L::Surface>) -> Result<()>,
    {
        self.ensure_page()?;
        let correct = self.drawing && gamma != 1.0;
        if correct && !self.caps.gamma {
            return Err(DeviceError::UnsupportedFeature("gamma correction".into()));
        }
        let start = if self.drawing { 0 } else { self.frames.len() - 1 };
        for frame in &mut self.frames[start..] {
            f(&mut self.library, frame)?;
        }
        if correct {
            for frame in &mut self.frames {
                self.library.gamma(&mut frame.surface, gamma)?;
            }
        }
        Ok(())
    }

    fn submit(&mut self, drawables: &[Drawable], gamma: f64) -> Result<()> {
        self.broadcast(gamma, |library, frame| frame.submit(library, drawables))
    }

    fn draw_primitive(&mut self, primitive: Primitive<'_>, gc: &GraphicsContext) -> Result<()> {
        let style = StyleContext::new(gc, self.resolution, self.antialias);
        let translation = draw::translate(&primitive, &style, &self.caps);
        self.broadcast(gc.gamma, |library, frame| {
            if let Some(rule) = translation.fill_rule {
                frame.state.fill_rule = rule;
            }
            frame.submit(library, &translation.drawables)
        })
    }

    fn ensure_page(&self) -> Result<()> {
        self.ensure_open()?;
        if self.frames.is_empty() { Err(DeviceError::no_page()) } else { Ok(()) }
    }

    fn shutdown(&mut self) -> Vec<Frame<L::Surface>> {
        if self.closed {
            return Vec::new();
        }
        if let Some(reset) = self.clip.reset_pending(self.width, self.height) {
            if let Err(err) = self.submit(&reset, 1.0) {
                warn!("failed to reset clip while closing device {:?}: {err}", self.id);
            }
        }
        self.closed = true;
        debug!("closed graphics device {:?} with {} pages", self.id, self.frames.len());
        std::mem::take(&mut self.frames)
    }
}

impl<L: RenderingLibrary> GraphicsDevice for Device<L> {
    fn new_page(&mut self, fill: Option<Color>) -> Result<()> {
        self.ensure_open()?;
        if self.drawing && !self.frames.is_empty() {
            if let Some(reset) = self.clip.reset(self.width, self.height) {
                self.submit(&reset, 1.0)?;
            }
            return Ok(());
        }
        if !self.multipage && !self.frames.is_empty() {
            return Err(DeviceError::InvalidState(
                "cannot open a new page on a single-page device".into(),
            ));
        }
        if let Some(previous) = self.frames.last_mut() {
            if let Some(reset) = self.clip.reset(previous.width, previous.height) {
                previous.submit(&mut self.library, &reset)?;
            }
        }
        let spec = CanvasSpec {
            width: self.width,
            height: self.height,
            background: fill.unwrap_or(self.background),
            depth: PAGE_DEPTH,
            resolution: self.resolution,
        };
        let frame = Frame::create(&mut self.library, &spec, self.antialias)?;
        self.frames.push(frame);
        debug!("device {:?}: page {}", self.id, self.frames.len());
        Ok(())
    }

    fn close(&mut self) {
        drop(self.shutdown());
    }

    fn clip(&mut self, left: f64, right: f64, bottom: f64, top: f64) -> Result<()> {
        self.ensure_open()?;
        let rect = ClipRect::from_host(left, right, bottom, top);
        let Some(drawables) = self.clip.diff(&rect) else {
            return Ok(());
        };
        self.submit(&drawables, 1.0)?;
        self.clip.commit(rect);
        debug!("device {:?}: clip {:?}", self.id, rect);
        Ok(())
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, gc: &GraphicsContext) -> Result<()> {
        self.draw_primitive(Primitive::Line { x1, y1, x2, y2 }, gc)
    }

    fn polyline(&mut self, points: &[Point], gc: &GraphicsContext) -> Result<()> {
        self.draw_primitive(Primitive::Polyline(points), gc)
    }

    fn polygon(&mut self, points: &[Point], gc: &GraphicsContext) -> Result<()> {
        self.draw_primitive(Primitive::Polygon(points), gc)
    }

    fn rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, gc: &GraphicsContext) -> Result<()> {
        self.draw_primitive(Primitive::Rect { x0, y0, x1, y1 }, gc)
    }

    fn circle(&mut self, x: f64, y: f64, r: f64, gc: &GraphicsContext) -> Result<()> {
        self.draw_primitive(Primitive::Circle { x, y, r }, gc)
    }

    fn path(&mut self, contours: &[Vec<Point>], winding: bool, gc: &GraphicsContext) -> Result<()> {
        self.draw_primitive(Primitive::Path { contours, winding }, gc)
    }

    fn text(
        &mut self,
        x: f64,
        y: f64,
        text: &str,
        rot: f64,
        _hadj: f64,
        gc: &GraphicsContext,
    ) -> Result<()> {
        let run = TextRun::new(x, y, text, rot, gc, self.resolution, self.antialias);
        self.broadcast(gc.gamma, |library, frame| run.render(library, frame))
    }

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
    ) -> Result<()> {
        self.ensure_page()?;
        let blit = Blit {
            image,
            x,
            y,
            width,
            height,
            rot,
            interpolate,
        };
        let prepared = raster::prepare(&mut self.library, &blit)?;
        self.broadcast(gc.gamma, |library, frame| prepared.composite_onto(library, frame))
    }

    fn metric_info(&mut self, c: i32, gc: &GraphicsContext) -> Result<GlyphMetrics> {
        self.ensure_open()?;
        let frame = self.frames.last_mut().ok_or_else(DeviceError::no_page)?;
        text::metric_info(&mut self.library, frame, c, gc)
    }

    fn strwidth(&mut self, text: &str, gc: &GraphicsContext) -> Result<f64> {
        self.ensure_open()?;
        let frame = self.frames.last_mut().ok_or_else(DeviceError::no_page)?;
        text::strwidth(&mut self.library, frame, text, gc)
    }

    fn size(&self) -> DeviceExtent {
        self.description.extent
    }

    fn capture(&mut self) -> Result<ImageData> {
        self.ensure_open()?;
        self.ensure_capture()?;
        let frame = self.frames.last().ok_or_else(DeviceError::no_page)?;
        self.library.export_rgba(&frame.surface)
    }

    fn mode(&mut self, mode: i32) {
        match mode {
            1 => self.in_burst = true,
            0 if self.in_burst => {
                self.in_burst = false;
                set_last_active(self.id);
            }
            _ => {}
        }
    }
}
