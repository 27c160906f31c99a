use std::cell::Cell;

use raster_gd::api::{
    CanvasSpec, CanvasState, Capabilities, CompositeOperation, Drawable, FillRule, ImageData, Point,
    RenderingLibrary, ResizeFilter, TypeMetrics,
};
use raster_gd::backends::recording::{RecordedSurface, RecordingLibrary, SurfaceOp};
use raster_gd::clip::ClipRect;
use raster_gd::error::Result;
use raster_gd::geometry::Geometry;
use raster_gd::host::{GraphicsContext, GraphicsDevice, NullRegistry};
use raster_gd::{Color, Device, DeviceError, DeviceOptions, pop_last_active};

fn assert_almost_eq(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
}

fn open(options: DeviceOptions) -> Device<RecordingLibrary> {
    Device::open(&options, RecordingLibrary::new(), &mut NullRegistry::default()).unwrap()
}

fn is_clip(d: &Drawable) -> bool {
    matches!(d, Drawable::ClipPath(_))
}

#[test]
fn repeated_clip_is_emitted_once() {
    let mut device = open(DeviceOptions::new(200, 200));
    device.new_page(None).unwrap();
    device.clip(10.0, 100.0, 100.0, 10.0).unwrap();
    device.clip(10.0, 100.0, 100.0, 10.0).unwrap();
    // Snaps to the same pixel edges as the rectangle above.
    device.clip(9.6, 100.4, 100.3, 9.8).unwrap();
    assert_eq!(device.frames()[0].surface.count_drawables(is_clip), 1);

    device.clip(20.0, 100.0, 100.0, 10.0).unwrap();
    assert_eq!(device.frames()[0].surface.count_drawables(is_clip), 2);
}

#[test]
fn disabled_clipping_emits_nothing() {
    let mut device = open(DeviceOptions::new(200, 200).clip(false));
    device.new_page(None).unwrap();
    device.clip(10.0, 100.0, 100.0, 10.0).unwrap();
    assert_eq!(device.frames()[0].surface.count_drawables(is_clip), 0);
}

#[test]
fn new_page_lifts_clip_from_previous_page() {
    let mut device = open(DeviceOptions::new(120, 80));
    device.new_page(None).unwrap();
    device.clip(10.0, 50.0, 50.0, 10.0).unwrap();
    device.new_page(Some(Color::RED)).unwrap();

    let first = &device.frames()[0].surface;
    let last = first.submissions().last().unwrap().drawables.clone();
    assert_eq!(last, ClipRect::full(120, 80).drawables());

    let second = &device.frames()[1];
    assert_eq!(second.background, Color::RED);
    assert_eq!(second.surface.count_drawables(is_clip), 0);

    // The stored clip was forgotten, so the same rectangle is applied again on page 2.
    device.clip(10.0, 50.0, 50.0, 10.0).unwrap();
    assert_eq!(device.frames()[1].surface.count_drawables(is_clip), 1);
}

#[test]
fn single_page_device_refuses_second_page() {
    let mut device = open(DeviceOptions::new(100, 100).multipage(false));
    device.new_page(None).unwrap();
    let err = device.new_page(None).unwrap_err();
    assert!(matches!(err, DeviceError::InvalidState(_)));
    assert_eq!(device.page_count(), 1);
}

#[test]
fn full_turn_rotation_matches_unrotated_text() {
    let gc = GraphicsContext::default();
    let mut a = open(DeviceOptions::new(100, 100));
    a.new_page(None).unwrap();
    a.text(20.0, 30.0, "label", 0.0, 0.0, &gc).unwrap();
    let mut b = open(DeviceOptions::new(100, 100));
    b.new_page(None).unwrap();
    b.text(20.0, 30.0, "label", 360.0, 0.0, &gc).unwrap();

    assert_eq!(a.frames()[0].surface.ops(), b.frames()[0].surface.ops());
    assert_eq!(a.frames()[0].surface.count_drawables(|d| matches!(d, Drawable::Rotate(_))), 0);
}

#[test]
fn descent_is_positive_for_every_library() {
    let gc = GraphicsContext::default();
    for signed_descent in [false, true] {
        let lib = RecordingLibrary::with_capabilities(Capabilities {
            signed_descent,
            ..Capabilities::default()
        });
        let mut device =
            Device::open(&DeviceOptions::new(100, 100), lib, &mut NullRegistry::default()).unwrap();
        device.new_page(None).unwrap();
        let m = device.metric_info('g' as i32, &gc).unwrap();
        assert_almost_eq(m.ascent, 9.0);
        assert_almost_eq(m.descent, 3.0);
        assert_almost_eq(m.width, 7.2);
    }
}

#[test]
fn last_device_to_finish_a_burst_wins() {
    pop_last_active();
    let mut registry = NullRegistry::default();
    let opts = DeviceOptions::default();
    let mut a = Device::open(&opts, RecordingLibrary::new(), &mut registry).unwrap();
    let mut b = Device::open(&opts, RecordingLibrary::new(), &mut registry).unwrap();

    // Ending a burst that never started leaves the slot alone.
    a.mode(0);
    assert_eq!(pop_last_active(), None);

    a.mode(1);
    b.mode(1);
    b.mode(0);
    a.mode(0);
    assert_eq!(pop_last_active(), Some(a.id()));
    assert_eq!(pop_last_active(), None);

    b.mode(1);
    b.mode(0);
    assert_eq!(pop_last_active(), Some(b.id()));
}

#[test]
fn drawing_mode_broadcasts_to_every_image() {
    let images = vec![
        ImageData::new(4, 3, vec![0; 48]).unwrap(),
        ImageData::new(4, 3, vec![255; 48]).unwrap(),
    ];
    let mut device = Device::open_drawing(
        &DeviceOptions::default(),
        RecordingLibrary::new(),
        &mut NullRegistry::default(),
        &images,
    )
    .unwrap();
    assert!(device.is_drawing());
    assert_eq!(device.size().right, 4.0);

    let gc = GraphicsContext {
        gamma: 2.2,
        ..GraphicsContext::default()
    };
    device.line(0.0, 0.0, 3.0, 2.0, &gc).unwrap();
    device.new_page(None).unwrap();
    assert_eq!(device.page_count(), 2);

    for frame in device.frames() {
        let ops = frame.surface.ops();
        assert!(matches!(ops[0], SurfaceOp::FromImage { width: 4, height: 3 }));
        assert_eq!(frame.surface.count_drawables(|d| matches!(d, Drawable::Line { .. })), 1);
        assert_eq!(ops.iter().filter(|op| matches!(op, SurfaceOp::Gamma(_))).count(), 1);
    }
}

#[test]
fn drawing_mode_requires_images() {
    let err = Device::open_drawing(
        &DeviceOptions::default(),
        RecordingLibrary::new(),
        &mut NullRegistry::default(),
        &[],
    )
    .err()
    .unwrap();
    assert!(matches!(err, DeviceError::InvalidInput(_)));
}

#[test]
fn raster_is_composited_over_the_page() {
    let mut device = open(DeviceOptions::new(100, 100));
    device.new_page(None).unwrap();
    let image = ImageData::new(2, 2, vec![255; 16]).unwrap();
    device
        .raster(&image, 10.0, 50.0, 20.0, -20.0, 0.0, false, &GraphicsContext::default())
        .unwrap();
    let ops = device.frames()[0].surface.ops();
    let composite = ops.iter().find_map(|op| match op {
        SurfaceOp::Composite { x, y, op, source_width, source_height } => {
            Some((*x, *y, *op, *source_width, *source_height))
        }
        _ => None,
    });
    assert_eq!(composite, Some((10.0, 30.0, CompositeOperation::Over, 20, 20)));
}

#[test]
fn finish_resets_pending_clip() {
    let mut device = open(DeviceOptions::new(60, 40));
    device.new_page(None).unwrap();
    device.clip(5.0, 20.0, 20.0, 5.0).unwrap();
    let frames = device.finish();
    let last = frames[0].surface.submissions().last().unwrap().drawables.clone();
    assert_eq!(last, ClipRect::full(60, 40).drawables());
}

#[test]
fn clip_reaches_every_image_in_drawing_mode() {
    let images = vec![ImageData::new(4, 3, vec![0; 48]).unwrap(); 3];
    let mut device = Device::open_drawing(
        &DeviceOptions::default(),
        RecordingLibrary::new(),
        &mut NullRegistry::default(),
        &images,
    )
    .unwrap();
    device.clip(1.0, 3.0, 2.0, 0.0).unwrap();
    for frame in device.frames() {
        let last = frame.surface.submissions().last().unwrap().drawables.clone();
        assert_eq!(last, ClipRect::from_host(1.0, 3.0, 2.0, 0.0).drawables());
    }
}

#[test]
fn gamma_without_library_support_fails_before_drawing() {
    let lib = RecordingLibrary::with_capabilities(Capabilities {
        gamma: false,
        ..Capabilities::default()
    });
    let images = vec![ImageData::new(2, 2, vec![0; 16]).unwrap(); 2];
    let mut registry = NullRegistry::default();
    let mut device =
        Device::open_drawing(&DeviceOptions::default(), lib, &mut registry, &images).unwrap();
    let gc = GraphicsContext {
        gamma: 2.2,
        ..GraphicsContext::default()
    };
    let err = device.line(0.0, 0.0, 1.0, 1.0, &gc).unwrap_err();
    assert!(matches!(err, DeviceError::UnsupportedFeature(_)));
    for frame in device.frames() {
        assert_eq!(frame.surface.count_drawables(|d| matches!(d, Drawable::Line { .. })), 0);
    }

    // Without a correction request the same draw goes through.
    device.line(0.0, 0.0, 1.0, 1.0, &GraphicsContext::default()).unwrap();
}

#[test]
fn path_sets_fill_rule_before_submission() {
    let mut device = open(DeviceOptions::new(100, 100));
    device.new_page(None).unwrap();
    let square = vec![
        Point::new(10.0, 10.0),
        Point::new(90.0, 10.0),
        Point::new(90.0, 90.0),
        Point::new(10.0, 90.0),
    ];
    let hole = vec![
        Point::new(30.0, 30.0),
        Point::new(70.0, 30.0),
        Point::new(70.0, 70.0),
        Point::new(30.0, 70.0),
    ];
    let gc = GraphicsContext::default();
    device.path(&[square.clone(), hole.clone()], false, &gc).unwrap();
    device.path(&[square, hole], true, &gc).unwrap();

    let submissions = device.frames()[0].surface.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].state.fill_rule, FillRule::EvenOdd);
    assert!(matches!(submissions[0].drawables.last(), Some(Drawable::Path(_))));
    assert_eq!(submissions[1].state.fill_rule, FillRule::NonZero);
}

#[test]
fn rotated_raster_turns_about_its_anchor() {
    let mut device = open(DeviceOptions::new(100, 100));
    device.new_page(None).unwrap();
    let image = ImageData::new(4, 2, vec![255; 32]).unwrap();
    device
        .raster(&image, 10.0, 50.0, 40.0, -20.0, 90.0, false, &GraphicsContext::default())
        .unwrap();
    let (x, y, w, h) = device.frames()[0]
        .surface
        .ops()
        .iter()
        .find_map(|op| match op {
            SurfaceOp::Composite { x, y, source_width, source_height, .. } => {
                Some((*x, *y, *source_width as f64, *source_height as f64))
            }
            _ => None,
        })
        .unwrap();
    assert_eq!((w, h), (20.0, 40.0));
    // The anchor (10, 50) becomes the bottom-right corner of the turned box.
    assert_almost_eq(x + w, 10.0);
    assert_almost_eq(y + h, 50.0);
}

/// Recording library whose clip definitions start failing once `fail_clips` is set.
struct FlakyClips {
    inner: RecordingLibrary,
    fail_clips: Cell<bool>,
}

impl FlakyClips {
    fn new() -> Self {
        Self {
            inner: RecordingLibrary::new(),
            fail_clips: Cell::new(false),
        }
    }
}

impl RenderingLibrary for FlakyClips {
    type Surface = RecordedSurface;

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn create_canvas(&mut self, spec: &CanvasSpec) -> Result<RecordedSurface> {
        self.inner.create_canvas(spec)
    }

    fn canvas_from_rgba(&mut self, image: &ImageData) -> Result<RecordedSurface> {
        self.inner.canvas_from_rgba(image)
    }

    fn dimensions(&self, surface: &RecordedSurface) -> (u32, u32) {
        self.inner.dimensions(surface)
    }

    fn draw(
        &mut self,
        surface: &mut RecordedSurface,
        state: &CanvasState,
        drawables: &[Drawable],
    ) -> Result<()> {
        let clips = drawables.iter().any(|d| matches!(d, Drawable::PushClipPath(_)));
        if self.fail_clips.get() && clips {
            return Err(DeviceError::Backend("clip stack exhausted".into()));
        }
        self.inner.draw(surface, state, drawables)
    }

    fn type_metrics(
        &mut self,
        surface: &RecordedSurface,
        state: &CanvasState,
        text: &str,
    ) -> Result<TypeMetrics> {
        self.inner.type_metrics(surface, state, text)
    }

    fn resize(
        &mut self,
        surface: &RecordedSurface,
        geometry: &Geometry,
        filter: ResizeFilter,
    ) -> Result<RecordedSurface> {
        self.inner.resize(surface, geometry, filter)
    }

    fn rotate(&mut self, surface: &RecordedSurface, degrees: f64) -> Result<RecordedSurface> {
        self.inner.rotate(surface, degrees)
    }

    fn composite(
        &mut self,
        target: &mut RecordedSurface,
        state: &CanvasState,
        source: &RecordedSurface,
        x: f64,
        y: f64,
        op: CompositeOperation,
    ) -> Result<()> {
        self.inner.composite(target, state, source, x, y, op)
    }

    fn gamma(&mut self, surface: &mut RecordedSurface, gamma: f64) -> Result<()> {
        self.inner.gamma(surface, gamma)
    }

    fn export_rgba(&self, surface: &RecordedSurface) -> Result<ImageData> {
        self.inner.export_rgba(surface)
    }
}

#[test]
fn failed_clip_reset_does_not_block_teardown() {
    let mut registry = NullRegistry::default();
    let mut device =
        Device::open(&DeviceOptions::new(60, 40), FlakyClips::new(), &mut registry).unwrap();
    device.new_page(None).unwrap();
    device.clip(5.0, 20.0, 20.0, 5.0).unwrap();
    device.library().fail_clips.set(true);

    let frames = device.finish();
    assert_eq!(frames.len(), 1);
    // Only the clip set while drawing made it to the page.
    assert_eq!(frames[0].surface.count_drawables(is_clip), 1);
}

#[test]
fn close_succeeds_when_clip_reset_fails() {
    let mut registry = NullRegistry::default();
    let mut device =
        Device::open(&DeviceOptions::new(60, 40), FlakyClips::new(), &mut registry).unwrap();
    device.new_page(None).unwrap();
    device.clip(5.0, 20.0, 20.0, 5.0).unwrap();
    device.library().fail_clips.set(true);

    device.close();
    assert!(device.is_closed());
    assert_eq!(device.page_count(), 0);
}
