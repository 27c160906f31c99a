//! Cairo backend, behind the optional `cairo` crate feature. Pages are ARGB32 image
//! surfaces; each command list is replayed on a fresh context so transforms never
//! leak from one list into the next.

use std::collections::HashMap;
use std::f64::consts::PI;

use cairo::{
    Antialias, Context, Extend, Filter, FillRule as CairoFillRule, FontSlant, FontWeight, Format,
    ImageSurface, LineCap as CairoLineCap, LineJoin as CairoLineJoin, Operator, SurfacePattern,
};

use crate::api::*;
use crate::color::Color;
use crate::error::Result;
use crate::geometry::Geometry;
use crate::style::SOLID_DASH;

/// An image surface plus the clip paths defined on it. Cairo clips live on a context,
/// so the active clip is kept here and re-applied on every submission.
pub struct CairoSurface {
    surface: ImageSurface,
    clip_paths: HashMap<String, Vec<PathCommand>>,
    active_clip: Option<Vec<PathCommand>>,
}

impl CairoSurface {
    fn new(surface: ImageSurface) -> Self {
        Self {
            surface,
            clip_paths: HashMap::new(),
            active_clip: None,
        }
    }

    pub fn image_surface(&self) -> &ImageSurface {
        &self.surface
    }

    fn context(&self) -> Result<Context> {
        let ctx = Context::new(&self.surface)?;
        if let Some(clip) = &self.active_clip {
            trace(&ctx, clip);
            ctx.clip();
        }
        Ok(ctx)
    }

    fn size(&self) -> (u32, u32) {
        (self.surface.width() as u32, self.surface.height() as u32)
    }
}

/// Style accumulated while replaying one command list.
struct Pen {
    stroke: Option<Color>,
    fill: Option<Color>,
    width: f64,
    cap: LineCap,
    join: LineJoin,
    miter_limit: f64,
    dash: Vec<f64>,
    antialias: bool,
}

impl Pen {
    fn from_state(state: &CanvasState) -> Self {
        Self {
            stroke: state.stroke,
            fill: state.fill,
            width: 1.0,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            miter_limit: 10.0,
            dash: SOLID_DASH.to_vec(),
            antialias: state.stroke_antialias,
        }
    }

    /// Fills (when `fillable`) and strokes the current path, then clears it.
    fn paint(&self, ctx: &Context, rule: FillRule, fillable: bool) -> Result<()> {
        ctx.set_antialias(map_antialias(self.antialias));
        if let Some(fill) = self.fill.filter(|_| fillable) {
            set_source_color(ctx, fill);
            ctx.set_fill_rule(map_fill_rule(rule));
            ctx.fill_preserve()?;
        }
        if let Some(stroke) = self.stroke {
            set_source_color(ctx, stroke);
            ctx.set_line_width(self.width);
            ctx.set_line_cap(map_line_cap(self.cap));
            ctx.set_line_join(map_line_join(self.join));
            ctx.set_miter_limit(self.miter_limit);
            if self.dash.as_slice() == SOLID_DASH {
                ctx.set_dash(&[], 0.0);
            } else {
                ctx.set_dash(&self.dash, 0.0);
            }
            ctx.stroke_preserve()?;
        }
        ctx.new_path();
        Ok(())
    }
}

/// Rendering library backed by cairo image surfaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct CairoLibrary;

impl CairoLibrary {
    pub fn new() -> Self {
        Self
    }

    fn image_surface_from_rgba(image: &ImageData) -> Result<ImageSurface> {
        let mut buf = vec![0u8; image.data.len()];
        for (src, dst) in image.data.chunks_exact(4).zip(buf.chunks_exact_mut(4)) {
            let a = src[3] as u32;
            let px = (a << 24)
                | (premultiply(src[0], a) << 16)
                | (premultiply(src[1], a) << 8)
                | premultiply(src[2], a);
            dst.copy_from_slice(&px.to_ne_bytes());
        }
        let stride = (image.width * 4) as i32;
        let surface = ImageSurface::create_for_data(
            buf,
            Format::ARgb32,
            image.width as i32,
            image.height as i32,
            stride,
        )?;
        Ok(surface)
    }

    fn blank(width: u32, height: u32) -> Result<ImageSurface> {
        Ok(ImageSurface::create(Format::ARgb32, width as i32, height as i32)?)
    }
}

impl RenderingLibrary for CairoLibrary {
    type Surface = CairoSurface;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn create_canvas(&mut self, spec: &CanvasSpec) -> Result<CairoSurface> {
        let surface = Self::blank(spec.width, spec.height)?;
        {
            let ctx = Context::new(&surface)?;
            ctx.set_operator(Operator::Source);
            set_source_color(&ctx, spec.background);
            ctx.paint()?;
        }
        Ok(CairoSurface::new(surface))
    }

    fn canvas_from_rgba(&mut self, image: &ImageData) -> Result<CairoSurface> {
        Ok(CairoSurface::new(Self::image_surface_from_rgba(image)?))
    }

    fn dimensions(&self, surface: &CairoSurface) -> (u32, u32) {
        surface.size()
    }

    fn draw(
        &mut self,
        surface: &mut CairoSurface,
        state: &CanvasState,
        drawables: &[Drawable],
    ) -> Result<()> {
        let mut ctx = surface.context()?;
        let mut pen = Pen::from_state(state);
        let mut defining: Option<(String, Vec<PathCommand>)> = None;

        for drawable in drawables {
            match drawable {
                Drawable::StrokeColor(c) => pen.stroke = *c,
                Drawable::FillColor(c) => pen.fill = *c,
                Drawable::StrokeWidth(w) => pen.width = *w,
                Drawable::StrokeLineCap(cap) => pen.cap = *cap,
                Drawable::StrokeLineJoin(join) => pen.join = *join,
                Drawable::MiterLimit(m) => pen.miter_limit = *m,
                Drawable::DashArray(dash) => pen.dash = dash.clone(),
                Drawable::StrokeAntialias(aa) => pen.antialias = *aa,
                // Glyphs are resolved from the canvas state.
                Drawable::TextAntialias(_) | Drawable::Font(_) | Drawable::PointSize(_) => {}
                Drawable::Translate { x, y } => ctx.translate(*x, *y),
                Drawable::Rotate(degrees) => ctx.rotate(degrees.to_radians()),
                Drawable::Line { x1, y1, x2, y2 } => {
                    ctx.move_to(*x1, *y1);
                    ctx.line_to(*x2, *y2);
                    pen.paint(&ctx, state.fill_rule, false)?;
                }
                Drawable::Polyline(points) => {
                    trace_points(&ctx, points);
                    pen.paint(&ctx, state.fill_rule, true)?;
                }
                Drawable::Polygon(points) => {
                    trace_points(&ctx, points);
                    ctx.close_path();
                    pen.paint(&ctx, state.fill_rule, true)?;
                }
                Drawable::Rectangle { x0, y0, x1, y1 } => {
                    ctx.rectangle(*x0, *y0, x1 - x0, y1 - y0);
                    pen.paint(&ctx, state.fill_rule, true)?;
                }
                Drawable::Circle { cx, cy, px, py } => {
                    let r = (px - cx).hypot(py - cy);
                    ctx.new_sub_path();
                    ctx.arc(*cx, *cy, r, 0.0, 2.0 * PI);
                    pen.paint(&ctx, state.fill_rule, true)?;
                }
                Drawable::Path(commands) => match defining.as_mut() {
                    Some((_, outline)) => outline.extend_from_slice(commands),
                    None => {
                        trace(&ctx, commands);
                        pen.paint(&ctx, state.fill_rule, true)?;
                    }
                },
                Drawable::Text { x, y, text } => show_text(&ctx, state, *x, *y, text)?,
                Drawable::PushClipPath(id) => defining = Some((id.clone(), Vec::new())),
                Drawable::PopClipPath => {
                    if let Some((id, outline)) = defining.take() {
                        surface.clip_paths.insert(id, outline);
                    }
                }
                Drawable::ClipPath(id) => {
                    surface.active_clip = surface.clip_paths.get(id).cloned();
                    let matrix = ctx.matrix();
                    ctx = surface.context()?;
                    ctx.set_matrix(matrix);
                }
            }
        }
        Ok(())
    }

    fn type_metrics(
        &mut self,
        surface: &CairoSurface,
        state: &CanvasState,
        text: &str,
    ) -> Result<TypeMetrics> {
        let ctx = Context::new(&surface.surface)?;
        select_font(&ctx, state);
        let font = ctx.font_extents()?;
        let extents = ctx.text_extents(text)?;
        Ok(TypeMetrics {
            ascent: font.ascent(),
            descent: font.descent(),
            text_width: extents.x_advance(),
        })
    }

    fn resize(
        &mut self,
        surface: &CairoSurface,
        geometry: &Geometry,
        filter: ResizeFilter,
    ) -> Result<CairoSurface> {
        let (sw, sh) = surface.size();
        let (w, h) = geometry.resolve(sw, sh)?;
        let target = Self::blank(w, h)?;
        {
            let ctx = Context::new(&target)?;
            ctx.scale(w as f64 / sw as f64, h as f64 / sh as f64);
            let pattern = SurfacePattern::create(&surface.surface);
            pattern.set_filter(match filter {
                ResizeFilter::Smooth => Filter::Good,
                ResizeFilter::Point => Filter::Nearest,
            });
            pattern.set_extend(Extend::Pad);
            ctx.set_source(&pattern)?;
            ctx.rectangle(0.0, 0.0, sw as f64, sh as f64);
            ctx.fill()?;
        }
        Ok(CairoSurface::new(target))
    }

    fn rotate(&mut self, surface: &CairoSurface, degrees: f64) -> Result<CairoSurface> {
        let (w, h) = surface.size();
        let (rw, rh) = rotated_extent_px(w, h, degrees);
        let target = Self::blank(rw, rh)?;
        {
            let ctx = Context::new(&target)?;
            ctx.translate(rw as f64 / 2.0, rh as f64 / 2.0);
            ctx.rotate(degrees.to_radians());
            ctx.translate(-(w as f64) / 2.0, -(h as f64) / 2.0);
            ctx.set_source_surface(&surface.surface, 0.0, 0.0)?;
            ctx.paint()?;
        }
        Ok(CairoSurface::new(target))
    }

    fn composite(
        &mut self,
        target: &mut CairoSurface,
        _state: &CanvasState,
        source: &CairoSurface,
        x: f64,
        y: f64,
        op: CompositeOperation,
    ) -> Result<()> {
        let ctx = target.context()?;
        let (w, h) = source.size();
        ctx.set_operator(match op {
            CompositeOperation::Over => Operator::Over,
            CompositeOperation::Copy => Operator::Source,
        });
        ctx.set_source_surface(&source.surface, x, y)?;
        ctx.rectangle(x, y, w as f64, h as f64);
        ctx.fill()?;
        Ok(())
    }

    fn gamma(&mut self, surface: &mut CairoSurface, gamma: f64) -> Result<()> {
        let exponent = 1.0 / gamma;
        let table: Vec<u8> = (0..=255u32)
            .map(|v| (255.0 * (v as f64 / 255.0).powf(exponent)).round().clamp(0.0, 255.0) as u8)
            .collect();
        surface.surface.flush();
        let mut data = surface.surface.data()?;
        for px in data.chunks_exact_mut(4) {
            let c = from_argb32(u32::from_ne_bytes([px[0], px[1], px[2], px[3]]));
            let corrected =
                Color::new(table[c.r as usize], table[c.g as usize], table[c.b as usize], c.a);
            px.copy_from_slice(&to_argb32(corrected).to_ne_bytes());
        }
        Ok(())
    }

    fn export_rgba(&self, surface: &CairoSurface) -> Result<ImageData> {
        let (w, h) = surface.size();
        let stride = surface.surface.stride() as usize;
        let mut out = Vec::with_capacity((w * h * 4) as usize);
        surface.surface.with_data(|data| {
            for row in data.chunks(stride).take(h as usize) {
                for px in row[..(w * 4) as usize].chunks_exact(4) {
                    let c = from_argb32(u32::from_ne_bytes([px[0], px[1], px[2], px[3]]));
                    out.extend_from_slice(&[c.r, c.g, c.b, c.a]);
                }
            }
        })?;
        ImageData::new(w, h, out)
    }
}

fn premultiply(c: u8, a: u32) -> u32 {
    (c as u32 * a + 127) / 255
}

fn unpremultiply(c: u32, a: u32) -> u8 {
    if a == 0 { 0 } else { ((c * 255 + a / 2) / a).min(255) as u8 }
}

/// Decodes one premultiplied ARGB32 pixel.
fn from_argb32(px: u32) -> Color {
    let a = px >> 24;
    Color::new(
        unpremultiply((px >> 16) & 0xFF, a),
        unpremultiply((px >> 8) & 0xFF, a),
        unpremultiply(px & 0xFF, a),
        a as u8,
    )
}

fn to_argb32(c: Color) -> u32 {
    let a = c.a as u32;
    (a << 24) | (premultiply(c.r, a) << 16) | (premultiply(c.g, a) << 8) | premultiply(c.b, a)
}

fn set_source_color(ctx: &Context, color: Color) {
    let (r, g, b, a) = color.to_unit();
    ctx.set_source_rgba(r, g, b, a);
}

fn trace(ctx: &Context, commands: &[PathCommand]) {
    for cmd in commands {
        match *cmd {
            PathCommand::MoveTo { x, y } => ctx.move_to(x, y),
            PathCommand::LineTo { x, y } => ctx.line_to(x, y),
            PathCommand::ClosePath => ctx.close_path(),
        }
    }
}

fn trace_points(ctx: &Context, points: &[Point]) {
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        ctx.move_to(first.x, first.y);
    }
    for p in iter {
        ctx.line_to(p.x, p.y);
    }
}

fn select_font(ctx: &Context, state: &CanvasState) {
    let slant = match state.font.style {
        FontStyle::Normal => FontSlant::Normal,
        FontStyle::Italic => FontSlant::Italic,
    };
    let weight = if state.font.is_bold() { FontWeight::Bold } else { FontWeight::Normal };
    ctx.select_font_face(&state.font.family, slant, weight);
    ctx.set_font_size(state.point_size);
}

fn show_text(ctx: &Context, state: &CanvasState, x: f64, y: f64, text: &str) -> Result<()> {
    let Some(fill) = state.fill else {
        return Ok(());
    };
    select_font(ctx, state);
    let mut options = cairo::FontOptions::new()?;
    options.set_antialias(map_antialias(state.text_antialias));
    ctx.set_font_options(&options);
    set_source_color(ctx, fill);
    ctx.move_to(x, y);
    ctx.show_text(text)?;
    ctx.new_path();
    Ok(())
}

fn map_antialias(on: bool) -> Antialias {
    if on { Antialias::Default } else { Antialias::None }
}

fn map_line_cap(cap: LineCap) -> CairoLineCap {
    match cap {
        LineCap::Butt => CairoLineCap::Butt,
        LineCap::Round => CairoLineCap::Round,
        LineCap::Square => CairoLineCap::Square,
    }
}

fn map_line_join(join: LineJoin) -> CairoLineJoin {
    match join {
        LineJoin::Bevel => CairoLineJoin::Bevel,
        LineJoin::Miter => CairoLineJoin::Miter,
        LineJoin::Round => CairoLineJoin::Round,
    }
}

fn map_fill_rule(rule: FillRule) -> CairoFillRule {
    match rule {
        FillRule::NonZero => CairoFillRule::Winding,
        FillRule::EvenOdd => CairoFillRule::EvenOdd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipRect;

    fn canvas(lib: &mut CairoLibrary) -> CairoSurface {
        lib.create_canvas(&CanvasSpec {
            width: 40,
            height: 30,
            background: Color::WHITE,
            depth: 8,
            resolution: 72.0,
        })
        .unwrap()
    }

    fn red_square() -> Vec<Drawable> {
        vec![
            Drawable::StrokeColor(None),
            Drawable::FillColor(Some(Color::RED)),
            Drawable::Rectangle { x0: 5.0, y0: 5.0, x1: 25.0, y1: 25.0 },
        ]
    }

    #[test]
    fn fills_rectangle_and_exports_rgba() {
        let mut lib = CairoLibrary::new();
        let mut s = canvas(&mut lib);
        lib.draw(&mut s, &CanvasState::default(), &red_square()).unwrap();
        let img = lib.export_rgba(&s).unwrap();
        assert_eq!((img.width, img.height), (40, 30));
        assert_eq!(img.pixel(10, 10), Some(Color::RED));
        assert_eq!(img.pixel(30, 10), Some(Color::WHITE));
    }

    #[test]
    fn clip_path_limits_later_lists() {
        let mut lib = CairoLibrary::new();
        let mut s = canvas(&mut lib);
        let state = CanvasState::default();
        lib.draw(&mut s, &state, &ClipRect::from_host(0.0, 10.0, 10.0, 0.0).drawables()).unwrap();
        lib.draw(&mut s, &state, &red_square()).unwrap();
        let img = lib.export_rgba(&s).unwrap();
        assert_eq!(img.pixel(7, 7), Some(Color::RED));
        assert_eq!(img.pixel(15, 15), Some(Color::WHITE));

        lib.draw(&mut s, &state, &ClipRect::full(40, 30).drawables()).unwrap();
        lib.draw(&mut s, &state, &red_square()).unwrap();
        assert_eq!(lib.export_rgba(&s).unwrap().pixel(15, 15), Some(Color::RED));
    }

    #[test]
    fn rgba_round_trips_through_premultiplied_surface() {
        let mut lib = CairoLibrary::new();
        let image = ImageData::new(2, 1, vec![10, 20, 30, 255, 0, 0, 0, 0]).unwrap();
        let s = lib.canvas_from_rgba(&image).unwrap();
        assert_eq!(lib.export_rgba(&s).unwrap(), image);
    }

    #[test]
    fn nearest_resize_keeps_hard_edges() {
        let mut lib = CairoLibrary::new();
        let image = ImageData::new(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).unwrap();
        let s = lib.canvas_from_rgba(&image).unwrap();
        let big = lib.resize(&s, &Geometry::new(8, 4).exact(), ResizeFilter::Point).unwrap();
        let img = lib.export_rgba(&big).unwrap();
        assert_eq!((img.width, img.height), (8, 4));
        assert_eq!(img.pixel(1, 1), Some(Color::RED));
        assert_eq!(img.pixel(6, 2), Some(Color::rgb(0, 0, 255)));
    }

    #[test]
    fn rotation_grows_bounding_box() {
        let mut lib = CairoLibrary::new();
        let s = lib.canvas_from_rgba(&ImageData::new(4, 2, vec![255; 32]).unwrap()).unwrap();
        let r = lib.rotate(&s, 90.0).unwrap();
        assert_eq!(lib.dimensions(&r), (2, 4));
    }

    #[test]
    fn gamma_brightens_midtones() {
        let mut lib = CairoLibrary::new();
        let image = ImageData::new(1, 1, vec![64, 64, 64, 255]).unwrap();
        let mut s = lib.canvas_from_rgba(&image).unwrap();
        lib.gamma(&mut s, 2.2).unwrap();
        let px = lib.export_rgba(&s).unwrap().pixel(0, 0).unwrap();
        assert!(px.r > 64);
        assert_eq!(px.a, 255);
    }

    #[test]
    fn metrics_are_non_negative() {
        let mut lib = CairoLibrary::new();
        let s = canvas(&mut lib);
        let tm = lib.type_metrics(&s, &CanvasState::default(), "Mg").unwrap();
        assert!(tm.ascent >= 0.0);
        assert!(tm.descent >= 0.0);
        assert!(tm.text_width >= 0.0);
    }
}
