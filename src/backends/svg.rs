//! SVG backend using a streaming XML writer. Surfaces are markup fragments; raster
//! input is embedded as PNG data URIs. Pixels cannot be read back from this backend.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use png::{ColorType, Encoder as PngEncoder};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::api::*;
use crate::color::Color;
use crate::error::{DeviceError, Result};
use crate::geometry::Geometry;
use crate::style::SOLID_DASH;

/// Fraction of the point size used to estimate glyph metrics.
const ASCENT_EM: f64 = 0.8;
const DESCENT_EM: f64 = 0.2;
const ADVANCE_EM: f64 = 0.5;

pub struct SvgSurface {
    width: u32,
    height: u32,
    background: Color,
    defs: Vec<u8>,
    body: Vec<u8>,
    clip_ids: HashMap<String, String>,
    active_clip: Option<String>,
    next_clip: usize,
}

impl SvgSurface {
    fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width,
            height,
            background,
            defs: Vec::new(),
            body: Vec::new(),
            clip_ids: HashMap::new(),
            active_clip: None,
            next_clip: 0,
        }
    }

    /// Copy of `self` with its body wrapped in a group carrying `attrs`.
    fn wrapped(&self, width: u32, height: u32, attrs: &[(&str, &str)]) -> Result<Self> {
        let mut out = Self::new(width, height, Color::TRANSPARENT);
        out.defs = self.defs.clone();
        let mut writer = Writer::new(&mut out.body);
        let mut group = BytesStart::new("g");
        for attr in attrs {
            group.push_attribute(*attr);
        }
        writer.write_event(Event::Start(group))?;
        writer.get_mut().extend_from_slice(&self.body);
        writer.write_event(Event::End(BytesEnd::new("g")))?;
        Ok(out)
    }

    fn define_clip(&mut self, name: String, outline: &[PathCommand]) -> Result<()> {
        let id = format!("clip{}", self.next_clip);
        self.next_clip += 1;
        let d = path_data(outline);
        let mut writer = Writer::new(&mut self.defs);
        let mut clip = BytesStart::new("clipPath");
        clip.push_attribute(("id", id.as_str()));
        writer.write_event(Event::Start(clip))?;
        let mut path = BytesStart::new("path");
        path.push_attribute(("d", d.as_str()));
        writer.write_event(Event::Empty(path))?;
        writer.write_event(Event::End(BytesEnd::new("clipPath")))?;
        self.clip_ids.insert(name, id);
        Ok(())
    }
}

/// One element of a command list, kept in submission order.
enum Node {
    Shape(BytesStart<'static>),
    Text(BytesStart<'static>, String),
}

/// Style accumulated while writing one command list.
struct Pen {
    stroke: Option<Color>,
    fill: Option<Color>,
    width: f64,
    cap: LineCap,
    join: LineJoin,
    miter_limit: f64,
    dash: Vec<f64>,
    antialias: bool,
    transform: String,
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
            transform: String::new(),
        }
    }

    fn push_transform(&mut self, step: &str) {
        if !self.transform.is_empty() {
            self.transform.push(' ');
        }
        self.transform.push_str(step);
    }

    fn apply(&self, elem: &mut BytesStart<'_>, fillable: bool) {
        match self.fill.filter(|_| fillable) {
            Some(fill) => push_color(elem, "fill", fill),
            None => elem.push_attribute(("fill", "none")),
        }
        match self.stroke {
            Some(stroke) => {
                push_color(elem, "stroke", stroke);
                elem.push_attribute(("stroke-width", self.width.to_string().as_str()));
                elem.push_attribute((
                    "stroke-linecap",
                    match self.cap {
                        LineCap::Butt => "butt",
                        LineCap::Round => "round",
                        LineCap::Square => "square",
                    },
                ));
                elem.push_attribute((
                    "stroke-linejoin",
                    match self.join {
                        LineJoin::Round => "round",
                        LineJoin::Bevel => "bevel",
                        LineJoin::Miter => "miter",
                    },
                ));
                elem.push_attribute(("stroke-miterlimit", self.miter_limit.to_string().as_str()));
                if self.dash.as_slice() != SOLID_DASH {
                    let dash =
                        self.dash.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
                    elem.push_attribute(("stroke-dasharray", dash.as_str()));
                }
            }
            None => elem.push_attribute(("stroke", "none")),
        }
        if !self.antialias {
            elem.push_attribute(("shape-rendering", "crispEdges"));
        }
        if !self.transform.is_empty() {
            elem.push_attribute(("transform", self.transform.as_str()));
        }
    }
}

/// Rendering library that writes SVG markup.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgLibrary;

impl SvgLibrary {
    pub fn new() -> Self {
        Self
    }

    /// Serializes a surface as a standalone SVG document.
    pub fn document(&self, surface: &SvgSurface) -> Result<String> {
        let mut out = Vec::new();
        let mut writer = Writer::new_with_indent(&mut out, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let width_attr = surface.width.to_string();
        let height_attr = surface.height.to_string();
        let view_box_attr = format!("0 0 {} {}", surface.width, surface.height);
        let mut start = BytesStart::new("svg");
        start.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
        start.push_attribute(("version", "1.1"));
        start.push_attribute(("width", width_attr.as_str()));
        start.push_attribute(("height", height_attr.as_str()));
        start.push_attribute(("viewBox", view_box_attr.as_str()));
        writer.write_event(Event::Start(start))?;

        if !surface.defs.is_empty() {
            writer.write_event(Event::Start(BytesStart::new("defs")))?;
            writer.get_mut().extend_from_slice(&surface.defs);
            writer.write_event(Event::End(BytesEnd::new("defs")))?;
        }
        if !surface.background.is_transparent() {
            let mut rect = BytesStart::new("rect");
            rect.push_attribute(("width", "100%"));
            rect.push_attribute(("height", "100%"));
            push_color(&mut rect, "fill", surface.background);
            writer.write_event(Event::Empty(rect))?;
        }
        writer.get_mut().extend_from_slice(&surface.body);
        writer.write_event(Event::End(BytesEnd::new("svg")))?;

        String::from_utf8(out).map_err(|err| DeviceError::Backend(Box::new(err)))
    }

    fn encode_image_as_data_uri(image: &ImageData) -> Result<String> {
        let mut png_bytes = Vec::new();
        let mut encoder = PngEncoder::new(&mut png_bytes, image.width, image.height);
        encoder.set_color(ColorType::Rgba);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&image.data)?;
        writer.finish()?;

        let encoded = BASE64_STANDARD.encode(png_bytes);
        Ok(format!("data:image/png;base64,{}", encoded))
    }
}

impl RenderingLibrary for SvgLibrary {
    type Surface = SvgSurface;

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            capture: false,
            gamma: false,
            ..Capabilities::default()
        }
    }

    fn create_canvas(&mut self, spec: &CanvasSpec) -> Result<SvgSurface> {
        Ok(SvgSurface::new(spec.width, spec.height, spec.background))
    }

    fn canvas_from_rgba(&mut self, image: &ImageData) -> Result<SvgSurface> {
        let mut surface = SvgSurface::new(image.width, image.height, Color::TRANSPARENT);
        let uri = Self::encode_image_as_data_uri(image)?;
        let mut elem = BytesStart::new("image");
        elem.push_attribute(("x", "0"));
        elem.push_attribute(("y", "0"));
        elem.push_attribute(("width", image.width.to_string().as_str()));
        elem.push_attribute(("height", image.height.to_string().as_str()));
        elem.push_attribute(("href", uri.as_str()));
        Writer::new(&mut surface.body).write_event(Event::Empty(elem))?;
        Ok(surface)
    }

    fn dimensions(&self, surface: &SvgSurface) -> (u32, u32) {
        (surface.width, surface.height)
    }

    fn draw(
        &mut self,
        surface: &mut SvgSurface,
        state: &CanvasState,
        drawables: &[Drawable],
    ) -> Result<()> {
        let mut pen = Pen::from_state(state);
        let mut defining: Option<(String, Vec<PathCommand>)> = None;
        let mut nodes: Vec<Node> = Vec::new();
        let rule = match state.fill_rule {
            FillRule::NonZero => "nonzero",
            FillRule::EvenOdd => "evenodd",
        };

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
                Drawable::TextAntialias(_) | Drawable::Font(_) | Drawable::PointSize(_) => {}
                Drawable::Translate { x, y } => {
                    pen.push_transform(&format!("translate({x} {y})"));
                }
                Drawable::Rotate(degrees) => {
                    pen.push_transform(&format!("rotate({degrees})"));
                }
                Drawable::Line { x1, y1, x2, y2 } => {
                    let mut elem = BytesStart::new("line");
                    elem.push_attribute(("x1", x1.to_string().as_str()));
                    elem.push_attribute(("y1", y1.to_string().as_str()));
                    elem.push_attribute(("x2", x2.to_string().as_str()));
                    elem.push_attribute(("y2", y2.to_string().as_str()));
                    pen.apply(&mut elem, false);
                    nodes.push(Node::Shape(elem));
                }
                Drawable::Polyline(points) | Drawable::Polygon(points) => {
                    let tag = if matches!(drawable, Drawable::Polyline(_)) {
                        "polyline"
                    } else {
                        "polygon"
                    };
                    let mut elem = BytesStart::new(tag);
                    elem.push_attribute(("points", points_attr(points).as_str()));
                    elem.push_attribute(("fill-rule", rule));
                    pen.apply(&mut elem, true);
                    nodes.push(Node::Shape(elem));
                }
                Drawable::Rectangle { x0, y0, x1, y1 } => {
                    let mut elem = BytesStart::new("rect");
                    elem.push_attribute(("x", x0.to_string().as_str()));
                    elem.push_attribute(("y", y0.to_string().as_str()));
                    elem.push_attribute(("width", (x1 - x0).to_string().as_str()));
                    elem.push_attribute(("height", (y1 - y0).to_string().as_str()));
                    pen.apply(&mut elem, true);
                    nodes.push(Node::Shape(elem));
                }
                Drawable::Circle { cx, cy, px, py } => {
                    let r = (px - cx).hypot(py - cy);
                    let mut elem = BytesStart::new("circle");
                    elem.push_attribute(("cx", cx.to_string().as_str()));
                    elem.push_attribute(("cy", cy.to_string().as_str()));
                    elem.push_attribute(("r", r.to_string().as_str()));
                    pen.apply(&mut elem, true);
                    nodes.push(Node::Shape(elem));
                }
                Drawable::Path(commands) => match defining.as_mut() {
                    Some((_, outline)) => outline.extend_from_slice(commands),
                    None => {
                        let mut elem = BytesStart::new("path");
                        elem.push_attribute(("d", path_data(commands).as_str()));
                        elem.push_attribute(("fill-rule", rule));
                        pen.apply(&mut elem, true);
                        nodes.push(Node::Shape(elem));
                    }
                },
                Drawable::Text { x, y, text } => {
                    let mut elem = BytesStart::new("text");
                    elem.push_attribute(("x", x.to_string().as_str()));
                    elem.push_attribute(("y", y.to_string().as_str()));
                    elem.push_attribute(("font-family", state.font.family.as_str()));
                    elem.push_attribute(("font-size", state.point_size.to_string().as_str()));
                    elem.push_attribute(("font-weight", state.font.weight.to_string().as_str()));
                    if state.font.style == FontStyle::Italic {
                        elem.push_attribute(("font-style", "italic"));
                    }
                    match state.fill {
                        Some(fill) => push_color(&mut elem, "fill", fill),
                        None => elem.push_attribute(("fill", "none")),
                    }
                    if !state.text_antialias {
                        elem.push_attribute(("text-rendering", "optimizeSpeed"));
                    }
                    if !pen.transform.is_empty() {
                        elem.push_attribute(("transform", pen.transform.as_str()));
                    }
                    nodes.push(Node::Text(elem, text.clone()));
                }
                Drawable::PushClipPath(id) => defining = Some((id.clone(), Vec::new())),
                Drawable::PopClipPath => {
                    if let Some((id, outline)) = defining.take() {
                        surface.define_clip(id, &outline)?;
                    }
                }
                Drawable::ClipPath(id) => {
                    surface.active_clip = surface.clip_ids.get(id).cloned();
                }
            }
        }

        if nodes.is_empty() {
            return Ok(());
        }
        let mut writer = Writer::new(&mut surface.body);
        let mut group = BytesStart::new("g");
        if let Some(clip) = &surface.active_clip {
            group.push_attribute(("clip-path", format!("url(#{clip})").as_str()));
        }
        writer.write_event(Event::Start(group))?;
        for node in nodes {
            match node {
                Node::Shape(elem) => writer.write_event(Event::Empty(elem))?,
                Node::Text(elem, text) => {
                    writer.write_event(Event::Start(elem))?;
                    writer.write_event(Event::Text(BytesText::new(&text)))?;
                    writer.write_event(Event::End(BytesEnd::new("text")))?;
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new("g")))?;
        Ok(())
    }

    fn type_metrics(
        &mut self,
        _surface: &SvgSurface,
        state: &CanvasState,
        text: &str,
    ) -> Result<TypeMetrics> {
        let size = state.point_size;
        Ok(TypeMetrics {
            ascent: ASCENT_EM * size,
            descent: DESCENT_EM * size,
            text_width: ADVANCE_EM * size * text.chars().count() as f64,
        })
    }

    fn resize(
        &mut self,
        surface: &SvgSurface,
        geometry: &Geometry,
        filter: ResizeFilter,
    ) -> Result<SvgSurface> {
        let (w, h) = geometry.resolve(surface.width, surface.height)?;
        let transform = format!(
            "scale({} {})",
            w as f64 / surface.width as f64,
            h as f64 / surface.height as f64
        );
        let rendering = match filter {
            ResizeFilter::Smooth => "optimizeQuality",
            ResizeFilter::Point => "pixelated",
        };
        surface.wrapped(w, h, &[("transform", transform.as_str()), ("image-rendering", rendering)])
    }

    fn rotate(&mut self, surface: &SvgSurface, degrees: f64) -> Result<SvgSurface> {
        let (rw, rh) = rotated_extent_px(surface.width, surface.height, degrees);
        let transform = format!(
            "translate({} {}) rotate({}) translate({} {})",
            rw as f64 / 2.0,
            rh as f64 / 2.0,
            degrees,
            -(surface.width as f64) / 2.0,
            -(surface.height as f64) / 2.0
        );
        surface.wrapped(rw, rh, &[("transform", transform.as_str())])
    }

    fn composite(
        &mut self,
        target: &mut SvgSurface,
        _state: &CanvasState,
        source: &SvgSurface,
        x: f64,
        y: f64,
        op: CompositeOperation,
    ) -> Result<()> {
        if op != CompositeOperation::Over {
            return Err(DeviceError::UnsupportedFeature(format!(
                "{op:?} compositing in SVG output"
            )));
        }
        target.defs.extend_from_slice(&source.defs);
        let transform = format!("translate({x} {y})");
        let mut writer = Writer::new(&mut target.body);
        let mut group = BytesStart::new("g");
        group.push_attribute(("transform", transform.as_str()));
        if let Some(clip) = &target.active_clip {
            group.push_attribute(("clip-path", format!("url(#{clip})").as_str()));
        }
        writer.write_event(Event::Start(group))?;
        writer.get_mut().extend_from_slice(&source.body);
        writer.write_event(Event::End(BytesEnd::new("g")))?;
        Ok(())
    }

    fn gamma(&mut self, _surface: &mut SvgSurface, _gamma: f64) -> Result<()> {
        Err(DeviceError::UnsupportedFeature("gamma correction of SVG output".into()))
    }

    fn export_rgba(&self, _surface: &SvgSurface) -> Result<ImageData> {
        Err(DeviceError::UnsupportedFeature("pixel read-back of SVG output".into()))
    }
}

fn push_color(elem: &mut BytesStart<'_>, attr: &str, color: Color) {
    elem.push_attribute((attr, color.to_hex_rgb().as_str()));
    if color.a < 255 {
        let opacity_attr = format!("{attr}-opacity");
        elem.push_attribute((opacity_attr.as_str(), color.opacity().to_string().as_str()));
    }
}

fn points_attr(points: &[Point]) -> String {
    points.iter().map(|p| format!("{},{}", p.x, p.y)).collect::<Vec<_>>().join(" ")
}

fn path_data(commands: &[PathCommand]) -> String {
    commands
        .iter()
        .map(|cmd| match *cmd {
            PathCommand::MoveTo { x, y } => format!("M {x} {y}"),
            PathCommand::LineTo { x, y } => format!("L {x} {y}"),
            PathCommand::ClosePath => "Z".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
