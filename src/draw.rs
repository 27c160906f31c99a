//! Translation of host primitives into drawable command lists.

use crate::api::{Capabilities, Drawable, FillRule, LineCap, LineJoin, PathCommand, Point};
use crate::color::Color;
use crate::host::{GraphicsContext, LTY_BLANK};
use crate::style;

/// A geometric primitive as the host describes it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Primitive<'a> {
    Line { x1: f64, y1: f64, x2: f64, y2: f64 },
    Polyline(&'a [Point]),
    Polygon(&'a [Point]),
    Rect { x0: f64, y0: f64, x1: f64, y1: f64 },
    Circle { x: f64, y: f64, r: f64 },
    Path { contours: &'a [Vec<Point>], winding: bool },
}

impl Primitive<'_> {
    fn fills(&self) -> bool {
        matches!(
            self,
            Primitive::Polygon(_)
                | Primitive::Rect { .. }
                | Primitive::Circle { .. }
                | Primitive::Path { .. }
        )
    }
}

/// Per-call style, rebuilt from the host context and the page resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleContext {
    /// Outer `None`: leave the library's stroke alone. Inner `None`: no stroke.
    pub stroke: Option<Option<Color>>,
    pub fill: Option<Color>,
    pub width: f64,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f64,
    pub dash: Vec<f64>,
    pub antialias: bool,
}

impl StyleContext {
    pub fn new(gc: &GraphicsContext, resolution: f64, antialias: bool) -> Self {
        let stroke = if gc.lty == LTY_BLANK { Some(None) } else { gc.stroke_color().map(Some) };
        Self {
            stroke,
            fill: gc.fill_color(),
            width: style::line_width_px(gc.lwd, resolution),
            cap: gc.line_cap(),
            join: gc.line_join(),
            miter_limit: gc.lmitre,
            dash: style::dash_array(gc.lty, gc.lwd),
            antialias,
        }
    }
}

/// Command list for one primitive, plus the fill rule the canvas must carry for it.
#[derive(Clone, Debug, PartialEq)]
pub struct Translation {
    pub drawables: Vec<Drawable>,
    pub fill_rule: Option<FillRule>,
}

/// Builds the ordered command list for `primitive`: style items first, geometry last.
pub fn translate(
    primitive: &Primitive<'_>,
    style: &StyleContext,
    caps: &Capabilities,
) -> Translation {
    let is_polyline = matches!(primitive, Primitive::Polyline(_));
    let mut drawables = Vec::with_capacity(10);

    if let Some(stroke) = style.stroke {
        drawables.push(Drawable::StrokeColor(stroke));
    }
    if primitive.fills() {
        if let Some(fill) = style.fill {
            drawables.push(Drawable::FillColor(Some(fill)));
        }
    } else if is_polyline {
        // An open polyline with a fill color is closed and filled by the library.
        drawables.push(Drawable::FillColor(None));
    }
    drawables.push(Drawable::StrokeWidth(style.width));
    drawables.push(Drawable::StrokeLineCap(style.cap));
    drawables.push(Drawable::StrokeAntialias(style.antialias));
    if !(is_polyline && caps.polyline_join_bug) {
        drawables.push(Drawable::StrokeLineJoin(style.join));
    }
    drawables.push(Drawable::MiterLimit(style.miter_limit));
    drawables.push(Drawable::DashArray(style.dash.clone()));

    let mut fill_rule = None;
    let geometry = match *primitive {
        Primitive::Line { x1, y1, x2, y2 } => Drawable::Line { x1, y1, x2, y2 },
        Primitive::Polyline(points) => Drawable::Polyline(points.to_vec()),
        Primitive::Polygon(points) => Drawable::Polygon(points.to_vec()),
        Primitive::Rect { x0, y0, x1, y1 } => Drawable::Rectangle {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        },
        Primitive::Circle { x, y, r } => Drawable::Circle {
            cx: x,
            cy: y,
            px: x,
            py: y + r,
        },
        Primitive::Path { contours, winding } => {
            fill_rule = Some(if winding { FillRule::NonZero } else { FillRule::EvenOdd });
            Drawable::Path(path_commands(contours))
        }
    };
    drawables.push(geometry);

    Translation { drawables, fill_rule }
}

/// One moveto/lineto run per contour, each closed back to its start.
pub fn path_commands(contours: &[Vec<Point>]) -> Vec<PathCommand> {
    let mut commands = Vec::new();
    for contour in contours {
        let Some((first, rest)) = contour.split_first() else {
            continue;
        };
        commands.push(PathCommand::MoveTo { x: first.x, y: first.y });
        commands.extend(rest.iter().map(|p| PathCommand::LineTo { x: p.x, y: p.y }));
        commands.push(PathCommand::ClosePath);
    }
    commands
}
