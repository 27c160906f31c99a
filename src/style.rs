//! Conversion of host style units into rendering-library units: line widths, dash
//! patterns, and font descriptors.

use crate::api::{FontSpec, FontStyle};
use crate::host::{
    FACE_BOLD, FACE_BOLD_ITALIC, FACE_ITALIC, FACE_SYMBOL, GraphicsContext, LTY_BLANK, LTY_SOLID,
};

/// Dash array meaning "draw a solid line".
pub const SOLID_DASH: [f64; 1] = [0.0];

pub const SYMBOL_FAMILY: &str = "Symbol";

const BIG_POINTS_PER_INCH: f64 = 72.0;
const LWD_UNITS_PER_INCH: f64 = 96.0;

/// Host line width (1/96 inch) in pixels at `resolution` dpi.
pub fn line_width_px(lwd: f64, resolution: f64) -> f64 {
    let inches_per_point = 1.0 / resolution;
    lwd * (BIG_POINTS_PER_INCH / LWD_UNITS_PER_INCH)
        * (1.0 / inches_per_point / BIG_POINTS_PER_INCH)
}

/// Decodes a packed line type into dash segment lengths.
///
/// Each nibble, least significant first, is a segment length in units of the line
/// width; a zero nibble ends the pattern.
pub fn dash_array(lty: i32, lwd: f64) -> Vec<f64> {
    if lty == LTY_BLANK || lty == LTY_SOLID {
        return SOLID_DASH.to_vec();
    }
    let scale = lwd.max(1.0);
    let bits = lty as u32;
    let segments: Vec<f64> = (0..8)
        .map(|i| (bits >> (4 * i)) & 0xF)
        .take_while(|&nibble| nibble != 0)
        .map(|nibble| nibble as f64 * scale)
        .collect();
    if segments.is_empty() {
        SOLID_DASH.to_vec()
    } else {
        segments
    }
}

pub fn is_bold(face: i32) -> bool {
    face == FACE_BOLD || face == FACE_BOLD_ITALIC
}

pub fn is_italic(face: i32) -> bool {
    face == FACE_ITALIC || face == FACE_BOLD_ITALIC
}

pub fn is_symbol(face: i32) -> bool {
    face == FACE_SYMBOL
}

pub fn font_weight(face: i32) -> u16 {
    if is_bold(face) { 700 } else { 400 }
}

pub fn font_style(face: i32) -> FontStyle {
    if is_italic(face) { FontStyle::Italic } else { FontStyle::Normal }
}

fn has_prefix(family: &str, prefix: &str) -> bool {
    let (f, p) = (family.as_bytes(), prefix.as_bytes());
    f.len() >= p.len() && f[..p.len()].eq_ignore_ascii_case(p)
}

/// Resolves generic and well-known family names to installed font families.
pub fn normalize_font(family: &str) -> String {
    let windows = cfg!(target_os = "windows");
    let resolved = if family.is_empty() || has_prefix(family, "sans") {
        "Arial"
    } else if has_prefix(family, "mono") {
        "Courier New"
    } else if has_prefix(family, "comic") {
        "Comic Sans MS"
    } else if has_prefix(family, "trebuchet") {
        "Trebuchet MS"
    } else if has_prefix(family, "georgia") {
        "Georgia"
    } else if has_prefix(family, "lucida") {
        if windows { "Lucida Console" } else { "Lucida Grande" }
    } else if has_prefix(family, "helvetica") || has_prefix(family, "segoe") {
        if windows { "Segoe UI" } else { "Helvetica" }
    } else if has_prefix(family, "serif") || has_prefix(family, "times") {
        if windows { "Times New Roman" } else { "Times" }
    } else {
        return family.to_string();
    };
    resolved.to_string()
}

/// Font descriptor for the host context; the symbol face ignores the family.
pub fn font_spec(gc: &GraphicsContext) -> FontSpec {
    let family = if is_symbol(gc.fontface) {
        SYMBOL_FAMILY.to_string()
    } else {
        normalize_font(&gc.fontfamily)
    };
    FontSpec {
        family,
        style: font_style(gc.fontface),
        weight: font_weight(gc.fontface),
    }
}

/// Point size scaled from big points to pixels at `resolution` dpi.
pub fn point_size_px(gc: &GraphicsContext, resolution: f64) -> f64 {
    gc.ps * gc.cex * resolution / BIG_POINTS_PER_INCH
}
