//! Clip rectangle bookkeeping. Clip paths are expensive for the rendering library, so a
//! clip is only emitted when it differs from the one last applied.

use crate::api::{Drawable, PathCommand};

pub const CLIP_PATH_ID: &str = "clip";

const TOLERANCE: f64 = 0.5;

/// Clip rectangle in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ClipRect {
    /// Snaps host edges inwards to whole pixels.
    pub fn from_host(left: f64, right: f64, bottom: f64, top: f64) -> Self {
        let (left, right) = (left.min(right), left.max(right));
        let (top, bottom) = (top.min(bottom), top.max(bottom));
        Self {
            left: left.ceil(),
            top: top.ceil(),
            right: right.floor(),
            bottom: bottom.floor(),
        }
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            right: width as f64,
            bottom: height as f64,
        }
    }

    pub fn approx_eq(&self, other: &ClipRect) -> bool {
        (self.left - other.left).abs() < TOLERANCE
            && (self.top - other.top).abs() < TOLERANCE
            && (self.right - other.right).abs() < TOLERANCE
            && (self.bottom - other.bottom).abs() < TOLERANCE
    }

    /// Command list that defines and activates this rectangle as the clip path.
    pub fn drawables(&self) -> Vec<Drawable> {
        let outline = vec![
            PathCommand::MoveTo { x: self.left, y: self.top },
            PathCommand::LineTo { x: self.right, y: self.top },
            PathCommand::LineTo { x: self.right, y: self.bottom },
            PathCommand::LineTo { x: self.left, y: self.bottom },
            PathCommand::LineTo { x: self.left, y: self.top },
        ];
        vec![
            Drawable::PushClipPath(CLIP_PATH_ID.into()),
            Drawable::Path(outline),
            Drawable::PopClipPath,
            Drawable::ClipPath(CLIP_PATH_ID.into()),
        ]
    }
}

/// Remembers the last clip applied to the current page.
#[derive(Clone, Debug)]
pub struct ClipTracker {
    enabled: bool,
    last: Option<ClipRect>,
}

impl ClipTracker {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, last: None }
    }

    /// Commands to emit for `rect`, or `None` when clipping is off or `rect` is
    /// already in effect.
    pub fn diff(&self, rect: &ClipRect) -> Option<Vec<Drawable>> {
        if !self.enabled {
            return None;
        }
        match &self.last {
            Some(last) if last.approx_eq(rect) => None,
            _ => Some(rect.drawables()),
        }
    }

    /// Records `rect` as applied.
    pub fn commit(&mut self, rect: ClipRect) {
        self.last = Some(rect);
    }

    /// Commands that lift the clip from a `width` x `height` page; forgets the stored rectangle.
    pub fn reset(&mut self, width: u32, height: u32) -> Option<Vec<Drawable>> {
        if !self.enabled {
            return None;
        }
        self.last = None;
        Some(ClipRect::full(width, height).drawables())
    }

    /// Like [`ClipTracker::reset`], but only when a clip is in effect.
    pub fn reset_pending(&mut self, width: u32, height: u32) -> Option<Vec<Drawable>> {
        if self.last.is_some() { self.reset(width, height) } else { None }
    }
}
