use crate::model::window::WindowId;
use crate::sys::geometry::{Point, Rect, Round};

/// Floating windows of one workspace with their frames, bottom to top.
#[derive(Debug, Default, Clone)]
pub struct FloatingManager {
    windows: Vec<(WindowId, Rect)>,
}

impl FloatingManager {
    pub fn new() -> Self { Self::default() }

    /// Adds the window on top of the stack, replacing its frame if it was
    /// already floating.
    pub fn add(&mut self, wid: WindowId, frame: Rect) {
        self.remove(wid);
        self.windows.push((wid, frame));
    }

    pub fn remove(&mut self, wid: WindowId) -> Option<Rect> {
        let idx = self.position(wid)?;
        Some(self.windows.remove(idx).1)
    }

    fn position(&self, wid: WindowId) -> Option<usize> {
        self.windows.iter().position(|(w, _)| *w == wid)
    }

    pub fn contains(&self, wid: WindowId) -> bool { self.position(wid).is_some() }

    pub fn frame(&self, wid: WindowId) -> Option<Rect> {
        self.windows.iter().find(|(w, _)| *w == wid).map(|(_, r)| *r)
    }

    pub fn set_frame(&mut self, wid: WindowId, frame: Rect) -> bool {
        match self.windows.iter_mut().find(|(w, _)| *w == wid) {
            Some((_, r)) => {
                *r = frame;
                true
            }
            None => false,
        }
    }

    /// Moves the window to the top of the z-order.
    pub fn raise(&mut self, wid: WindowId) -> bool {
        let Some(idx) = self.position(wid) else {
            return false;
        };
        let entry = self.windows.remove(idx);
        self.windows.push(entry);
        true
    }

    /// Bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (WindowId, Rect)> + '_ {
        self.windows.iter().copied()
    }

    pub fn windows(&self) -> impl Iterator<Item = WindowId> + '_ { self.windows.iter().map(|(w, _)| *w) }

    pub fn topmost_at(&self, point: Point) -> Option<WindowId> {
        self.windows.iter().rev().find(|(_, r)| r.contains(point)).map(|(w, _)| *w)
    }

    pub fn translate_all(&mut self, delta: Point) {
        for (_, frame) in &mut self.windows {
            *frame = frame.translate(delta);
        }
    }

    pub fn len(&self) -> usize { self.windows.len() }

    pub fn is_empty(&self) -> bool { self.windows.is_empty() }
}

/// Frame given to a window that starts floating without one of its own:
/// half the area in each dimension, centred.
pub fn default_floating_frame(area: Rect) -> Rect {
    let width = area.width() / 2.0;
    let height = area.height() / 2.0;
    Rect::clamped(
        area.min_x() + (area.width() - width) / 2.0,
        area.min_y() + (area.height() - height) / 2.0,
        width,
        height,
    )
    .round()
}
