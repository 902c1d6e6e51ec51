use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout_engine::Direction;
use crate::sys::geometry::{Point, Rect};

/// Stable identity of a connected display. Ids are never reused within a
/// process, so a stale id simply fails to resolve.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonitorId(u32);

impl MonitorId {
    pub fn new(raw: u32) -> Self { MonitorId(raw) }

    pub fn get(self) -> u32 { self.0 }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "monitor#{}", self.0) }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: MonitorId,
    pub rect: Rect,
}

/// How a command names a monitor relative to the current one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorTarget {
    Direction(Direction),
    Next,
    Prev,
    Id(MonitorId),
}

/// Connected monitors, kept sorted by position: left to right, then top to
/// bottom, then by id.
#[derive(Debug, Clone, Default)]
pub struct MonitorRegistry {
    monitors: Vec<Monitor>,
    next_id: u32,
}

impl MonitorRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, rect: Rect) -> MonitorId {
        let id = MonitorId(self.next_id);
        self.next_id += 1;
        self.monitors.push(Monitor { id, rect });
        self.sort();
        debug!(%id, ?rect, "monitor added");
        id
    }

    pub fn remove(&mut self, id: MonitorId) -> Option<Monitor> {
        let idx = self.monitors.iter().position(|m| m.id == id)?;
        Some(self.monitors.remove(idx))
    }

    /// Replaces the frame of an existing monitor, e.g. after a resolution change.
    pub fn update(&mut self, id: MonitorId, rect: Rect) -> bool {
        let Some(monitor) = self.monitors.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        monitor.rect = rect;
        self.sort();
        true
    }

    fn sort(&mut self) {
        self.monitors.sort_by(|a, b| {
            a.rect
                .min_x()
                .total_cmp(&b.rect.min_x())
                .then(a.rect.min_y().total_cmp(&b.rect.min_y()))
                .then(a.id.cmp(&b.id))
        });
    }

    pub fn get(&self, id: MonitorId) -> Option<&Monitor> { self.monitors.iter().find(|m| m.id == id) }

    pub fn contains(&self, id: MonitorId) -> bool { self.get(id).is_some() }

    pub fn iter(&self) -> impl Iterator<Item = &Monitor> { self.monitors.iter() }

    pub fn ids(&self) -> impl Iterator<Item = MonitorId> + '_ { self.monitors.iter().map(|m| m.id) }

    pub fn len(&self) -> usize { self.monitors.len() }

    pub fn is_empty(&self) -> bool { self.monitors.is_empty() }

    /// The first monitor containing `point`, or the one whose outline is
    /// closest to it. Ties go to the monitor that comes first in registry
    /// order.
    ///
    /// # Panics
    ///
    /// If no monitor is registered.
    pub fn monitor_containing(&self, point: Point) -> &Monitor {
        assert!(!self.monitors.is_empty(), "monitor query on an empty registry");
        if let Some(m) = self.monitors.iter().find(|m| m.rect.contains(point)) {
            return m;
        }
        let mut best = &self.monitors[0];
        let mut best_distance = point.distance_to_outline(&best.rect);
        for m in &self.monitors[1..] {
            let distance = point.distance_to_outline(&m.rect);
            if distance < best_distance {
                best = m;
                best_distance = distance;
            }
        }
        best
    }

    /// The monitor whose centre is closest to `point`.
    pub fn nearest_by_center(&self, point: Point) -> Option<&Monitor> {
        self.monitors.iter().fold(None, |best: Option<&Monitor>, m| match best {
            Some(b)
                if b.rect.center().distance_squared_to(point)
                    <= m.rect.center().distance_squared_to(point) =>
            {
                Some(b)
            }
            _ => Some(m),
        })
    }

    /// The closest monitor whose centre lies strictly beyond `id`'s centre in
    /// `direction`.
    pub fn neighbor(&self, id: MonitorId, direction: Direction) -> Option<MonitorId> {
        let origin = self.get(id)?.rect.center();
        let axis = direction.orientation();
        let sign = if direction.is_forward() { 1.0 } else { -1.0 };
        self.monitors
            .iter()
            .filter(|m| m.id != id)
            .filter(|m| {
                let delta = m.rect.center().coordinate(axis) - origin.coordinate(axis);
                delta * sign > 0.0
            })
            .fold(None, |best: Option<&Monitor>, m| match best {
                Some(b)
                    if b.rect.center().distance_squared_to(origin)
                        <= m.rect.center().distance_squared_to(origin) =>
                {
                    Some(b)
                }
                _ => Some(m),
            })
            .map(|m| m.id)
    }

    /// The next (or previous) monitor in registry order, wrapping around.
    pub fn cycle(&self, id: MonitorId, forward: bool) -> Option<MonitorId> {
        let idx = self.monitors.iter().position(|m| m.id == id)?;
        let len = self.monitors.len();
        let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
        Some(self.monitors[next].id)
    }

    pub fn resolve(&self, from: MonitorId, target: MonitorTarget) -> Option<MonitorId> {
        match target {
            MonitorTarget::Direction(direction) => self.neighbor(from, direction),
            MonitorTarget::Next => self.cycle(from, true),
            MonitorTarget::Prev => self.cycle(from, false),
            MonitorTarget::Id(id) => self.contains(id).then_some(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect { Rect::new(x, y, w, h).unwrap() }

    fn two_side_by_side() -> (MonitorRegistry, MonitorId, MonitorId) {
        let mut reg = MonitorRegistry::new();
        // Added out of order on purpose.
        let b = reg.add(rect(1000.0, 0.0, 1000.0, 800.0));
        let a = reg.add(rect(0.0, 0.0, 1000.0, 800.0));
        (reg, a, b)
    }

    #[test]
    fn registry_order_is_positional() {
        let (reg, a, b) = two_side_by_side();
        assert_eq!(reg.ids().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn containing_point_inside() {
        let (reg, a, b) = two_side_by_side();
        assert_eq!(reg.monitor_containing(Point::new(10.0, 10.0)).id, a);
        assert_eq!(reg.monitor_containing(Point::new(1500.0, 400.0)).id, b);
        // Shared edge belongs to the right-hand monitor.
        assert_eq!(reg.monitor_containing(Point::new(1000.0, 400.0)).id, b);
    }

    #[test]
    fn containing_point_outside_degrades_to_nearest() {
        let (reg, a, b) = two_side_by_side();
        assert_eq!(reg.monitor_containing(Point::new(-50.0, 400.0)).id, a);
        assert_eq!(reg.monitor_containing(Point::new(2100.0, -30.0)).id, b);
        // Equidistant below the shared edge: first in registry order.
        assert_eq!(reg.monitor_containing(Point::new(1000.0, 900.0)).id, a);
    }

    #[test]
    #[should_panic(expected = "empty registry")]
    fn containing_on_empty_registry_panics() {
        MonitorRegistry::new().monitor_containing(Point::ZERO);
    }

    #[test]
    fn neighbors_and_cycling() {
        let (mut reg, a, b) = two_side_by_side();
        let below = reg.add(rect(0.0, 800.0, 1000.0, 800.0));
        assert_eq!(reg.neighbor(a, Direction::Right), Some(b));
        assert_eq!(reg.neighbor(b, Direction::Left), Some(a));
        assert_eq!(reg.neighbor(a, Direction::Left), None);
        assert_eq!(reg.neighbor(a, Direction::Down), Some(below));
        assert_eq!(reg.cycle(a, true), Some(below));
        assert_eq!(reg.cycle(a, false), Some(b));
        assert_eq!(reg.resolve(a, MonitorTarget::Id(b)), Some(b));
        assert_eq!(reg.resolve(a, MonitorTarget::Id(MonitorId::new(99))), None);
    }

    #[test]
    fn remove_and_nearest_by_center() {
        let (mut reg, a, b) = two_side_by_side();
        let removed = reg.remove(b).unwrap();
        assert_eq!(removed.id, b);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.nearest_by_center(removed.rect.center()).map(|m| m.id), Some(a));
        assert!(reg.remove(b).is_none());
    }

    #[test]
    fn ids_are_not_reused() {
        let mut reg = MonitorRegistry::new();
        let first = reg.add(rect(0.0, 0.0, 10.0, 10.0));
        reg.remove(first);
        let second = reg.add(rect(0.0, 0.0, 10.0, 10.0));
        assert_ne!(first, second);
    }
}
