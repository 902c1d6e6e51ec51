use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout_engine::Orientation;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeometryError {
    #[error("rectangle size must be non-negative, got {width}x{height}")]
    NegativeSize { width: f64, height: f64 },
    #[error("rectangle components must be finite")]
    NotFinite,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }

    pub fn distance_squared_to(self, other: Point) -> f64 {
        let d = self - other;
        d.x * d.x + d.y * d.y
    }

    pub fn distance_to(self, other: Point) -> f64 { self.distance_squared_to(other).sqrt() }

    pub fn coordinate(self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.x,
            Orientation::Vertical => self.y,
        }
    }

    /// Distance from this point to the outline of `rect`.
    ///
    /// Zero when the point is strictly inside. Otherwise the smallest of the
    /// perpendicular distances to the edges whose span contains the point's
    /// projection, and the distances to the four corners.
    pub fn distance_to_outline(self, rect: &Rect) -> f64 {
        if rect.min_x() < self.x
            && self.x < rect.max_x()
            && rect.min_y() < self.y
            && self.y < rect.max_y()
        {
            return 0.0;
        }
        let mut best = [
            rect.top_left_corner(),
            rect.top_right_corner(),
            rect.bottom_left_corner(),
            rect.bottom_right_corner(),
        ]
        .into_iter()
        .map(|corner| self.distance_to(corner))
        .fold(f64::INFINITY, f64::min);
        if (rect.min_y()..rect.max_y()).contains(&self.y) {
            best = best.min((rect.min_x() - self.x).abs()).min((rect.max_x() - self.x).abs());
        }
        if (rect.min_x()..rect.max_x()).contains(&self.x) {
            best = best.min((rect.min_y() - self.y).abs()).min((rect.max_y() - self.y).abs());
        }
        best
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point { Point::new(self.x + rhs.x, self.y + rhs.y) }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point { Point::new(self.x - rhs.x, self.y - rhs.y) }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SizeRepr")]
pub struct Size {
    width: f64,
    height: f64,
}

#[derive(Deserialize)]
struct SizeRepr {
    width: f64,
    height: f64,
}

impl TryFrom<SizeRepr> for Size {
    type Error = GeometryError;

    fn try_from(value: SizeRepr) -> Result<Self, Self::Error> { Size::new(value.width, value.height) }
}

impl Size {
    pub fn new(width: f64, height: f64) -> Result<Self, GeometryError> {
        if !width.is_finite() || !height.is_finite() {
            return Err(GeometryError::NotFinite);
        }
        if width < 0.0 || height < 0.0 {
            return Err(GeometryError::NegativeSize { width, height });
        }
        Ok(Self { width, height })
    }

    /// Negative extents are clamped to zero.
    pub fn clamped(width: f64, height: f64) -> Self {
        Self { width: width.max(0.0), height: height.max(0.0) }
    }

    pub fn width(&self) -> f64 { self.width }

    pub fn height(&self) -> f64 { self.height }

    pub fn extent(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.width,
            Orientation::Vertical => self.height,
        }
    }
}

/// Axis-aligned rectangle in global screen coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RectRepr", into = "RectRepr")]
pub struct Rect {
    origin: Point,
    size: Size,
}

#[derive(Serialize, Deserialize)]
struct RectRepr {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl TryFrom<RectRepr> for Rect {
    type Error = GeometryError;

    fn try_from(r: RectRepr) -> Result<Self, Self::Error> { Rect::new(r.x, r.y, r.width, r.height) }
}

impl From<Rect> for RectRepr {
    fn from(r: Rect) -> Self {
        RectRepr {
            x: r.origin.x,
            y: r.origin.y,
            width: r.size.width,
            height: r.size.height,
        }
    }
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self, GeometryError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(GeometryError::NotFinite);
        }
        Ok(Self::from_parts(Point::new(x, y), Size::new(width, height)?))
    }

    pub fn from_parts(origin: Point, size: Size) -> Self { Self { origin, size } }

    /// Like [`Rect::new`] but clamps negative extents to zero. Used by layout
    /// math where gaps may eat the whole extent.
    pub fn clamped(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_parts(Point::new(x, y), Size::clamped(width, height))
    }

    pub fn origin(&self) -> Point { self.origin }

    pub fn size(&self) -> Size { self.size }

    pub fn width(&self) -> f64 { self.size.width }

    pub fn height(&self) -> f64 { self.size.height }

    pub fn min_x(&self) -> f64 { self.origin.x }

    pub fn min_y(&self) -> f64 { self.origin.y }

    pub fn max_x(&self) -> f64 { self.origin.x + self.size.width }

    pub fn max_y(&self) -> f64 { self.origin.y + self.size.height }

    pub fn min(&self, orientation: Orientation) -> f64 { self.origin.coordinate(orientation) }

    pub fn extent(&self, orientation: Orientation) -> f64 { self.size.extent(orientation) }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    pub fn top_left_corner(&self) -> Point { self.origin }

    pub fn top_right_corner(&self) -> Point { Point::new(self.max_x(), self.min_y()) }

    pub fn bottom_left_corner(&self) -> Point { Point::new(self.min_x(), self.max_y()) }

    pub fn bottom_right_corner(&self) -> Point { Point::new(self.max_x(), self.max_y()) }

    /// Half-open containment: `[min, max)` on both axes.
    pub fn contains(&self, point: Point) -> bool {
        (self.min_x()..self.max_x()).contains(&point.x)
            && (self.min_y()..self.max_y()).contains(&point.y)
    }

    pub fn with_origin(&self, origin: Point) -> Self { Self::from_parts(origin, self.size) }

    pub fn translate(&self, delta: Point) -> Self { self.with_origin(self.origin + delta) }
}

pub trait Round {
    fn round(&self) -> Self;
}

impl Round for Rect {
    /// Rounds each edge independently so that rectangles sharing an edge
    /// before rounding still share it afterwards.
    fn round(&self) -> Self {
        let min_x = self.min_x().round();
        let min_y = self.min_y().round();
        Rect::clamped(
            min_x,
            min_y,
            self.max_x().round() - min_x,
            self.max_y().round() - min_y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect { Rect::new(x, y, w, h).unwrap() }

    #[test]
    fn rejects_negative_sizes() {
        assert_eq!(
            Rect::new(0.0, 0.0, -1.0, 10.0),
            Err(GeometryError::NegativeSize { width: -1.0, height: 10.0 })
        );
        assert_eq!(Rect::new(f64::NAN, 0.0, 1.0, 1.0), Err(GeometryError::NotFinite));
        assert!(Rect::new(0.0, 0.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn containment_is_half_open() {
        let r = rect(0.0, 0.0, 100.0, 50.0);
        assert!(r.contains(Point::new(0.0, 0.0)));
        assert!(r.contains(Point::new(99.9, 49.9)));
        assert!(!r.contains(Point::new(100.0, 10.0)));
        assert!(!r.contains(Point::new(10.0, 50.0)));
        assert!(!r.contains(Point::new(-0.1, 10.0)));
    }

    #[test]
    fn vector_arithmetic() {
        let a = Point::new(3.0, 4.0);
        let b = Point::new(1.0, 1.0);
        assert_eq!(a + b, Point::new(4.0, 5.0));
        assert_eq!(a - b, Point::new(2.0, 3.0));
        assert_eq!(a.distance_squared_to(Point::ZERO), 25.0);
        assert_eq!(a.distance_to(Point::ZERO), 5.0);
    }

    #[test]
    fn distance_to_outline() {
        let r = rect(0.0, 0.0, 100.0, 100.0);
        assert_eq!(Point::new(50.0, 50.0).distance_to_outline(&r), 0.0);
        // Projection falls on the right edge.
        assert_eq!(Point::new(130.0, 50.0).distance_to_outline(&r), 30.0);
        // Projection falls on the top edge.
        assert_eq!(Point::new(20.0, -7.0).distance_to_outline(&r), 7.0);
        // Beyond a corner.
        assert_eq!(Point::new(103.0, 104.0).distance_to_outline(&r), 5.0);
        // On the max edge: not contained, but touching the outline.
        assert_eq!(Point::new(100.0, 20.0).distance_to_outline(&r), 0.0);
    }

    #[test]
    fn round_keeps_shared_edges() {
        let third = 1000.0 / 3.0;
        let a = Rect::clamped(0.0, 0.0, third, 10.0).round();
        let b = Rect::clamped(third, 0.0, third, 10.0).round();
        let c = Rect::clamped(2.0 * third, 0.0, third, 10.0).round();
        assert_eq!(a.max_x(), b.min_x());
        assert_eq!(b.max_x(), c.min_x());
        assert_eq!(c.max_x(), 1000.0);
        assert_eq!(a.width() + b.width() + c.width(), 1000.0);
    }

    #[test]
    fn deserialize_validates() {
        let ok: Rect = serde_json::from_str(r#"{"x":1,"y":2,"width":3,"height":4}"#).unwrap();
        assert_eq!(ok, rect(1.0, 2.0, 3.0, 4.0));
        assert!(
            serde_json::from_str::<Rect>(r#"{"x":1,"y":2,"width":-3,"height":4}"#).is_err()
        );
    }
}
