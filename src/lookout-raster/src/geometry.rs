//! Points, rectangles and locator matches

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer pixel coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle, origin at top-left.
///
/// Coordinates are relative to whatever space the rectangle was computed in:
/// a searched image for matches, the virtual desktop for monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Center point, rounded toward the origin
    pub fn center(&self) -> Point {
        Point::new(
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    /// Half-open containment: `[x, right) x [y, bottom)`
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// True when `other` lies entirely within this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Rect::new(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32))
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// A located element: where it is and, for text search, what was read there
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    pub rect: Rect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Match {
    pub fn new(rect: Rect) -> Self {
        Self { rect, label: None }
    }

    pub fn labeled(rect: Rect, label: impl Into<String>) -> Self {
        Self {
            rect,
            label: Some(label.into()),
        }
    }

    pub fn center(&self) -> Point {
        self.rect.center()
    }
}

/// Anything that can be reduced to a single target point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Position {
    Point(Point),
    Rect(Rect),
    Match(Match),
}

impl Position {
    /// Normalize to a point: a point is its own center
    pub fn center(&self) -> Point {
        match self {
            Position::Point(p) => *p,
            Position::Rect(r) => r.center(),
            Position::Match(m) => m.center(),
        }
    }
}

impl From<Point> for Position {
    fn from(p: Point) -> Self {
        Position::Point(p)
    }
}

impl From<Rect> for Position {
    fn from(r: Rect) -> Self {
        Position::Rect(r)
    }
}

impl From<Match> for Position {
    fn from(m: Match) -> Self {
        Position::Match(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_half_open() {
        let r = Rect::new(10, 20, 5, 5);
        assert!(r.contains(Point::new(10, 20)));
        assert!(r.contains(Point::new(14, 24)));
        assert!(!r.contains(Point::new(15, 24)));
        assert!(!r.contains(Point::new(14, 25)));
        assert!(!r.contains(Point::new(9, 20)));
    }

    #[test]
    fn test_negative_origin() {
        let r = Rect::new(-1920, 0, 1920, 1080);
        assert!(r.contains(Point::new(-1, 0)));
        assert!(!r.contains(Point::new(0, 0)));
        assert_eq!(r.right(), 0);
    }

    #[test]
    fn test_center_normalization() {
        let rect = Rect::new(10, 10, 21, 9);
        assert_eq!(rect.center(), Point::new(20, 14));

        assert_eq!(Position::from(Point::new(3, 4)).center(), Point::new(3, 4));
        assert_eq!(Position::from(rect).center(), Point::new(20, 14));
        assert_eq!(
            Position::from(Match::labeled(rect, "ok")).center(),
            Point::new(20, 14)
        );
    }

    #[test]
    fn test_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersection(&b), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.intersection(&Rect::new(10, 0, 5, 5)), None);
    }
}
