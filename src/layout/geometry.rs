//! Geometric primitives shared by the layout and its renderers.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn midpoint(self, other: Point) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Axis-aligned rectangle; `(x, y)` is the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle of the given size centred on `center`
    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    /// Degenerate rectangle covering one point
    pub fn at(point: Point) -> Self {
        Self::new(point.x, point.y, 0.0, 0.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn union(&self, other: &Rect) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
    }

    pub fn include(&self, point: Point) -> Self {
        self.union(&Rect::at(point))
    }

    /// Open-interval overlap; touching edges do not intersect
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }
}

/// Direction a port's connection leaves the chassis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Up,
    Down,
    Left,
    Right,
}

impl Orientation {
    pub fn is_vertical(self) -> bool {
        matches!(self, Orientation::Up | Orientation::Down)
    }

    /// Move `point` `distance` units in this direction
    pub fn extend(self, point: Point, distance: f64) -> Point {
        match self {
            Orientation::Up => point.translate(0.0, -distance),
            Orientation::Down => point.translate(0.0, distance),
            Orientation::Left => point.translate(-distance, 0.0),
            Orientation::Right => point.translate(distance, 0.0),
        }
    }
}

/// A text box with already-fitted content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    pub rect: Rect,
    pub lines: Vec<String>,
    /// Content was cut to fit the size bounds
    pub truncated: bool,
    /// Text runs bottom-to-top inside `rect`
    pub rotated: bool,
}

impl Label {
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            rect: self.rect.translate(dx, dy),
            ..self.clone()
        }
    }
}
