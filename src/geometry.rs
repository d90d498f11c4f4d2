//! Rectangles, points and the design/display scale between them.
//!
//! Design space is measured in card pixels (the format's native size).
//! Display space is measured in on-screen pixels of whatever size the
//! editor currently renders at. Every function here is total: non-finite
//! inputs are coerced to the nearest valid value instead of propagating.

use serde::{Deserialize, Serialize};

/// Minimum QR zone width, in the units of the container being clamped against.
pub const MIN_ZONE_WIDTH: f64 = 50.0;
/// Minimum QR zone height.
pub const MIN_ZONE_HEIGHT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when both sides are finite and strictly positive.
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// A point; also the top-left corner of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

pub type Anchor = Point;

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// QR placement rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Zone {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Zone {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when the zone satisfies the placement invariant inside `bounds`.
    pub fn fits_within(&self, bounds: Size, min_width: f64, min_height: f64) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width >= min_width
            && self.height >= min_height
            && self.right() <= bounds.width
            && self.bottom() <= bounds.height
    }
}

/// Per-axis multipliers from one coordinate space to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactors {
    pub const IDENTITY: Self = Self { x: 1.0, y: 1.0 };

    /// Factors mapping coordinates measured against `from` onto `to`.
    ///
    /// A degenerate `from` side maps to a factor of 1.0 on that axis.
    pub fn between(from: Size, to: Size) -> Self {
        Self {
            x: ratio(to.width, from.width),
            y: ratio(to.height, from.height),
        }
    }

    pub fn inverse(&self) -> Self {
        Self {
            x: ratio(1.0, self.x),
            y: ratio(1.0, self.y),
        }
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    let value = num / den;
    if den > 0.0 && value.is_finite() {
        value
    } else {
        1.0
    }
}

/// Replaces NaN and infinities with `fallback`.
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn factor(value: f64) -> f64 {
    let v = finite_or(value, 1.0);
    if v < 0.0 {
        0.0
    } else {
        v
    }
}

/// Multiplies every field of `rect` by the matching axis factor.
pub fn scale_rect(rect: Zone, scale: ScaleFactors) -> Zone {
    let sx = factor(scale.x);
    let sy = factor(scale.y);
    Zone {
        x: finite_or(rect.x, 0.0) * sx,
        y: finite_or(rect.y, 0.0) * sy,
        width: finite_or(rect.width, 0.0) * sx,
        height: finite_or(rect.height, 0.0) * sy,
    }
}

pub fn scale_point(point: Point, scale: ScaleFactors) -> Point {
    Point {
        x: finite_or(point.x, 0.0) * factor(scale.x),
        y: finite_or(point.y, 0.0) * factor(scale.y),
    }
}

/// Forces `rect` into `bounds` with the given minimum size.
///
/// Size is floored at the minimum first, then capped at the container;
/// the origin is then pulled in so the far edges stay inside. When the
/// container itself is smaller than the minimum, the container wins.
pub fn clamp_rect(rect: Zone, bounds: Size, min_width: f64, min_height: f64) -> Zone {
    let bw = finite_or(bounds.width, 0.0).max(0.0);
    let bh = finite_or(bounds.height, 0.0).max(0.0);

    let width = finite_or(rect.width, min_width).max(min_width).min(bw);
    let height = finite_or(rect.height, min_height).max(min_height).min(bh);

    Zone {
        x: finite_or(rect.x, 0.0).clamp(0.0, bw - width),
        y: finite_or(rect.y, 0.0).clamp(0.0, bh - height),
        width,
        height,
    }
}

/// Keeps a text block of `box_size` anchored at `point` inside `bounds`.
pub fn clamp_point(point: Point, box_size: Size, bounds: Size) -> Point {
    let max_x = (finite_or(bounds.width, 0.0) - finite_or(box_size.width, 0.0)).max(0.0);
    let max_y = (finite_or(bounds.height, 0.0) - finite_or(box_size.height, 0.0)).max(0.0);
    Point {
        x: finite_or(point.x, 0.0).clamp(0.0, max_x),
        y: finite_or(point.y, 0.0).clamp(0.0, max_y),
    }
}
