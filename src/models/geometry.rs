//! Screen-space geometry shared by the warp engine and the evaluation pipeline.

use serde::{Deserialize, Serialize};

/// A point in screen coordinates (pixels, y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance.
    pub fn distance_to(self, other: Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Translates the point by `(dx, dy)`.
    pub fn offset(self, dx: f64, dy: f64) -> Point2D {
        Point2D::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Direction of the vector `self -> to`, in radians, measured in a
    /// cartesian frame (y axis pointing up).
    pub fn heading_to(self, to: Point2D) -> f64 {
        (self.y - to.y).atan2(to.x - self.x)
    }
}

/// Angle in degrees between the vectors `origin -> a` and `origin -> b`.
///
/// The raw heading difference is folded into `[0, 180]`, so vectors on either
/// side of the negative x axis compare as close rather than ~360 degrees apart.
/// `tests::angle_folds_across_negative_x_axis` pins this behaviour.
pub fn angle_between_deg(origin: Point2D, a: Point2D, b: Point2D) -> f64 {
    let diff = (origin.heading_to(b) - origin.heading_to(a)).to_degrees().abs() % 360.0;
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}
