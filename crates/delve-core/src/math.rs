//! 2D math utilities.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Rect {
    /// Create a new rectangle from min and max corners
    #[inline]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Create a square centered on `center`
    #[inline]
    pub fn from_center_half_extent(center: Vec2, half_extent: f32) -> Self {
        Self {
            min: center - Vec2::splat(half_extent),
            max: center + Vec2::splat(half_extent),
        }
    }
}

/// A line segment in world space.
///
/// Contour segments are oriented so that solid material lies to the right of
/// `a -> b` when y grows downward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub a: Vec2,
    pub b: Vec2,
}

impl Segment {
    #[inline]
    pub const fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    /// Closest distance from `point` to the segment
    pub fn distance_to_point(&self, point: Vec2) -> f32 {
        let ab = self.b - self.a;
        let len_sq = ab.length_squared();
        if len_sq <= f32::EPSILON {
            return point.distance(self.a);
        }
        let t = ((point - self.a).dot(ab) / len_sq).clamp(0.0, 1.0);
        point.distance(self.a + ab * t)
    }
}
