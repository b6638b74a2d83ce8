//! Plane geometry used by the layout stages.

use std::f64::consts::PI;

pub use glam::DVec2 as Vector2;

/// Distances below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// Rotations and reflections about arbitrary points, which glam only
/// provides about the origin.
pub trait PlaneExt {
    fn rotate_around(self, center: Vector2, angle: f64) -> Self;

    /// Mirror image across the infinite line through `a` and `b`.
    fn reflect_across(self, a: Vector2, b: Vector2) -> Self;
}

impl PlaneExt for Vector2 {
    fn rotate_around(self, center: Vector2, angle: f64) -> Self {
        center + Vector2::from_angle(angle).rotate(self - center)
    }

    fn reflect_across(self, a: Vector2, b: Vector2) -> Self {
        let axis = (b - a).normalize_or_zero();
        if axis == Vector2::ZERO {
            return self;
        }
        let offset = self - a;
        let along = axis * offset.dot(axis);
        a + along * 2.0 - offset
    }
}

/// Arithmetic mean of a set of points, `None` when empty.
pub fn centroid<I: IntoIterator<Item = Vector2>>(points: I) -> Option<Vector2> {
    let (sum, count) = points
        .into_iter()
        .fold((Vector2::ZERO, 0usize), |(sum, count), p| (sum + p, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Radius of the circle through the corners of a regular polygon with
/// `sides` sides of length `side_length`.
pub fn polygon_circumradius(side_length: f64, sides: usize) -> f64 {
    side_length / (2.0 * (PI / sides as f64).sin())
}

/// Distance from the center of a regular polygon to the middle of a side.
pub fn apothem(circumradius: f64, sides: usize) -> f64 {
    circumradius * (PI / sides as f64).cos()
}

pub fn apothem_from_side_length(side_length: f64, sides: usize) -> f64 {
    apothem(polygon_circumradius(side_length, sides), sides)
}

/// Angle subtended at the center by one side of a regular polygon.
pub fn central_angle(sides: usize) -> f64 {
    2.0 * PI / sides as f64
}

/// Normalize an angle into `(-π, π]`.
pub fn wrap_angle(angle: f64) -> f64 {
    let mut wrapped = angle % (2.0 * PI);
    if wrapped <= -PI {
        wrapped += 2.0 * PI;
    } else if wrapped > PI {
        wrapped -= 2.0 * PI;
    }
    wrapped
}

/// Parity of a permutation given as the image of `0..n`: `1` when it is
/// reachable with an even number of swaps, `-1` otherwise.
pub fn parity(permutation: &[usize]) -> i8 {
    let mut inversions = 0usize;
    for i in 0..permutation.len() {
        for j in i + 1..permutation.len() {
            if permutation[i] > permutation[j] {
                inversions += 1;
            }
        }
    }
    if inversions % 2 == 0 {
        1
    } else {
        -1
    }
}

/// Whether the open segments `a1-a2` and `b1-b2` cross. Touching endpoints
/// and collinear overlaps do not count.
pub fn segments_cross(a1: Vector2, a2: Vector2, b1: Vector2, b2: Vector2) -> bool {
    let d1 = (a2 - a1).perp_dot(b1 - a1);
    let d2 = (a2 - a1).perp_dot(b2 - a1);
    let d3 = (b2 - b1).perp_dot(a1 - b1);
    let d4 = (b2 - b1).perp_dot(a2 - b1);
    d1 * d2 < -EPSILON && d3 * d4 < -EPSILON
}

/// Determinant of the 3x3 matrix with rows `a`, `b`, `c`.
pub fn determinant3(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
        + a[2] * (b[0] * c[1] - b[1] * c[0])
}
