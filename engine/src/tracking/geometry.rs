//! Vector primitives over `[f32; 3]` positions.
//!
//! Positions and directions stay plain arrays, the same representation the
//! sensor delivers.  Degenerate input never panics: normalizing a zero-length
//! vector yields the zero vector, so downstream dot products fall below any
//! positive threshold and read as "no information".

/// 3D vector in sensor space (millimeters for positions).
pub type Vec3 = [f32; 3];

/// Lengths below this are treated as zero when normalizing.
const EPSILON: f32 = 1e-6;

/// Component-wise `a - b`.
pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Dot product.
pub fn dot(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Euclidean length.
pub fn length(v: &Vec3) -> f32 {
    dot(v, v).sqrt()
}

/// Unit vector in the direction of `v`, or zero for a degenerate vector.
pub fn normalize(v: &Vec3) -> Vec3 {
    let len = length(v);
    if len < EPSILON {
        return [0.0; 3];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

/// Euclidean distance between two 3D points.
pub fn distance(a: &Vec3, b: &Vec3) -> f32 {
    length(&sub(b, a))
}

/// Unit direction pointing from `from` to `to`.
pub fn direction(from: &Vec3, to: &Vec3) -> Vec3 {
    normalize(&sub(to, from))
}
