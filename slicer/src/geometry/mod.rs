use crate::Pos;

pub mod segments_1d;
pub use segments_1d::Segments1D;
pub mod triangle;

/// Distance from `point` to the segment `a`-`b`. Zero length segments fall
/// back to the distance to `a`.
pub fn point_segment_distance(point: &Pos, a: &Pos, b: &Pos) -> f32 {
    let ab = b - a;
    let length_squared = ab.norm_squared();
    if length_squared <= f32::EPSILON * f32::EPSILON {
        return (point - a).norm();
    }

    let t = ((point - a).dot(&ab) / length_squared).clamp(0.0, 1.0);
    (point - (a + ab * t)).norm()
}

/// Signed area of the polygon projected onto the xy plane, positive for
/// counter-clockwise winding. The polygon may or may not repeat its first
/// point at the end.
pub fn signed_area_xy(points: &[Pos]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f32>()
        / 2.0
}

pub fn polyline_length(points: &[Pos]) -> f32 {
    points.windows(2).map(|x| (x[1] - x[0]).norm()).sum()
}
