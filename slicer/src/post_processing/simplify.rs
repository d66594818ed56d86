use std::time::Instant;

use rayon::iter::{IntoParallelRefMutIterator, ParallelIterator};
use tracing::info;

use crate::{geometry::point_segment_distance, slicer::SliceResult, Pos};

/// Removes points that deviate less than `threshold` from the line through
/// their neighbours, using Ramer-Douglas-Peucker on every path. Closed paths
/// that would end up with fewer than three distinct points are left alone.
pub fn simplify_paths_rdp(result: &mut SliceResult, threshold: f32) {
    let threshold = threshold.max(0.0);
    let before = result.point_count();
    let start = Instant::now();

    result.layers.par_iter_mut().for_each(|layer| {
        for path in layer.paths.iter_mut() {
            let simplified = rdp(&path.points, threshold);
            let minimum = if path.is_closed { 4 } else { 2 };

            if simplified.len() >= minimum && simplified.len() < path.points.len() {
                path.points = simplified;
            }
        }
    });

    info!(
        "Simplified paths from {before} to {} points in {:?}",
        result.point_count(),
        start.elapsed()
    );
}

/// Ramer-Douglas-Peucker simplification of a polyline. Both end points are
/// always kept and the result never has more points than the input.
pub fn rdp(points: &[Pos], threshold: f32) -> Vec<Pos> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    (keep[0], keep[last]) = (true, true);

    let mut stack = vec![(0, last)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let (a, b) = (&points[start], &points[end]);
        let (index, distance) = (start + 1..end)
            .map(|i| (i, point_segment_distance(&points[i], a, b)))
            .fold((start, -1.0), |max, x| if x.1 > max.1 { x } else { max });

        if distance > threshold {
            keep[index] = true;
            stack.push((index, end));
            stack.push((start, index));
        }
    }

    (points.iter().zip(keep))
        .filter_map(|(point, keep)| keep.then_some(*point))
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::{collection::vec, prelude::*};

    use super::*;
    use crate::slicer::{Layer, Path};

    fn result(paths: Vec<Path>) -> SliceResult {
        SliceResult {
            mesh: Default::default(),
            layer_height: 1.0,
            layers: vec![Layer { paths }],
        }
    }

    #[test]
    fn removes_collinear_points() {
        let points = (0..=10)
            .map(|i| Pos::new(i as f32, 0.0, 0.0))
            .collect::<Vec<_>>();
        assert_eq!(rdp(&points, 0.1), vec![points[0], points[10]]);
    }

    #[test]
    fn keeps_corners() {
        let points = [
            Pos::new(0.0, 0.0, 0.0),
            Pos::new(1.0, 0.05, 0.0),
            Pos::new(2.0, 0.0, 0.0),
            Pos::new(2.0, 2.0, 0.0),
        ];
        assert_eq!(rdp(&points, 0.1), vec![points[0], points[2], points[3]]);
        assert_eq!(rdp(&points, 0.0), points.to_vec());
    }

    #[test]
    fn closed_square_keeps_corners() {
        let mut points = Vec::new();
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 2.0), (1.0, 2.0), (0.0, 2.0)] {
            points.push(Pos::new(x, y, 5.0));
        }
        points.push(points[0]);

        let mut result = result(vec![Path::new(points, true)]);
        simplify_paths_rdp(&mut result, 0.6);

        let path = &result.layers[0].paths[0];
        assert!(path.wraps());
        assert_eq!(path.points.len(), 5);
    }

    #[test]
    fn tiny_closed_path_untouched() {
        let points = vec![
            Pos::new(0.0, 0.0, 0.0),
            Pos::new(0.1, 0.0, 0.0),
            Pos::new(0.0, 0.1, 0.0),
            Pos::new(0.0, 0.0, 0.0),
        ];
        let mut result = result(vec![Path::new(points.clone(), true)]);
        simplify_paths_rdp(&mut result, 0.6);

        assert_eq!(result.layers[0].paths[0].points, points);
    }

    proptest! {
        #[test]
        fn never_adds_points(
            coords in vec((-50.0_f32..50.0, -50.0_f32..50.0), 0..64),
            threshold in -1.0_f32..5.0,
        ) {
            let points = coords.iter().map(|&(x, y)| Pos::new(x, y, 0.0)).collect::<Vec<_>>();
            let simplified = rdp(&points, threshold.max(0.0));

            prop_assert!(simplified.len() <= points.len());
            if points.len() >= 2 {
                prop_assert_eq!(simplified.first(), points.first());
                prop_assert_eq!(simplified.last(), points.last());
            }

            let mut result = result(vec![Path::new(points.clone(), false)]);
            simplify_paths_rdp(&mut result, threshold);
            prop_assert!(result.layers[0].paths[0].points.len() <= points.len());
        }
    }
}
