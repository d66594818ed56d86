use tracing::{debug, info, warn};

use crate::{slicer::SliceResult, Pos};

/// Cuts the first `smooth_distance` off every closed path of single path
/// layers. The path keeps ending on its seam, so the move up to the next
/// layer starts before the seam instead of stacking a blob on it. Layers with
/// several paths are printed with lifts in between and are skipped.
pub fn seams_smooth(result: &mut SliceResult, smooth_distance: f32) {
    if smooth_distance <= 0.0 {
        return;
    }

    let mut smoothed = 0;
    for (layer_idx, layer) in result.layers.iter_mut().enumerate() {
        if layer.paths.len() > 1 {
            warn!(
                "Layer {layer_idx} has {} paths, seams are only smoothed on single path layers",
                layer.paths.len()
            );
            continue;
        }

        for (path_idx, path) in layer.paths.iter_mut().enumerate() {
            if !path.is_closed {
                continue;
            }

            if smooth_start(&mut path.points, smooth_distance) {
                smoothed += 1;
            } else {
                debug!("Path {path_idx} of layer {layer_idx} is too short to smooth");
            }
        }
    }

    info!("Smoothed the seams of {smoothed} paths over {smooth_distance}");
}

/// Replaces the points within `distance` of the seam at the start of the path
/// with one point on the path exactly `distance` away from it. Only the first
/// half of the path is searched.
fn smooth_start(points: &mut Vec<Pos>, distance: f32) -> bool {
    let Some(&seam) = points.first() else {
        return false;
    };

    let cut = (1..=points.len() / 2).find(|&i| (points[i] - seam).norm() >= distance);
    let Some(cut) = cut else {
        return false;
    };

    let start = sphere_crossing(&seam, distance, &points[cut - 1], &points[cut]);
    points.drain(1..cut);
    points[0] = start;
    true
}

/// Point on the segment `a`-`b` at `radius` from `center`, given `a` is inside
/// the sphere and `b` is not.
fn sphere_crossing(center: &Pos, radius: f32, a: &Pos, b: &Pos) -> Pos {
    let (u, w) = (b - a, a - center);
    let (uu, wu) = (u.norm_squared(), w.dot(&u));
    if uu <= f32::EPSILON {
        return *b;
    }

    let discriminant = (wu * wu - uu * (w.norm_squared() - radius * radius)).max(0.0);
    let t = ((-wu + discriminant.sqrt()) / uu).clamp(0.0, 1.0);
    a + u * t
}
