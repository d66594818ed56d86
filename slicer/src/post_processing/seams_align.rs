use common::config::SeamAlignment;
use ordered_float::OrderedFloat;
use tracing::info;

use crate::{
    slicer::{Path, SliceResult},
    Pos,
};

/// Moves the seam (first point) of every closed path to the point closest to
/// the alignment target. With [`SeamAlignment::NextPath`] the target is the
/// seam of the path with the same index on the layer below, so seams line up
/// from layer to layer.
pub fn seams_align(result: &mut SliceResult, align_with: SeamAlignment) {
    let mut previous: Vec<Option<Pos>> = Vec::new();
    let mut rotated = 0;

    for layer in result.layers.iter_mut() {
        let mut seams = Vec::with_capacity(layer.paths.len());

        for (i, path) in layer.paths.iter_mut().enumerate() {
            let target = match align_with.reference_point(path.height().unwrap_or_default()) {
                Some(point) => Some(point),
                None => previous.get(i).copied().flatten(),
            };

            if let Some(target) = target {
                if align_path(path, &target) {
                    rotated += 1;
                }
            }

            seams.push(path.points.first().copied());
        }

        previous = seams;
    }

    info!("Aligned seams of {rotated} paths with {align_with}");
}

/// Rotates a wrapping path so its point closest to `target` comes first.
/// Returns whether the seam moved.
fn align_path(path: &mut Path, target: &Pos) -> bool {
    if !path.wraps() {
        return false;
    }

    let ring = &path.points[..path.points.len() - 1];
    let closest = (ring.iter().enumerate())
        .min_by_key(|(_, point)| OrderedFloat((*point - target).norm_squared()))
        .map(|(i, _)| i);

    match closest {
        Some(index) if index != 0 => {
            path.rotate_seam(index);
            true
        }
        _ => false,
    }
}
