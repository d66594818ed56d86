use anyhow::{bail, Result};
use common::config::WaitAt;
use tracing::info;

use super::PlanarPrintOrganizer;

/// Waits `wait_time` seconds on every point inside a path where the path
/// folds back sharper than `threshold_angle` (interior angle, degrees).
pub fn set_wait_time_on_sharp_corners(
    organizer: &mut PlanarPrintOrganizer,
    threshold_angle: f32,
    wait_time: f32,
) {
    let mut corners = 0;
    for path in organizer.paths_mut() {
        for k in 1..path.len().saturating_sub(1) {
            let (prev, next) = (path[k - 1].pt - path[k].pt, path[k + 1].pt - path[k].pt);
            if prev.norm() <= f32::EPSILON || next.norm() <= f32::EPSILON {
                continue;
            }

            if prev.angle(&next).to_degrees() < threshold_angle {
                path[k].wait_time = Some(wait_time);
                corners += 1;
            }
        }
    }

    info!("Added a {wait_time}s wait on {corners} sharp corners");
}

/// Waits `wait_time` seconds where the extruder state changes, right before
/// extrusion starts, after it stops, or both.
pub fn set_wait_time_based_on_extruder_toggle(
    organizer: &mut PlanarPrintOrganizer,
    wait_at: WaitAt,
    wait_time: f32,
) -> Result<()> {
    if organizer.points().any(|x| x.extruder_toggle.is_none()) {
        bail!("Extruder toggles must be set before adding wait times");
    }

    let (before, after) = match wait_at {
        WaitAt::BeforeExtrusion => (true, false),
        WaitAt::AfterExtrusion => (false, true),
        WaitAt::BeforeAndAfterExtrusion => (true, true),
    };

    let mut previous = None;
    for point in organizer.points_mut() {
        let extrudes = point.extrudes();
        let starts = before && extrudes && previous == Some(false);
        let stops = after && !extrudes && previous == Some(true);

        if starts || stops {
            point.wait_time = Some(wait_time);
        }
        previous = Some(extrudes);
    }

    Ok(())
}
