use tracing::info;

use super::{PlanarPrintOrganizer, PrintPoint};

/// Sets the radius the robot may round each point with. It is `d_fillet`,
/// capped to `buffer` times the distance to either neighbour, and zero where
/// the motion has to hit the point exactly: path ends, waits and extruder
/// changes. Values are rounded to five decimals.
pub fn set_blend_radius(organizer: &mut PlanarPrintOrganizer, d_fillet: f32, buffer: f32) {
    for path in organizer.paths_mut() {
        let radii = (0..path.len())
            .map(|k| round(blend_radius(path, k, d_fillet, buffer)))
            .collect::<Vec<_>>();

        for (point, radius) in path.iter_mut().zip(radii) {
            point.blend_radius = Some(radius);
        }
    }

    info!("Set blend radius {d_fillet} with buffer {buffer}");
}

fn blend_radius(path: &[PrintPoint], k: usize, d_fillet: f32, buffer: f32) -> f32 {
    if k == 0 || k + 1 >= path.len() {
        return 0.0;
    }

    let (prev, point, next) = (&path[k - 1], &path[k], &path[k + 1]);
    if point.wait_time.unwrap_or_default() > 0.0
        || prev.extruder_toggle != point.extruder_toggle
        || next.extruder_toggle != point.extruder_toggle
    {
        return 0.0;
    }

    let to_prev = (prev.pt - point.pt).norm() * buffer;
    let to_next = (next.pt - point.pt).norm() * buffer;
    d_fillet.min(to_prev).min(to_next)
}

fn round(value: f32) -> f32 {
    (value * 1e5).round() / 1e5
}
