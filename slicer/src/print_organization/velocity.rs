use anyhow::{bail, Result};
use tracing::info;

use super::PlanarPrintOrganizer;

pub fn set_linear_velocity_constant(organizer: &mut PlanarPrintOrganizer, velocity: f32) {
    for point in organizer.points_mut() {
        point.velocity = Some(velocity);
    }
    info!("Set constant velocity of {velocity} mm/s");
}

/// Gives every point of a layer that layer's velocity from `velocities`.
pub fn set_linear_velocity_per_layer(
    organizer: &mut PlanarPrintOrganizer,
    velocities: &[f32],
) -> Result<()> {
    if velocities.len() != organizer.layer_count() {
        bail!(
            "Got {} velocities for {} layers",
            velocities.len(),
            organizer.layer_count()
        );
    }

    for (layer, &velocity) in organizer.printpoints.iter_mut().zip(velocities) {
        for point in layer.iter_mut().flatten() {
            point.velocity = Some(velocity);
        }
    }
    Ok(())
}

/// Interpolates the velocity linearly with the height of each point, from
/// `min` at the lowest point of the print to `max` at the highest.
pub fn set_linear_velocity_by_height(organizer: &mut PlanarPrintOrganizer, [min, max]: [f32; 2]) {
    let (low, high) = organizer
        .points()
        .fold((f32::MAX, f32::MIN), |(low, high), x| {
            (low.min(x.pt.z), high.max(x.pt.z))
        });
    let span = high - low;

    for point in organizer.points_mut() {
        let t = if span > 0.0 { (point.pt.z - low) / span } else { 0.0 };
        point.velocity = Some(min + (max - min) * t);
    }
    info!("Set velocity from {min} to {max} mm/s by height");
}
