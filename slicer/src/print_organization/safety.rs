use anyhow::{bail, Result};
use tracing::info;

use super::{PlanarPrintOrganizer, PrintPoint};

/// Adds non extruding points lifted by `z_hop` around every travel move: one
/// above each point where the extruder turns off, one above the point where
/// printing resumes, and one above the very first point of the print.
///
/// Needs extruder toggles to be set.
pub fn add_safety_printpoints(organizer: &mut PlanarPrintOrganizer, z_hop: f32) -> Result<()> {
    if organizer.points().any(|x| x.extruder_toggle.is_none()) {
        bail!("Extruder toggles must be set before adding safety points");
    }

    let before = organizer.point_count();
    let mut printpoints = Vec::with_capacity(organizer.layer_count());

    for (i, layer) in organizer.printpoints.iter().enumerate() {
        let mut new_layer = Vec::with_capacity(layer.len());
        for (j, path) in layer.iter().enumerate() {
            let mut new_path = Vec::with_capacity(path.len() + 2);
            for (k, point) in path.iter().enumerate() {
                new_path.push(point.clone());
                if point.extrudes() {
                    continue;
                }

                new_path.push(lifted(point, z_hop));
                if let Some(next) = organizer.next_printpoint(i, j, k) {
                    if next.extrudes() {
                        new_path.push(lifted(next, z_hop));
                    }
                }
            }
            new_layer.push(new_path);
        }
        printpoints.push(new_layer);
    }

    let first_path = printpoints.iter_mut().flatten().find(|x| !x.is_empty());
    if let Some(path) = first_path {
        let point = lifted(&path[0], z_hop);
        path.insert(0, point);
    }

    organizer.printpoints = printpoints;
    info!(
        "Added {} safety points",
        organizer.point_count() - before
    );
    Ok(())
}

fn lifted(point: &PrintPoint, z_hop: f32) -> PrintPoint {
    let mut safety = point.clone();
    safety.pt.z += z_hop;
    safety.extruder_toggle = Some(false);
    safety
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print_organization::tests::organizer;

    #[test]
    fn needs_toggles() {
        let mut organizer = organizer(&[&[3]]);
        assert!(add_safety_printpoints(&mut organizer, 10.0).is_err());
    }

    #[test]
    fn lifts_around_travel() {
        let mut organizer = organizer(&[&[2, 2]]);
        for point in organizer.points_mut() {
            point.extruder_toggle = Some(true);
        }
        organizer.printpoints[0][0][1].extruder_toggle = Some(false);
        organizer.printpoints[0][1][1].extruder_toggle = Some(false);

        add_safety_printpoints(&mut organizer, 10.0).unwrap();

        let first = &organizer.printpoints[0][0];
        let zs = first.iter().map(|x| x.pt.z).collect::<Vec<_>>();
        let xs = first.iter().map(|x| x.pt.x).collect::<Vec<_>>();
        assert_eq!(zs, [10.0, 0.0, 0.0, 10.0, 10.0]);
        assert_eq!(xs, [0.0, 0.0, 1.0, 1.0, 0.0]);

        // Nothing follows the last point, so only its own lift is added.
        let last = &organizer.printpoints[0][1];
        assert_eq!(last.len(), 3);
        assert_eq!(last[2].pt.z, 10.0);

        let safety = [&first[0], &first[3], &first[4], &last[2]];
        assert!(safety.iter().all(|x| x.extruder_toggle == Some(false)));
        assert_eq!(organizer.point_count(), 8);
    }
}
