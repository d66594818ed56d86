use anyhow::{bail, Result};
use tracing::info;

use super::PlanarPrintOrganizer;
use crate::slicer::SliceResult;

/// Turns the extruder on for every point, except where the nozzle has to
/// travel afterwards: the end of a path that is open or shares its layer with
/// other paths, and the very last point of the print.
pub fn set_extruder_toggle(organizer: &mut PlanarPrintOrganizer, slicer: &SliceResult) -> Result<()> {
    if organizer.layer_count() != slicer.layers.len() {
        bail!(
            "Print organizer has {} layers but the slicer has {}",
            organizer.layer_count(),
            slicer.layers.len()
        );
    }

    let mut interruptions = 0;
    for (i, (layer, slice)) in organizer.printpoints.iter_mut().zip(&slicer.layers).enumerate() {
        if layer.len() != slice.paths.len() {
            bail!(
                "Layer {i} has {} print paths but {} slicer paths",
                layer.len(),
                slice.paths.len()
            );
        }

        let shared_layer = layer.len() > 1;
        for (path, slice_path) in layer.iter_mut().zip(&slice.paths) {
            let interrupted = shared_layer || !slice_path.is_closed;
            let last = path.len().saturating_sub(1);

            for (k, point) in path.iter_mut().enumerate() {
                point.extruder_toggle = Some(!(interrupted && k == last));
            }
            interruptions += interrupted as usize;
        }
    }

    if let Some(point) = organizer.points_mut().last() {
        point.extruder_toggle = Some(false);
    }

    info!("Set extruder toggles, {interruptions} interrupted paths");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        print_organization::tests::organizer,
        slicer::{Layer, Path},
        Pos,
    };

    fn slicer(layout: &[&[(usize, bool)]]) -> SliceResult {
        let layers = (layout.iter())
            .map(|paths| Layer {
                paths: (paths.iter())
                    .map(|&(count, closed)| Path::new(vec![Pos::zeros(); count], closed))
                    .collect(),
            })
            .collect();

        SliceResult {
            mesh: Default::default(),
            layer_height: 1.0,
            layers,
        }
    }

    fn toggles(organizer: &PlanarPrintOrganizer) -> Vec<bool> {
        organizer.points().map(|x| x.extruder_toggle.unwrap()).collect()
    }

    #[test]
    fn single_closed_paths_extrude_through() {
        let mut organizer = organizer(&[&[3], &[3]]);
        let slicer = slicer(&[&[(3, true)], &[(3, true)]]);
        set_extruder_toggle(&mut organizer, &slicer).unwrap();

        assert_eq!(toggles(&organizer), [true, true, true, true, true, false]);
    }

    #[test]
    fn interrupted_paths_stop_extruding() {
        let mut organizer = organizer(&[&[2, 2], &[3]]);
        let slicer = slicer(&[&[(2, true), (2, true)], &[(3, false)]]);
        set_extruder_toggle(&mut organizer, &slicer).unwrap();

        assert_eq!(
            toggles(&organizer),
            [true, false, true, false, true, true, false]
        );
    }

    #[test]
    fn mismatched_layout_is_an_error() {
        let mut organizer = organizer(&[&[2]]);
        assert!(set_extruder_toggle(&mut organizer, &slicer(&[&[(2, true)], &[(2, true)]])).is_err());
        assert!(set_extruder_toggle(&mut organizer, &slicer(&[&[(2, true), (2, true)]])).is_err());
    }
}
