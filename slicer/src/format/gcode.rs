use std::{f32::consts::PI, fmt::Write};

use anyhow::Result;
use common::config::GcodeConfig;

use crate::print_organization::{PlanarPrintOrganizer, PrintPoint};

/// Exports print points as G-code for a cartesian FDM printer with absolute
/// extrusion.
pub struct GcodeWriter {
    config: GcodeConfig,
}

impl GcodeWriter {
    pub fn new(config: GcodeConfig) -> Self {
        Self { config }
    }

    /// Filament needed per mm of path, in mm of filament.
    fn extrusion_per_mm(&self, layer_height: f32) -> f32 {
        let radius = self.config.filament_diameter / 2.0;
        let filament_area = PI * radius * radius;
        self.config.extrusion_width * layer_height / filament_area * self.config.flow_multiplier
    }

    pub fn write(&self, organizer: &PlanarPrintOrganizer) -> Result<String> {
        let mut out = String::new();
        let travel_feed = self.config.travel_velocity * 60.0;

        writeln!(out, "; layer height: {}", organizer.layer_height)?;
        writeln!(out, "G21 ; millimeters")?;
        writeln!(out, "G90 ; absolute positioning")?;
        writeln!(out, "M82 ; absolute extrusion")?;
        writeln!(out, "G92 E0")?;

        let mut extruded = 0.0;
        let mut last: Option<&PrintPoint> = None;

        for (i, layer) in organizer.printpoints.iter().enumerate() {
            writeln!(out, ";LAYER:{i}")?;

            for point in layer.iter().flatten() {
                let [x, y, z] = [point.pt.x, point.pt.y, point.pt.z];
                match last {
                    Some(from) if from.extrudes() => {
                        let length = (point.pt - from.pt).norm();
                        extruded += length * self.extrusion_per_mm(point.layer_height);
                        let feed = point.velocity.unwrap_or(self.config.travel_velocity) * 60.0;
                        writeln!(out, "G1 X{x:.3} Y{y:.3} Z{z:.3} E{extruded:.5} F{feed:.0}")?;
                    }
                    _ => writeln!(out, "G0 X{x:.3} Y{y:.3} Z{z:.3} F{travel_feed:.0}")?,
                }

                if let Some(wait) = point.wait_time.filter(|&x| x > 0.0) {
                    writeln!(out, "G4 P{:.0}", wait * 1000.0)?;
                }
                last = Some(point);
            }
        }

        writeln!(out, "M2")?;
        Ok(out)
    }
}
