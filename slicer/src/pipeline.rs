use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result};
use common::config::{OutputConfig, PipelineConfig};
use tracing::info;

use crate::{
    format::{gcode::GcodeWriter, preview::PreviewFile, save_to_json},
    mesh::{move_mesh_to_point, Mesh},
    post_processing::{seams_align, seams_smooth, simplify_paths_rdp},
    print_organization::{
        add_safety_printpoints, set_blend_radius, set_extruder_toggle,
        set_linear_velocity_by_height, set_linear_velocity_constant,
        set_wait_time_based_on_extruder_toggle, set_wait_time_on_sharp_corners,
        PlanarPrintOrganizer,
    },
    slicer::{PlanarSlicer, SliceResult},
    Pos,
};

pub const SLICER_DATA: &str = "slicer_data.json";
pub const NESTED_PRINTPOINTS: &str = "out_printpoints_nested.json";
pub const PREVIEW: &str = "preview.svg";
pub const GCODE: &str = "out.gcode";

/// Runs every stage from a mesh to annotated print points.
pub struct Pipeline {
    config: PipelineConfig,
}

pub struct PipelineOutput {
    pub slicer: SliceResult,
    pub organizer: PlanarPrintOrganizer,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, mut mesh: Mesh) -> Result<PipelineOutput> {
        let (slice, fab) = (&self.config.slice, &self.config.fabrication);
        let start = Instant::now();

        move_mesh_to_point(&mut mesh, Pos::zeros());

        let mut slicer = PlanarSlicer::new(mesh, slice.layer_height)?.slice_model()?;
        seams_align(&mut slicer, slice.seam_alignment);
        simplify_paths_rdp(&mut slicer, slice.simplify_threshold);
        seams_smooth(&mut slicer, slice.smooth_distance);
        slicer.printout_info();

        let mut organizer =
            PlanarPrintOrganizer::create_printpoints(&slicer, slice.generate_mesh_normals);
        set_extruder_toggle(&mut organizer, &slicer)?;
        add_safety_printpoints(&mut organizer, fab.z_hop)?;

        match fab.velocity_range {
            Some(range) => set_linear_velocity_by_height(&mut organizer, range),
            None => set_linear_velocity_constant(&mut organizer, fab.velocity),
        }

        if let Some(wait) = &fab.sharp_corner_wait {
            set_wait_time_on_sharp_corners(&mut organizer, wait.threshold_angle, wait.wait_time);
        }

        if let Some(wait) = &fab.extruder_toggle_wait {
            set_wait_time_based_on_extruder_toggle(&mut organizer, wait.wait_at, wait.wait_time)?;
        }

        set_blend_radius(&mut organizer, fab.blend_radius, fab.blend_buffer);
        organizer.printout_info();

        info!("Pipeline finished in {:?}", start.elapsed());
        Ok(PipelineOutput { slicer, organizer })
    }
}

impl PipelineOutput {
    /// Writes the slicer data and nested print points, plus the preview and
    /// G-code when enabled. Returns the paths written.
    pub fn write(&self, dir: &Path, config: &OutputConfig) -> Result<Vec<PathBuf>> {
        let mut written = vec![
            save_to_json(&self.slicer.to_data(), dir, SLICER_DATA)?,
            save_to_json(
                &self.organizer.output_nested_printpoints_dict(),
                dir,
                NESTED_PRINTPOINTS,
            )?,
        ];

        if config.svg_preview {
            let path = dir.join(PREVIEW);
            let document = PreviewFile::new(&self.organizer).to_document();
            fs::write(&path, document.to_string())
                .with_context(|| format!("Failed to write `{}`", path.display()))?;
            written.push(path);
        }

        if let Some(gcode) = &config.gcode {
            let path = dir.join(GCODE);
            let raw = GcodeWriter::new(gcode.clone()).write(&self.organizer)?;
            fs::write(&path, raw)
                .with_context(|| format!("Failed to write `{}`", path.display()))?;
            written.push(path);
        }

        Ok(written)
    }
}
