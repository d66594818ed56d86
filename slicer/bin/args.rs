use std::{path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use clap::Parser;
use common::config::{GcodeConfig, PipelineConfig, SeamAlignment};
use nalgebra::{ArrayStorage, Const, Matrix, Scalar, Vector2, Vector3, U1};
use num_traits::Zero;

#[derive(Debug, Parser)]
/// Planar slicer, turns a mesh into ordered print points.
pub struct Args {
    /// Path to a .stl or .obj file.
    pub mesh: PathBuf,

    #[arg(long)]
    /// TOML file with the pipeline config. Flags below override its values.
    pub config: Option<PathBuf>,
    #[arg(long)]
    /// Writes the resolved config to this file.
    pub save_config: Option<PathBuf>,
    #[arg(long, short)]
    /// Directory to write results to, defaults to `output` next to the mesh.
    pub output: Option<PathBuf>,

    #[arg(long, default_value = "1, 1, 1", value_parser = vector_value_parser::<f32, 3>)]
    /// Scale of the model along the X, Y, and Z axes.
    pub scale: Vector3<f32>,
    #[arg(long, default_value = "0, 0, 0", value_parser = vector_value_parser::<f32, 3>)]
    /// Rotation of the model in degrees, roll, pitch, yaw.
    pub rotation: Vector3<f32>,

    #[arg(long)]
    /// Distance between slicing planes in mm.
    pub layer_height: Option<f32>,
    #[arg(long)]
    /// One of next_path, origin, x_axis, y_axis or a point `x, y, z`.
    pub seam_alignment: Option<SeamAlignment>,
    #[arg(long)]
    /// Maximum deviation when simplifying paths, in mm.
    pub simplify_threshold: Option<f32>,
    #[arg(long)]
    /// Length cut off the start of closed paths, in mm.
    pub smooth_distance: Option<f32>,
    #[arg(long)]
    /// Store the normal of the closest mesh face on every print point.
    pub mesh_normals: bool,

    #[arg(long)]
    /// Height of safety points above the path, in mm.
    pub z_hop: Option<f32>,
    #[arg(long)]
    /// Constant print velocity in mm/s.
    pub velocity: Option<f32>,
    #[arg(long, value_parser = vector_value_parser::<f32, 2>)]
    /// Velocity from the bottom to the top of the print, `min, max` in mm/s.
    pub velocity_range: Option<Vector2<f32>>,
    #[arg(long)]
    /// Largest blend radius in mm.
    pub blend_radius: Option<f32>,

    #[arg(long)]
    /// Don't write the SVG preview.
    pub no_preview: bool,
    #[arg(long)]
    /// Also write G-code, using the config file's G-code settings if any.
    pub gcode: bool,
}

impl Args {
    /// Loads the config file, if any, and applies every flag on top of it.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        let slice = &mut config.slice;
        override_with(&mut slice.layer_height, self.layer_height);
        override_with(&mut slice.seam_alignment, self.seam_alignment);
        override_with(&mut slice.simplify_threshold, self.simplify_threshold);
        override_with(&mut slice.smooth_distance, self.smooth_distance);
        slice.generate_mesh_normals |= self.mesh_normals;

        let fab = &mut config.fabrication;
        override_with(&mut fab.z_hop, self.z_hop);
        override_with(&mut fab.velocity, self.velocity);
        override_with(&mut fab.blend_radius, self.blend_radius);
        if let Some(range) = self.velocity_range {
            fab.velocity_range = Some([range.x, range.y]);
        }

        let output = &mut config.output;
        output.svg_preview &= !self.no_preview;
        if self.gcode && output.gcode.is_none() {
            output.gcode = Some(GcodeConfig::default());
        }

        config.validate()?;
        Ok(config)
    }
}

fn override_with<T>(value: &mut T, flag: Option<T>) {
    if let Some(flag) = flag {
        *value = flag;
    }
}

fn vector_value_parser<T, const N: usize>(
    raw: &str,
) -> Result<Matrix<T, Const<N>, U1, ArrayStorage<T, N, 1>>>
where
    T: FromStr + Scalar + Zero,
    T::Err: Send + Sync + std::error::Error + 'static,
{
    let mut vec = Matrix::<T, Const<N>, U1, ArrayStorage<T, N, 1>>::zeros();

    let mut parts = raw.splitn(N, ',');
    for i in 0..N {
        let element = parts.next().context("Missing vector element")?.trim();
        vec[i] = element
            .parse()
            .context("Can't convert element from string")?;
    }

    Ok(vec)
}
