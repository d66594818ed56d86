use std::{fmt, fs, path::Path, str::FromStr};

use anyhow::{bail, Context, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Every tunable of a slicing run. Missing keys in a config file fall back to
/// the values in [`Default`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub slice: SliceConfig,
    pub fabrication: FabricationConfig,
    pub output: OutputConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    /// Distance between two slicing planes, in model units (mm).
    pub layer_height: f32,
    pub seam_alignment: SeamAlignment,
    /// Maximum deviation allowed when removing path points.
    pub simplify_threshold: f32,
    /// Length of path removed at the start of every closed path so layers
    /// blend into each other.
    pub smooth_distance: f32,
    pub generate_mesh_normals: bool,
}

/// Where the seam (start point) of every closed path is moved to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeamAlignment {
    /// Closest to the seam of the same path on the layer below.
    NextPath,
    Origin,
    XAxis,
    YAxis,
    Point([f32; 3]),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricationConfig {
    /// Height safety points are lifted above the path they belong to.
    pub z_hop: f32,
    /// Constant linear velocity in mm/s.
    pub velocity: f32,
    /// When set, velocity is interpolated between these values from the
    /// bottom to the top of the print instead of being constant.
    pub velocity_range: Option<[f32; 2]>,
    pub blend_radius: f32,
    /// Fraction of the distance to the neighbouring points the blend radius
    /// may not exceed.
    pub blend_buffer: f32,
    pub sharp_corner_wait: Option<SharpCornerWait>,
    pub extruder_toggle_wait: Option<ExtruderToggleWait>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SharpCornerWait {
    /// Corners whose interior angle is below this value (degrees) get a wait.
    pub threshold_angle: f32,
    pub wait_time: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtruderToggleWait {
    pub wait_at: WaitAt,
    pub wait_time: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitAt {
    BeforeExtrusion,
    AfterExtrusion,
    BeforeAndAfterExtrusion,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub svg_preview: bool,
    pub gcode: Option<GcodeConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcodeConfig {
    pub filament_diameter: f32,
    pub extrusion_width: f32,
    pub flow_multiplier: f32,
    /// Feed rate of non extruding moves in mm/s.
    pub travel_velocity: f32,
}

impl PipelineConfig {
    /// Reads a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config `{}`", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config `{}`", path.display()))?;
        info!("Loaded config from `{}`", path.display());
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, toml::to_string(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let slice = &self.slice;
        if !positive(slice.layer_height) {
            bail!("Layer height must be positive, got {}", slice.layer_height);
        }

        if !non_negative(slice.smooth_distance) {
            bail!("Smooth distance can't be negative");
        }

        if slice.simplify_threshold.is_nan() {
            bail!("Simplify threshold must be a number");
        }

        let fab = &self.fabrication;
        if !positive(fab.velocity) {
            bail!("Velocity must be positive, got {}", fab.velocity);
        }

        if let Some([min, max]) = fab.velocity_range {
            if !positive(min) || !positive(max) {
                bail!("Velocity range must be positive, got [{min}, {max}]");
            }
        }

        if !non_negative(fab.blend_radius) || !non_negative(fab.z_hop) {
            bail!("Blend radius and z hop can't be negative");
        }

        if !non_negative(fab.blend_buffer) {
            bail!("Blend buffer can't be negative, got {}", fab.blend_buffer);
        }

        let waits = [
            fab.sharp_corner_wait.as_ref().map(|x| x.wait_time),
            fab.extruder_toggle_wait.as_ref().map(|x| x.wait_time),
        ];
        if waits.into_iter().flatten().any(|x| !non_negative(x)) {
            bail!("Wait times can't be negative");
        }

        if let Some(wait) = &fab.sharp_corner_wait {
            if !wait.threshold_angle.is_finite() {
                bail!("Sharp corner angle must be finite");
            }
        }

        Ok(())
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

impl SeamAlignment {
    /// The point a path starting at height `z` should have its seam closest
    /// to, `None` for [`SeamAlignment::NextPath`].
    pub fn reference_point(&self, z: f32) -> Option<Vector3<f32>> {
        // Far enough that the closest path point is the extreme one along the
        // axis for any model that fits a printer.
        const FAR: f32 = 2000.0;

        match self {
            SeamAlignment::NextPath => None,
            SeamAlignment::Origin => Some(Vector3::zeros()),
            SeamAlignment::XAxis => Some(Vector3::new(FAR, 0.0, z)),
            SeamAlignment::YAxis => Some(Vector3::new(0.0, FAR, z)),
            SeamAlignment::Point(point) => Some(Vector3::from(*point)),
        }
    }
}

impl FromStr for SeamAlignment {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        Ok(match raw.trim() {
            "next_path" => Self::NextPath,
            "origin" => Self::Origin,
            "x_axis" => Self::XAxis,
            "y_axis" => Self::YAxis,
            other => {
                let parts = other
                    .split(',')
                    .map(|x| x.trim().parse::<f32>())
                    .collect::<Result<Vec<_>, _>>()
                    .with_context(|| format!("Invalid seam alignment `{other}`"))?;
                let [x, y, z] = parts[..] else {
                    bail!("Seam alignment point needs three components, got `{other}`");
                };
                Self::Point([x, y, z])
            }
        })
    }
}

impl fmt::Display for SeamAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeamAlignment::NextPath => f.write_str("next_path"),
            SeamAlignment::Origin => f.write_str("origin"),
            SeamAlignment::XAxis => f.write_str("x_axis"),
            SeamAlignment::YAxis => f.write_str("y_axis"),
            SeamAlignment::Point([x, y, z]) => write!(f, "{x}, {y}, {z}"),
        }
    }
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            layer_height: 10.0,
            seam_alignment: SeamAlignment::YAxis,
            simplify_threshold: 0.6,
            smooth_distance: 10.0,
            generate_mesh_normals: false,
        }
    }
}

impl Default for FabricationConfig {
    fn default() -> Self {
        Self {
            z_hop: 10.0,
            velocity: 100.0,
            velocity_range: None,
            blend_radius: 10.0,
            blend_buffer: 0.3,
            sharp_corner_wait: None,
            extruder_toggle_wait: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            svg_preview: true,
            gcode: None,
        }
    }
}

impl Default for GcodeConfig {
    fn default() -> Self {
        Self {
            filament_diameter: 1.75,
            extrusion_width: 0.6,
            flow_multiplier: 1.0,
            travel_velocity: 150.0,
        }
    }
}
