use std::fmt;

use anyhow::{bail, Result};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    geometry::Segments1D,
    mesh::{Mesh, MeshData},
};

mod contour;
mod path;
pub use path::{Layer, Path};

/// Number of height bins used to find the faces crossing a plane.
pub const SEGMENT_LAYERS: usize = 100;

/// Cuts a mesh with a stack of horizontal planes.
pub struct PlanarSlicer {
    mesh: Mesh,
    layer_height: f32,
}

/// Ordered layers produced by a [`PlanarSlicer`], along with the mesh they
/// were cut from.
#[derive(Debug, Clone)]
pub struct SliceResult {
    pub mesh: Mesh,
    pub layer_height: f32,
    pub layers: Vec<Layer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliceInfo {
    pub layers: usize,
    pub paths: usize,
    pub closed_paths: usize,
    pub points: usize,
    pub min_z: f32,
    pub max_z: f32,
}

/// Document written to `slicer_data.json`.
#[derive(Serialize)]
pub struct SlicerData<'a> {
    pub layer_height: f32,
    pub mesh: MeshData,
    pub layers: Vec<LayerData<'a>>,
}

#[derive(Serialize)]
pub struct LayerData<'a> {
    pub min_max_z_height: (f32, f32),
    pub paths: &'a [Path],
}

impl PlanarSlicer {
    pub fn new(mesh: Mesh, layer_height: f32) -> Result<Self> {
        if !(layer_height.is_finite() && layer_height > 0.0) {
            bail!("Layer height must be positive, got {layer_height}");
        }

        if mesh.face_count() == 0 {
            bail!("Can't slice a mesh without faces");
        }

        Ok(Self { mesh, layer_height })
    }

    /// Heights of every slicing plane. The first plane sits on the bottom of
    /// the mesh and every following one is a layer height above it; planes
    /// are kept a hair inside the mesh so they never lie on a flat bottom or
    /// top.
    pub fn plane_heights(&self) -> Vec<f32> {
        let (min, max) = self.mesh.bounds();
        let span = max.z - min.z;
        if span <= 0.0 {
            return Vec::new();
        }

        let epsilon = (span * 1e-4).max(1e-5).min(span / 2.0);
        let count = (span / self.layer_height).floor() as usize + 1;
        (0..count)
            .map(|i| (min.z + i as f32 * self.layer_height).clamp(min.z + epsilon, max.z - epsilon))
            .collect()
    }

    /// Slices every plane, in parallel, dropping planes that don't cut
    /// anything.
    pub fn slice_model(self) -> Result<SliceResult> {
        if !self.mesh.is_manifold() {
            warn!("Mesh is not closed, slices may contain open paths");
        }

        let heights = self.plane_heights();
        let segments = Segments1D::from_mesh(&self.mesh, SEGMENT_LAYERS);

        let layers = heights
            .into_par_iter()
            .map(|height| (height, contour::slice_plane(&self.mesh, &segments, height)))
            .collect::<Vec<_>>();

        let total = layers.len();
        let layers = layers
            .into_iter()
            .filter_map(|(height, paths)| {
                if paths.is_empty() {
                    debug!("No paths at height {height}, dropping layer");
                    return None;
                }

                Some(Layer { paths })
            })
            .collect::<Vec<_>>();

        if layers.is_empty() {
            bail!("Slicing produced no layers, is the mesh taller than a layer?");
        }

        info!(
            "Sliced {} layers ({} planes) at layer height {}",
            layers.len(),
            total,
            self.layer_height
        );

        Ok(SliceResult {
            mesh: self.mesh,
            layer_height: self.layer_height,
            layers,
        })
    }
}

impl SliceResult {
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.layers.iter().flat_map(|x| x.paths.iter())
    }

    pub fn paths_mut(&mut self) -> impl Iterator<Item = &mut Path> {
        self.layers.iter_mut().flat_map(|x| x.paths.iter_mut())
    }

    pub fn point_count(&self) -> usize {
        self.layers.iter().map(Layer::point_count).sum()
    }

    pub fn info(&self) -> SliceInfo {
        let (min_z, max_z) = self.layers.iter().map(Layer::min_max_z).fold(
            (f32::MAX, f32::MIN),
            |(min, max), (low, high)| (min.min(low), max.max(high)),
        );

        SliceInfo {
            layers: self.layers.len(),
            paths: self.paths().count(),
            closed_paths: self.paths().filter(|x| x.is_closed).count(),
            points: self.point_count(),
            min_z,
            max_z,
        }
    }

    /// Logs a summary of the slicing result.
    pub fn printout_info(&self) {
        info!("Slicer info: {}", self.info());
    }

    pub fn to_data(&self) -> SlicerData<'_> {
        SlicerData {
            layer_height: self.layer_height,
            mesh: self.mesh.to_data(),
            layers: (self.layers.iter())
                .map(|layer| LayerData {
                    min_max_z_height: layer.min_max_z(),
                    paths: &layer.paths,
                })
                .collect(),
        }
    }
}

impl fmt::Display for SliceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ layers: {}, paths: {} ({} closed, {} open), points: {}, z: {:.2}..{:.2} }}",
            self.layers,
            self.paths,
            self.closed_paths,
            self.paths - self.closed_paths,
            self.points,
            self.min_z,
            self.max_z
        )
    }
}
