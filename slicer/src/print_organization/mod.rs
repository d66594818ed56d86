use std::{fmt, time::Instant};

use itertools::Itertools;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{ser::SerializeMap, Serialize, Serializer};
use tracing::info;

use crate::{
    geometry::Segments1D,
    slicer::{SliceResult, SEGMENT_LAYERS},
    Pos,
};

mod blend_radius;
mod extruder_toggle;
mod safety;
mod velocity;
mod wait_time;

pub use blend_radius::set_blend_radius;
pub use extruder_toggle::set_extruder_toggle;
pub use safety::add_safety_printpoints;
pub use velocity::{
    set_linear_velocity_by_height, set_linear_velocity_constant, set_linear_velocity_per_layer,
};
pub use wait_time::{set_wait_time_based_on_extruder_toggle, set_wait_time_on_sharp_corners};

/// One fabrication waypoint. Everything besides the position is filled in by
/// the annotators and stays `None` until then.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintPoint {
    #[serde(rename = "point")]
    pub pt: Pos,
    pub layer_height: f32,
    pub up_vector: Pos,
    pub mesh_normal: Option<Pos>,

    pub extruder_toggle: Option<bool>,
    /// Linear velocity of the move ending at this point, in mm/s.
    pub velocity: Option<f32>,
    /// Seconds to stay at this point before moving on.
    pub wait_time: Option<f32>,
    pub blend_radius: Option<f32>,
}

/// Print points of a planar slicing result, nested by layer then path in
/// print order.
#[derive(Debug, Clone)]
pub struct PlanarPrintOrganizer {
    pub layer_height: f32,
    pub printpoints: Vec<Vec<Vec<PrintPoint>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintInfo {
    pub layers: usize,
    pub paths: usize,
    pub points: usize,
    /// Length of every move, extruding or not.
    pub toolpath_length: f32,
    pub extruding_length: f32,
    /// Seconds, counting only moves that have a velocity.
    pub print_time: f32,
}

impl PrintPoint {
    pub fn new(pt: Pos, layer_height: f32, mesh_normal: Option<Pos>) -> Self {
        Self {
            pt,
            layer_height,
            up_vector: Pos::z(),
            mesh_normal,

            extruder_toggle: None,
            velocity: None,
            wait_time: None,
            blend_radius: None,
        }
    }

    /// Whether the move from this point to the next one deposits material.
    pub fn extrudes(&self) -> bool {
        self.extruder_toggle == Some(true)
    }
}

impl PlanarPrintOrganizer {
    /// Makes one print point for every path point of the slicing result.
    /// With `generate_mesh_normals` each point also gets the normal of the
    /// mesh face closest to it.
    pub fn create_printpoints(slicer: &SliceResult, generate_mesh_normals: bool) -> Self {
        let start = Instant::now();
        let mesh = &slicer.mesh;
        let segments = generate_mesh_normals.then(|| Segments1D::from_mesh(mesh, SEGMENT_LAYERS));

        let printpoints = (slicer.layers.par_iter())
            .map(|layer| {
                (layer.paths.iter())
                    .map(|path| {
                        (path.points.iter())
                            .map(|pt| {
                                let normal = (segments.as_ref())
                                    .and_then(|segments| segments.closest_face(mesh, pt))
                                    .map(|face| mesh.normal(face));
                                PrintPoint::new(*pt, slicer.layer_height, normal)
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let organizer = Self {
            layer_height: slicer.layer_height,
            printpoints,
        };
        info!(
            "Created {} print points in {:?}",
            organizer.point_count(),
            start.elapsed()
        );

        organizer
    }

    pub fn layer_count(&self) -> usize {
        self.printpoints.len()
    }

    pub fn path_count(&self) -> usize {
        self.printpoints.iter().map(Vec::len).sum()
    }

    pub fn point_count(&self) -> usize {
        self.points().count()
    }

    /// Every print point in print order.
    pub fn points(&self) -> impl Iterator<Item = &PrintPoint> {
        self.printpoints.iter().flatten().flatten()
    }

    pub fn points_mut(&mut self) -> impl Iterator<Item = &mut PrintPoint> {
        self.printpoints.iter_mut().flatten().flatten()
    }

    pub fn paths_mut(&mut self) -> impl Iterator<Item = &mut Vec<PrintPoint>> {
        self.printpoints.iter_mut().flatten()
    }

    /// The point printed after the one at `index` of the given path, which
    /// may be on a later path or layer.
    pub fn next_printpoint(&self, layer: usize, path: usize, index: usize) -> Option<&PrintPoint> {
        let current = self.printpoints.get(layer)?.get(path)?;
        if let Some(point) = current.get(index + 1) {
            return Some(point);
        }

        let later_paths = self.printpoints[layer][path + 1..].iter();
        let later_layers = self.printpoints[layer + 1..].iter().flatten();
        later_paths.chain(later_layers).find_map(|path| path.first())
    }

    pub fn info(&self) -> PrintInfo {
        let mut info = PrintInfo {
            layers: self.layer_count(),
            paths: self.path_count(),
            points: self.point_count(),
            toolpath_length: 0.0,
            extruding_length: 0.0,
            print_time: 0.0,
        };

        for (last, point) in self.points().tuple_windows() {
            let length = (point.pt - last.pt).norm();
            info.toolpath_length += length;
            if last.extrudes() {
                info.extruding_length += length;
            }

            if let Some(velocity) = point.velocity.filter(|&v| v > 0.0) {
                info.print_time += length / velocity;
            }
            info.print_time += last.wait_time.unwrap_or_default();
        }

        info
    }

    /// Logs a summary of the print points.
    pub fn printout_info(&self) {
        info!("Print organizer info: {}", self.info());
    }

    /// `{"layer_0": {"path_0": {"0": point, ..}, ..}, ..}`
    pub fn output_nested_printpoints_dict(&self) -> NestedPrintPoints<'_> {
        NestedPrintPoints(&self.printpoints)
    }

    /// `{"0": point, "1": point, ..}` over every point in print order.
    pub fn output_printpoints_dict(&self) -> FlatPrintPoints<'_> {
        FlatPrintPoints(self)
    }
}

impl fmt::Display for PrintInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ layers: {}, paths: {}, points: {}, toolpath length: {:.1} mm, extruding length: {:.1} mm, print time: {:.1} s }}",
            self.layers,
            self.paths,
            self.points,
            self.toolpath_length,
            self.extruding_length,
            self.print_time
        )
    }
}

pub struct NestedPrintPoints<'a>(&'a [Vec<Vec<PrintPoint>>]);
pub struct FlatPrintPoints<'a>(&'a PlanarPrintOrganizer);
struct LayerPaths<'a>(&'a [Vec<PrintPoint>]);
struct PathPoints<'a>(&'a [PrintPoint]);

impl Serialize for NestedPrintPoints<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (i, layer) in self.0.iter().enumerate() {
            map.serialize_entry(&format!("layer_{i}"), &LayerPaths(layer))?;
        }
        map.end()
    }
}

impl Serialize for LayerPaths<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (i, path) in self.0.iter().enumerate() {
            map.serialize_entry(&format!("path_{i}"), &PathPoints(path))?;
        }
        map.end()
    }
}

impl Serialize for PathPoints<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (i, point) in self.0.iter().enumerate() {
            map.serialize_entry(&i.to_string(), point)?;
        }
        map.end()
    }
}

impl Serialize for FlatPrintPoints<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.point_count()))?;
        for (i, point) in self.0.points().enumerate() {
            map.serialize_entry(&i.to_string(), point)?;
        }
        map.end()
    }
}
