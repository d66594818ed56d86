//! Planar slicing of triangle meshes into ordered fabrication points.
//!
//! A [`mesh::Mesh`] is cut by horizontal planes ([`slicer::PlanarSlicer`]),
//! the resulting paths are cleaned up ([`post_processing`]), turned into
//! [`print_organization::PrintPoint`]s and annotated with fabrication
//! parameters. [`pipeline::Pipeline`] runs all of it in order.

use nalgebra::Vector3;

pub mod builder;
pub mod format;
pub mod geometry;
pub mod mesh;
pub mod pipeline;
pub mod post_processing;
pub mod print_organization;
pub mod slicer;

pub type Pos = Vector3<f32>;
