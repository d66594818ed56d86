use std::f32::consts::TAU;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Vector2;

use slicer::{
    builder::MeshBuilder,
    mesh::Mesh,
    post_processing::simplify_paths_rdp,
    slicer::{PlanarSlicer, SliceResult},
};

/// Twisted star prism, every layer cuts a different outline.
fn star(points: usize) -> Mesh {
    let outline = (0..points * 2)
        .map(|i| {
            let angle = TAU * i as f32 / (points * 2) as f32;
            let radius = if i % 2 == 0 { 40.0 } else { 25.0 };
            Vector2::new(angle.cos(), angle.sin()) * radius
        })
        .collect::<Vec<_>>();

    let mut builder = MeshBuilder::new();
    builder.add_prism(&outline, (0.0, 100.0), TAU / 6.0, 0.7);
    builder.build()
}

fn slice(mesh: &Mesh, layer_height: f32) -> SliceResult {
    PlanarSlicer::new(mesh.clone(), layer_height)
        .unwrap()
        .slice_model()
        .unwrap()
}

pub fn bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Planar Slicing");

    for points in [16, 256, 4096] {
        let mesh = star(points);
        group.bench_with_input(BenchmarkId::new("Slice", points), &mesh, |b, mesh| {
            b.iter(|| slice(mesh, 1.0))
        });

        let result = slice(&mesh, 1.0);
        group.bench_with_input(BenchmarkId::new("Simplify", points), &result, |b, result| {
            b.iter(|| simplify_paths_rdp(&mut result.clone(), 0.6))
        });
    }
}

criterion_group!(benches, bench);
criterion_main!(benches);
