use std::{fs::File, io::BufReader, path::Path, time::Instant};

use anyhow::{Context, Result};
use args::Args;
use clap::Parser;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

use slicer::{format::output_directory, mesh::load_mesh, pipeline::Pipeline};

mod args;

fn main() -> Result<()> {
    let start = Instant::now();

    let filter = filter::Targets::new()
        .with_default(LevelFilter::WARN)
        .with_target("slicer", LevelFilter::INFO)
        .with_target("common", LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.pipeline_config()?;
    if let Some(path) = &args.save_config {
        config.save(path)?;
        info!("Saved config to `{}`", path.display());
    }

    let ext = args
        .mesh
        .extension()
        .context("Mesh file has no extension")?
        .to_string_lossy();
    let file = File::open(&args.mesh)
        .with_context(|| format!("Failed to open `{}`", args.mesh.display()))?;

    let mut mesh = load_mesh(BufReader::new(file), &ext)?;
    mesh.set_scale(args.scale);
    mesh.set_rotation(args.rotation.map(f32::to_radians));
    info!(
        "Loaded `{}`. {{ vert: {}, face: {} }}",
        args.mesh.display(),
        mesh.vertex_count(),
        mesh.face_count()
    );

    let output = Pipeline::new(config.clone()).run(mesh)?;

    let dir = match &args.output {
        Some(dir) => dir.clone(),
        None => output_directory(args.mesh.parent().unwrap_or(Path::new(".")))?,
    };
    for path in output.write(&dir, &config.output)? {
        info!("Wrote `{}`", path.display());
    }

    println!(
        "Total elapsed time {:.2} seconds",
        start.elapsed().as_secs_f32()
    );
    Ok(())
}
