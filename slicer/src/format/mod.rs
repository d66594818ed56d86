use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

pub mod gcode;
pub mod preview;

/// Writes `value` as pretty printed JSON to `dir/name`, creating `dir` if
/// needed. Returns the path written to.
pub fn save_to_json<T: Serialize + ?Sized>(value: &T, dir: &Path, name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory `{}`", dir.display()))?;

    let path = dir.join(name);
    let raw = serde_json::to_string_pretty(value)?;
    fs::write(&path, raw).with_context(|| format!("Failed to write `{}`", path.display()))?;

    info!("Saved `{}`", path.display());
    Ok(path)
}

/// The `output` directory next to the input files, created if missing.
pub fn output_directory(base: &Path) -> Result<PathBuf> {
    let dir = base.join("output");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory `{}`", dir.display()))?;
    Ok(dir)
}
