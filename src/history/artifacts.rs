//! Timestamped raw-tensor dumps.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::item::RawTensors;
use crate::error::Result;

/// File name prefix for raw score/criteria dumps.
pub const ARTIFACT_PREFIX: &str = "activation_metrics";

/// Write `raw` to `<dir>/activation_metrics-<UTC timestamp>.json`,
/// creating `dir` if needed. Returns the written path.
pub fn save_timestamped(dir: &Path, raw: &RawTensors) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.6fZ");
    let path = dir.join(format!("{ARTIFACT_PREFIX}-{stamp}.json"));
    fs::write(&path, serde_json::to_vec(raw)?)?;
    tracing::info!(path = %path.display(), "saved raw pruning tensors");
    Ok(path)
}

/// Read a dump written by [`save_timestamped`].
pub fn load(path: &Path) -> Result<RawTensors> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
