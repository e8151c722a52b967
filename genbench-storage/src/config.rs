use std::path::Path;

use genbench_core::BenchConfig;

use crate::{Error, Result};

/// Loads a sweep configuration from a `.yaml`/`.yml` or `.json` file.
/// Missing keys fall back to the built-in defaults.
pub fn load_config(path: &Path) -> Result<BenchConfig> {
    let content = std::fs::read_to_string(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let config = match ext {
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        "json" => serde_json::from_str(&content)?,
        other => return Err(Error::UnsupportedFormat(other.to_string())),
    };
    Ok(config)
}
