use std::fs;
use std::path::{Path, PathBuf};

use genbench_core::{BenchConfig, BenchmarkRun, ConcurrencyLevelStats};
use tracing::debug;

use crate::error::{Error, Result};

const MANIFEST_FILE: &str = "manifest.yaml";
const RESULTS_FILE: &str = "results.json";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunManifest {
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub endpoint: String,
    pub model: String,
    pub concurrency_levels: Vec<u64>,
    pub requests_per_session: u64,
    #[serde(default)]
    pub interrupted: bool,
}

impl RunManifest {
    pub fn new(config: &BenchConfig, run: &BenchmarkRun) -> Self {
        Self {
            created_at: chrono::Utc::now(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            concurrency_levels: config.concurrency_levels.clone(),
            requests_per_session: config.requests_per_session,
            interrupted: run.interrupted,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRun {
    pub manifest: RunManifest,
    pub run: BenchmarkRun,
}

/// On-disk layout: `<base>/<run_id>/manifest.yaml` plus `results.json`,
/// a JSON array with one record per concurrency level.
#[derive(Debug, Clone)]
pub struct Storage {
    base_path: PathBuf,
}

impl Storage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.base_path.join(run_id)
    }

    pub fn save_run(&self, run_id: &str, manifest: &RunManifest, run: &BenchmarkRun) -> Result<PathBuf> {
        if run.is_empty() {
            return Err(Error::EmptyRun(run_id.to_string()));
        }

        let run_path = self.run_path(run_id);
        fs::create_dir_all(&run_path)?;

        let manifest_file = fs::File::create(run_path.join(MANIFEST_FILE))?;
        serde_yaml::to_writer(manifest_file, manifest)?;

        let results_path = run_path.join(RESULTS_FILE);
        let results_file = fs::File::create(&results_path)?;
        serde_json::to_writer_pretty(results_file, &run.levels)?;

        debug!("Saved {} levels to {}", run.levels.len(), results_path.display());
        Ok(results_path)
    }

    pub fn load_run(&self, run_id: &str) -> Result<StoredRun> {
        let run_path = self.run_path(run_id);
        let manifest_path = run_path.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(Error::RunNotFound(run_id.to_string()));
        }

        let manifest: RunManifest = serde_yaml::from_reader(fs::File::open(&manifest_path)?)?;
        let content = fs::read_to_string(run_path.join(RESULTS_FILE))?;
        let levels: Vec<ConcurrencyLevelStats> = serde_json::from_str(&content)?;

        let interrupted = manifest.interrupted;
        Ok(StoredRun {
            manifest,
            run: BenchmarkRun { levels, interrupted },
        })
    }

    /// Ids of every stored run, sorted.
    pub fn list_runs(&self) -> Result<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() && entry.path().join(MANIFEST_FILE).exists() {
                runs.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        runs.sort();
        Ok(runs)
    }
}
