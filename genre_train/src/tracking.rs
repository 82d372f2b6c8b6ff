use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use crate::metrics::EpochMetrics;

/// Hyperparameters recorded with every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub lr: f64,
}

#[derive(Serialize)]
struct RunManifest<'a> {
    project: &'a str,
    config: &'a RunConfig,
}

/// Local experiment log: `config.json` plus one `metrics.csv` row per epoch.
pub struct RunSession {
    dir: PathBuf,
    writer: csv::Writer<File>,
    rows: usize,
}

impl RunSession {
    /// Start a session under `<run_dir>/<project>/`, replacing earlier metrics.
    pub fn open(run_dir: impl AsRef<Path>, project: &str, config: &RunConfig) -> Result<Self> {
        let dir = run_dir.as_ref().join(project);
        fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create run dir {}", dir.display()))?;

        let manifest = RunManifest { project, config };
        let config_path = dir.join("config.json");
        fs::write(&config_path, serde_json::to_string_pretty(&manifest)?)
            .with_context(|| format!("cannot write {}", config_path.display()))?;

        let metrics_path = dir.join("metrics.csv");
        let writer = csv::Writer::from_path(&metrics_path)
            .with_context(|| format!("cannot create {}", metrics_path.display()))?;

        tracing::info!(project, dir = %dir.display(), ?config, "opened run session");
        Ok(Self {
            dir,
            writer,
            rows: 0,
        })
    }

    /// Append one epoch's metrics and flush them to disk.
    pub fn log(&mut self, metrics: &EpochMetrics) -> Result<()> {
        self.writer.serialize(metrics)?;
        self.writer.flush()?;
        self.rows += 1;

        tracing::debug!(epoch = metrics.epoch, acc = metrics.acc, "logged epoch metrics");
        Ok(())
    }

    /// Close the session.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        tracing::info!(dir = %self.dir.display(), epochs = self.rows, "closed run session");
        Ok(self.dir)
    }
}
