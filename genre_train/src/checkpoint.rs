use anyhow::{Context, Result, anyhow};
use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
};

use crate::model::GenreCnn;

type CheckpointRecorder = BinBytesRecorder<FullPrecisionSettings>;

/// Whole-model parameter snapshots named `epoch<N>.pth`.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("epoch{epoch}.pth"))
    }

    /// Write the model's parameters for `epoch`.
    ///
    /// An existing file of the same name is removed before the new one is
    /// written; a crash in between leaves no checkpoint for that epoch.
    pub fn save<B: Backend>(&self, model: &GenreCnn<B>, epoch: usize) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("cannot create checkpoint dir {}", self.dir.display()))?;

        let path = self.path_for(epoch);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("cannot remove old checkpoint {}", path.display()))?;
        }

        let bytes = CheckpointRecorder::default()
            .record(model.clone().into_record(), ())
            .map_err(|e| anyhow!("failed to encode checkpoint for epoch {epoch}: {e:?}"))?;

        fs::write(&path, bytes)
            .with_context(|| format!("failed to write checkpoint {}", path.display()))?;

        tracing::info!(epoch, path = %path.display(), "saved checkpoint");
        Ok(path)
    }

    /// Load parameters from `path` into a model of the same architecture.
    pub fn load<B: Backend>(
        path: impl AsRef<Path>,
        model: GenreCnn<B>,
        device: &B::Device,
    ) -> Result<GenreCnn<B>> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("cannot read checkpoint {}", path.display()))?;

        let record = CheckpointRecorder::default()
            .load(bytes, device)
            .map_err(|e| anyhow!("checkpoint {} does not fit the model: {e:?}", path.display()))?;

        tracing::info!(path = %path.display(), "loaded checkpoint");
        Ok(model.load_record(record))
    }
}
