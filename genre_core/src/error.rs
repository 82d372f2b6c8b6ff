use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors raised while indexing a dataset root.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("dataset root has no `genres` directory: {0}")]
    MissingGenresDir(PathBuf),

    #[error("no label directories found under {0}")]
    NoLabels(PathBuf),

    #[error("label `{label}` has {found} audio files, the split layout needs {required}")]
    TooFewFiles {
        label: String,
        found: usize,
        required: usize,
    },

    #[error("unknown split `{0}` (expected train, valid or test)")]
    UnknownSplit(String),

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
