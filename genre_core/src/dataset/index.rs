use std::{
    fmt,
    fs,
    ops::Range,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// Dataset partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Valid,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Valid => "valid",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Split::Train),
            "valid" => Ok(Split::Valid),
            "test" => Ok(Split::Test),
            other => Err(DatasetError::UnknownSplit(other.to_string())),
        }
    }
}

/// Which file positions of each label directory belong to which split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitLayout {
    pub train: Range<usize>,
    pub valid: Range<usize>,
    pub test: Range<usize>,
}

impl Default for SplitLayout {
    /// 90 training files and 10 held-out files per label.
    ///
    /// NOTE: valid and test select the same ten files, so test accuracy is
    /// not independent of model selection on the validation split.
    fn default() -> Self {
        Self {
            train: 0..90,
            valid: 90..100,
            test: 90..100,
        }
    }
}

impl SplitLayout {
    pub fn range(&self, split: Split) -> Range<usize> {
        match split {
            Split::Train => self.train.clone(),
            Split::Valid => self.valid.clone(),
            Split::Test => self.test.clone(),
        }
    }

    /// Minimum number of files every label directory must hold.
    pub fn required_files(&self) -> usize {
        self.train.end.max(self.valid.end).max(self.test.end)
    }
}

/// Bijective label name <-> index mapping.
///
/// Names are sorted before indices are assigned, so the mapping does not
/// depend on directory listing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    pub fn new(mut labels: Vec<String>) -> Self {
        labels.sort();
        labels.dedup();
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.binary_search_by(|l| l.as_str().cmp(label)).ok()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn one_hot(&self, index: usize) -> Vec<f32> {
        let mut target = vec![0.0; self.labels.len()];
        if let Some(slot) = target.get_mut(index) {
            *slot = 1.0;
        }
        target
    }
}

/// One indexed audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub audio_name: String,
    pub audio_path: PathBuf,
    pub label: String,
    pub index: usize,
    pub target: Vec<f32>,
}

/// Immutable index of one split of a `<root>/genres/<label>/<files>` tree.
#[derive(Debug, Clone)]
pub struct DatasetIndex {
    split: Split,
    vocabulary: LabelVocabulary,
    entries: Vec<DatasetEntry>,
}

impl DatasetIndex {
    /// Scan `root` and select `split` according to `layout`.
    ///
    /// Only directory listings are read; audio content is not touched.
    pub fn build(
        root: impl AsRef<Path>,
        split: Split,
        layout: &SplitLayout,
    ) -> Result<Self, DatasetError> {
        let audios_dir = root.as_ref().join("genres");
        if !audios_dir.is_dir() {
            return Err(DatasetError::MissingGenresDir(audios_dir));
        }

        let vocabulary = LabelVocabulary::new(list_names(&audios_dir, EntryKind::Dir)?);
        if vocabulary.is_empty() {
            return Err(DatasetError::NoLabels(audios_dir));
        }

        let range = layout.range(split);
        let required = layout.required_files();
        let mut entries = Vec::with_capacity(vocabulary.len() * range.len());

        for (index, label) in vocabulary.labels().iter().enumerate() {
            let label_dir = audios_dir.join(label);
            let mut audio_names = list_names(&label_dir, EntryKind::File)?;
            audio_names.sort();

            if audio_names.len() < required {
                return Err(DatasetError::TooFewFiles {
                    label: label.clone(),
                    found: audio_names.len(),
                    required,
                });
            }

            let target = vocabulary.one_hot(index);
            for audio_name in &audio_names[range.clone()] {
                entries.push(DatasetEntry {
                    audio_name: audio_name.clone(),
                    audio_path: label_dir.join(audio_name),
                    label: label.clone(),
                    index,
                    target: target.clone(),
                });
            }
        }

        tracing::debug!(
            %split,
            labels = vocabulary.len(),
            entries = entries.len(),
            "indexed dataset"
        );

        Ok(Self {
            split,
            vocabulary,
            entries,
        })
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    pub fn get(&self, position: usize) -> Option<&DatasetEntry> {
        self.entries.get(position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<DatasetEntry> {
        self.entries
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    File,
}

/// Non-hidden names of the directories or files directly inside `dir`.
fn list_names(dir: &Path, kind: EntryKind) -> Result<Vec<String>, DatasetError> {
    let io_err = |source: std::io::Error| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let file_type = entry.file_type().map_err(io_err)?;
        let wanted = match kind {
            EntryKind::Dir => file_type.is_dir(),
            EntryKind::File => file_type.is_file(),
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if wanted && !name.starts_with('.') {
            names.push(name);
        }
    }
    Ok(names)
}
