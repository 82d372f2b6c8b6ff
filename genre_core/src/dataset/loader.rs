use anyhow::{Context, Result};

use crate::audio::{decoder::decode_to_mono, window::{ClipWindow, fix_length}};
use crate::dataset::index::DatasetEntry;

/// A decoded, fixed-length clip and its one-hot target.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub waveform: Vec<f32>,
    pub target: Vec<f32>,
    pub index: usize,
}

/// Loads index entries into fixed-length clips.
///
/// Nothing is cached: every call decodes the file again.
#[derive(Debug, Clone, Copy)]
pub struct SampleLoader {
    window: ClipWindow,
}

impl SampleLoader {
    pub fn new(window: ClipWindow) -> Self {
        Self { window }
    }

    pub fn load(&self, entry: &DatasetEntry) -> Result<AudioClip> {
        let samples = decode_to_mono(&entry.audio_path, self.window.sample_rate)
            .with_context(|| format!("failed to load clip `{}`", entry.audio_name))?;

        Ok(AudioClip {
            waveform: fix_length(samples, self.window.num_samples()),
            target: entry.target.clone(),
            index: entry.index,
        })
    }
}
