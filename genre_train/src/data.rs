use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    prelude::*,
    tensor::TensorData,
};
use genre_core::{AudioClip, DatasetEntry, SampleLoader};
use thiserror::Error;

/// A clip that could not be loaded.
///
/// Loader workers cannot return errors directly, so failures travel inside
/// the item and are raised by whoever consumes the batch.
#[derive(Error, Debug, Clone)]
#[error("{audio_name}: {reason}")]
pub struct ClipError {
    pub audio_name: String,
    pub reason: String,
}

pub type ClipItem = Result<AudioClip, ClipError>;

/// Burn dataset over index entries; every `get` decodes the file again.
pub struct ClipDataset {
    entries: Vec<DatasetEntry>,
    loader: SampleLoader,
}

impl ClipDataset {
    pub fn new(entries: Vec<DatasetEntry>, loader: SampleLoader) -> Self {
        Self { entries, loader }
    }
}

impl Dataset<ClipItem> for ClipDataset {
    fn get(&self, index: usize) -> Option<ClipItem> {
        let entry = self.entries.get(index)?;
        Some(self.loader.load(entry).map_err(|e| ClipError {
            audio_name: entry.audio_name.clone(),
            reason: format!("{e:#}"),
        }))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Stacked waveforms and one-hot targets.
#[derive(Debug, Clone)]
pub struct GenreBatch<B: Backend> {
    /// [batch, samples]
    pub waveforms: Tensor<B, 2>,
    /// [batch, classes]
    pub targets: Tensor<B, 2>,
}

pub type BatchResult<B> = Result<GenreBatch<B>, ClipError>;

#[derive(Clone, Debug, Default)]
pub struct GenreBatcher;

impl<B: Backend> Batcher<B, ClipItem, BatchResult<B>> for GenreBatcher {
    fn batch(&self, items: Vec<ClipItem>, device: &B::Device) -> BatchResult<B> {
        let clips = items.into_iter().collect::<Result<Vec<_>, _>>()?;

        let batch_size = clips.len();
        let num_samples = clips.first().map_or(0, |c| c.waveform.len());
        let num_classes = clips.first().map_or(0, |c| c.target.len());

        if let Some(odd) = clips
            .iter()
            .find(|c| c.waveform.len() != num_samples || c.target.len() != num_classes)
        {
            return Err(ClipError {
                audio_name: format!("class {}", odd.index),
                reason: format!(
                    "clip shape {}x{} does not match batch shape {num_samples}x{num_classes}",
                    odd.waveform.len(),
                    odd.target.len()
                ),
            });
        }

        let waveforms: Vec<f32> = clips
            .iter()
            .flat_map(|c| c.waveform.iter().copied())
            .collect();
        let targets: Vec<f32> = clips
            .iter()
            .flat_map(|c| c.target.iter().copied())
            .collect();

        Ok(GenreBatch {
            waveforms: Tensor::from_data(
                TensorData::new(waveforms, [batch_size, num_samples]),
                device,
            ),
            targets: Tensor::from_data(TensorData::new(targets, [batch_size, num_classes]), device),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn clip(index: usize, len: usize) -> ClipItem {
        let mut target = vec![0.0; 3];
        target[index] = 1.0;
        Ok(AudioClip {
            waveform: vec![index as f32; len],
            target,
            index,
        })
    }

    #[test]
    fn stacks_clips_in_order() {
        let device = Default::default();
        let batch: GenreBatch<B> =
            GenreBatcher.batch(vec![clip(0, 5), clip(2, 5)], &device).unwrap();

        assert_eq!(batch.waveforms.dims(), [2, 5]);
        assert_eq!(batch.targets.dims(), [2, 3]);
        let targets: Vec<f32> = batch.targets.into_data().iter::<f32>().collect();
        assert_eq!(targets, vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn failed_clip_fails_the_batch() {
        let device = Default::default();
        let broken = Err(ClipError {
            audio_name: "rock.00001.wav".into(),
            reason: "bad header".into(),
        });
        let result: BatchResult<B> = GenreBatcher.batch(vec![clip(0, 5), broken], &device);

        let err = result.unwrap_err();
        assert_eq!(err.audio_name, "rock.00001.wav");
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let device = Default::default();
        let result: BatchResult<B> = GenreBatcher.batch(vec![clip(0, 5), clip(1, 4)], &device);
        assert!(result.is_err());
    }
}
