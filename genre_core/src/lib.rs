//! Audio decoding, mel features and dataset indexing for genre classification.

pub mod audio;
pub mod dataset;
mod error;

pub use audio::mel::{MelConfig, MelExtractor};
pub use audio::window::{ClipWindow, fix_length};
pub use dataset::{
    AudioClip, DatasetEntry, DatasetIndex, LabelVocabulary, SampleLoader, Split, SplitLayout,
};
pub use error::DatasetError;
