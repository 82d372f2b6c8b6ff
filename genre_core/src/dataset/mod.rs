pub mod index;
pub mod loader;

pub use index::{DatasetEntry, DatasetIndex, LabelVocabulary, Split, SplitLayout};
pub use loader::{AudioClip, SampleLoader};
