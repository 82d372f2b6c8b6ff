//! Genre classifier training on burn: model, data pipeline, checkpoints and run tracking.

pub mod checkpoint;
pub mod data;
pub mod metrics;
pub mod model;
pub mod rng;
pub mod tracking;
pub mod trainer;

pub use checkpoint::CheckpointStore;
pub use metrics::{EpochMetrics, accuracy};
pub use model::{GenreCnn, GenreCnnConfig};
pub use rng::RngContext;
pub use tracking::{RunConfig, RunSession};
pub use trainer::{
    EvalConfig, EvalOutcome, TrainConfig, TrainReport, evaluate_checkpoint, score_batches, train,
};
