use serde::{Deserialize, Serialize};

/// Scalars pushed to the run session once per epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    /// Optimizer steps taken so far in the run.
    pub step: usize,
    /// Loss of the last training batch of the epoch.
    pub loss: f32,
    /// Validation accuracy.
    pub acc: f64,
}

/// Fraction of positions where the predicted class equals the true class.
///
/// Returns 0.0 when there is nothing to compare.
pub fn accuracy(predictions: &[usize], targets: &[usize]) -> f64 {
    let total = predictions.len().min(targets.len());
    if total == 0 {
        return 0.0;
    }

    let correct = predictions
        .iter()
        .zip(targets)
        .filter(|(p, t)| p == t)
        .count();

    correct as f64 / total as f64
}
