use burn::{prelude::*, tensor::TensorData};
use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};

/// The single source of randomness for a run.
///
/// Parameter initialisation and loader shuffling draw from this context in a
/// fixed order, so one seed reproduces a run.
#[derive(Debug, Clone)]
pub struct RngContext {
    seed: u64,
    rng: StdRng,
}

impl RngContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Derive a seed for a component that keeps its own generator.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Tensor with values drawn uniformly from `[-limit, limit)`.
    pub fn uniform<B: Backend, const D: usize>(
        &mut self,
        shape: [usize; D],
        limit: f32,
        device: &B::Device,
    ) -> Tensor<B, D> {
        let total: usize = shape.iter().product();
        let values: Vec<f32> = (0..total)
            .map(|_| self.rng.random::<f32>() * 2.0 * limit - limit)
            .collect();

        Tensor::<B, D>::from_data(TensorData::new(values, shape), device)
    }
}
