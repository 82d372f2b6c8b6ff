use anyhow::{Context, Result, ensure};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{ElementConversion, backend::AutodiffBackend},
};
use genre_core::{
    ClipWindow, DatasetEntry, DatasetIndex, LabelVocabulary, MelConfig, SampleLoader, Split,
    SplitLayout,
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};

use crate::{
    checkpoint::CheckpointStore,
    data::{BatchResult, ClipDataset, GenreBatch, GenreBatcher},
    metrics::{EpochMetrics, accuracy},
    model::{GenreCnn, GenreCnnConfig},
    rng::RngContext,
    tracking::{RunConfig, RunSession},
};

/// Everything one training run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub root: PathBuf,
    pub window: ClipWindow,
    /// Feature parameters; the sample rate is always taken from `window`.
    pub features: MelConfig,
    pub layout: SplitLayout,
    pub epochs: usize,
    pub batch_size: usize,
    pub lr: f64,
    pub seed: u64,
    /// Loader threads; 0 or 1 keeps batch order reproducible.
    pub num_workers: usize,
    pub checkpoint_dir: PathBuf,
    pub checkpoint_every: usize,
    pub run_dir: PathBuf,
    pub project: String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/datasets/gtzan"),
            window: ClipWindow::default(),
            features: MelConfig::default(),
            layout: SplitLayout::default(),
            epochs: 10,
            batch_size: 108,
            lr: 1e-3,
            seed: 42,
            num_workers: 8,
            checkpoint_dir: PathBuf::from("checkpoints"),
            checkpoint_every: 10,
            run_dir: PathBuf::from("runs"),
            project: "music_tagging_parallel".to_string(),
        }
    }
}

impl TrainConfig {
    pub fn mel_config(&self) -> MelConfig {
        MelConfig {
            sample_rate: self.window.sample_rate,
            ..self.features
        }
    }
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct TrainReport {
    /// Loss of every optimizer step, in order.
    pub losses: Vec<f32>,
    pub epochs: Vec<EpochMetrics>,
    pub checkpoints: Vec<PathBuf>,
    pub vocabulary: LabelVocabulary,
}

/// Predicted and true classes over a set of batches.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
    pub accuracy: f64,
    pub predictions: Vec<usize>,
    pub targets: Vec<usize>,
}

fn build_loader<B: Backend>(
    entries: Vec<DatasetEntry>,
    loader: SampleLoader,
    batch_size: usize,
    shuffle: Option<u64>,
    num_workers: usize,
    device: &B::Device,
) -> Arc<dyn DataLoader<B, BatchResult<B>>> {
    let mut builder = DataLoaderBuilder::<B, _, BatchResult<B>>::new(GenreBatcher)
        .batch_size(batch_size)
        .set_device(device.clone());
    if let Some(seed) = shuffle {
        builder = builder.shuffle(seed);
    }
    if num_workers > 0 {
        builder = builder.num_workers(num_workers);
    }
    builder.build(ClipDataset::new(entries, loader))
}

/// Run the full train / validate / checkpoint loop.
pub fn train<B: AutodiffBackend>(config: &TrainConfig, device: B::Device) -> Result<TrainReport> {
    ensure!(config.batch_size > 0, "batch_size must be at least 1");
    let train_index = DatasetIndex::build(&config.root, Split::Train, &config.layout)?;
    let valid_index = DatasetIndex::build(&config.root, Split::Valid, &config.layout)?;
    let vocabulary = train_index.vocabulary().clone();

    tracing::info!(
        labels = vocabulary.len(),
        train = train_index.len(),
        valid = valid_index.len(),
        "dataset indexed"
    );

    let mut rng = RngContext::new(config.seed);
    let mut model: GenreCnn<B> =
        GenreCnnConfig::from_mel(vocabulary.len(), &config.mel_config()).init(&mut rng, &device);
    let mut optim = AdamConfig::new().init();

    let loader = SampleLoader::new(config.window);
    let train_loader = build_loader::<B>(
        train_index.into_entries(),
        loader,
        config.batch_size,
        Some(rng.next_seed()),
        config.num_workers,
        &device,
    );
    let valid_loader = build_loader::<B::InnerBackend>(
        valid_index.into_entries(),
        loader,
        config.batch_size,
        None,
        config.num_workers,
        &device,
    );

    let mut session = RunSession::open(
        &config.run_dir,
        &config.project,
        &RunConfig {
            epochs: config.epochs,
            batch_size: config.batch_size,
            lr: config.lr,
        },
    )?;
    let store = CheckpointStore::new(&config.checkpoint_dir);

    let mut report = TrainReport {
        losses: Vec::new(),
        epochs: Vec::with_capacity(config.epochs),
        checkpoints: Vec::new(),
        vocabulary,
    };
    let mut step = 0usize;

    for epoch in 1..=config.epochs {
        // -------------------------
        // 1) Train
        // -------------------------
        let mut last_loss = f32::NAN;
        for batch in train_loader.iter() {
            let batch: GenreBatch<B> = batch?;
            let (loss, _) = model.forward_loss(batch.waveforms, batch.targets);
            let loss_value = loss.clone().into_scalar().elem::<f32>();

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(config.lr, model, grads);

            step += 1;
            last_loss = loss_value;
            report.losses.push(loss_value);
            tracing::info!(epoch, step, loss = loss_value, "train step");
        }

        // -------------------------
        // 2) Validate
        // -------------------------
        let outcome = score_batches(&model.valid(), valid_loader.iter())?;
        tracing::info!(epoch, acc = outcome.accuracy, "validation");

        let metrics = EpochMetrics {
            epoch,
            step,
            loss: last_loss,
            acc: outcome.accuracy,
        };
        session.log(&metrics)?;
        report.epochs.push(metrics);

        // -------------------------
        // 3) Checkpoint
        // -------------------------
        if config.checkpoint_every > 0 && epoch % config.checkpoint_every == 0 {
            report.checkpoints.push(store.save(&model, epoch)?);
        }
    }

    session.finish()?;
    Ok(report)
}

/// Arg-max predictions and targets over every batch, plus their accuracy.
pub fn score_batches<B, I>(model: &GenreCnn<B>, batches: I) -> Result<EvalOutcome>
where
    B: Backend,
    I: Iterator<Item = BatchResult<B>>,
{
    let mut predictions = Vec::new();
    let mut targets = Vec::new();

    for batch in batches {
        let batch = batch?;
        let scores = model.forward(batch.waveforms);

        predictions.extend(class_ids(scores));
        targets.extend(class_ids(batch.targets));
    }

    Ok(EvalOutcome {
        accuracy: accuracy(&predictions, &targets),
        predictions,
        targets,
    })
}

fn class_ids<B: Backend>(scores: Tensor<B, 2>) -> Vec<usize> {
    scores
        .argmax(1)
        .into_data()
        .iter::<i64>()
        .map(|id| id as usize)
        .collect()
}

/// Settings for scoring a saved checkpoint on one split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    pub root: PathBuf,
    pub checkpoint: PathBuf,
    pub window: ClipWindow,
    pub features: MelConfig,
    pub layout: SplitLayout,
    pub batch_size: usize,
    pub num_workers: usize,
    pub split: Split,
}

impl EvalConfig {
    pub fn new(root: impl Into<PathBuf>, checkpoint: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            checkpoint: checkpoint.into(),
            window: ClipWindow::default(),
            features: MelConfig::default(),
            layout: SplitLayout::default(),
            batch_size: 108,
            num_workers: 8,
            split: Split::Test,
        }
    }
}

/// Load a checkpoint and report its accuracy on `config.split`.
pub fn evaluate_checkpoint<B: Backend>(
    config: &EvalConfig,
    device: B::Device,
) -> Result<EvalOutcome> {
    ensure!(config.batch_size > 0, "batch_size must be at least 1");
    let index = DatasetIndex::build(&config.root, config.split, &config.layout)?;
    let mel = MelConfig {
        sample_rate: config.window.sample_rate,
        ..config.features
    };

    // parameters are overwritten by the record, the seed only fixes shapes
    let blank: GenreCnn<B> = GenreCnnConfig::from_mel(index.vocabulary().len(), &mel)
        .init(&mut RngContext::new(0), &device);
    let model = CheckpointStore::load(&config.checkpoint, blank, &device)
        .with_context(|| format!("cannot evaluate {}", config.checkpoint.display()))?;

    let split = index.split();
    let loader = build_loader::<B>(
        index.into_entries(),
        SampleLoader::new(config.window),
        config.batch_size,
        None,
        config.num_workers,
        &device,
    );

    let outcome = score_batches(&model, loader.iter())?;
    tracing::info!(%split, acc = outcome.accuracy, n = outcome.predictions.len(), "evaluated checkpoint");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{Autodiff, NdArray},
        tensor::TensorData,
    };

    type B = NdArray;

    #[test]
    fn class_ids_take_the_highest_score() {
        let device = Default::default();
        let scores = Tensor::<B, 2>::from_data(
            TensorData::new(vec![0.1f32, 0.9, 0.8, 0.2, 0.3, 0.7], [3, 2]),
            &device,
        );
        assert_eq!(class_ids(scores), vec![1, 0, 1]);
    }

    #[test]
    fn mel_rate_follows_the_clip_window() {
        let config = TrainConfig {
            window: ClipWindow::new(16_000, 5),
            ..TrainConfig::default()
        };
        assert_eq!(config.mel_config().sample_rate, 16_000);
        assert_eq!(config.mel_config().n_mels, 128);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainConfig {
            root: dir.path().to_path_buf(),
            batch_size: 0,
            run_dir: dir.path().join("runs"),
            ..TrainConfig::default()
        };

        let err = train::<Autodiff<B>>(&config, Default::default()).unwrap_err();
        assert!(err.to_string().contains("batch_size"));
        assert!(!dir.path().join("runs").exists());

        let eval = EvalConfig {
            batch_size: 0,
            ..EvalConfig::new(dir.path(), dir.path().join("epoch1.pth"))
        };
        let err = evaluate_checkpoint::<B>(&eval, Default::default()).unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn defaults_match_the_cli() {
        let config = TrainConfig::default();
        assert_eq!(config.epochs, 10);
        assert_eq!(config.batch_size, 108);
        assert_eq!(config.seed, 42);
        assert_eq!(config.checkpoint_every, 10);
    }
}
