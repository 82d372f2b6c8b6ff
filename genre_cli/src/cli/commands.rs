use clap::{Args, Subcommand, ValueEnum};
use genre_core::{ClipWindow, MelConfig, SplitLayout};
use genre_train::{EvalConfig, TrainConfig};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the genre classifier
    Train(TrainArgs),
    /// Score a saved checkpoint on the test split
    Evaluate(EvalArgs),
}

/// Compute backend for the network.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Wgpu,
    Ndarray,
}

/// Options shared by every command that reads the dataset.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Dataset root containing `genres/<label>/`
    #[arg(long, default_value = "/datasets/gtzan")]
    pub root: PathBuf,

    #[arg(long, default_value_t = 108)]
    pub batch_size: usize,

    /// Loader threads; 0 loads on the calling thread
    #[arg(long, default_value_t = 8)]
    pub num_workers: usize,

    /// Decode rate; also the rate the mel filterbank is built for
    #[arg(long, default_value_t = 24_000)]
    pub sample_rate: u32,

    #[arg(long, default_value_t = 30)]
    pub clip_seconds: u32,

    #[arg(long, value_enum, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,

    /// Accelerator ids; only the first one is used
    #[arg(long, value_delimiter = ',', default_value = "0")]
    pub device_ids: Vec<usize>,
}

impl DataArgs {
    fn window(&self) -> ClipWindow {
        ClipWindow::new(self.sample_rate, self.clip_seconds)
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Save parameters every N epochs
    #[arg(long, default_value_t = 10)]
    pub checkpoint_every: usize,

    #[arg(long, default_value = "runs")]
    pub run_dir: PathBuf,

    #[arg(long, default_value = "music_tagging_parallel")]
    pub project: String,
}

impl From<&TrainArgs> for TrainConfig {
    fn from(args: &TrainArgs) -> Self {
        Self {
            root: args.data.root.clone(),
            window: args.data.window(),
            features: MelConfig::default(),
            layout: SplitLayout::default(),
            epochs: args.epochs,
            batch_size: args.data.batch_size,
            lr: args.lr,
            seed: args.seed,
            num_workers: args.data.num_workers,
            checkpoint_dir: args.checkpoint_dir.clone(),
            checkpoint_every: args.checkpoint_every,
            run_dir: args.run_dir.clone(),
            project: args.project.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Checkpoint written by `train`, e.g. checkpoints/epoch10.pth
    #[arg(long)]
    pub checkpoint: PathBuf,
}

impl From<&EvalArgs> for EvalConfig {
    fn from(args: &EvalArgs) -> Self {
        Self {
            window: args.data.window(),
            batch_size: args.data.batch_size,
            num_workers: args.data.num_workers,
            ..EvalConfig::new(args.data.root.clone(), args.checkpoint.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn train_defaults() {
        let cli = Cli::parse_from(["genre", "train"]);
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        let config = TrainConfig::from(&args);

        assert_eq!(config.root, PathBuf::from("/datasets/gtzan"));
        assert_eq!(config.epochs, 10);
        assert_eq!(config.batch_size, 108);
        assert_eq!(config.lr, 1e-3);
        assert_eq!(config.seed, 42);
        assert_eq!(config.window.num_samples(), 24_000 * 30);
        assert_eq!(args.data.device_ids, vec![0]);
        assert_eq!(args.data.backend, BackendKind::Wgpu);
    }

    #[test]
    fn device_ids_are_comma_separated() {
        let cli = Cli::parse_from([
            "genre",
            "train",
            "--device-ids",
            "0,1,2,3",
            "--backend",
            "ndarray",
        ]);
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.data.device_ids, vec![0, 1, 2, 3]);
        assert_eq!(args.data.backend, BackendKind::Ndarray);
    }

    #[test]
    fn evaluate_needs_a_checkpoint() {
        assert!(Cli::try_parse_from(["genre", "evaluate"]).is_err());

        let cli = Cli::parse_from(["genre", "evaluate", "--checkpoint", "ckpt/epoch10.pth"]);
        let Commands::Evaluate(args) = cli.command else {
            panic!("expected evaluate");
        };
        let config = EvalConfig::from(&args);
        assert_eq!(config.checkpoint, PathBuf::from("ckpt/epoch10.pth"));
        assert_eq!(config.split, genre_core::Split::Test);
    }
}
