pub mod commands;

use anyhow::Result;
use burn::backend::{
    Autodiff, NdArray, Wgpu,
    ndarray::NdArrayDevice,
    wgpu::WgpuDevice,
};
use clap::Parser;
use commands::{BackendKind, Commands, DataArgs, EvalArgs, TrainArgs};
use genre_train::{EvalConfig, TrainConfig, evaluate_checkpoint, train};

#[derive(Parser, Debug)]
#[command(
    name = "genre",
    version,
    about = "Train and evaluate a CNN music-genre classifier."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match &self.command {
            Commands::Train(args) => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: &TrainArgs) -> Result<()> {
    let config = TrainConfig::from(args);
    tracing::info!(root = %config.root.display(), backend = ?args.data.backend, "starting training");

    let report = match args.data.backend {
        BackendKind::Wgpu => train::<Autodiff<Wgpu>>(&config, wgpu_device(&args.data)),
        BackendKind::Ndarray => train::<Autodiff<NdArray>>(&config, NdArrayDevice::Cpu),
    }?;

    if let Some(last) = report.epochs.last() {
        println!("epoch {}: loss={:.4} acc={:.4}", last.epoch, last.loss, last.acc);
    }
    for path in &report.checkpoints {
        println!("checkpoint: {}", path.display());
    }
    Ok(())
}

fn run_evaluate(args: &EvalArgs) -> Result<()> {
    let config = EvalConfig::from(args);

    let outcome = match args.data.backend {
        BackendKind::Wgpu => evaluate_checkpoint::<Wgpu>(&config, wgpu_device(&args.data)),
        BackendKind::Ndarray => evaluate_checkpoint::<NdArray>(&config, NdArrayDevice::Cpu),
    }?;

    println!(
        "{} accuracy: {:.4} ({} clips)",
        config.split,
        outcome.accuracy,
        outcome.predictions.len()
    );
    Ok(())
}

fn wgpu_device(data: &DataArgs) -> WgpuDevice {
    if data.device_ids.len() > 1 {
        tracing::warn!(
            ids = ?data.device_ids,
            "multi-device training is not supported, using the first id only"
        );
    }
    match data.device_ids.first() {
        Some(&id) => WgpuDevice::DiscreteGpu(id),
        None => WgpuDevice::default(),
    }
}
