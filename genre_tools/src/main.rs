mod inspect;
mod manifest;

use anyhow::Result;
use clap::{Parser, Subcommand};
use genre_core::{ClipWindow, Split};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "genre-tools", about = "Dataset helpers for the genre classifier.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a JSONL manifest of one split
    Manifest {
        #[arg(long, default_value = "/datasets/gtzan")]
        root: PathBuf,
        #[arg(long, default_value = "train")]
        split: Split,
        #[arg(long, default_value = "manifests/train.jsonl")]
        out: PathBuf,
    },
    /// Decode one file and print its log-mel statistics
    Inspect {
        path: PathBuf,
        #[arg(long, default_value_t = 24_000)]
        sample_rate: u32,
        #[arg(long, default_value_t = 30)]
        clip_seconds: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("genre_tools=info".parse()?),
        )
        .init();

    match Cli::parse().command {
        Command::Manifest { root, split, out } => {
            let count = manifest::write_manifest(&root, split, &out)?;
            println!("Wrote: {}", out.display());
            println!("Entries: {count}");
        }
        Command::Inspect {
            path,
            sample_rate,
            clip_seconds,
        } => inspect::inspect(&path, ClipWindow::new(sample_rate, clip_seconds))?,
    }
    Ok(())
}
