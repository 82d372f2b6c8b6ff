#![recursion_limit = "256"]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("genre_train=info".parse()?)
                .add_directive("genre_core=info".parse()?),
        )
        .init();

    Cli::parse().run()
}
