#![forbid(unsafe_code)]

//! `run_hop_producer` entry point.

use clap::{CommandFactory, Parser};
use hop_client::cli::{run_hop_producer, Cli};
use hop_client::Error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match run_hop_producer(cli).await {
        Ok(()) => Ok(()),
        Err(Error::Usage { message }) => Cli::command()
            .error(clap::error::ErrorKind::ArgumentConflict, message)
            .exit(),
        Err(err) => Err(err.into()),
    }
}
