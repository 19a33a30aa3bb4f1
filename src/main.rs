//! CLI entry point for the animal catalog.

use anyhow::Result;
use clap::Parser;

mod app;
mod cli;
mod output;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse before tracing so --help works without logs
    let args = Args::parse();
    app::runtime::run(args).await
}
