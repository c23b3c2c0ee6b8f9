use anyhow::Context;
use aq_dashboard::cli::{run, Cli};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).await.context("aq-dashboard failed")
}
