//! ChannelScope CLI: analyse a channel, pick a recommendation, get a script.
//!
//! Runs the pipeline against the YouTube Data API and a local Ollama model,
//! keeping the state record in a local database between invocations.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
