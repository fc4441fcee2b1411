//! issuekb CLI: turn a GitHub issue export into a Q&A knowledge base.
//!
//! Classifies every issue thread into a question with tagged answers,
//! writes JSON and Markdown exports, and optionally refines the result
//! through an external LLM bridge.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
