//! Prospector CLI: classify waitlist signups from their websites.
//!
//! Fetches each company's site (recovering a dead domain through web search)
//! and asks a language model to categorize and score the company.

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
