//! Docweaver CLI — grounded long-form document writer.
//!
//! Plans an outline for a topic, grounds each section in local reference
//! files and live web search, attaches validated illustrations, and writes
//! the assembled markdown document.

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
