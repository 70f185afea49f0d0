//! Roadmapper CLI: learning roadmaps from a subject and a study duration.
//!
//! Generates a topic tree, enriches every topic with a description, a video
//! and reference documents, and offers a tutor chat.

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
