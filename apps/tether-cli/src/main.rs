//! `tether` binary entry point.
//!
//! Parses arguments, sets up tracing (with a per-task JSON log file for
//! `replay`), and dispatches to the selected subcommand via [`Cli::run`].

mod cli;
mod console;
mod logging;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (working_dir, slug) = cli.log_context();

    // best-effort, before tracing is initialized
    logging::cleanup_old_logs(&working_dir);

    let _guard = logging::init_tracing(&working_dir, slug.as_deref())?;

    cli.run().await
}
