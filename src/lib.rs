pub mod archive;
pub mod cli;
pub mod config;
pub mod remote;
pub mod store;

pub use archive::{ExportSummary, ImportSummary, Manifest, export_archive, import_archive};
pub use store::{Selector, Session, SessionStore};

use anyhow::Result;
use clap::Parser;

/// Parse the command line and run one operation to completion.
pub fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::execute(cli)
}
