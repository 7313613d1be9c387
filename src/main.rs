//! rbstata: find your way back to older versions of dta files.
//!
//! Converts newer Stata .dta files to older versions so that they can be
//! opened in older Stata versions.

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rbstata::cli::{prompt_target_version, run_conversions, run_wizard, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = if cli.needs_wizard() {
        run_wizard(&cli)?
    } else {
        let target_version = match cli.target_version {
            Some(v) => v,
            None => prompt_target_version()?,
        };
        cli.settings(target_version)
    };
    debug!(?settings, "resolved settings");

    run_conversions(&settings)?;
    Ok(())
}
