//! CLI module - argument parsing, interactive prompts and the conversion loop

pub mod args;
pub mod convert;
pub mod prompts;

pub use args::{Cli, FileSelection, Settings};
pub use convert::run_conversions;
pub use prompts::{prompt_target_version, run_wizard};
