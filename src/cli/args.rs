//! Command-line argument definitions using clap

use clap::Parser;

use crate::pipeline::{version_suffix, ConversionPolicy, DEFAULT_SUFFIX};

/// rbstata - Find your way back to older versions of dta files.
///
/// Convert newer Stata .dta files to older versions so that you can open
/// them in older Stata versions.
#[derive(Parser, Debug)]
#[command(name = "rbstata")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// dta files to convert. The .dta extension may be omitted.
    #[arg(value_name = "DTA_FILES")]
    pub files: Vec<String>,

    /// Which version of Stata to convert to (10-17)
    #[arg(short, long, value_name = "INT")]
    pub target_version: Option<u32>,

    /// Convert all dta files in the current directory
    #[arg(short, long)]
    pub all: bool,

    /// Suffix added to converted file names (default "-rbstata")
    #[arg(short, long, value_name = "TEXT", allow_hyphen_values = true)]
    pub suffix: Option<String>,

    /// Name of the converted file (single file conversion only).
    /// Supersedes --suffix.
    #[arg(short, long, value_name = "TEXT")]
    pub output: Option<String>,

    /// Also convert dta files in subdirectories (with --all)
    #[arg(short, long)]
    pub recursive: bool,

    /// Overwrite the original input files
    #[arg(short = 'w', long)]
    pub overwrite: bool,

    /// Print progress messages
    #[arg(short, long)]
    pub verbose: bool,

    /// Lower-case file names after stripping whitespace
    #[arg(long)]
    pub lowercase: bool,

    /// Name converted files after the target version (auto-v13.dta)
    /// instead of using "-rbstata"
    #[arg(long)]
    pub version_suffix: bool,

    /// Diagnostic log level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Which files a run converts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    /// File names as typed by the user, not yet normalized.
    Listed(Vec<String>),
    /// Every dta file in the current directory.
    Discover { recursive: bool },
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub files: FileSelection,
    pub target_version: u32,
    pub policy: ConversionPolicy,
    /// Suffix used when the policy names no destination.
    pub default_suffix: String,
    pub lowercase: bool,
    pub verbose: bool,
}

impl Cli {
    /// True when neither files nor --all were given.
    pub fn needs_wizard(&self) -> bool {
        self.files.is_empty() && !self.all
    }

    /// Suffix used when neither --suffix nor --output applies.
    pub fn default_suffix(&self, target_version: u32) -> String {
        if self.version_suffix {
            version_suffix(target_version)
        } else {
            DEFAULT_SUFFIX.to_string()
        }
    }

    /// Builds the run settings from the flags alone.
    pub fn settings(&self, target_version: u32) -> Settings {
        let files = if self.all {
            FileSelection::Discover {
                recursive: self.recursive,
            }
        } else {
            FileSelection::Listed(self.files.clone())
        };

        Settings {
            files,
            target_version,
            policy: ConversionPolicy {
                overwrite: self.overwrite,
                suffix: self.suffix.clone(),
                explicit_output: self.output.clone(),
            },
            default_suffix: self.default_suffix(target_version),
            lowercase: self.lowercase,
            verbose: self.verbose,
        }
    }
}
