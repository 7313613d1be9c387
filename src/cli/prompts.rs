//! Interactive prompts using dialoguer
//!
//! Invoked without files or `--all`, rbstata asks for each setting in turn
//! and returns a complete `Settings` before anything is converted.

use anyhow::Result;
use dialoguer::{Confirm, Input};

use crate::cli::args::{Cli, FileSelection, Settings};
use crate::pipeline::{
    ensure_extension, insert_suffix, normalize, ConversionPolicy, SUPPORTED_VERSIONS,
};
use crate::utils::{print_banner, print_prompt_help};

/// Target version offered by default.
pub const DEFAULT_TARGET_VERSION: u32 = 13;

/// Token meaning "every dta file in the current directory".
pub const DISCOVER_TOKEN: &str = "*";

/// Asks for the Stata version to convert to.
pub fn prompt_target_version() -> Result<u32> {
    print_prompt_help("The Stata version to convert to.");
    let version = Input::<u32>::new()
        .with_prompt("> Target version")
        .default(DEFAULT_TARGET_VERSION)
        .validate_with(|v: &u32| -> Result<(), String> {
            if SUPPORTED_VERSIONS.contains(v) {
                Ok(())
            } else {
                Err(format!(
                    "choose a version between {} and {}",
                    SUPPORTED_VERSIONS.start(),
                    SUPPORTED_VERSIONS.end()
                ))
            }
        })
        .interact_text()?;
    Ok(version)
}

/// Collects every setting interactively. Flags already given on the command
/// line (target version, suffix, overwrite, ...) are not asked again.
pub fn run_wizard(cli: &Cli) -> Result<Settings> {
    print_banner(env!("CARGO_PKG_VERSION"));

    print_prompt_help(
        "Enter the dta file(s) you want to convert (e.g. 'auto.dta').\n\
         It is not necessary to key in the .dta extension (e.g. just type 'auto').\n\
         Separate several files with spaces. Press Enter to include all .dta files\n\
         in the current directory.",
    );
    let entered = Input::<String>::new()
        .with_prompt("> .dta file(s)")
        .default(DISCOVER_TOKEN.to_string())
        .interact_text()?;
    let tokens = parse_file_tokens(&entered);
    let discover = tokens.is_empty() || tokens == [DISCOVER_TOKEN];

    let target_version = match cli.target_version {
        Some(v) => v,
        None => prompt_target_version()?,
    };
    let default_suffix = cli.default_suffix(target_version);

    let mut policy = ConversionPolicy {
        overwrite: cli.overwrite,
        suffix: cli.suffix.clone(),
        explicit_output: cli.output.clone(),
    };

    if !policy.overwrite {
        if !discover && tokens.len() == 1 {
            if policy.explicit_output.is_none() {
                let input = ensure_extension(&normalize(&tokens[0], cli.lowercase));
                let default_output = insert_suffix(&input, &default_suffix)?;
                print_prompt_help(&format!(
                    "File name for saving. Default is to save using the '{}' suffix.",
                    default_suffix
                ));
                let output = Input::<String>::new()
                    .with_prompt("> Save file as")
                    .default(default_output)
                    .interact_text()?;
                policy.explicit_output = Some(ensure_extension(&normalize(&output, cli.lowercase)));
            }
        } else if policy.suffix.is_none() {
            print_prompt_help(&format!(
                "File suffix for saving the output file(s).\n\
                 (For example, the suffix '-old' means that auto.dta will be converted and\n\
                 saved as auto-old.dta. Default is to use '{}'.)",
                default_suffix
            ));
            let suffix = Input::<String>::new()
                .with_prompt("> File suffix for saving")
                .default(default_suffix.clone())
                .interact_text()?;
            policy.suffix = Some(suffix);
        }
    }

    let files = if discover {
        print_prompt_help(
            "Include all .dta files in current directory and its subdirectories.\n\
             (Default is to include only the .dta files in the current directory.)",
        );
        let recursive = Confirm::new()
            .with_prompt("> Include subdirectories")
            .default(cli.recursive)
            .interact()?;
        FileSelection::Discover { recursive }
    } else {
        FileSelection::Listed(tokens)
    };

    let verbose = Confirm::new()
        .with_prompt("> Print all messages")
        .default(true)
        .interact()?;

    Ok(Settings {
        files,
        target_version,
        policy,
        default_suffix,
        lowercase: cli.lowercase,
        verbose,
    })
}

/// Splits the wizard's file answer into individual file names.
pub fn parse_file_tokens(entered: &str) -> Vec<String> {
    entered.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_tokens() {
        assert_eq!(parse_file_tokens("auto census.dta"), vec!["auto", "census.dta"]);
        assert_eq!(parse_file_tokens("  *  "), vec!["*"]);
        assert!(parse_file_tokens("   ").is_empty());
    }
}
