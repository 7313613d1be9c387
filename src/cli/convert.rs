//! Running conversions for a set of resolved settings
//!
//! One file is converted with single-file semantics: an invalid input or a
//! failed conversion ends the run with an error. Two or more files form a
//! batch: each failure is reported on stderr and the batch carries on.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::args::{FileSelection, Settings};
use crate::pipeline::{
    convert_dta, ensure_extension, format_revision, glob_dta_files, is_dta_file, normalize,
    resolve_output, ConversionPolicy, ConvertError,
};
use crate::report::ConversionSummary;
use crate::utils::{
    create_progress_bar, create_spinner, print_completion, print_converted, print_error,
    print_info, print_warning, OVERWRITE_WARNING,
};

/// Converts every file named by `settings` and returns the per-file outcomes.
///
/// A batch carries on past every per-file failure: invalid paths as well as
/// read, write and encoding errors are printed and recorded in the summary,
/// and the run still succeeds. Only the unsupported version check and file
/// discovery abort a batch.
///
/// # Errors
/// Unsupported target versions, failed discovery and any failure of a
/// single-file run.
pub fn run_conversions(settings: &Settings) -> Result<ConversionSummary> {
    format_revision(settings.target_version)?;

    let entered = match &settings.files {
        FileSelection::Listed(files) => files.clone(),
        FileSelection::Discover { recursive } => glob_dta_files(Path::new("."), *recursive)
            .context("Failed to search for dta files")?
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
    };
    if settings.verbose {
        print_info(&format!("dta files entered: {:?}", entered));
    }

    let files: Vec<String> = entered
        .iter()
        .map(|f| ensure_extension(&normalize(f, settings.lowercase)))
        .collect();
    if settings.verbose {
        print_info(&format!("Valid dta files to be converted: {:?}", files));
    }

    let mut summary = ConversionSummary::new(settings.target_version);
    match files.as_slice() {
        [] => {}
        [file] => convert_single(file, settings, &mut summary)?,
        batch => convert_batch(batch, settings, &mut summary),
    }

    if settings.verbose && files.len() > 1 {
        summary.display();
    }
    print_completion(!files.is_empty());

    Ok(summary)
}

fn convert_single(file: &str, settings: &Settings, summary: &mut ConversionSummary) -> Result<()> {
    let input = Path::new(file);
    if !is_dta_file(input) {
        return Err(ConvertError::InvalidInputPath(file.to_string()).into());
    }

    let output = resolve_output(file, &settings.policy, &settings.default_suffix)?;
    if output == file {
        print_warning(OVERWRITE_WARNING);
    }

    let spinner = create_spinner(&format!("Converting {}", file));
    let result = convert_dta(input, Path::new(&output), settings.target_version);
    spinner.finish_and_clear();
    let report = result?;

    if report.repaired {
        print_warning(&format!(
            "+ Warning: text in {} was transliterated to ASCII for Stata {}.",
            file, settings.target_version
        ));
    }
    if settings.verbose {
        print_converted(&report);
    }
    summary.record_success(report);
    Ok(())
}

fn convert_batch(files: &[String], settings: &Settings, summary: &mut ConversionSummary) {
    let policy = if settings.policy.explicit_output.is_some() {
        print_warning("+ Warning: --output applies to single file conversions only and is ignored.");
        ConversionPolicy {
            explicit_output: None,
            ..settings.policy.clone()
        }
    } else {
        settings.policy.clone()
    };

    let pb = create_progress_bar(files.len() as u64, "Converting");
    for file in files {
        let outcome = batch_output(file, &policy, settings).and_then(|output| {
            if output == *file {
                pb.suspend(|| print_warning(OVERWRITE_WARNING));
            }
            convert_dta(Path::new(file), Path::new(&output), settings.target_version)
        });
        pb.suspend(|| match outcome {
            Ok(report) => {
                if report.repaired {
                    print_warning(&format!(
                        "+ Warning: text in {} was transliterated to ASCII for Stata {}.",
                        file, settings.target_version
                    ));
                }
                if settings.verbose {
                    print_converted(&report);
                }
                summary.record_success(report);
            }
            Err(err) => {
                debug!(file = %file, error = ?err, "conversion failed");
                print_error(&err.to_string());
                summary.record_failure(file, err.to_string());
            }
        });
        pb.inc(1);
    }
    pb.finish_and_clear();
}

/// Validates a batch input and resolves its destination.
fn batch_output(
    file: &str,
    policy: &ConversionPolicy,
    settings: &Settings,
) -> Result<String, ConvertError> {
    if !is_dta_file(Path::new(file)) {
        return Err(ConvertError::InvalidInputPath(file.to_string()));
    }
    resolve_output(file, policy, &settings.default_suffix)
}
