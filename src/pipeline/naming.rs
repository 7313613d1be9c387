//! File name normalization and output path resolution.
//!
//! Everything here is pure string manipulation; nothing touches the
//! filesystem.

use crate::pipeline::error::ConvertError;

/// Extension every input and output carries.
pub const DTA_EXTENSION: &str = "dta";

/// Suffix appended to converted files when nothing else is configured.
pub const DEFAULT_SUFFIX: &str = "-rbstata";

/// Suffix naming the target version, e.g. `-v13`.
pub fn version_suffix(target_version: u32) -> String {
    format!("-v{}", target_version)
}

/// How the destination of a conversion is chosen.
///
/// At most one strategy applies; `resolve_output` checks them in the order
/// overwrite, explicit output, suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionPolicy {
    /// Write over the input file.
    pub overwrite: bool,
    /// Insert this suffix before the extension.
    pub suffix: Option<String>,
    /// Destination name, used verbatim. Only meaningful for a single file.
    pub explicit_output: Option<String>,
}

/// Removes every whitespace character from a user-supplied file name and
/// optionally lower-cases it.
///
/// ```
/// use rbstata::pipeline::normalize;
/// assert_eq!(normalize("  my file.dta ", false), "myfile.dta");
/// assert_eq!(normalize("Auto.DTA", true), "auto.dta");
/// ```
pub fn normalize(raw: &str, lowercase: bool) -> String {
    let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if lowercase {
        stripped.to_lowercase()
    } else {
        stripped
    }
}

/// Appends `.dta` unless the name's extension is already exactly `dta`.
pub fn ensure_extension(name: &str) -> String {
    let file_name = file_name_component(name);
    match file_name.rsplit_once('.') {
        Some((_, ext)) if ext == DTA_EXTENSION => name.to_string(),
        _ => format!("{}.{}", name, DTA_EXTENSION),
    }
}

/// Inserts `suffix` between the stem and the extension of `file`.
///
/// The split happens at the first `.` of the final path component, so
/// `archive.tar.dta` becomes `archive<suffix>.tar.dta` and directories
/// containing dots are left alone.
///
/// # Errors
/// `ConvertError::MissingExtension` when the file name has no `.`.
pub fn insert_suffix(file: &str, suffix: &str) -> Result<String, ConvertError> {
    let name_start = file.len() - file_name_component(file).len();
    let (dir, name) = file.split_at(name_start);
    let (stem, rest) = name
        .split_once('.')
        .ok_or_else(|| ConvertError::MissingExtension(file.to_string()))?;
    Ok(format!("{}{}{}.{}", dir, stem, suffix, rest))
}

/// Computes the destination of converting `file` under `policy`.
pub fn resolve_output(
    file: &str,
    policy: &ConversionPolicy,
    default_suffix: &str,
) -> Result<String, ConvertError> {
    if policy.overwrite {
        return Ok(file.to_string());
    }
    if let Some(output) = &policy.explicit_output {
        return Ok(output.clone());
    }
    match &policy.suffix {
        Some(suffix) => insert_suffix(file, suffix),
        None => insert_suffix(file, default_suffix),
    }
}

fn file_name_component(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}
