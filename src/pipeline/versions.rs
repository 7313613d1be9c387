//! Mapping from Stata versions to dta format releases.

use crate::pipeline::dta::Release;
use crate::pipeline::error::ConvertError;

/// Stata versions a file can be converted to.
pub const SUPPORTED_VERSIONS: std::ops::RangeInclusive<u32> = 10..=17;

/// Format revision requested from the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRevision {
    /// A specific release.
    Release(Release),
    /// No particular release; the writer uses its newest one.
    Default,
}

impl FormatRevision {
    /// The release to request from the writer, `None` for the default.
    pub fn release(self) -> Option<Release> {
        match self {
            FormatRevision::Release(release) => Some(release),
            FormatRevision::Default => None,
        }
    }
}

/// Looks up the format revision Stata `target_version` reads natively.
///
/// Stata 10-12 read release 114, Stata 13 reads 117 and Stata 14 reads 118.
/// Stata 15-17 read anything the writer produces.
pub fn format_revision(target_version: u32) -> Result<FormatRevision, ConvertError> {
    match target_version {
        10..=12 => Ok(FormatRevision::Release(Release::V114)),
        13 => Ok(FormatRevision::Release(Release::V117)),
        14 => Ok(FormatRevision::Release(Release::V118)),
        15..=17 => Ok(FormatRevision::Default),
        other => Err(ConvertError::UnsupportedVersion(other)),
    }
}
