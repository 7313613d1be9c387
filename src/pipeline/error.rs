//! Errors raised by the conversion driver.

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::dta::DtaError;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input does not name an existing `.dta` file.
    #[error("{0} is not a valid path to a dta file.")]
    InvalidInputPath(String),

    #[error("Stata version {0} is not supported (choose 10-17)")]
    UnsupportedVersion(u32),

    /// Text could not be encoded for the target release, even after
    /// transliterating it to ASCII.
    #[error("cannot encode {path} for Stata {target_version}: {source}")]
    EncodingIncompatibility {
        path: PathBuf,
        target_version: u32,
        #[source]
        source: DtaError,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: DtaError,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: DtaError,
    },

    #[error("{0} has no file extension")]
    MissingExtension(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message() {
        let err = ConvertError::InvalidInputPath("dummy.dta".to_string());
        assert_eq!(err.to_string(), "dummy.dta is not a valid path to a dta file.");
    }

    #[test]
    fn test_read_error_keeps_source() {
        let err = ConvertError::Read {
            path: PathBuf::from("a.dta"),
            source: DtaError::UnsupportedRelease { code: 108 },
        };
        assert!(err.to_string().starts_with("failed to read a.dta"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
