//! Error types for dta file reading and writing.
//!
//! `DtaError` captures the failure modes of the codec: malformed or
//! unsupported files on the read side, and values that the requested
//! release cannot represent on the write side.

use std::fmt;

use super::Release;

/// Errors that can occur when reading or writing dta files.
#[derive(Debug)]
pub enum DtaError {
    /// The file declares a format release this codec does not handle.
    UnsupportedRelease {
        /// Release number found in (or requested for) the file
        code: u16,
    },

    /// The file structure does not match the dta layout.
    ///
    /// Raised for unexpected section tags, bad byte-order markers and
    /// dangling strL references.
    Malformed {
        /// Description of what was expected
        message: String,
    },

    /// A variable type code is not defined for the file's release.
    UnknownVariableType {
        /// Raw type code
        code: u16,
    },

    /// Text cannot be represented in the character encoding of the target
    /// release.
    ///
    /// Releases up to 117 store text in Windows-1252; any character outside
    /// that codepage triggers this error. Callers may transliterate and retry.
    EncodingIncompatible {
        /// Release being written
        release: Release,
        /// Where the offending text lives (column, label, ...)
        context: String,
        /// The offending text
        value: String,
    },

    /// A string value is longer than any string type the release supports.
    StringTooLong {
        /// Column holding the value
        column: String,
        /// Encoded length in bytes
        length: usize,
        /// Longest fixed-width string the release supports
        limit: usize,
    },

    /// A column name cannot be used as a Stata variable name.
    InvalidVariableName {
        /// Offending name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// A column's dtype has no dta storage type.
    UnsupportedColumnType {
        /// Column name
        column: String,
        /// Polars dtype, rendered
        dtype: String,
    },

    /// The dataset has more variables than the release allows.
    TooManyVariables {
        /// Number of variables in the dataset
        count: usize,
        /// Release ceiling
        limit: usize,
    },

    /// The dataset has more observations than the release can address.
    TooManyObservations {
        /// Number of rows in the dataset
        count: usize,
        /// Release being written
        release: Release,
    },

    /// Building or reading a polars frame failed.
    Polars(polars::error::PolarsError),

    /// I/O error occurred while reading or writing the file.
    Io(std::io::Error),
}

impl DtaError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        DtaError::Malformed {
            message: message.into(),
        }
    }

    /// Returns true for the encoding failure the conversion driver can repair.
    pub fn is_encoding_incompatible(&self) -> bool {
        matches!(self, DtaError::EncodingIncompatible { .. })
    }
}

impl fmt::Display for DtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DtaError::UnsupportedRelease { code } => {
                write!(f, "Unsupported dta format release {}", code)
            }
            DtaError::Malformed { message } => {
                write!(f, "Malformed dta file: {}", message)
            }
            DtaError::UnknownVariableType { code } => {
                write!(f, "Unknown dta variable type code {}", code)
            }
            DtaError::EncodingIncompatible {
                release,
                context,
                value,
            } => {
                write!(
                    f,
                    "{} value {:?} cannot be encoded for dta release {}",
                    context, value, release
                )
            }
            DtaError::StringTooLong {
                column,
                length,
                limit,
            } => {
                write!(
                    f,
                    "String in column '{}' is {} bytes long; fixed-width strings are limited to {} bytes",
                    column, length, limit
                )
            }
            DtaError::InvalidVariableName { name, reason } => {
                write!(f, "Invalid variable name '{}': {}", name, reason)
            }
            DtaError::UnsupportedColumnType { column, dtype } => {
                write!(
                    f,
                    "Column '{}' has dtype {} which cannot be stored in a dta file",
                    column, dtype
                )
            }
            DtaError::TooManyVariables { count, limit } => {
                write!(
                    f,
                    "Dataset has {} variables; the target release allows at most {}",
                    count, limit
                )
            }
            DtaError::TooManyObservations { count, release } => {
                write!(
                    f,
                    "Dataset has {} observations, too many for dta release {}",
                    count, release
                )
            }
            DtaError::Polars(err) => write!(f, "Polars error: {}", err),
            DtaError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for DtaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DtaError::Io(err) => Some(err),
            DtaError::Polars(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DtaError {
    fn from(err: std::io::Error) -> Self {
        DtaError::Io(err)
    }
}

impl From<polars::error::PolarsError> for DtaError {
    fn from(err: polars::error::PolarsError) -> Self {
        DtaError::Polars(err)
    }
}
