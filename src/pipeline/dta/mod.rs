//! Stata dta file format reader and writer.
//!
//! Reads dta releases 113-119 into Polars DataFrames and writes DataFrames
//! back out as releases 114, 117, 118 or 119, carrying the dataset label,
//! variable labels, display formats and value labels across.
//!
//! # Module Structure
//!
//! - `constants` - Type codes, section tags, missing-value sentinels
//! - `error` - Error types for read and write failures
//! - `cursor` - Byte-order aware primitive reads
//! - `encoding` - Text codepage per release
//! - `header` - Header and variable descriptor parsing
//! - `names` - Legal variable and value label names per release
//! - `reader` - Data, strL and value label decoding
//! - `writer` - Encoding a dataset for a target release

pub mod constants;
pub mod cursor;
pub mod encoding;
pub mod error;
pub mod header;
pub mod names;
pub mod reader;
pub mod writer;

pub use error::DtaError;
pub use reader::DtaReader;
pub use writer::{write_dta, WriteOptions};

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use polars::prelude::*;

use self::constants::*;

/// A dta format release (the `ds_format` / `<release>` number).
///
/// Stata 8-9 wrote 113, Stata 10-11 wrote 114, Stata 12 wrote 115,
/// Stata 13 wrote 117, Stata 14-18 write 118, and 119 is used when a
/// dataset has more than 32,767 variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Release {
    V113,
    V114,
    V115,
    V117,
    V118,
    V119,
}

impl Release {
    /// Looks up a release by its on-disk number.
    pub fn from_code(code: u16) -> Option<Release> {
        match code {
            113 => Some(Release::V113),
            114 => Some(Release::V114),
            115 => Some(Release::V115),
            117 => Some(Release::V117),
            118 => Some(Release::V118),
            119 => Some(Release::V119),
            _ => None,
        }
    }

    /// The on-disk release number.
    pub fn code(self) -> u16 {
        match self {
            Release::V113 => 113,
            Release::V114 => 114,
            Release::V115 => 115,
            Release::V117 => 117,
            Release::V118 => 118,
            Release::V119 => 119,
        }
    }

    /// Releases 117+ use the tagged `<stata_dta>` layout.
    pub fn is_tagged(self) -> bool {
        self >= Release::V117
    }

    /// Releases 118+ store text as UTF-8.
    pub fn is_unicode(self) -> bool {
        self >= Release::V118
    }

    /// Only these releases can be written.
    pub fn is_writable(self) -> bool {
        matches!(
            self,
            Release::V114 | Release::V117 | Release::V118 | Release::V119
        )
    }

    /// Width of a variable name (and value label name) field, with its null.
    pub fn name_len(self) -> usize {
        if self.is_unicode() {
            129
        } else {
            33
        }
    }

    /// Width of a display format field.
    pub fn format_len(self) -> usize {
        match self {
            Release::V113 => 12,
            Release::V114 | Release::V115 | Release::V117 => 49,
            Release::V118 | Release::V119 => 57,
        }
    }

    /// Width of a variable label field, with its null.
    pub fn label_len(self) -> usize {
        if self.is_unicode() {
            321
        } else {
            81
        }
    }

    /// Longest fixed-width string type.
    pub fn max_str_width(self) -> usize {
        if self.is_tagged() {
            MAX_STR_WIDTH
        } else {
            LEGACY_MAX_STR_WIDTH
        }
    }

    /// Whether the release has the strL (long string) type.
    pub fn supports_strl(self) -> bool {
        self.is_tagged()
    }

    /// Largest number of variables the release can hold.
    pub fn max_variables(self) -> usize {
        if self == Release::V119 {
            MAX_VARIABLES_119
        } else {
            MAX_VARIABLES
        }
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Byte order of multi-byte numbers in a dta file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// LOHI / LSF
    Little,
    /// HILO / MSF
    Big,
}

/// Storage type of a dta variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    /// Fixed-width string of the given byte width.
    Str(u16),
    /// Long string stored in the `<strls>` section (117+).
    StrL,
    Byte,
    Int,
    Long,
    Float,
    Double,
}

impl VarType {
    /// Decodes a type code for the given release.
    pub fn from_code(code: u16, release: Release) -> Result<VarType, DtaError> {
        if release.is_tagged() {
            match code {
                1..=2045 => Ok(VarType::Str(code)),
                TYPE_STRL => Ok(VarType::StrL),
                TYPE_DOUBLE => Ok(VarType::Double),
                TYPE_FLOAT => Ok(VarType::Float),
                TYPE_LONG => Ok(VarType::Long),
                TYPE_INT => Ok(VarType::Int),
                TYPE_BYTE => Ok(VarType::Byte),
                _ => Err(DtaError::UnknownVariableType { code }),
            }
        } else {
            match code {
                1..=244 => Ok(VarType::Str(code)),
                c if c == LEGACY_TYPE_BYTE as u16 => Ok(VarType::Byte),
                c if c == LEGACY_TYPE_INT as u16 => Ok(VarType::Int),
                c if c == LEGACY_TYPE_LONG as u16 => Ok(VarType::Long),
                c if c == LEGACY_TYPE_FLOAT as u16 => Ok(VarType::Float),
                c if c == LEGACY_TYPE_DOUBLE as u16 => Ok(VarType::Double),
                _ => Err(DtaError::UnknownVariableType { code }),
            }
        }
    }

    /// Encodes the type for the given release.
    pub fn code(self, release: Release) -> u16 {
        if release.is_tagged() {
            match self {
                VarType::Str(width) => width,
                VarType::StrL => TYPE_STRL,
                VarType::Byte => TYPE_BYTE,
                VarType::Int => TYPE_INT,
                VarType::Long => TYPE_LONG,
                VarType::Float => TYPE_FLOAT,
                VarType::Double => TYPE_DOUBLE,
            }
        } else {
            match self {
                VarType::Str(width) => width,
                // strL never reaches a legacy writer
                VarType::StrL => LEGACY_MAX_STR_WIDTH as u16,
                VarType::Byte => LEGACY_TYPE_BYTE as u16,
                VarType::Int => LEGACY_TYPE_INT as u16,
                VarType::Long => LEGACY_TYPE_LONG as u16,
                VarType::Float => LEGACY_TYPE_FLOAT as u16,
                VarType::Double => LEGACY_TYPE_DOUBLE as u16,
            }
        }
    }

    /// Bytes occupied by one cell of this type in the data section.
    pub fn width(self) -> usize {
        match self {
            VarType::Str(width) => width as usize,
            VarType::StrL => STRL_REF_LEN,
            VarType::Byte => 1,
            VarType::Int => 2,
            VarType::Long => 4,
            VarType::Float => 4,
            VarType::Double => 8,
        }
    }

    pub fn is_string(self) -> bool {
        matches!(self, VarType::Str(_) | VarType::StrL)
    }

    /// Display format Stata assigns to a new variable of this type.
    pub fn default_format(self) -> String {
        match self {
            VarType::Str(width) => format!("%{}s", width),
            VarType::StrL => FORMAT_STRL.to_string(),
            VarType::Byte => FORMAT_BYTE.to_string(),
            VarType::Int => FORMAT_INT.to_string(),
            VarType::Long => FORMAT_LONG.to_string(),
            VarType::Float => FORMAT_FLOAT.to_string(),
            VarType::Double => FORMAT_DOUBLE.to_string(),
        }
    }
}

/// Descriptor of one variable (column) in a dta file.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub var_type: VarType,
    /// Display format, e.g. `%9.0g` or `%td`.
    pub format: String,
    /// Name of the value label set attached to the variable, or empty.
    pub value_label: String,
    /// Variable label, or empty.
    pub label: String,
}

/// A named value label table mapping integer codes to text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueLabelSet {
    pub name: String,
    pub entries: Vec<(i32, String)>,
}

/// Everything in a dta file except the observations.
#[derive(Debug, Clone)]
pub struct DtaMetadata {
    pub release: Release,
    pub byte_order: ByteOrder,
    pub observation_count: u64,
    pub data_label: String,
    pub timestamp: String,
    pub variables: Vec<Variable>,
}

impl DtaMetadata {
    /// Column name to variable label, for every variable.
    pub fn variable_labels(&self) -> HashMap<String, String> {
        self.variables
            .iter()
            .map(|v| (v.name.clone(), v.label.clone()))
            .collect()
    }
}

/// A fully materialized dta dataset.
///
/// The frame holds the observations; `variables` keeps the per-column
/// storage details needed to write the data back faithfully.
#[derive(Debug, Clone)]
pub struct DtaDataset {
    pub release: Release,
    pub data_label: String,
    pub variables: Vec<Variable>,
    pub value_labels: Vec<ValueLabelSet>,
    pub frame: DataFrame,
}

impl DtaDataset {
    /// Wraps a frame with no dta metadata; storage types are inferred on write.
    pub fn from_frame(frame: DataFrame) -> Self {
        Self {
            release: Release::V118,
            data_label: String::new(),
            variables: Vec::new(),
            value_labels: Vec::new(),
            frame,
        }
    }

    /// Looks up the stored descriptor for a column.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Column name to variable label.
    pub fn variable_labels(&self) -> HashMap<String, String> {
        self.variables
            .iter()
            .map(|v| (v.name.clone(), v.label.clone()))
            .collect()
    }
}

/// Reads only the header and variable descriptors of a dta file.
pub fn read_dta_metadata(path: &Path) -> Result<DtaMetadata, DtaError> {
    Ok(DtaReader::open(path)?.metadata().clone())
}

/// Reads a complete dta file.
pub fn read_dta(path: &Path) -> Result<DtaDataset, DtaError> {
    DtaReader::open(path)?.read_dataset()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_round_trip_codes() {
        for code in [113u16, 114, 115, 117, 118, 119] {
            assert_eq!(Release::from_code(code).map(|r| r.code()), Some(code));
        }
        assert_eq!(Release::from_code(116), None);
        assert_eq!(Release::from_code(120), None);
    }

    #[test]
    fn test_release_layout_widths() {
        assert_eq!(Release::V113.format_len(), 12);
        assert_eq!(Release::V114.format_len(), 49);
        assert_eq!(Release::V118.format_len(), 57);
        assert_eq!(Release::V117.name_len(), 33);
        assert_eq!(Release::V118.name_len(), 129);
        assert_eq!(Release::V114.label_len(), 81);
        assert_eq!(Release::V119.label_len(), 321);
    }

    #[test]
    fn test_release_writability() {
        assert!(!Release::V113.is_writable());
        assert!(Release::V114.is_writable());
        assert!(!Release::V115.is_writable());
        assert!(Release::V117.is_writable());
        assert!(Release::V119.is_writable());
    }

    #[test]
    fn test_var_type_legacy_codes() {
        assert_eq!(VarType::from_code(251, Release::V114).unwrap(), VarType::Byte);
        assert_eq!(VarType::from_code(255, Release::V114).unwrap(), VarType::Double);
        assert_eq!(VarType::from_code(12, Release::V114).unwrap(), VarType::Str(12));
        assert!(VarType::from_code(245, Release::V114).is_err());
        assert_eq!(VarType::Long.code(Release::V114), 253);
    }

    #[test]
    fn test_var_type_tagged_codes() {
        assert_eq!(VarType::from_code(65530, Release::V117).unwrap(), VarType::Byte);
        assert_eq!(VarType::from_code(32768, Release::V118).unwrap(), VarType::StrL);
        assert_eq!(VarType::from_code(2045, Release::V118).unwrap(), VarType::Str(2045));
        assert!(VarType::from_code(2046, Release::V118).is_err());
        assert_eq!(VarType::Double.code(Release::V118), 65526);
    }

    #[test]
    fn test_default_formats() {
        assert_eq!(VarType::Str(14).default_format(), "%14s");
        assert_eq!(VarType::Double.default_format(), "%10.0g");
        assert_eq!(VarType::StrL.default_format(), "%9s");
    }
}
