//! Converting a dta file to the release an older Stata can read.
//!
//! The driver reads the source's labels, reads the full dataset and writes it
//! at the target release. When the target's codepage cannot hold some text,
//! the dataset is read again, every text value is transliterated to ASCII and
//! the write is retried once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use any_ascii::any_ascii;
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::pipeline::dta::constants::MAX_LABEL_CHARS;
use crate::pipeline::dta::encoding::truncate_chars;
use crate::pipeline::dta::{
    read_dta, read_dta_metadata, write_dta, DtaDataset, DtaError, DtaMetadata, Release,
    WriteOptions,
};
use crate::pipeline::error::ConvertError;
use crate::pipeline::versions::format_revision;

/// Reading and writing of dta files, as used by the conversion driver.
pub trait DtaCodec {
    /// Header, variable descriptors and labels, without the observations.
    fn read_metadata(&self, path: &Path) -> Result<DtaMetadata, DtaError>;

    fn read_dataset(&self, path: &Path) -> Result<DtaDataset, DtaError>;

    /// Writes the dataset and returns the release actually written.
    fn write_dataset(
        &self,
        path: &Path,
        dataset: &DtaDataset,
        options: &WriteOptions,
    ) -> Result<Release, DtaError>;
}

/// The crate's own dta reader and writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

impl DtaCodec for NativeCodec {
    fn read_metadata(&self, path: &Path) -> Result<DtaMetadata, DtaError> {
        read_dta_metadata(path)
    }

    fn read_dataset(&self, path: &Path) -> Result<DtaDataset, DtaError> {
        read_dta(path)
    }

    fn write_dataset(
        &self,
        path: &Path,
        dataset: &DtaDataset,
        options: &WriteOptions,
    ) -> Result<Release, DtaError> {
        write_dta(path, dataset, options)
    }
}

/// Outcome of one successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub target_version: u32,
    /// Release written to `output`.
    pub release: Release,
    /// True when text had to be transliterated to ASCII.
    pub repaired: bool,
}

/// Converts `input` to a file Stata `target_version` can open, written to
/// `output`. `input` and `output` may be the same path.
pub fn convert_dta(
    input: &Path,
    output: &Path,
    target_version: u32,
) -> Result<ConversionReport, ConvertError> {
    convert_with(&NativeCodec, input, output, target_version)
}

/// `convert_dta` over an arbitrary codec.
pub fn convert_with<C: DtaCodec>(
    codec: &C,
    input: &Path,
    output: &Path,
    target_version: u32,
) -> Result<ConversionReport, ConvertError> {
    let revision = format_revision(target_version)?;
    let read_error = |source| ConvertError::Read {
        path: input.to_path_buf(),
        source,
    };

    let metadata = codec.read_metadata(input).map_err(read_error)?;
    let data_label = truncate_chars(&metadata.data_label, MAX_LABEL_CHARS).to_string();
    let variable_labels = truncate_labels(metadata.variable_labels());

    let dataset = codec.read_dataset(input).map_err(read_error)?;
    debug!(
        input = %input.display(),
        source_release = metadata.release.code(),
        rows = dataset.frame.height(),
        columns = dataset.frame.width(),
        "read dta file"
    );

    let mut options = WriteOptions {
        release: revision.release(),
        data_label: Some(data_label),
        variable_labels: Some(variable_labels),
        write_index: false,
        timestamp: None,
    };

    let report = |release, repaired| ConversionReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        target_version,
        release,
        repaired,
    };

    match codec.write_dataset(output, &dataset, &options) {
        Ok(release) => {
            info!(output = %output.display(), release = release.code(), "converted");
            return Ok(report(release, false));
        }
        Err(err) if err.is_encoding_incompatible() => {
            warn!(input = %input.display(), error = %err, "transliterating text to ASCII and retrying");
        }
        Err(source) => {
            return Err(ConvertError::Write {
                path: output.to_path_buf(),
                source,
            })
        }
    }
    drop(dataset);

    let dataset = codec.read_dataset(input).map_err(read_error)?;
    let dataset = transliterate_dataset(dataset).map_err(read_error)?;
    options.data_label = options.data_label.as_deref().map(any_ascii);
    options.variable_labels = options.variable_labels.map(|labels| {
        labels
            .into_iter()
            .map(|(name, label)| (name, any_ascii(&label)))
            .collect()
    });

    match codec.write_dataset(output, &dataset, &options) {
        Ok(release) => {
            info!(output = %output.display(), release = release.code(), "converted after transliteration");
            Ok(report(release, true))
        }
        Err(source) if source.is_encoding_incompatible() => {
            Err(ConvertError::EncodingIncompatibility {
                path: input.to_path_buf(),
                target_version,
                source,
            })
        }
        Err(source) => Err(ConvertError::Write {
            path: output.to_path_buf(),
            source,
        }),
    }
}

/// Clips every label to 80 characters.
pub fn truncate_labels(labels: HashMap<String, String>) -> HashMap<String, String> {
    labels
        .into_iter()
        .map(|(name, label)| {
            let label = truncate_chars(&label, MAX_LABEL_CHARS).to_string();
            (name, label)
        })
        .collect()
}

/// Replaces every text value with its ASCII transliteration.
///
/// String columns, the data label, variable labels and value label texts are
/// rewritten. Numeric columns and variable names are left as they are.
pub fn transliterate_dataset(mut dataset: DtaDataset) -> Result<DtaDataset, DtaError> {
    let columns = dataset
        .frame
        .get_columns()
        .iter()
        .map(|column| match column.as_materialized_series().str() {
            Ok(values) => {
                let ascii: StringChunked = values.into_iter().map(|v| v.map(any_ascii)).collect();
                ascii.with_name(column.name().clone()).into_series().into()
            }
            // not a text column
            Err(_) => column.clone(),
        })
        .collect::<Vec<Column>>();
    dataset.frame = DataFrame::new(columns)?;

    dataset.data_label = any_ascii(&dataset.data_label);
    for variable in &mut dataset.variables {
        variable.label = any_ascii(&variable.label);
    }
    for set in &mut dataset.value_labels {
        for (_, text) in &mut set.entries {
            *text = any_ascii(text);
        }
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::dta::{ValueLabelSet, VarType, Variable};

    fn sample_dataset() -> DtaDataset {
        let city = Series::new("city".into(), &["Zürich", "北京", "Oslo"]);
        let pop = Series::new("pop".into(), &[1i32, 2, 3]);
        let frame = DataFrame::new(vec![city.into(), pop.into()]).unwrap();
        let mut dataset = DtaDataset::from_frame(frame);
        dataset.data_label = "Städte".to_string();
        dataset.variables = vec![Variable {
            name: "city".to_string(),
            var_type: VarType::Str(6),
            format: "%9s".to_string(),
            value_label: String::new(),
            label: "Stadt – Name".to_string(),
        }];
        dataset.value_labels = vec![ValueLabelSet {
            name: "yn".to_string(),
            entries: vec![(1, "ja ✓".to_string())],
        }];
        dataset
    }

    #[test]
    fn test_transliterate_text_columns_only() {
        let dataset = transliterate_dataset(sample_dataset()).unwrap();
        let city: Vec<Option<&str>> = dataset
            .frame
            .column("city")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(city, vec![Some("Zurich"), Some("BeiJing"), Some("Oslo")]);

        let pop = dataset.frame.column("pop").unwrap();
        assert_eq!(pop.dtype(), &DataType::Int32);
    }

    #[test]
    fn test_transliterate_labels() {
        let dataset = transliterate_dataset(sample_dataset()).unwrap();
        assert_eq!(dataset.data_label, "Stadte");
        assert!(dataset.variables[0].label.is_ascii());
        assert!(dataset.value_labels[0].entries[0].1.is_ascii());
    }

    #[test]
    fn test_truncate_labels() {
        let mut labels = HashMap::new();
        labels.insert("a".to_string(), "x".repeat(120));
        labels.insert("b".to_string(), "short".to_string());
        let labels = truncate_labels(labels);
        assert_eq!(labels["a"].chars().count(), 80);
        assert_eq!(labels["b"], "short");
    }
}
