//! Writing a dataset as a dta file of a chosen release.
//!
//! The whole file is encoded in memory before the destination is opened, so
//! an encoding failure leaves an existing file (possibly the source itself)
//! untouched.

use std::collections::HashMap;
use std::path::Path;

use chrono::{Local, NaiveDateTime};
use polars::prelude::*;
use tracing::debug;

use super::constants::*;
use super::encoding::{truncate_bytes, truncate_chars, TextEncoding};
use super::names::NameMap;
use super::{DtaDataset, DtaError, Release, ValueLabelSet, VarType, Variable};

/// Options for `write_dta`.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Release to write. `None` lets the writer pick its newest release.
    pub release: Option<Release>,
    /// Dataset label. `None` keeps the dataset's own label.
    pub data_label: Option<String>,
    /// Column name to variable label. `None` keeps the dataset's labels.
    pub variable_labels: Option<HashMap<String, String>>,
    /// Prepend an `index` column numbering the observations from 0.
    pub write_index: bool,
    /// Header timestamp. `None` uses the current local time.
    pub timestamp: Option<NaiveDateTime>,
}

/// Release used when none is requested: 118, or 119 for very wide datasets.
pub fn default_release(variable_count: usize) -> Release {
    if variable_count > MAX_VARIABLES {
        Release::V119
    } else {
        Release::V118
    }
}

/// Writes `dataset` to `path` and returns the release written.
///
/// # Errors
/// * `DtaError::UnsupportedRelease` - Release 113 or 115 requested
/// * `DtaError::EncodingIncompatible` - Text outside the release's codepage
/// * `DtaError::StringTooLong` - String too long for release 114
/// * `DtaError::InvalidVariableName` - Column name empty or too long
/// * `DtaError::UnsupportedColumnType` - Column dtype has no dta storage type
/// * `DtaError::TooManyVariables` / `TooManyObservations` - Release limits
/// * `DtaError::Io` - Failure writing the destination
pub fn write_dta(
    path: &Path,
    dataset: &DtaDataset,
    options: &WriteOptions,
) -> Result<Release, DtaError> {
    let (release, bytes) = encode_dta(dataset, options)?;
    std::fs::write(path, bytes)?;
    Ok(release)
}

/// Encodes `dataset` into the bytes of a dta file.
pub fn encode_dta(
    dataset: &DtaDataset,
    options: &WriteOptions,
) -> Result<(Release, Vec<u8>), DtaError> {
    let frame = if options.write_index {
        with_index_column(&dataset.frame)?
    } else {
        dataset.frame.clone()
    };

    let release = options
        .release
        .unwrap_or_else(|| default_release(frame.width()));
    if !release.is_writable() {
        return Err(DtaError::UnsupportedRelease {
            code: release.code(),
        });
    }
    if frame.width() > release.max_variables() {
        return Err(DtaError::TooManyVariables {
            count: frame.width(),
            limit: release.max_variables(),
        });
    }
    if matches!(release, Release::V114 | Release::V117) && frame.height() > u32::MAX as usize {
        return Err(DtaError::TooManyObservations {
            count: frame.height(),
            release,
        });
    }

    let encoding = TextEncoding::for_release(release);
    let labels = options
        .variable_labels
        .clone()
        .unwrap_or_else(|| dataset.variable_labels());

    let var_names = NameMap::for_release(
        frame.get_column_names().into_iter().map(|n| n.as_str()),
        release,
    );
    let label_names = NameMap::for_release(
        dataset
            .value_labels
            .iter()
            .map(|set| set.name.as_str())
            .chain(dataset.variables.iter().map(|v| v.value_label.as_str()))
            .filter(|n| !n.is_empty()),
        release,
    );
    for (original, written) in var_names.renamed() {
        debug!(original, written, release = release.code(), "renamed variable");
    }

    let mut columns = Vec::with_capacity(frame.width());
    for column in frame.get_columns() {
        let name = column.name().as_str();
        columns.push(prepare_column(
            column.as_materialized_series(),
            var_names.get(name),
            dataset.variable(name),
            labels.get(name).map(String::as_str).unwrap_or(""),
            &label_names,
            release,
            encoding,
        )?);
    }

    let data_label = options.data_label.as_deref().unwrap_or(&dataset.data_label);
    let data_label = encode_label(data_label, release, encoding, || "data label".to_string())?;

    let value_labels = dataset
        .value_labels
        .iter()
        .map(|set| prepare_value_labels(set, label_names.get(&set.name), release, encoding))
        .collect::<Result<Vec<_>, _>>()?;

    let timestamp = options
        .timestamp
        .unwrap_or_else(|| Local::now().naive_local())
        .format("%d %b %Y %H:%M")
        .to_string();

    let layout = FileLayout {
        release,
        nobs: frame.height(),
        data_label,
        timestamp: timestamp.into_bytes(),
        columns,
        value_labels,
    };

    let bytes = if release.is_tagged() {
        layout.encode_tagged()
    } else {
        layout.encode_legacy()
    };

    debug!(
        release = release.code(),
        rows = layout.nobs,
        columns = layout.columns.len(),
        bytes = bytes.len(),
        "encoded dta file"
    );

    Ok((release, bytes))
}

fn with_index_column(frame: &DataFrame) -> Result<DataFrame, DtaError> {
    if frame.get_column_names().iter().any(|n| n.as_str() == "index") {
        return Err(DtaError::InvalidVariableName {
            name: "index".to_string(),
            reason: "an index column was requested but the dataset already has one".to_string(),
        });
    }
    let index: Int64Chunked = (0..frame.height() as i64).map(Some).collect();
    let mut columns: Vec<Column> = Vec::with_capacity(frame.width() + 1);
    columns.push(index.with_name("index".into()).into_series().into());
    columns.extend(frame.get_columns().iter().cloned());
    Ok(DataFrame::new(columns)?)
}

/// Encoded cells of one column, missing values already replaced by
/// Stata's system missing sentinel.
enum Cells {
    Byte(Vec<i8>),
    Int(Vec<i16>),
    Long(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Str(Vec<Vec<u8>>),
}

/// A column ready for serialization.
struct PreparedColumn {
    name: Vec<u8>,
    var_type: VarType,
    format: Vec<u8>,
    value_label: Vec<u8>,
    label: Vec<u8>,
    cells: Cells,
}

/// Prepares one column. `written_name` is the (possibly renamed) name stored
/// in the file; errors refer to the column's own name.
fn prepare_column(
    series: &Series,
    written_name: &str,
    stored: Option<&Variable>,
    label: &str,
    label_names: &NameMap,
    release: Release,
    encoding: TextEncoding,
) -> Result<PreparedColumn, DtaError> {
    let column = series.name().as_str();
    let name = encode_name(written_name, release, encoding)?;

    let (var_type, cells) = match series.dtype() {
        DataType::String => string_cells(series, stored, release, encoding)?,
        DataType::Float32 => {
            let missing = f32::from_bits(FLOAT_MISSING_BITS);
            let values = series
                .f32()?
                .into_iter()
                .map(|v| v.filter(|x| !is_missing_float(*x)).unwrap_or(missing))
                .collect();
            (VarType::Float, Cells::Float(values))
        }
        DataType::Float64 => {
            let missing = f64::from_bits(DOUBLE_MISSING_BITS);
            let values = series
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !is_missing_double(*x)).unwrap_or(missing))
                .collect();
            (VarType::Double, Cells::Double(values))
        }
        DataType::Boolean => integer_cells(
            series.bool()?.into_iter().map(|v| v.map(|b| b as i128)).collect(),
            VarType::Byte,
        ),
        DataType::Int8 => integer_cells(
            series.i8()?.into_iter().map(|v| v.map(i128::from)).collect(),
            VarType::Byte,
        ),
        DataType::Int16 => integer_cells(
            series.i16()?.into_iter().map(|v| v.map(i128::from)).collect(),
            VarType::Int,
        ),
        DataType::Int32 => integer_cells(
            series.i32()?.into_iter().map(|v| v.map(i128::from)).collect(),
            VarType::Long,
        ),
        DataType::Int64 => integer_cells(
            series.i64()?.into_iter().map(|v| v.map(i128::from)).collect(),
            VarType::Byte,
        ),
        DataType::UInt8 => integer_cells(
            series.u8()?.into_iter().map(|v| v.map(i128::from)).collect(),
            VarType::Byte,
        ),
        DataType::UInt16 => integer_cells(
            series.u16()?.into_iter().map(|v| v.map(i128::from)).collect(),
            VarType::Byte,
        ),
        DataType::UInt32 => integer_cells(
            series.u32()?.into_iter().map(|v| v.map(i128::from)).collect(),
            VarType::Byte,
        ),
        DataType::UInt64 => integer_cells(
            series.u64()?.into_iter().map(|v| v.map(i128::from)).collect(),
            VarType::Byte,
        ),
        other => {
            return Err(DtaError::UnsupportedColumnType {
                column: column.to_string(),
                dtype: other.to_string(),
            })
        }
    };

    let format = stored
        .filter(|v| same_format_family(v.var_type, var_type))
        .map(|v| v.format.clone())
        .filter(|f| !f.is_empty() && f.len() < release.format_len())
        .unwrap_or_else(|| var_type.default_format());

    let value_label = match stored {
        Some(v) if !var_type.is_string() && !v.value_label.is_empty() => {
            encode_name(label_names.get(&v.value_label), release, encoding)?
        }
        _ => Vec::new(),
    };

    let label = encode_label(label, release, encoding, || {
        format!("label of column '{}'", column)
    })?;

    Ok(PreparedColumn {
        name,
        var_type,
        format: format.into_bytes(),
        value_label,
        label,
        cells,
    })
}

/// Numeric formats carry over between numeric types; string formats only
/// when the storage type is unchanged.
fn same_format_family(stored: VarType, written: VarType) -> bool {
    match (stored.is_string(), written.is_string()) {
        (false, false) => true,
        (true, true) => stored == written,
        _ => false,
    }
}

fn integer_rank(var_type: VarType) -> u8 {
    match var_type {
        VarType::Byte => 0,
        VarType::Int => 1,
        VarType::Long => 2,
        _ => 3,
    }
}

/// Picks the narrowest integer storage holding every value, but never
/// narrower than the column's natural type.
fn integer_cells(values: Vec<Option<i128>>, natural: VarType) -> (VarType, Cells) {
    let (min, max) = values
        .iter()
        .flatten()
        .fold((0i128, 0i128), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let fitted = if min >= BYTE_MIN_VALID as i128 && max <= BYTE_MAX_VALID as i128 {
        VarType::Byte
    } else if min >= INT_MIN_VALID as i128 && max <= INT_MAX_VALID as i128 {
        VarType::Int
    } else if min >= LONG_MIN_VALID as i128 && max <= LONG_MAX_VALID as i128 {
        VarType::Long
    } else {
        VarType::Double
    };
    let var_type = if integer_rank(natural) > integer_rank(fitted) {
        natural
    } else {
        fitted
    };

    let cells = match var_type {
        VarType::Byte => Cells::Byte(
            values
                .iter()
                .map(|v| v.map(|x| x as i8).unwrap_or(BYTE_MISSING))
                .collect(),
        ),
        VarType::Int => Cells::Int(
            values
                .iter()
                .map(|v| v.map(|x| x as i16).unwrap_or(INT_MISSING))
                .collect(),
        ),
        VarType::Long => Cells::Long(
            values
                .iter()
                .map(|v| v.map(|x| x as i32).unwrap_or(LONG_MISSING))
                .collect(),
        ),
        _ => Cells::Double(
            values
                .iter()
                .map(|v| {
                    v.map(|x| x as f64)
                        .unwrap_or_else(|| f64::from_bits(DOUBLE_MISSING_BITS))
                })
                .collect(),
        ),
    };
    (var_type, cells)
}

fn string_cells(
    series: &Series,
    stored: Option<&Variable>,
    release: Release,
    encoding: TextEncoding,
) -> Result<(VarType, Cells), DtaError> {
    let column = series.name().as_str();
    let mut values = Vec::with_capacity(series.len());
    for value in series.str()?.into_iter() {
        let text = value.unwrap_or("");
        let bytes = encoding.encode(text, release, || format!("column '{}'", column))?;
        values.push(bytes.into_owned());
    }

    let needed = values.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let limit = release.max_str_width();

    let var_type = match stored.map(|v| v.var_type) {
        Some(VarType::StrL) if release.supports_strl() => VarType::StrL,
        Some(VarType::Str(width)) if (width as usize) >= needed && (width as usize) <= limit => {
            VarType::Str(width)
        }
        _ if needed <= limit => VarType::Str(needed as u16),
        _ if release.supports_strl() => VarType::StrL,
        _ => {
            return Err(DtaError::StringTooLong {
                column: column.to_string(),
                length: needed,
                limit,
            })
        }
    };

    Ok((var_type, Cells::Str(values)))
}

fn encode_name(name: &str, release: Release, encoding: TextEncoding) -> Result<Vec<u8>, DtaError> {
    if name.is_empty() {
        return Err(DtaError::InvalidVariableName {
            name: String::new(),
            reason: "name is empty".to_string(),
        });
    }
    let bytes = encoding.encode(name, release, || "variable name".to_string())?;
    let limit = release.name_len() - 1;
    if bytes.len() > limit {
        return Err(DtaError::InvalidVariableName {
            name: name.to_string(),
            reason: format!("longer than {} bytes for release {}", limit, release),
        });
    }
    Ok(bytes.into_owned())
}

/// Encodes a data or variable label, clipped to 80 characters and to the
/// release's field width.
fn encode_label(
    label: &str,
    release: Release,
    encoding: TextEncoding,
    context: impl FnOnce() -> String,
) -> Result<Vec<u8>, DtaError> {
    let label = truncate_chars(label, MAX_LABEL_CHARS);
    let bytes = encoding.encode(label, release, context)?;
    Ok(truncate_bytes(&bytes, release.label_len() - 1, encoding).to_vec())
}

/// A value label table ready for serialization.
struct PreparedValueLabels {
    name: Vec<u8>,
    table: Vec<u8>,
}

fn prepare_value_labels(
    set: &ValueLabelSet,
    written_name: &str,
    release: Release,
    encoding: TextEncoding,
) -> Result<PreparedValueLabels, DtaError> {
    let name = encode_name(written_name, release, encoding)?;

    let mut entries: Vec<&(i32, String)> = set.entries.iter().collect();
    entries.sort_by_key(|(value, _)| *value);

    let mut offsets = Vec::with_capacity(entries.len());
    let mut text = Vec::new();
    for (_, label) in &entries {
        offsets.push(text.len() as i32);
        let bytes = encoding.encode(label, release, || {
            format!("value label '{}'", set.name)
        })?;
        text.extend_from_slice(&bytes);
        text.push(0);
    }

    let mut sink = ByteSink::default();
    sink.put_i32(entries.len() as i32);
    sink.put_i32(text.len() as i32);
    for off in offsets {
        sink.put_i32(off);
    }
    for (value, _) in &entries {
        sink.put_i32(*value);
    }
    sink.put_bytes(&text);

    Ok(PreparedValueLabels {
        name,
        table: sink.into_inner(),
    })
}

/// Little-endian output buffer.
#[derive(Default)]
struct ByteSink {
    buf: Vec<u8>,
}

impl ByteSink {
    fn position(&self) -> usize {
        self.buf.len()
    }

    fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn put_tag(&mut self, tag: &str) {
        self.buf.extend_from_slice(tag.as_bytes());
    }

    /// Writes `bytes` into a null-padded field of exactly `width` bytes.
    fn put_fixed(&mut self, bytes: &[u8], width: usize) {
        let len = bytes.len().min(width);
        self.buf.extend_from_slice(&bytes[..len]);
        self.buf.resize(self.buf.len() + (width - len), 0);
    }

    fn put_zeros(&mut self, count: usize) {
        self.buf.resize(self.buf.len() + count, 0);
    }

    fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes the low `width` bytes of `v`.
    fn put_uint(&mut self, v: u64, width: usize) {
        self.buf.extend_from_slice(&v.to_le_bytes()[..width]);
    }

    fn patch_u64(&mut self, at: usize, v: u64) {
        self.buf[at..at + 8].copy_from_slice(&v.to_le_bytes());
    }
}

struct FileLayout {
    release: Release,
    nobs: usize,
    data_label: Vec<u8>,
    timestamp: Vec<u8>,
    columns: Vec<PreparedColumn>,
    value_labels: Vec<PreparedValueLabels>,
}

impl FileLayout {
    fn encode_legacy(&self) -> Vec<u8> {
        let release = self.release;
        let nvar = self.columns.len();
        let mut sink = ByteSink::default();

        sink.put_u8(release.code() as u8);
        sink.put_u8(LEGACY_LOHI);
        sink.put_u8(LEGACY_FILETYPE);
        sink.put_u8(0);
        sink.put_u16(nvar as u16);
        sink.put_u32(self.nobs as u32);
        sink.put_fixed(&self.data_label, LEGACY_DATA_LABEL_LEN);
        sink.put_fixed(&self.timestamp, LEGACY_TIMESTAMP_LEN);

        for col in &self.columns {
            sink.put_u8(col.var_type.code(release) as u8);
        }
        for col in &self.columns {
            sink.put_fixed(&col.name, release.name_len());
        }
        sink.put_zeros((nvar + 1) * 2);
        for col in &self.columns {
            sink.put_fixed(&col.format, release.format_len());
        }
        for col in &self.columns {
            sink.put_fixed(&col.value_label, release.name_len());
        }
        for col in &self.columns {
            sink.put_fixed(&col.label, release.label_len());
        }
        // Empty expansion field list
        sink.put_u8(0);
        sink.put_u32(0);

        let mut strls = ByteSink::default();
        self.encode_rows(&mut sink, &mut strls);

        for set in &self.value_labels {
            sink.put_i32(set.table.len() as i32);
            sink.put_fixed(&set.name, release.name_len());
            sink.put_zeros(3);
            sink.put_bytes(&set.table);
        }

        sink.into_inner()
    }

    fn encode_tagged(&self) -> Vec<u8> {
        let release = self.release;
        let nvar = self.columns.len();
        let mut sink = ByteSink::default();
        let mut map = [0u64; MAP_ENTRIES];

        map[MAP_STATA_DATA] = sink.position() as u64;
        sink.put_tag(TAG_STATA_DTA_OPEN);
        sink.put_tag(TAG_HEADER_OPEN);
        sink.put_tag(TAG_RELEASE_OPEN);
        sink.put_tag(&release.code().to_string());
        sink.put_tag(TAG_RELEASE_CLOSE);
        sink.put_tag(TAG_BYTEORDER_OPEN);
        sink.put_tag(BYTEORDER_LSF);
        sink.put_tag(TAG_BYTEORDER_CLOSE);

        sink.put_tag(TAG_K_OPEN);
        if release == Release::V119 {
            sink.put_u32(nvar as u32);
        } else {
            sink.put_u16(nvar as u16);
        }
        sink.put_tag(TAG_K_CLOSE);

        sink.put_tag(TAG_N_OPEN);
        if release == Release::V117 {
            sink.put_u32(self.nobs as u32);
        } else {
            sink.put_u64(self.nobs as u64);
        }
        sink.put_tag(TAG_N_CLOSE);

        sink.put_tag(TAG_LABEL_OPEN);
        if release == Release::V117 {
            sink.put_u8(self.data_label.len() as u8);
        } else {
            sink.put_u16(self.data_label.len() as u16);
        }
        sink.put_bytes(&self.data_label);
        sink.put_tag(TAG_LABEL_CLOSE);

        sink.put_tag(TAG_TIMESTAMP_OPEN);
        sink.put_u8(self.timestamp.len() as u8);
        sink.put_bytes(&self.timestamp);
        sink.put_tag(TAG_TIMESTAMP_CLOSE);
        sink.put_tag(TAG_HEADER_CLOSE);

        map[MAP_MAP] = sink.position() as u64;
        sink.put_tag(TAG_MAP_OPEN);
        let map_slots = sink.position();
        sink.put_zeros(MAP_ENTRIES * 8);
        sink.put_tag(TAG_MAP_CLOSE);

        map[MAP_VARIABLE_TYPES] = sink.position() as u64;
        sink.put_tag(TAG_VARIABLE_TYPES_OPEN);
        for col in &self.columns {
            sink.put_u16(col.var_type.code(release));
        }
        sink.put_tag(TAG_VARIABLE_TYPES_CLOSE);

        map[MAP_VARNAMES] = sink.position() as u64;
        sink.put_tag(TAG_VARNAMES_OPEN);
        for col in &self.columns {
            sink.put_fixed(&col.name, release.name_len());
        }
        sink.put_tag(TAG_VARNAMES_CLOSE);

        map[MAP_SORTLIST] = sink.position() as u64;
        sink.put_tag(TAG_SORTLIST_OPEN);
        let sort_width = if release == Release::V119 { 4 } else { 2 };
        sink.put_zeros((nvar + 1) * sort_width);
        sink.put_tag(TAG_SORTLIST_CLOSE);

        map[MAP_FORMATS] = sink.position() as u64;
        sink.put_tag(TAG_FORMATS_OPEN);
        for col in &self.columns {
            sink.put_fixed(&col.format, release.format_len());
        }
        sink.put_tag(TAG_FORMATS_CLOSE);

        map[MAP_VALUE_LABEL_NAMES] = sink.position() as u64;
        sink.put_tag(TAG_VALUE_LABEL_NAMES_OPEN);
        for col in &self.columns {
            sink.put_fixed(&col.value_label, release.name_len());
        }
        sink.put_tag(TAG_VALUE_LABEL_NAMES_CLOSE);

        map[MAP_VARIABLE_LABELS] = sink.position() as u64;
        sink.put_tag(TAG_VARIABLE_LABELS_OPEN);
        for col in &self.columns {
            sink.put_fixed(&col.label, release.label_len());
        }
        sink.put_tag(TAG_VARIABLE_LABELS_CLOSE);

        map[MAP_CHARACTERISTICS] = sink.position() as u64;
        sink.put_tag(TAG_CHARACTERISTICS_OPEN);
        sink.put_tag(TAG_CHARACTERISTICS_CLOSE);

        map[MAP_DATA] = sink.position() as u64;
        sink.put_tag(TAG_DATA_OPEN);
        let mut strls = ByteSink::default();
        self.encode_rows(&mut sink, &mut strls);
        sink.put_tag(TAG_DATA_CLOSE);

        map[MAP_STRLS] = sink.position() as u64;
        sink.put_tag(TAG_STRLS_OPEN);
        sink.put_bytes(&strls.into_inner());
        sink.put_tag(TAG_STRLS_CLOSE);

        map[MAP_VALUE_LABELS] = sink.position() as u64;
        sink.put_tag(TAG_VALUE_LABELS_OPEN);
        for set in &self.value_labels {
            sink.put_tag(TAG_LBL_OPEN);
            sink.put_i32(set.table.len() as i32);
            sink.put_fixed(&set.name, release.name_len());
            sink.put_zeros(3);
            sink.put_bytes(&set.table);
            sink.put_tag(TAG_LBL_CLOSE);
        }
        sink.put_tag(TAG_VALUE_LABELS_CLOSE);

        map[MAP_STATA_DATA_CLOSE] = sink.position() as u64;
        sink.put_tag(TAG_STATA_DTA_CLOSE);
        map[MAP_END_OF_FILE] = sink.position() as u64;

        for (i, offset) in map.iter().enumerate() {
            sink.patch_u64(map_slots + i * 8, *offset);
        }

        sink.into_inner()
    }

    /// Writes the observations row by row; strL contents go to `strls`.
    fn encode_rows(&self, sink: &mut ByteSink, strls: &mut ByteSink) {
        let release = self.release;
        let v_len = match release {
            Release::V118 => 2,
            Release::V119 => 3,
            _ => 4,
        };

        for row in 0..self.nobs {
            for (col_idx, col) in self.columns.iter().enumerate() {
                match &col.cells {
                    Cells::Byte(values) => sink.put_u8(values[row] as u8),
                    Cells::Int(values) => sink.put_bytes(&values[row].to_le_bytes()),
                    Cells::Long(values) => sink.put_bytes(&values[row].to_le_bytes()),
                    Cells::Float(values) => sink.put_bytes(&values[row].to_le_bytes()),
                    Cells::Double(values) => sink.put_bytes(&values[row].to_le_bytes()),
                    Cells::Str(values) => match col.var_type {
                        VarType::StrL => {
                            let text = &values[row];
                            if text.is_empty() {
                                sink.put_zeros(STRL_REF_LEN);
                                continue;
                            }
                            let v = (col_idx + 1) as u64;
                            let o = (row + 1) as u64;
                            sink.put_uint(v, v_len);
                            sink.put_uint(o, STRL_REF_LEN - v_len);

                            strls.put_bytes(GSO_MARKER);
                            strls.put_u32(v as u32);
                            if release == Release::V117 {
                                strls.put_u32(o as u32);
                            } else {
                                strls.put_u64(o);
                            }
                            strls.put_u8(GSO_TEXT);
                            strls.put_u32(text.len() as u32 + 1);
                            strls.put_bytes(text);
                            strls.put_u8(0);
                        }
                        _ => sink.put_fixed(&values[row], col.var_type.width()),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_release_by_width() {
        assert_eq!(default_release(10), Release::V118);
        assert_eq!(default_release(32_767), Release::V118);
        assert_eq!(default_release(32_768), Release::V119);
    }

    #[test]
    fn test_integer_cells_widen_to_fit() {
        let (var_type, _) = integer_cells(vec![Some(1), Some(100)], VarType::Byte);
        assert_eq!(var_type, VarType::Byte);

        let (var_type, _) = integer_cells(vec![Some(1), Some(101)], VarType::Byte);
        assert_eq!(var_type, VarType::Int);

        let (var_type, _) = integer_cells(vec![Some(40_000), None], VarType::Byte);
        assert_eq!(var_type, VarType::Long);

        let (var_type, _) = integer_cells(vec![Some(3_000_000_000)], VarType::Byte);
        assert_eq!(var_type, VarType::Double);
    }

    #[test]
    fn test_integer_cells_keep_natural_type() {
        let (var_type, cells) = integer_cells(vec![Some(1), None], VarType::Long);
        assert_eq!(var_type, VarType::Long);
        match cells {
            Cells::Long(values) => assert_eq!(values, vec![1, LONG_MISSING]),
            _ => panic!("expected long cells"),
        }
    }

    #[test]
    fn test_format_family() {
        assert!(same_format_family(VarType::Int, VarType::Double));
        assert!(same_format_family(VarType::Str(4), VarType::Str(4)));
        assert!(!same_format_family(VarType::Str(4), VarType::Str(8)));
        assert!(!same_format_family(VarType::Str(4), VarType::Byte));
    }

    #[test]
    fn test_put_fixed_pads_and_clips() {
        let mut sink = ByteSink::default();
        sink.put_fixed(b"ab", 4);
        sink.put_fixed(b"abcdef", 3);
        assert_eq!(sink.into_inner(), b"ab\0\0abc".to_vec());
    }

    #[test]
    fn test_encode_name_limits() {
        let long = "x".repeat(33);
        assert!(encode_name(&long, Release::V114, TextEncoding::Windows1252).is_err());
        assert!(encode_name(&long, Release::V118, TextEncoding::Utf8).is_ok());
        assert!(encode_name("", Release::V118, TextEncoding::Utf8).is_err());
    }

    #[test]
    fn test_legacy_release_writes_legal_names() {
        let frame = df!("prénom" => ["Ada"], "城市" => ["Zurich"]).unwrap();
        let options = WriteOptions {
            release: Some(Release::V117),
            ..Default::default()
        };
        let (_, bytes) = encode_dta(&DtaDataset::from_frame(frame), &options).unwrap();

        let start = find(&bytes, TAG_VARNAMES_OPEN.as_bytes()) + TAG_VARNAMES_OPEN.len();
        let name_len = Release::V117.name_len();
        assert_eq!(&bytes[start..start + 7], b"prenom\0");
        assert_eq!(&bytes[start + name_len..start + name_len + 9], b"ChengShi\0");
        assert!(bytes[start..start + 2 * name_len].is_ascii());
    }

    fn find(haystack: &[u8], needle: &[u8]) -> usize {
        haystack
            .windows(needle.len())
            .position(|w| w == needle)
            .unwrap()
    }

    #[test]
    fn test_encode_label_truncates_to_80_chars() {
        let label = "é".repeat(100);
        let bytes = encode_label(&label, Release::V118, TextEncoding::Utf8, String::new).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().chars().count(), 80);
    }

    #[test]
    fn test_value_label_table_layout() {
        let set = ValueLabelSet {
            name: "yesno".to_string(),
            entries: vec![(1, "yes".to_string()), (0, "no".to_string())],
        };
        let prepared = prepare_value_labels(&set, "yesno", Release::V118, TextEncoding::Utf8).unwrap();
        // n, txtlen, 2 offsets, 2 values, "no\0yes\0"
        assert_eq!(prepared.table.len(), 8 + 16 + 7);
        assert_eq!(&prepared.table[0..4], &2i32.to_le_bytes());
        assert_eq!(&prepared.table[4..8], &7i32.to_le_bytes());
        assert_eq!(&prepared.table[16..20], &0i32.to_le_bytes());
        assert_eq!(&prepared.table[24..], b"no\0yes\0");
    }
}
