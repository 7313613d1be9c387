//! Reading observations, strLs and value labels from a dta file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use super::constants::*;
use super::cursor::{read_uint, DtaCursor};
use super::encoding::TextEncoding;
use super::header::{parse_header, ParsedHeader};
use super::{ByteOrder, DtaDataset, DtaError, DtaMetadata, Release, ValueLabelSet, VarType};

/// Key of a strL: variable number and observation number.
type StrlKey = (u64, u64);

/// A dta file opened for reading.
///
/// Opening parses only the header and variable descriptors, so labels and
/// variable names are available without touching the observations.
pub struct DtaReader<R = BufReader<File>> {
    cursor: DtaCursor<R>,
    header: ParsedHeader,
}

impl DtaReader<BufReader<File>> {
    /// Opens a dta file and parses its metadata.
    pub fn open(path: &Path) -> Result<Self, DtaError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> DtaReader<R> {
    /// Parses the metadata of a dta stream.
    pub fn from_reader(reader: R) -> Result<Self, DtaError> {
        let mut cursor = DtaCursor::new(reader, ByteOrder::Little);
        let header = parse_header(&mut cursor)?;
        Ok(Self { cursor, header })
    }

    pub fn metadata(&self) -> &DtaMetadata {
        &self.header.metadata
    }

    pub fn release(&self) -> Release {
        self.header.metadata.release
    }

    pub fn data_label(&self) -> &str {
        &self.header.metadata.data_label
    }

    /// Column name to variable label.
    pub fn variable_labels(&self) -> HashMap<String, String> {
        self.header.metadata.variable_labels()
    }

    /// Reads all observations and value labels.
    pub fn read_dataset(mut self) -> Result<DtaDataset, DtaError> {
        let meta = self.header.metadata.clone();
        let offsets = self.header.offsets;
        let encoding = TextEncoding::for_release(meta.release);

        let strls = match offsets.strls {
            Some(offset) if meta.variables.iter().any(|v| v.var_type == VarType::StrL) => {
                read_strls(&mut self.cursor, offset, meta.release, encoding)?
            }
            _ => HashMap::new(),
        };

        self.cursor.seek_to(offsets.data)?;
        let buffers = read_observations(&mut self.cursor, &meta, encoding)?;

        let value_labels = if meta.release.is_tagged() {
            read_tagged_value_labels(&mut self.cursor, offsets.value_labels, meta.release, encoding)?
        } else {
            read_legacy_value_labels(&mut self.cursor, offsets.value_labels, meta.release, encoding)?
        };

        let mut columns: Vec<Column> = Vec::with_capacity(meta.variables.len());
        for (variable, buffer) in meta.variables.iter().zip(buffers) {
            let series = buffer.into_series(&variable.name, &strls)?;
            columns.push(series.into());
        }
        let frame = DataFrame::new(columns)?;

        debug!(
            rows = frame.height(),
            columns = frame.width(),
            value_labels = value_labels.len(),
            "read dta observations"
        );

        Ok(DtaDataset {
            release: meta.release,
            data_label: meta.data_label,
            variables: meta.variables,
            value_labels,
            frame,
        })
    }
}

/// Per-column accumulator for decoded cells.
enum ColumnBuffer {
    Byte(Vec<Option<i8>>),
    Int(Vec<Option<i16>>),
    Long(Vec<Option<i32>>),
    Float(Vec<Option<f32>>),
    Double(Vec<Option<f64>>),
    Str(Vec<String>),
    StrL(Vec<StrlKey>),
}

impl ColumnBuffer {
    fn for_type(var_type: VarType, capacity: usize) -> Self {
        match var_type {
            VarType::Byte => ColumnBuffer::Byte(Vec::with_capacity(capacity)),
            VarType::Int => ColumnBuffer::Int(Vec::with_capacity(capacity)),
            VarType::Long => ColumnBuffer::Long(Vec::with_capacity(capacity)),
            VarType::Float => ColumnBuffer::Float(Vec::with_capacity(capacity)),
            VarType::Double => ColumnBuffer::Double(Vec::with_capacity(capacity)),
            VarType::Str(_) => ColumnBuffer::Str(Vec::with_capacity(capacity)),
            VarType::StrL => ColumnBuffer::StrL(Vec::with_capacity(capacity)),
        }
    }

    fn push(&mut self, cell: &[u8], order: ByteOrder, release: Release, encoding: TextEncoding) {
        match self {
            ColumnBuffer::Byte(values) => {
                let v = cell[0] as i8;
                values.push((v <= BYTE_MAX_VALID).then_some(v));
            }
            ColumnBuffer::Int(values) => {
                let v = read_uint(cell, order) as u16 as i16;
                values.push((v <= INT_MAX_VALID).then_some(v));
            }
            ColumnBuffer::Long(values) => {
                let v = read_uint(cell, order) as u32 as i32;
                values.push((v <= LONG_MAX_VALID).then_some(v));
            }
            ColumnBuffer::Float(values) => {
                let v = f32::from_bits(read_uint(cell, order) as u32);
                values.push((!is_missing_float(v)).then_some(v));
            }
            ColumnBuffer::Double(values) => {
                let v = f64::from_bits(read_uint(cell, order));
                values.push((!is_missing_double(v)).then_some(v));
            }
            ColumnBuffer::Str(values) => values.push(encoding.decode_fixed(cell)),
            ColumnBuffer::StrL(values) => values.push(decode_strl_ref(cell, order, release)),
        }
    }

    fn into_series(self, name: &str, strls: &HashMap<StrlKey, String>) -> Result<Series, DtaError> {
        let series = match self {
            ColumnBuffer::Byte(values) => {
                let ca: Int8Chunked = values.into_iter().collect();
                ca.with_name(name.into()).into_series()
            }
            ColumnBuffer::Int(values) => {
                let ca: Int16Chunked = values.into_iter().collect();
                ca.with_name(name.into()).into_series()
            }
            ColumnBuffer::Long(values) => {
                let ca: Int32Chunked = values.into_iter().collect();
                ca.with_name(name.into()).into_series()
            }
            ColumnBuffer::Float(values) => {
                let ca: Float32Chunked = values.into_iter().collect();
                ca.with_name(name.into()).into_series()
            }
            ColumnBuffer::Double(values) => {
                let ca: Float64Chunked = values.into_iter().collect();
                ca.with_name(name.into()).into_series()
            }
            ColumnBuffer::Str(values) => {
                let ca: StringChunked = values.iter().map(|s| Some(s.as_str())).collect();
                ca.with_name(name.into()).into_series()
            }
            ColumnBuffer::StrL(keys) => {
                let mut values = Vec::with_capacity(keys.len());
                for key in keys {
                    if key == (0, 0) {
                        values.push("");
                        continue;
                    }
                    let text = strls.get(&key).ok_or_else(|| {
                        DtaError::malformed(format!(
                            "strL ({}, {}) in column '{}' has no entry in <strls>",
                            key.0, key.1, name
                        ))
                    })?;
                    values.push(text.as_str());
                }
                let ca: StringChunked = values.into_iter().map(Some).collect();
                ca.with_name(name.into()).into_series()
            }
        };
        Ok(series)
    }
}

/// Splits an 8-byte strL cell into (variable, observation).
///
/// Release 117 uses 4 + 4 bytes, 118 uses 2 + 6 and 119 uses 3 + 5.
fn decode_strl_ref(cell: &[u8], order: ByteOrder, release: Release) -> StrlKey {
    let v_len = match release {
        Release::V118 => 2,
        Release::V119 => 3,
        _ => 4,
    };
    (
        read_uint(&cell[..v_len], order),
        read_uint(&cell[v_len..STRL_REF_LEN], order),
    )
}

fn read_observations<R: Read + Seek>(
    cursor: &mut DtaCursor<R>,
    meta: &DtaMetadata,
    encoding: TextEncoding,
) -> Result<Vec<ColumnBuffer>, DtaError> {
    let widths: Vec<usize> = meta.variables.iter().map(|v| v.var_type.width()).collect();
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Ok(Vec::new());
    }

    let remaining = cursor.remaining()?;
    let needed = meta.observation_count.checked_mul(row_len as u64);
    let nobs = match needed {
        Some(bytes) if bytes <= remaining => meta.observation_count as usize,
        _ => {
            return Err(DtaError::malformed(format!(
                "{} observations of {} bytes do not fit in the {} bytes left in the file",
                meta.observation_count, row_len, remaining
            )))
        }
    };
    let order = cursor.order();

    let mut buffers: Vec<ColumnBuffer> = meta
        .variables
        .iter()
        .map(|v| ColumnBuffer::for_type(v.var_type, nobs))
        .collect();

    let mut row = vec![0u8; row_len];
    for _ in 0..nobs {
        cursor.read_into(&mut row)?;
        let mut offset = 0;
        for (buffer, &width) in buffers.iter_mut().zip(&widths) {
            buffer.push(&row[offset..offset + width], order, meta.release, encoding);
            offset += width;
        }
    }

    Ok(buffers)
}

fn read_strls<R: Read + Seek>(
    cursor: &mut DtaCursor<R>,
    offset: u64,
    release: Release,
    encoding: TextEncoding,
) -> Result<HashMap<StrlKey, String>, DtaError> {
    cursor.seek_to(offset)?;
    cursor.expect_tag(TAG_STRLS_OPEN)?;

    let mut strls = HashMap::new();
    while cursor.peek_tag("GSO")? {
        cursor.skip(GSO_MARKER.len() as u64)?;
        let v = cursor.read_u32()? as u64;
        let o = if release == Release::V117 {
            cursor.read_u32()? as u64
        } else {
            cursor.read_u64()?
        };
        let kind = cursor.read_u8()?;
        let len = cursor.read_u32()? as usize;
        let mut content = cursor.read_bytes(len)?;
        if kind == GSO_TEXT && content.last() == Some(&0) {
            content.pop();
        }
        strls.insert((v, o), encoding.decode(&content));
    }

    cursor.expect_tag(TAG_STRLS_CLOSE)?;
    Ok(strls)
}

fn read_legacy_value_labels<R: Read + Seek>(
    cursor: &mut DtaCursor<R>,
    offset: u64,
    release: Release,
    encoding: TextEncoding,
) -> Result<Vec<ValueLabelSet>, DtaError> {
    cursor.seek_to(offset)?;
    let mut sets = Vec::new();
    loop {
        let len = match cursor.read_i32() {
            Ok(len) => len,
            Err(DtaError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        };
        let name = encoding.decode_fixed(&cursor.read_bytes(release.name_len())?);
        cursor.skip(3)?;
        let table = cursor.read_bytes(len.max(0) as usize)?;
        sets.push(parse_value_label_table(name, &table, cursor.order(), encoding)?);
    }
    Ok(sets)
}

fn read_tagged_value_labels<R: Read + Seek>(
    cursor: &mut DtaCursor<R>,
    offset: u64,
    release: Release,
    encoding: TextEncoding,
) -> Result<Vec<ValueLabelSet>, DtaError> {
    cursor.seek_to(offset)?;
    cursor.expect_tag(TAG_VALUE_LABELS_OPEN)?;
    let mut sets = Vec::new();
    while cursor.peek_tag(TAG_LBL_OPEN)? {
        cursor.expect_tag(TAG_LBL_OPEN)?;
        let len = cursor.read_i32()?;
        let name = encoding.decode_fixed(&cursor.read_bytes(release.name_len())?);
        cursor.skip(3)?;
        let table = cursor.read_bytes(len.max(0) as usize)?;
        sets.push(parse_value_label_table(name, &table, cursor.order(), encoding)?);
        cursor.expect_tag(TAG_LBL_CLOSE)?;
    }
    cursor.expect_tag(TAG_VALUE_LABELS_CLOSE)?;
    Ok(sets)
}

/// Decodes `n, txtlen, off[n], val[n], txt[txtlen]`.
fn parse_value_label_table(
    name: String,
    table: &[u8],
    order: ByteOrder,
    encoding: TextEncoding,
) -> Result<ValueLabelSet, DtaError> {
    let truncated = || DtaError::malformed(format!("value label table '{}' is truncated", name));
    let word = |at: usize| -> Option<u32> {
        table.get(at..at + 4).map(|b| read_uint(b, order) as u32)
    };

    let n = word(0).ok_or_else(truncated)? as usize;
    let txt_len = word(4).ok_or_else(truncated)? as usize;
    let txt_start = 8 + 8 * n;
    let text = table
        .get(txt_start..txt_start + txt_len)
        .ok_or_else(truncated)?;

    let mut entries = Vec::with_capacity(n);
    for i in 0..n {
        let off = word(8 + 4 * i).ok_or_else(truncated)? as usize;
        let value = word(8 + 4 * n + 4 * i).ok_or_else(truncated)? as i32;
        let label = text.get(off..).ok_or_else(truncated)?;
        entries.push((value, encoding.decode_fixed(label)));
    }

    Ok(ValueLabelSet { name, entries })
}
