//! dta header and variable descriptor parsing.
//!
//! Both layouts end up in the same `DtaMetadata`; the section offsets the
//! reader needs afterwards are returned alongside it.

use std::io::{Read, Seek};

use tracing::debug;

use super::constants::*;
use super::cursor::DtaCursor;
use super::encoding::TextEncoding;
use super::{ByteOrder, DtaError, DtaMetadata, Release, VarType, Variable};

/// Where the row data and trailing sections start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionOffsets {
    /// First byte of the first observation.
    pub data: u64,
    /// Start of `<strls>` (tagged layout only).
    pub strls: Option<u64>,
    /// Start of the value label tables.
    pub value_labels: u64,
}

/// Parsed header plus section offsets.
#[derive(Debug, Clone)]
pub struct ParsedHeader {
    pub metadata: DtaMetadata,
    pub offsets: SectionOffsets,
}

/// Parses the dta header and variable descriptors.
///
/// Dispatches on the first byte: `<` opens the tagged layout of releases
/// 117+, anything else is the release number of the legacy layout.
///
/// # Errors
/// * `DtaError::UnsupportedRelease` - Release older than 113 or unknown
/// * `DtaError::Malformed` - Section tags or byte-order marker do not match
/// * `DtaError::UnknownVariableType` - Type code not defined for the release
/// * `DtaError::Io` - Truncated file or read failure
pub fn parse_header<R: Read + Seek>(cursor: &mut DtaCursor<R>) -> Result<ParsedHeader, DtaError> {
    cursor.seek_to(0)?;
    let first = cursor.read_u8()?;

    let parsed = if first == b'<' {
        cursor.seek_to(0)?;
        parse_tagged_header(cursor)?
    } else {
        parse_legacy_header(cursor, first)?
    };

    debug!(
        release = parsed.metadata.release.code(),
        variables = parsed.metadata.variables.len(),
        observations = parsed.metadata.observation_count,
        "parsed dta header"
    );

    Ok(parsed)
}

fn parse_legacy_header<R: Read + Seek>(
    cursor: &mut DtaCursor<R>,
    code: u8,
) -> Result<ParsedHeader, DtaError> {
    let release = match Release::from_code(code as u16) {
        Some(r) if !r.is_tagged() => r,
        _ => return Err(DtaError::UnsupportedRelease { code: code as u16 }),
    };

    let byte_order = match cursor.read_u8()? {
        LEGACY_HILO => ByteOrder::Big,
        LEGACY_LOHI => ByteOrder::Little,
        other => {
            return Err(DtaError::malformed(format!(
                "unknown byte order marker {:#04x}",
                other
            )))
        }
    };
    cursor.set_order(byte_order);

    let _filetype = cursor.read_u8()?;
    let _unused = cursor.read_u8()?;
    let nvar = cursor.read_u16()? as usize;
    let nobs = cursor.read_u32()? as u64;

    let encoding = TextEncoding::for_release(release);
    let data_label = encoding.decode_fixed(&cursor.read_bytes(LEGACY_DATA_LABEL_LEN)?);
    let timestamp = encoding.decode_fixed(&cursor.read_bytes(LEGACY_TIMESTAMP_LEN)?);

    let type_codes = cursor.read_bytes(nvar)?;
    let types = type_codes
        .iter()
        .map(|&c| VarType::from_code(c as u16, release))
        .collect::<Result<Vec<_>, _>>()?;

    let names = read_fixed_strings(cursor, nvar, release.name_len(), encoding)?;
    cursor.skip(((nvar + 1) * 2) as u64)?;
    let formats = read_fixed_strings(cursor, nvar, release.format_len(), encoding)?;
    let value_labels = read_fixed_strings(cursor, nvar, release.name_len(), encoding)?;
    let labels = read_fixed_strings(cursor, nvar, release.label_len(), encoding)?;

    skip_expansion_fields(cursor)?;

    let data = cursor.position()?;
    let row_len: u64 = types.iter().map(|t| t.width() as u64).sum();

    Ok(ParsedHeader {
        metadata: DtaMetadata {
            release,
            byte_order,
            observation_count: nobs,
            data_label,
            timestamp,
            variables: assemble_variables(types, names, formats, value_labels, labels),
        },
        offsets: SectionOffsets {
            data,
            strls: None,
            value_labels: data + nobs * row_len,
        },
    })
}

/// Skips the legacy expansion fields (characteristics), which end with a
/// zero type byte and a zero length.
fn skip_expansion_fields<R: Read + Seek>(cursor: &mut DtaCursor<R>) -> Result<(), DtaError> {
    loop {
        let data_type = cursor.read_u8()?;
        let len = cursor.read_u32()?;
        if data_type == 0 {
            if len != 0 {
                cursor.skip(len as u64)?;
            }
            return Ok(());
        }
        cursor.skip(len as u64)?;
    }
}

fn parse_tagged_header<R: Read + Seek>(cursor: &mut DtaCursor<R>) -> Result<ParsedHeader, DtaError> {
    cursor.expect_tag(TAG_STATA_DTA_OPEN)?;
    cursor.expect_tag(TAG_HEADER_OPEN)?;
    cursor.expect_tag(TAG_RELEASE_OPEN)?;
    let release_text = String::from_utf8_lossy(&cursor.read_bytes(3)?).into_owned();
    let code: u16 = release_text
        .parse()
        .map_err(|_| DtaError::malformed(format!("invalid release {:?}", release_text)))?;
    let release = match Release::from_code(code) {
        Some(r) if r.is_tagged() => r,
        _ => return Err(DtaError::UnsupportedRelease { code }),
    };
    cursor.expect_tag(TAG_RELEASE_CLOSE)?;

    cursor.expect_tag(TAG_BYTEORDER_OPEN)?;
    let order_text = cursor.read_bytes(3)?;
    let byte_order = if order_text == BYTEORDER_LSF.as_bytes() {
        ByteOrder::Little
    } else if order_text == BYTEORDER_MSF.as_bytes() {
        ByteOrder::Big
    } else {
        return Err(DtaError::malformed(format!(
            "unknown byte order {:?}",
            String::from_utf8_lossy(&order_text)
        )));
    };
    cursor.set_order(byte_order);
    cursor.expect_tag(TAG_BYTEORDER_CLOSE)?;

    cursor.expect_tag(TAG_K_OPEN)?;
    let nvar = if release == Release::V119 {
        cursor.read_u32()? as usize
    } else {
        cursor.read_u16()? as usize
    };
    cursor.expect_tag(TAG_K_CLOSE)?;

    cursor.expect_tag(TAG_N_OPEN)?;
    let nobs = if release == Release::V117 {
        cursor.read_u32()? as u64
    } else {
        cursor.read_u64()?
    };
    cursor.expect_tag(TAG_N_CLOSE)?;

    let encoding = TextEncoding::for_release(release);

    cursor.expect_tag(TAG_LABEL_OPEN)?;
    let label_len = if release == Release::V117 {
        cursor.read_u8()? as usize
    } else {
        cursor.read_u16()? as usize
    };
    let data_label = encoding.decode(&cursor.read_bytes(label_len)?);
    cursor.expect_tag(TAG_LABEL_CLOSE)?;

    cursor.expect_tag(TAG_TIMESTAMP_OPEN)?;
    let ts_len = cursor.read_u8()? as usize;
    let timestamp = encoding.decode(&cursor.read_bytes(ts_len)?);
    cursor.expect_tag(TAG_TIMESTAMP_CLOSE)?;
    cursor.expect_tag(TAG_HEADER_CLOSE)?;

    cursor.expect_tag(TAG_MAP_OPEN)?;
    let mut map = [0u64; MAP_ENTRIES];
    for slot in map.iter_mut() {
        *slot = cursor.read_u64()?;
    }
    cursor.expect_tag(TAG_MAP_CLOSE)?;

    cursor.seek_to(map[MAP_VARIABLE_TYPES])?;
    cursor.expect_tag(TAG_VARIABLE_TYPES_OPEN)?;
    let mut types = Vec::with_capacity(nvar);
    for _ in 0..nvar {
        types.push(VarType::from_code(cursor.read_u16()?, release)?);
    }
    cursor.expect_tag(TAG_VARIABLE_TYPES_CLOSE)?;

    cursor.seek_to(map[MAP_VARNAMES])?;
    cursor.expect_tag(TAG_VARNAMES_OPEN)?;
    let names = read_fixed_strings(cursor, nvar, release.name_len(), encoding)?;
    cursor.expect_tag(TAG_VARNAMES_CLOSE)?;

    cursor.seek_to(map[MAP_FORMATS])?;
    cursor.expect_tag(TAG_FORMATS_OPEN)?;
    let formats = read_fixed_strings(cursor, nvar, release.format_len(), encoding)?;
    cursor.expect_tag(TAG_FORMATS_CLOSE)?;

    cursor.seek_to(map[MAP_VALUE_LABEL_NAMES])?;
    cursor.expect_tag(TAG_VALUE_LABEL_NAMES_OPEN)?;
    let value_labels = read_fixed_strings(cursor, nvar, release.name_len(), encoding)?;
    cursor.expect_tag(TAG_VALUE_LABEL_NAMES_CLOSE)?;

    cursor.seek_to(map[MAP_VARIABLE_LABELS])?;
    cursor.expect_tag(TAG_VARIABLE_LABELS_OPEN)?;
    let labels = read_fixed_strings(cursor, nvar, release.label_len(), encoding)?;
    cursor.expect_tag(TAG_VARIABLE_LABELS_CLOSE)?;

    Ok(ParsedHeader {
        metadata: DtaMetadata {
            release,
            byte_order,
            observation_count: nobs,
            data_label,
            timestamp,
            variables: assemble_variables(types, names, formats, value_labels, labels),
        },
        offsets: SectionOffsets {
            data: map[MAP_DATA] + TAG_DATA_OPEN.len() as u64,
            strls: Some(map[MAP_STRLS]),
            value_labels: map[MAP_VALUE_LABELS],
        },
    })
}

fn read_fixed_strings<R: Read + Seek>(
    cursor: &mut DtaCursor<R>,
    count: usize,
    width: usize,
    encoding: TextEncoding,
) -> Result<Vec<String>, DtaError> {
    let block = cursor.read_bytes(count * width)?;
    Ok(block
        .chunks(width.max(1))
        .take(count)
        .map(|chunk| encoding.decode_fixed(chunk))
        .collect())
}

fn assemble_variables(
    types: Vec<VarType>,
    names: Vec<String>,
    formats: Vec<String>,
    value_labels: Vec<String>,
    labels: Vec<String>,
) -> Vec<Variable> {
    types
        .into_iter()
        .zip(names)
        .zip(formats)
        .zip(value_labels)
        .zip(labels)
        .map(|((((var_type, name), format), value_label), label)| Variable {
            name,
            var_type,
            format,
            value_label,
            label,
        })
        .collect()
}
