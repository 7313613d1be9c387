//! Binary format constants for the Stata dta file format.
//!
//! Covers the pre-Stata-13 binary layout (releases 113, 114, 115) and the
//! tagged layout used from Stata 13 onwards (releases 117, 118, 119).

// ============================================================================
// Release 113-115 layout
// ============================================================================

/// Byte-order marker for big-endian (HILO) files in releases <= 115.
pub const LEGACY_HILO: u8 = 0x01;

/// Byte-order marker for little-endian (LOHI) files in releases <= 115.
pub const LEGACY_LOHI: u8 = 0x02;

/// Value of the `filetype` header byte. Always 1.
pub const LEGACY_FILETYPE: u8 = 0x01;

/// Width of the data label field, including its terminating null.
pub const LEGACY_DATA_LABEL_LEN: usize = 81;

/// Width of the timestamp field, including its terminating null.
pub const LEGACY_TIMESTAMP_LEN: usize = 18;

/// Legacy type codes. Codes 1..=244 denote `strN` of that width.
pub const LEGACY_TYPE_BYTE: u8 = 251;
pub const LEGACY_TYPE_INT: u8 = 252;
pub const LEGACY_TYPE_LONG: u8 = 253;
pub const LEGACY_TYPE_FLOAT: u8 = 254;
pub const LEGACY_TYPE_DOUBLE: u8 = 255;

// ============================================================================
// Release 117+ layout
// ============================================================================

pub const TAG_STATA_DTA_OPEN: &str = "<stata_dta>";
pub const TAG_STATA_DTA_CLOSE: &str = "</stata_dta>";
pub const TAG_HEADER_OPEN: &str = "<header>";
pub const TAG_HEADER_CLOSE: &str = "</header>";
pub const TAG_RELEASE_OPEN: &str = "<release>";
pub const TAG_RELEASE_CLOSE: &str = "</release>";
pub const TAG_BYTEORDER_OPEN: &str = "<byteorder>";
pub const TAG_BYTEORDER_CLOSE: &str = "</byteorder>";
pub const TAG_K_OPEN: &str = "<K>";
pub const TAG_K_CLOSE: &str = "</K>";
pub const TAG_N_OPEN: &str = "<N>";
pub const TAG_N_CLOSE: &str = "</N>";
pub const TAG_LABEL_OPEN: &str = "<label>";
pub const TAG_LABEL_CLOSE: &str = "</label>";
pub const TAG_TIMESTAMP_OPEN: &str = "<timestamp>";
pub const TAG_TIMESTAMP_CLOSE: &str = "</timestamp>";
pub const TAG_MAP_OPEN: &str = "<map>";
pub const TAG_MAP_CLOSE: &str = "</map>";
pub const TAG_VARIABLE_TYPES_OPEN: &str = "<variable_types>";
pub const TAG_VARIABLE_TYPES_CLOSE: &str = "</variable_types>";
pub const TAG_VARNAMES_OPEN: &str = "<varnames>";
pub const TAG_VARNAMES_CLOSE: &str = "</varnames>";
pub const TAG_SORTLIST_OPEN: &str = "<sortlist>";
pub const TAG_SORTLIST_CLOSE: &str = "</sortlist>";
pub const TAG_FORMATS_OPEN: &str = "<formats>";
pub const TAG_FORMATS_CLOSE: &str = "</formats>";
pub const TAG_VALUE_LABEL_NAMES_OPEN: &str = "<value_label_names>";
pub const TAG_VALUE_LABEL_NAMES_CLOSE: &str = "</value_label_names>";
pub const TAG_VARIABLE_LABELS_OPEN: &str = "<variable_labels>";
pub const TAG_VARIABLE_LABELS_CLOSE: &str = "</variable_labels>";
pub const TAG_CHARACTERISTICS_OPEN: &str = "<characteristics>";
pub const TAG_CHARACTERISTICS_CLOSE: &str = "</characteristics>";
pub const TAG_DATA_OPEN: &str = "<data>";
pub const TAG_DATA_CLOSE: &str = "</data>";
pub const TAG_STRLS_OPEN: &str = "<strls>";
pub const TAG_STRLS_CLOSE: &str = "</strls>";
pub const TAG_VALUE_LABELS_OPEN: &str = "<value_labels>";
pub const TAG_VALUE_LABELS_CLOSE: &str = "</value_labels>";
pub const TAG_LBL_OPEN: &str = "<lbl>";
pub const TAG_LBL_CLOSE: &str = "</lbl>";

/// Byte-order strings inside `<byteorder>`.
pub const BYTEORDER_MSF: &str = "MSF";
pub const BYTEORDER_LSF: &str = "LSF";

/// Number of 8-byte offsets stored in `<map>`.
pub const MAP_ENTRIES: usize = 14;

/// Indices into the `<map>` offset table.
pub const MAP_STATA_DATA: usize = 0;
pub const MAP_MAP: usize = 1;
pub const MAP_VARIABLE_TYPES: usize = 2;
pub const MAP_VARNAMES: usize = 3;
pub const MAP_SORTLIST: usize = 4;
pub const MAP_FORMATS: usize = 5;
pub const MAP_VALUE_LABEL_NAMES: usize = 6;
pub const MAP_VARIABLE_LABELS: usize = 7;
pub const MAP_CHARACTERISTICS: usize = 8;
pub const MAP_DATA: usize = 9;
pub const MAP_STRLS: usize = 10;
pub const MAP_VALUE_LABELS: usize = 11;
pub const MAP_STATA_DATA_CLOSE: usize = 12;
pub const MAP_END_OF_FILE: usize = 13;

/// Type codes for releases 117+. Codes 1..=2045 denote `strN` of that width.
pub const TYPE_STRL: u16 = 32768;
pub const TYPE_DOUBLE: u16 = 65526;
pub const TYPE_FLOAT: u16 = 65527;
pub const TYPE_LONG: u16 = 65528;
pub const TYPE_INT: u16 = 65529;
pub const TYPE_BYTE: u16 = 65530;

/// Marker opening every strL (GSO) entry in `<strls>`.
pub const GSO_MARKER: &[u8; 3] = b"GSO";

/// GSO content type: binary blob.
pub const GSO_BINARY: u8 = 129;

/// GSO content type: text stored with a trailing null.
pub const GSO_TEXT: u8 = 130;

/// Width of a strL reference cell in the data section.
pub const STRL_REF_LEN: usize = 8;

// ============================================================================
// Limits shared by all releases
// ============================================================================

/// Longest fixed-width string in releases <= 115.
pub const LEGACY_MAX_STR_WIDTH: usize = 244;

/// Longest fixed-width string in releases 117+.
pub const MAX_STR_WIDTH: usize = 2045;

/// Variable and data labels hold at most this many characters.
pub const MAX_LABEL_CHARS: usize = 80;

/// Variable count ceiling for every release except 119.
pub const MAX_VARIABLES: usize = 32_767;

/// Variable count ceiling for release 119.
pub const MAX_VARIABLES_119: usize = 120_000;

// ============================================================================
// Missing values
// ============================================================================

/// Largest non-missing `byte`. 101 is `.`, 102..=127 are `.a`..`.z`.
pub const BYTE_MAX_VALID: i8 = 100;
pub const BYTE_MIN_VALID: i8 = -127;
pub const BYTE_MISSING: i8 = 101;

/// Largest non-missing `int`. 32741 is `.`.
pub const INT_MAX_VALID: i16 = 32_740;
pub const INT_MIN_VALID: i16 = -32_767;
pub const INT_MISSING: i16 = 32_741;

/// Largest non-missing `long`. 2147483621 is `.`.
pub const LONG_MAX_VALID: i32 = 2_147_483_620;
pub const LONG_MIN_VALID: i32 = -2_147_483_647;
pub const LONG_MISSING: i32 = 2_147_483_621;

/// Bit pattern of the largest non-missing `float`.
pub const FLOAT_MAX_VALID_BITS: u32 = 0x7eff_ffff;

/// Bit pattern of the system missing `float` (`.`).
pub const FLOAT_MISSING_BITS: u32 = 0x7f00_0000;

/// Bit pattern of the largest non-missing `double`.
pub const DOUBLE_MAX_VALID_BITS: u64 = 0x7fdf_ffff_ffff_ffff;

/// Bit pattern of the system missing `double` (`.`).
pub const DOUBLE_MISSING_BITS: u64 = 0x7fe0_0000_0000_0000;

/// Returns true if a raw `float` value lies in Stata's missing range.
pub fn is_missing_float(value: f32) -> bool {
    value.is_nan() || value > f32::from_bits(FLOAT_MAX_VALID_BITS)
}

/// Returns true if a raw `double` value lies in Stata's missing range.
pub fn is_missing_double(value: f64) -> bool {
    value.is_nan() || value > f64::from_bits(DOUBLE_MAX_VALID_BITS)
}

// ============================================================================
// Default display formats
// ============================================================================

pub const FORMAT_BYTE: &str = "%8.0g";
pub const FORMAT_INT: &str = "%8.0g";
pub const FORMAT_LONG: &str = "%12.0g";
pub const FORMAT_FLOAT: &str = "%9.0g";
pub const FORMAT_DOUBLE: &str = "%10.0g";
pub const FORMAT_STRL: &str = "%9s";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_float_detection() {
        assert!(is_missing_float(f32::from_bits(FLOAT_MISSING_BITS)));
        assert!(is_missing_float(f32::NAN));
        assert!(!is_missing_float(1.5));
        assert!(!is_missing_float(f32::from_bits(FLOAT_MAX_VALID_BITS)));
    }

    #[test]
    fn test_missing_double_detection() {
        assert!(is_missing_double(f64::from_bits(DOUBLE_MISSING_BITS)));
        // .a is one step above system missing
        assert!(is_missing_double(f64::from_bits(DOUBLE_MISSING_BITS + 0x0000_0100_0000_0000)));
        assert!(!is_missing_double(-1.0e300));
        assert!(!is_missing_double(f64::from_bits(DOUBLE_MAX_VALID_BITS)));
    }
}
