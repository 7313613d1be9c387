//! Character encoding of text stored in dta files.
//!
//! Releases up to 117 predate Unicode Stata and store text in the platform
//! codepage; Windows-1252 (a superset of Latin-1) is assumed. Releases 118+
//! store UTF-8.

use std::borrow::Cow;

use encoding_rs::WINDOWS_1252;

use super::{DtaError, Release};

/// Text codepage used by a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Windows1252,
    Utf8,
}

impl TextEncoding {
    pub fn for_release(release: Release) -> Self {
        if release.is_unicode() {
            TextEncoding::Utf8
        } else {
            TextEncoding::Windows1252
        }
    }

    /// Decodes a null-padded fixed-width field, stopping at the first null.
    pub fn decode_fixed(self, bytes: &[u8]) -> String {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        self.decode(&bytes[..end])
    }

    /// Decodes raw text bytes. Invalid UTF-8 is replaced, never rejected.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Windows1252 => WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
        }
    }

    /// Encodes text, reporting characters outside the codepage as
    /// `DtaError::EncodingIncompatible`.
    pub fn encode<'a>(
        self,
        text: &'a str,
        release: Release,
        context: impl FnOnce() -> String,
    ) -> Result<Cow<'a, [u8]>, DtaError> {
        match self {
            TextEncoding::Utf8 => Ok(Cow::Borrowed(text.as_bytes())),
            TextEncoding::Windows1252 => {
                let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
                if had_errors {
                    Err(DtaError::EncodingIncompatible {
                        release,
                        context: context(),
                        value: text.to_string(),
                    })
                } else {
                    Ok(bytes)
                }
            }
        }
    }
}

/// Truncates to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Truncates encoded text to at most `max_bytes` without splitting a UTF-8
/// sequence.
pub fn truncate_bytes(bytes: &[u8], max_bytes: usize, encoding: TextEncoding) -> &[u8] {
    if bytes.len() <= max_bytes {
        return bytes;
    }
    match encoding {
        TextEncoding::Windows1252 => &bytes[..max_bytes],
        TextEncoding::Utf8 => {
            let mut end = max_bytes;
            // Back off continuation bytes (10xxxxxx)
            while end > 0 && (bytes[end] & 0xC0) == 0x80 {
                end -= 1;
            }
            &bytes[..end]
        }
    }
}
