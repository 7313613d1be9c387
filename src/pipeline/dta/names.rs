//! Legal variable and value label names per release.
//!
//! Releases before 118 accept names made of `[A-Za-z0-9_]` only, at most 32
//! bytes long and not starting with a digit. Names that break these rules are
//! transliterated to ASCII, cleaned up and de-duplicated before writing.
//! Unicode releases keep names unchanged.

use std::collections::{HashMap, HashSet};

use any_ascii::any_ascii;

use super::Release;

/// Original name to the name written to the file.
#[derive(Debug, Clone, Default)]
pub struct NameMap {
    renamed: HashMap<String, String>,
}

impl NameMap {
    /// Builds the renaming for one namespace (variables or value labels).
    ///
    /// Names already legal keep their spelling and are reserved first, so a
    /// renamed name never takes the place of an untouched one.
    pub fn for_release<'a, I>(names: I, release: Release) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        if release.is_unicode() {
            return Self::default();
        }
        let limit = release.name_len() - 1;

        let mut seen = HashSet::new();
        let names: Vec<&str> = names.into_iter().filter(|n| seen.insert(*n)).collect();

        let mut used: HashSet<String> = names
            .iter()
            .filter(|n| is_legal_legacy_name(n, limit))
            .map(|n| n.to_string())
            .collect();

        let mut renamed = HashMap::new();
        for name in names {
            if is_legal_legacy_name(name, limit) {
                continue;
            }
            let base = legacy_name(name, limit);
            let written = unique_name(&base, limit, &used);
            used.insert(written.clone());
            renamed.insert(name.to_string(), written);
        }

        Self { renamed }
    }

    /// The name to write for `name`.
    pub fn get<'a>(&'a self, name: &'a str) -> &'a str {
        self.renamed.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Pairs of (original, written) for every name that changed.
    pub fn renamed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.renamed.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.renamed.is_empty()
    }
}

fn is_legal_legacy_name(name: &str, limit: usize) -> bool {
    !name.is_empty()
        && name.len() <= limit
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
        && !name.as_bytes()[0].is_ascii_digit()
}

/// Transliterates `name` and rewrites it into `[A-Za-z0-9_]`, clipped to
/// `limit` bytes.
pub fn legacy_name(name: &str, limit: usize) -> String {
    let mut cleaned: String = any_ascii(name)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() || cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        cleaned.insert(0, '_');
    }
    cleaned.truncate(limit);
    cleaned
}

/// `base`, or `base` with a numeric suffix when that is already taken.
fn unique_name(base: &str, limit: usize, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| {
            let suffix = format!("_{}", n);
            let keep = limit.saturating_sub(suffix.len()).min(base.len());
            format!("{}{}", &base[..keep], suffix)
        })
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}
