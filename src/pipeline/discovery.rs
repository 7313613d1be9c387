//! Locating dta files on disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

use crate::pipeline::naming::DTA_EXTENSION;

/// True when `path` names an existing regular file with extension `dta`.
pub fn is_dta_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == DTA_EXTENSION)
}

/// Finds the dta files in `dir`, descending into subdirectories when
/// `recursive` is set. Results are sorted.
pub fn glob_dta_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let pattern = if recursive {
        dir.join("**").join(format!("*.{}", DTA_EXTENSION))
    } else {
        dir.join(format!("*.{}", DTA_EXTENSION))
    };
    let pattern = pattern.to_string_lossy().into_owned();

    let mut files = Vec::new();
    for entry in glob(&pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))? {
        let path = entry.context("Failed to read directory entry")?;
        if path.is_file() {
            files.push(path.strip_prefix("./").map(Path::to_path_buf).unwrap_or(path));
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_is_dta_file() {
        let dir = TempDir::new().unwrap();
        let dta = dir.path().join("a.dta");
        let csv = dir.path().join("a.csv");
        touch(&dta);
        touch(&csv);

        assert!(is_dta_file(&dta));
        assert!(!is_dta_file(&csv));
        assert!(!is_dta_file(&dir.path().join("missing.dta")));
        assert!(!is_dta_file(dir.path()));
    }

    #[test]
    fn test_uppercase_extension_is_not_dta() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("A.DTA");
        touch(&path);
        assert!(!is_dta_file(&path));
    }

    #[test]
    fn test_glob_shallow_and_recursive() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("b.dta"));
        touch(&dir.path().join("a.dta"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("sub").join("c.dta"));

        let shallow = glob_dta_files(dir.path(), false).unwrap();
        assert_eq!(
            shallow,
            vec![dir.path().join("a.dta"), dir.path().join("b.dta")]
        );

        let recursive = glob_dta_files(dir.path(), true).unwrap();
        assert_eq!(recursive.len(), 3);
        assert!(recursive.contains(&dir.path().join("sub").join("c.dta")));
    }
}
