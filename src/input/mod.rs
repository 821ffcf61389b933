//! Term list loading
//!
//! Reads the family names to search for, one per line.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::models::QueryTerm;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("failed to read term list {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("term list {} contains no terms", path.display())]
    Empty { path: PathBuf },
}

/// Parse terms from text: surrounding whitespace is trimmed, blank lines and
/// `#` comments are skipped, order is kept.
pub fn parse_terms(content: &str) -> Vec<QueryTerm> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(QueryTerm::parse)
        .collect()
}

/// Load a non-empty term list from a file
pub fn load_terms(path: impl AsRef<Path>) -> Result<Vec<QueryTerm>, InputError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let terms = parse_terms(&content);
    if terms.is_empty() {
        return Err(InputError::Empty {
            path: path.to_path_buf(),
        });
    }

    debug!("Loaded {} terms from {}", terms.len(), path.display());
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_terms() {
        let terms = parse_terms("SMITH\n  JONES  \n\n# comment\nde la Cruz\r\n");
        let names: Vec<_> = terms.iter().map(QueryTerm::as_str).collect();
        assert_eq!(names, vec!["SMITH", "JONES", "de la Cruz"]);
    }

    #[test]
    fn test_load_terms() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "SMITH").unwrap();
        writeln!(file, "JONES").unwrap();

        let terms = load_terms(file.path()).unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[1].as_str(), "JONES");
    }

    #[test]
    fn test_load_empty_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "   ").unwrap();
        writeln!(file, "# nothing").unwrap();

        let err = load_terms(file.path()).unwrap_err();
        assert!(matches!(err, InputError::Empty { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_terms("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, InputError::Io { .. }));
    }
}
