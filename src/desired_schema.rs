//! Desired-schema loading (§6 "Desired-schema format").
//!
//! Files with suffix `.lp.sql` contain Postgres DDL. A directory argument is
//! a shallow scan of its top level (symlinks and subdirectories ignored)
//! with files concatenated in lexicographic order; each file's contents are
//! preceded by a `-- File: <path>` comment so diagnostics can point back. A
//! trailing newline is inserted between files if absent.
//!
//! Grounded in the teacher's `input::sql::SqlLoader` shallow-scan-and-sort
//! pattern, adapted from "one Schema per file" to "one concatenated source
//! document, parsed once" since the Parser (§4.2) operates over a single
//! source string and reports positions within it.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::parser::{self, ParseOutcome};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),
}

const EXTENSION: &str = "lp.sql";

/// Loads and concatenates `.lp.sql` sources from `paths`, then parses the
/// result as one document. Each path may be a file or a directory (shallow
/// scan, lexicographic order, symlinks ignored).
pub fn load(paths: &[PathBuf]) -> Result<ParseOutcome, LoadError> {
    let source = load_source(paths)?;
    Ok(parser::parse(&source))
}

/// Just the concatenation step, exposed separately so callers that want the
/// raw source text (e.g. to display alongside diagnostics) don't have to
/// re-implement the scan.
pub fn load_source(paths: &[PathBuf]) -> Result<String, LoadError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(collect_lp_sql_files(path)?);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(LoadError::NotFound(path.clone()));
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut document = String::new();
    for file in &files {
        let contents = std::fs::read_to_string(file).map_err(|source| LoadError::Io { path: file.clone(), source })?;
        document.push_str(&format!("-- File: {}\n", file.display()));
        document.push_str(&contents);
        if !contents.ends_with('\n') {
            document.push('\n');
        }
    }
    Ok(document)
}

fn collect_lp_sql_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io { path: dir.to_path_buf(), source })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io { path: dir.to_path_buf(), source })?;
        let path = entry.path();
        let is_symlink = entry.file_type().map(|t| t.is_symlink()).unwrap_or(false);
        if !is_symlink && path.is_file() && is_lp_sql_file(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

fn is_lp_sql_file(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).map(|n| n.ends_with(&format!(".{EXTENSION}"))).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn is_lp_sql_file_matches_suffix() {
        assert!(is_lp_sql_file(Path::new("001_tables.lp.sql")));
        assert!(!is_lp_sql_file(Path::new("001_tables.sql")));
        assert!(!is_lp_sql_file(Path::new("readme.md")));
    }

    #[test]
    fn single_file_is_prefixed_with_file_header() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.lp.sql");
        fs::write(&file_path, "CREATE TABLE t (id integer PRIMARY KEY);").unwrap();

        let doc = load_source(&[file_path.clone()]).unwrap();
        assert!(doc.starts_with(&format!("-- File: {}\n", file_path.display())));
        assert!(doc.contains("CREATE TABLE t"));
    }

    #[test]
    fn directory_scan_is_lexicographic_and_shallow() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("002_second.lp.sql"), "CREATE TABLE b (id integer);").unwrap();
        fs::write(dir.path().join("001_first.lp.sql"), "CREATE TABLE a (id integer);").unwrap();
        fs::write(dir.path().join("ignored.sql"), "CREATE TABLE c (id integer);").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("003_nested.lp.sql"), "CREATE TABLE d (id integer);").unwrap();

        let doc = load_source(&[dir.path().to_path_buf()]).unwrap();
        let first_pos = doc.find("CREATE TABLE a").unwrap();
        let second_pos = doc.find("CREATE TABLE b").unwrap();
        assert!(first_pos < second_pos);
        assert!(!doc.contains("CREATE TABLE c"));
        assert!(!doc.contains("CREATE TABLE d"));
    }

    #[test]
    fn trailing_newline_inserted_between_files_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.lp.sql"), "CREATE TABLE a (id integer);").unwrap();
        fs::write(dir.path().join("b.lp.sql"), "CREATE TABLE b (id integer);").unwrap();

        let doc = load_source(&[dir.path().to_path_buf()]).unwrap();
        assert!(doc.contains(";\n-- File:"));
    }

    #[test]
    fn nonexistent_path_is_an_error() {
        assert!(load_source(&[PathBuf::from("/nonexistent/path.lp.sql")]).is_err());
    }
}
