//! Level scanner
//!
//! Decides between single-file (free-form) mode and leveled mode, enumerates
//! level directories under the root, and lists candidate schema files in a
//! stable lexical order. The file order within a level is advisory; the
//! dependency resolver may override it for intra-level ordering. Read-only.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ResolveError, Result};
use crate::schema::SchemaFile;

/// Directory names encoding a dependency level, e.g. `level_2.0`.
static LEVEL_DIR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^level_([0-9]+)\.0$").expect("level pattern is valid"));

/// A level directory discovered by the scanner: paths only, parsed later.
#[derive(Debug, Clone)]
pub struct LevelDir {
    pub number: u32,
    pub dir: PathBuf,
    /// Candidate schema files, lexical by filename
    pub files: Vec<PathBuf>,
}

/// A dependency tier with its parsed schema files, in scan order.
#[derive(Debug)]
pub struct Level {
    pub number: u32,
    pub dir: PathBuf,
    pub files: Vec<SchemaFile>,
}

/// The scanner's mode decision for a root directory.
#[derive(Debug)]
pub enum ScanOutcome {
    /// No level subdirectories: single-file or free-form multi-file, no
    /// leveling structure and no namespace requirement.
    Flat(Vec<PathBuf>),
    /// One or more `level_<N>.0` subdirectories, sorted ascending by number.
    /// The sequence may be sparse; an empty level is a no-op.
    Leveled(Vec<LevelDir>),
}

/// Scan a root directory for schema files with the given extension.
pub fn scan(root: &Path, extension: &str) -> Result<ScanOutcome> {
    let mut level_dirs = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };
        if name.starts_with('.') {
            continue;
        }
        // Anything that looks like the leveling convention must parse
        // cleanly; a loose match with a bad numeric part is a user mistake,
        // not a directory to skip silently.
        if let Some(number) = parse_level_number(&path, name)? {
            let files = list_schema_files(&path, extension)?;
            if files.is_empty() {
                debug!(dir = %path.display(), "level directory is empty, treating as no-op");
            }
            level_dirs.push(LevelDir {
                number,
                dir: path,
                files,
            });
        }
    }

    if level_dirs.is_empty() {
        let files = list_schema_files_recursive(root, extension);
        debug!(root = %root.display(), count = files.len(), "no level directories, flat mode");
        return Ok(ScanOutcome::Flat(files));
    }

    level_dirs.sort_by_key(|l| l.number);
    for pair in level_dirs.windows(2) {
        if pair[0].number == pair[1].number {
            return Err(ResolveError::MalformedLevelName {
                dir: pair[1].dir.clone(),
                detail: format!(
                    "level {} is also claimed by {:?}",
                    pair[1].number, pair[0].dir
                ),
            });
        }
    }

    debug!(
        root = %root.display(),
        levels = level_dirs.len(),
        "leveled mode"
    );
    Ok(ScanOutcome::Leveled(level_dirs))
}

/// Parse the level number out of a directory name. Returns Ok(None) for
/// directories unrelated to the leveling convention.
fn parse_level_number(path: &Path, name: &str) -> Result<Option<u32>> {
    if !name.starts_with("level_") {
        return Ok(None);
    }
    let captures = LEVEL_DIR_PATTERN
        .captures(name)
        .ok_or_else(|| ResolveError::MalformedLevelName {
            dir: path.to_path_buf(),
            detail: "expected the form level_<N>.0".to_string(),
        })?;
    let number: u32 =
        captures[1]
            .parse()
            .map_err(|_| ResolveError::MalformedLevelName {
                dir: path.to_path_buf(),
                detail: format!("level number {:?} does not fit in u32", &captures[1]),
            })?;
    if number == 0 {
        return Err(ResolveError::MalformedLevelName {
            dir: path.to_path_buf(),
            detail: "level numbers start at 1".to_string(),
        });
    }
    Ok(Some(number))
}

/// List schema files directly inside a level directory, lexical by filename.
/// Nested directories are not supported inside a level and are skipped.
fn list_schema_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            debug!(entry = %path.display(), "skipping non-file entry, nesting not supported");
            continue;
        }
        if path.extension().map(|e| e == extension).unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Flat mode: collect schema files anywhere under the root, in a stable
/// walk order.
fn list_schema_files_recursive(root: &Path, extension: &str) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == extension)
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn touch(path: &Path, content: &str) {
        let mut f = File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_flat_mode_when_no_level_dirs() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.avsc"), "{}");
        touch(&dir.path().join("a.avsc"), "{}");
        touch(&dir.path().join("notes.txt"), "ignored");

        match scan(dir.path(), "avsc").unwrap() {
            ScanOutcome::Flat(files) => {
                let names: Vec<_> = files
                    .iter()
                    .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
                    .collect();
                assert_eq!(names, vec!["a.avsc", "b.avsc"]);
            }
            other => panic!("Expected Flat, got {:?}", other),
        }
    }

    #[test]
    fn test_leveled_mode_sorted_and_sparse() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("level_3.0")).unwrap();
        fs::create_dir(dir.path().join("level_1.0")).unwrap();
        touch(&dir.path().join("level_1.0").join("a.avsc"), "{}");
        touch(&dir.path().join("level_3.0").join("b.avsc"), "{}");

        match scan(dir.path(), "avsc").unwrap() {
            ScanOutcome::Leveled(levels) => {
                let numbers: Vec<u32> = levels.iter().map(|l| l.number).collect();
                assert_eq!(numbers, vec![1, 3]);
            }
            other => panic!("Expected Leveled, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_level_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("level_one.0")).unwrap();

        match scan(dir.path(), "avsc").unwrap_err() {
            ResolveError::MalformedLevelName { .. } => {}
            other => panic!("Expected MalformedLevelName, got {:?}", other),
        }
    }

    #[test]
    fn test_level_zero_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("level_0.0")).unwrap();

        match scan(dir.path(), "avsc").unwrap_err() {
            ResolveError::MalformedLevelName { detail, .. } => {
                assert!(detail.contains("start at 1"));
            }
            other => panic!("Expected MalformedLevelName, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_level_numbers_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("level_2.0")).unwrap();
        fs::create_dir(dir.path().join("level_02.0")).unwrap();

        match scan(dir.path(), "avsc").unwrap_err() {
            ResolveError::MalformedLevelName { detail, .. } => {
                assert!(detail.contains("also claimed"));
            }
            other => panic!("Expected MalformedLevelName, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_level_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("level_1.0")).unwrap();
        fs::create_dir(dir.path().join("level_2.0")).unwrap();
        touch(&dir.path().join("level_2.0").join("a.avsc"), "{}");

        match scan(dir.path(), "avsc").unwrap() {
            ScanOutcome::Leveled(levels) => {
                assert_eq!(levels.len(), 2);
                assert!(levels[0].files.is_empty());
                assert_eq!(levels[1].files.len(), 1);
            }
            other => panic!("Expected Leveled, got {:?}", other),
        }
    }
}
