//! Watched-folder bookkeeping: which files have already been processed.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::IntakeError;

/// Image extensions picked up from the input directory.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Persisted set of processed file names.
///
/// Stored as a sorted, pretty-printed JSON array. Every insertion is
/// flushed to disk immediately.
#[derive(Debug, Clone)]
pub struct SeenLog {
    path: PathBuf,
    names: BTreeSet<String>,
}

impl SeenLog {
    /// Load the log at `path`.
    ///
    /// A missing file is an empty log. So is an unreadable or corrupt one,
    /// after a warning.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let names = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<String>>(&content) {
                Ok(names) => names.into_iter().collect(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Seen log is corrupt, starting empty");
                    BTreeSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Seen log is unreadable, starting empty");
                BTreeSet::new()
            }
        };

        debug!("Loaded {} seen file names from {}", names.len(), path.display());
        Self { path, names }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Record `name` and flush. Returns false if it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> Result<bool, IntakeError> {
        if !self.names.insert(name.into()) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Write the log to disk.
    pub fn save(&self) -> Result<(), IntakeError> {
        let names: Vec<&String> = self.names.iter().collect();
        let content = serde_json::to_string_pretty(&names)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        fs::write(&self.path, content).map_err(|source| io_error(&self.path, source))
    }
}

/// List image files in `dir` not yet recorded in `seen`, sorted by name.
///
/// Creates `dir` if it does not exist.
pub fn scan_new(dir: &Path, seen: &SeenLog) -> Result<Vec<PathBuf>, IntakeError> {
    fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|source| io_error(dir, source))? {
        let path = entry.map_err(|source| io_error(dir, source))?.path();
        if !path.is_file() || !is_image(&path) {
            continue;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if !seen.contains(&name) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// True if `path` has one of [`IMAGE_EXTENSIONS`], case-insensitively.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn io_error(path: &Path, source: std::io::Error) -> IntakeError {
    IntakeError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = SeenLog::load(dir.path().join("processed.json"));
        assert!(log.is_empty());
    }

    #[test]
    fn test_corrupt_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.json");
        fs::write(&path, "{not a list").unwrap();

        let log = SeenLog::load(&path);
        assert!(log.is_empty());
    }

    #[test]
    fn test_insert_flushes_sorted_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.json");

        let mut log = SeenLog::load(&path);
        assert!(log.insert("b.png").unwrap());
        assert!(log.insert("a.jpg").unwrap());
        assert!(!log.insert("a.jpg").unwrap());

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[\n  \"a.jpg\",\n  \"b.png\"\n]");

        let reloaded = SeenLog::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("b.png"));
    }

    #[test]
    fn test_scan_new_filters_seen_and_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("invoices");
        fs::create_dir_all(inbox.join("nested.png")).unwrap();
        for name in ["c.JPG", "a.png", "b.jpeg", "notes.txt", "done.png"] {
            fs::write(inbox.join(name), b"x").unwrap();
        }

        let mut log = SeenLog::load(dir.path().join("processed.json"));
        log.insert("done.png").unwrap();

        let found: Vec<String> = scan_new(&inbox, &log)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(found, vec!["a.png", "b.jpeg", "c.JPG"]);
    }

    #[test]
    fn test_scan_new_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("does/not/exist");

        let found = scan_new(&inbox, &SeenLog::load(dir.path().join("p.json"))).unwrap();

        assert!(found.is_empty());
        assert!(inbox.is_dir());
    }
}
