//! Builder for small artifact trees on disk.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::TestResult;

/// Writes files relative to a root directory.
///
/// Paths may be given with or without a leading `/`, matching the keys used
/// by directory pairing.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    root: PathBuf,
}

impl TreeBuilder {
    /// Start a tree at `root`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> TestResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of the tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a relative entry.
    #[must_use]
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }

    /// Write `contents` at `relative`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn file(&self, relative: &str, contents: impl AsRef<[u8]>) -> TestResult<&Self> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(self)
    }

    /// Write several files at once.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be written.
    pub fn files(&self, entries: &[(&str, &str)]) -> TestResult<&Self> {
        for (relative, contents) in entries {
            self.file(relative, contents)?;
        }
        Ok(self)
    }

    /// Create an empty directory at `relative`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn dir(&self, relative: &str) -> TestResult<&Self> {
        fs::create_dir_all(self.path(relative))?;
        Ok(self)
    }
}

/// Sorted `/`-prefixed relative paths of every file below `root`.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked.
pub fn list_files(root: &Path) -> TestResult<Vec<String>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root)?;
        let key = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        files.push(format!("/{key}"));
    }
    files.sort();
    Ok(files)
}
