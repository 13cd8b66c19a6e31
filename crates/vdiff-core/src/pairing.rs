//! Pair two local artifact trees by relative path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{CoreError, CoreResult};

/// A path present in both trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedFile {
    /// `/`-prefixed relative path.
    pub path: String,
    /// Absolute path in the actual tree.
    pub actual: PathBuf,
    /// Absolute path in the expect tree.
    pub expect: PathBuf,
}

/// Result of pairing the actual and expect trees. Every list is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairedTrees {
    /// Paths in both trees.
    pub common: Vec<PairedFile>,
    /// Paths only in the actual tree.
    pub new: Vec<String>,
    /// Paths only in the expect tree.
    pub deleted: Vec<String>,
}

/// Map every file below `root` to its absolute path, keyed by the
/// `/`-prefixed relative path with forward slashes.
///
/// # Errors
///
/// Returns [`CoreError::ArtifactsNotFound`] if `root` is not a directory and
/// [`CoreError::Walkdir`] if traversal fails.
pub fn scan_tree(root: &Path) -> CoreResult<BTreeMap<String, PathBuf>> {
    if !root.is_dir() {
        return Err(CoreError::ArtifactsNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|err| CoreError::walkdir("pairing.scan_tree", root, err))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        files.insert(relative_key(relative), entry.into_path());
    }
    Ok(files)
}

fn relative_key(relative: &Path) -> String {
    let mut key = String::new();
    for component in relative.components() {
        key.push('/');
        key.push_str(&component.as_os_str().to_string_lossy());
    }
    key
}

/// Compute common, new and deleted paths between the two trees.
///
/// # Errors
///
/// Returns [`CoreError::ArtifactsNotFound`] if either root is missing.
pub fn pair_trees(actual_root: &Path, expect_root: &Path) -> CoreResult<PairedTrees> {
    let actual = scan_tree(actual_root)?;
    let mut expect = scan_tree(expect_root)?;

    let mut paired = PairedTrees::default();
    for (path, actual_file) in actual {
        match expect.remove(&path) {
            Some(expect_file) => paired.common.push(PairedFile {
                path,
                actual: actual_file,
                expect: expect_file,
            }),
            None => paired.new.push(path),
        }
    }
    paired.deleted = expect.into_keys().collect();
    Ok(paired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdiff_test_support::TestResult;
    use vdiff_test_support::fixtures::temp_dir;
    use vdiff_test_support::tree::TreeBuilder;

    #[test]
    fn scan_tree_keys_files_by_relative_path() -> TestResult {
        let dir = temp_dir("pairing")?;
        let tree = TreeBuilder::new(dir.path().join("fake"))?;
        tree.files(&[("test1.txt", "text1"), ("data-dir/text2.txt", "text2")])?
            .dir("empty-dir")?;

        let files = scan_tree(tree.root())?;
        let keys: Vec<_> = files.keys().map(String::as_str).collect();
        assert_eq!(keys, ["/data-dir/text2.txt", "/test1.txt"]);
        assert_eq!(files["/test1.txt"], tree.path("test1.txt"));
        Ok(())
    }

    #[test]
    fn pairing_splits_common_new_and_deleted() -> TestResult {
        let dir = temp_dir("pairing")?;
        let actual = TreeBuilder::new(dir.path().join("actual"))?;
        actual.files(&[("x", "1"), ("y", "1")])?;
        let expect = TreeBuilder::new(dir.path().join("expect"))?;
        expect.files(&[("y", "2"), ("z", "2")])?;

        let paired = pair_trees(actual.root(), expect.root())?;
        assert_eq!(paired.common.len(), 1);
        assert_eq!(paired.common[0].path, "/y");
        assert_eq!(paired.common[0].actual, actual.path("y"));
        assert_eq!(paired.common[0].expect, expect.path("y"));
        assert_eq!(paired.new, ["/x"]);
        assert_eq!(paired.deleted, ["/z"]);
        Ok(())
    }

    #[test]
    fn empty_trees_pair_to_nothing() -> TestResult {
        let dir = temp_dir("pairing")?;
        let actual = TreeBuilder::new(dir.path().join("actual"))?;
        let expect = TreeBuilder::new(dir.path().join("expect"))?;
        assert_eq!(pair_trees(actual.root(), expect.root())?, PairedTrees::default());
        Ok(())
    }

    #[test]
    fn missing_root_is_reported() -> TestResult {
        let dir = temp_dir("pairing")?;
        let actual = TreeBuilder::new(dir.path().join("actual"))?;
        let missing = dir.path().join("expect");
        let err = pair_trees(actual.root(), &missing).expect_err("missing root");
        assert!(matches!(err, CoreError::ArtifactsNotFound { ref path } if *path == missing));
        Ok(())
    }
}
