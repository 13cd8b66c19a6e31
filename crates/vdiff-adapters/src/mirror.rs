//! Artifact source backed by a local mirror of the object store.
//!
//! Objects live at `<root>/<bucket>/<prefix>/<path>`. Fetching a prefix copies
//! its subtree into the build workspace.

use std::fs;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use url::Url;
use vdiff_core::{ArtifactSource, CoreResult};
use walkdir::WalkDir;

use crate::error::{AdapterError, AdapterResult};

/// Filesystem mirror of an artifact bucket.
#[derive(Debug, Clone)]
pub struct MirrorSource {
    bucket_dir: PathBuf,
    public_base_url: Option<Url>,
}

impl MirrorSource {
    /// Mirror rooted at `<root>/<bucket>`. File URLs use `public_base_url`
    /// when given, `file://` URLs otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Io`] if the root cannot be made absolute and
    /// [`AdapterError::InvalidUrl`] for a malformed base URL.
    pub fn new(root: &Path, bucket: &str, public_base_url: Option<&str>) -> AdapterResult<Self> {
        let bucket_dir = std::path::absolute(root.join(bucket))
            .map_err(|err| AdapterError::io("mirror.absolute_root", root, err))?;
        let public_base_url = public_base_url
            .map(|value| {
                Url::parse(value).map_err(|source| AdapterError::InvalidUrl {
                    field: "artifacts.public_base_url",
                    value: value.to_string(),
                    source,
                })
            })
            .transpose()?;
        Ok(Self {
            bucket_dir,
            public_base_url,
        })
    }

    /// Directory holding the bucket's objects.
    #[must_use]
    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    fn prefix_dir(&self, prefix: &str) -> AdapterResult<PathBuf> {
        let relative = Path::new(prefix.trim_matches('/'));
        let safe = !prefix.trim().is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(AdapterError::InvalidPrefix {
                prefix: prefix.to_string(),
            });
        }
        Ok(self.bucket_dir.join(relative))
    }
}

#[async_trait]
impl ArtifactSource for MirrorSource {
    async fn fetch(&self, prefix: &str, local_dir: &Path) -> CoreResult<()> {
        let source = self
            .prefix_dir(prefix)
            .map_err(|err| err.into_download(prefix))?;
        let target = local_dir.to_path_buf();
        let copied = tokio::task::spawn_blocking(move || copy_tree(&source, &target))
            .await
            .map_err(|source| AdapterError::Join { source }.into_download(prefix))?
            .map_err(|err| err.into_download(prefix))?;
        debug!(prefix, files = copied, "artifact prefix fetched");
        Ok(())
    }

    fn file_url(&self, prefix: &str, relative: &str) -> String {
        if let Some(base) = &self.public_base_url {
            return format!("{}/{prefix}{relative}", base.as_str().trim_end_matches('/'));
        }
        let path = self
            .bucket_dir
            .join(prefix.trim_matches('/'))
            .join(relative.trim_start_matches('/'));
        Url::from_file_path(&path)
            .map_or_else(|()| path.display().to_string(), String::from)
    }
}

fn copy_tree(source: &Path, destination: &Path) -> AdapterResult<usize> {
    if !source.is_dir() {
        return Err(AdapterError::MissingPrefix {
            path: source.to_path_buf(),
        });
    }
    fs::create_dir_all(destination)
        .map_err(|err| AdapterError::io("mirror.create_destination", destination, err))?;

    let mut copied = 0;
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|err| AdapterError::Walkdir {
            operation: "mirror.walk_prefix",
            path: source.to_path_buf(),
            source: err,
        })?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|err| AdapterError::io("mirror.create_dir", &target, err))?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|err| AdapterError::io("mirror.create_dir", parent, err))?;
            }
            fs::copy(entry.path(), &target)
                .map_err(|err| AdapterError::io("mirror.copy_file", &target, err))?;
            copied += 1;
        }
    }
    Ok(copied)
}
