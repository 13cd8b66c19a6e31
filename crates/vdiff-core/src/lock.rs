//! Per-fingerprint build lock.
//!
//! # Design
//! - A zero-byte `building.now` marker signals a running build; its
//!   modification time is the start time and it is written exactly once.
//! - Markers older than the staleness window are ignored, so a crashed build
//!   never blocks its fingerprint for longer than the window.
//! - An in-process claim registry closes the check-then-act window between
//!   tasks of one process. Across processes the marker check stays best-effort.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::location::WorkLocation;

/// Default staleness window for lock markers.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(10 * 60);

type Claims = Arc<Mutex<HashSet<String>>>;

/// Lock guard factory shared by every build in the process.
#[derive(Debug, Clone)]
pub struct BuildLock {
    stale_after: Duration,
    claims: Claims,
}

impl BuildLock {
    /// Lock honouring markers younger than `stale_after`.
    #[must_use]
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            claims: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Staleness window in effect.
    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Whether a fresh marker exists for the location. Stale markers report
    /// `false` and are left in place.
    #[must_use]
    pub fn is_building(&self, location: &WorkLocation) -> bool {
        let marker = location.lock_marker();
        let modified = match fs::metadata(marker).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(err) if err.kind() == ErrorKind::NotFound => return false,
            Err(err) => {
                warn!(
                    error = %err,
                    marker = %marker.display(),
                    "failed to inspect lock marker; treating build as idle"
                );
                return false;
            }
        };
        // A timestamp in the future (clock skew) counts as fresh.
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        age < self.stale_after
    }

    /// Acquire the lock: purge the workspace, recreate it and write a fresh
    /// marker.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateBuild`] when another task of this process
    /// holds the fingerprint or a fresh marker exists, and
    /// [`CoreError::Io`] when the workspace cannot be prepared.
    pub fn begin(&self, location: &WorkLocation) -> CoreResult<BuildLease> {
        let fingerprint = location.hash().to_string();
        {
            let mut claims = self.lock_claims();
            if claims.contains(&fingerprint) || self.is_building(location) {
                return Err(CoreError::DuplicateBuild { fingerprint });
            }
            claims.insert(fingerprint.clone());
        }

        if let Err(err) = prepare_workspace(location) {
            self.lock_claims().remove(&fingerprint);
            return Err(err);
        }

        debug!(fingerprint = %fingerprint, "build lock acquired");
        Ok(BuildLease {
            fingerprint,
            marker: location.lock_marker().to_path_buf(),
            claims: Arc::clone(&self.claims),
            released: false,
        })
    }

    fn lock_claims(&self) -> MutexGuard<'_, HashSet<String>> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BuildLock {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER)
    }
}

fn prepare_workspace(location: &WorkLocation) -> CoreResult<()> {
    let root = location.root();
    match fs::remove_dir_all(root) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(CoreError::io("lock.purge_workspace", root, err)),
    }
    fs::create_dir_all(root).map_err(|err| CoreError::io("lock.create_workspace", root, err))?;

    let marker = location.lock_marker();
    match OpenOptions::new().write(true).create_new(true).open(marker) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Err(CoreError::DuplicateBuild {
            fingerprint: location.hash().to_string(),
        }),
        Err(err) => Err(CoreError::io("lock.create_marker", marker, err)),
    }
}

/// Scoped ownership of a build lock. Releasing (explicitly or on drop)
/// removes the marker and the in-process claim.
#[derive(Debug)]
pub struct BuildLease {
    fingerprint: String,
    marker: PathBuf,
    claims: Claims,
    released: bool,
}

impl BuildLease {
    /// Fingerprint the lease guards.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Lock marker owned by the lease.
    #[must_use]
    pub fn marker(&self) -> &Path {
        &self.marker
    }

    /// Release the lock. The claim is dropped even when removing the marker
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the marker cannot be removed.
    pub fn release(mut self) -> CoreResult<()> {
        self.released = true;
        let result = remove_marker(&self.marker);
        self.drop_claim();
        debug!(fingerprint = %self.fingerprint, "build lock released");
        result
    }

    fn drop_claim(&self) {
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.fingerprint);
    }
}

impl Drop for BuildLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = remove_marker(&self.marker) {
            warn!(
                error = %err.detail(),
                fingerprint = %self.fingerprint,
                "failed to remove lock marker on drop"
            );
        }
        self.drop_claim();
    }
}

fn remove_marker(marker: &Path) -> CoreResult<()> {
    match fs::remove_file(marker) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(CoreError::io("lock.remove_marker", marker, err)),
    }
}
