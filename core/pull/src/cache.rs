//! Two-tier release and payload cache.
//!
//! Release metadata and downloaded payloads are kept in memory for the
//! duration of a run and persisted under a cache root, one directory per
//! repository:
//!
//! ```text
//! <root>/
//!   <owner>/<repo>/
//!     release.json          # upstream object plus `fetched_at`
//!     asset.<asset_id>      # payload of a release asset
//!     tarball.<release_id>  # source snapshot of a release
//! ```
//!
//! Release metadata is fresh for one hour after `fetched_at`. Payloads are
//! bound to immutable ids and never expire.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;

use crate::errors::{PullError, Result};
use crate::release::{FETCHED_AT_KEY, Release};

/// Seconds a cached release stays fresh.
pub const RELEASE_TTL_SECS: i64 = 60 * 60;

/// File holding the cached release of a repository.
const RELEASE_FILE: &str = "release.json";

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can keep one handle and give
/// another to the cache.
#[derive(Debug, Clone)]
pub struct FixedClock {
    millis: Arc<AtomicI64>,
}

impl FixedClock {
    #[must_use]
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(at.timestamp_millis())),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: TimeDelta) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Identifies a cached payload within a repository directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKey {
    /// A release asset, by asset id.
    Asset(u64),
    /// The source snapshot of a release, by release id.
    Tarball(u64),
}

impl PayloadKey {
    #[must_use]
    pub fn file_name(self) -> String {
        match self {
            Self::Asset(id) => format!("asset.{id}"),
            Self::Tarball(id) => format!("tarball.{id}"),
        }
    }
}

/// In-memory map in front of an on-disk directory tree.
///
/// Writes go to disk first and then to memory. Reads check memory, then
/// disk, warming memory on a disk hit.
pub struct ReleaseCache {
    root: PathBuf,
    ttl: TimeDelta,
    clock: Box<dyn Clock>,
    releases: HashMap<(String, String), Release>,
    payloads: HashMap<PathBuf, Vec<u8>>,
}

impl fmt::Debug for ReleaseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseCache")
            .field("root", &self.root)
            .field("ttl", &self.ttl)
            .field("releases", &self.releases.len())
            .field("payloads", &self.payloads.len())
            .finish_non_exhaustive()
    }
}

impl ReleaseCache {
    /// Creates a cache rooted at `root` using the system clock.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_clock(root, SystemClock)
    }

    /// Creates a cache rooted at `root` reading time from `clock`.
    #[must_use]
    pub fn with_clock(root: impl Into<PathBuf>, clock: impl Clock + 'static) -> Self {
        Self {
            root: root.into(),
            ttl: TimeDelta::seconds(RELEASE_TTL_SECS),
            clock: Box::new(clock),
            releases: HashMap::new(),
            payloads: HashMap::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current time according to the cache's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn repo_dir(&self, owner: &str, repo: &str) -> PathBuf {
        self.root.join(owner).join(repo)
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
        self.now() - fetched_at < self.ttl
    }

    /// Returns the cached release of `owner/repo` if it is still fresh.
    ///
    /// A stale entry, or a disk entry without `fetched_at`, is a miss.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Fetch`] if `release.json` exists but cannot be
    /// read or parsed.
    pub fn get_release(&mut self, owner: &str, repo: &str) -> Result<Option<Release>> {
        let key = (owner.to_string(), repo.to_string());

        if let Some(release) = self.releases.get(&key) {
            if self.is_fresh(release.fetched_at) {
                tracing::debug!(owner, repo, "memory cache hit for release");
                return Ok(Some(release.clone()));
            }
            tracing::debug!(owner, repo, fetched_at = %release.fetched_at, "cached release expired");
            self.releases.remove(&key);
            return Ok(None);
        }

        let path = self.repo_dir(owner, repo).join(RELEASE_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            PullError::fetch_with_source(format!("failed to read {}", path.display()), e)
        })?;
        let raw: Value = serde_json::from_str(&content).map_err(|e| {
            PullError::fetch_with_source(format!("corrupt cache file {}", path.display()), e)
        })?;

        if raw.get(FETCHED_AT_KEY).is_none_or(Value::is_null) {
            tracing::debug!(owner, repo, "cached release has no timestamp");
            return Ok(None);
        }

        let release = Release::from_json(owner, repo, raw).map_err(|e| {
            PullError::fetch_with_source(format!("corrupt cache file {}", path.display()), e)
        })?;

        if !self.is_fresh(release.fetched_at) {
            tracing::debug!(owner, repo, fetched_at = %release.fetched_at, "cached release expired");
            return Ok(None);
        }

        tracing::debug!(owner, repo, "disk cache hit for release");
        self.releases.insert(key, release.clone());
        Ok(Some(release))
    }

    /// Stores a release, replacing any previous entry for its repository.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Fetch`] if the release cannot be written to disk.
    pub fn put_release(&mut self, release: Release) -> Result<()> {
        let dir = self.repo_dir(&release.owner, &release.repo);
        create_dir(&dir)?;

        let path = dir.join(RELEASE_FILE);
        let content = serde_json::to_string_pretty(release.to_json()).map_err(|e| {
            PullError::fetch_with_source(format!("failed to serialize {}", path.display()), e)
        })?;
        std::fs::write(&path, content).map_err(|e| {
            PullError::fetch_with_source(format!("failed to write {}", path.display()), e)
        })?;

        self.releases
            .insert((release.owner.clone(), release.repo.clone()), release);
        Ok(())
    }

    /// Returns a cached payload, regardless of its age.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Fetch`] if the payload file exists but cannot be read.
    pub fn get_payload(
        &mut self,
        owner: &str,
        repo: &str,
        key: PayloadKey,
    ) -> Result<Option<Vec<u8>>> {
        let path = self.repo_dir(owner, repo).join(key.file_name());

        if let Some(data) = self.payloads.get(&path) {
            tracing::debug!(owner, repo, payload = %key.file_name(), "memory cache hit for payload");
            return Ok(Some(data.clone()));
        }

        if !path.exists() {
            return Ok(None);
        }

        let data = std::fs::read(&path).map_err(|e| {
            PullError::fetch_with_source(format!("failed to read {}", path.display()), e)
        })?;
        tracing::debug!(owner, repo, payload = %key.file_name(), "disk cache hit for payload");
        self.payloads.insert(path, data.clone());
        Ok(Some(data))
    }

    /// Stores a payload.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Fetch`] if the payload cannot be written to disk.
    pub fn put_payload(
        &mut self,
        owner: &str,
        repo: &str,
        key: PayloadKey,
        data: Vec<u8>,
    ) -> Result<()> {
        let dir = self.repo_dir(owner, repo);
        create_dir(&dir)?;

        let path = dir.join(key.file_name());
        std::fs::write(&path, &data).map_err(|e| {
            PullError::fetch_with_source(format!("failed to write {}", path.display()), e)
        })?;

        self.payloads.insert(path, data);
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        PullError::fetch_with_source(format!("failed to create directory {}", dir.display()), e)
    })
}
