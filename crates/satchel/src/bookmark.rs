//! Durable locators for resources outside the application's own storage.
//!
//! A [`BookmarkProvider`] turns a live [`ResourceHandle`] into an opaque
//! [`Locator`] that survives restarts, and resolves it back later. A locator
//! resolves with `stale = true` once the underlying resource has moved,
//! been renamed, or been replaced; callers must then re-prompt the user and
//! re-store a fresh locator. [`BookmarkRegistry`] pairs a provider with a
//! [`KeyValueStore`] so locators persist under caller-chosen keys.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{Json, Payload};
use crate::error::Error;
use crate::kv::KeyValueStore;

/// Live, accessible reference to an external file or folder. Valid only
/// inside an access scope; never persisted — persist the [`Locator`]
/// obtained from a provider instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    path: PathBuf,
}

impl ResourceHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a named entry inside this handle's folder.
    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

/// Opaque durable token issued by a [`BookmarkProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator(Vec<u8>);

impl Locator {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Outcome of resolving a locator. A stale handle is best-effort: the
/// resource may have moved since the locator was created, so callers must
/// not read or write through it without re-prompting.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub handle: ResourceHandle,
    pub stale: bool,
}

pub trait BookmarkProvider: Send + Sync {
    /// Issue a locator for a live handle. Fails when the resource cannot be
    /// reached or permission cannot be obtained.
    fn create(&self, handle: &ResourceHandle) -> Result<Locator, Error>;

    /// Resolve a locator back to a handle, flagging staleness.
    fn resolve(&self, locator: &Locator) -> Result<Resolved, Error>;
}

// ==============================================================================
// FsBookmarks
// ==============================================================================

/// Filesystem-backed provider. The locator records the path plus a file
/// identity fingerprint; resolution reports stale when the path is gone or
/// now names a different file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsBookmarks;

#[derive(Debug, Serialize, Deserialize)]
struct LocatorRecord {
    path: PathBuf,
    fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Fingerprint {
    device: u64,
    inode: u64,
}

#[cfg(unix)]
fn fingerprint_of(meta: &std::fs::Metadata) -> Fingerprint {
    use std::os::unix::fs::MetadataExt;
    Fingerprint {
        device: meta.dev(),
        inode: meta.ino(),
    }
}

#[cfg(not(unix))]
fn fingerprint_of(meta: &std::fs::Metadata) -> Fingerprint {
    // Creation time stands in for a stable identity where inodes are
    // unavailable; it survives renames but not replacement.
    let stamp = meta
        .created()
        .or_else(|_| meta.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    Fingerprint {
        device: 0,
        inode: stamp,
    }
}

impl BookmarkProvider for FsBookmarks {
    fn create(&self, handle: &ResourceHandle) -> Result<Locator, Error> {
        let meta = std::fs::metadata(handle.path())
            .map_err(|err| Error::from_io_at(handle.path(), err))?;
        let record = LocatorRecord {
            path: handle.path().to_path_buf(),
            fingerprint: fingerprint_of(&meta),
        };
        let bytes = Json(record).encode(false)?;
        Ok(Locator::from_bytes(bytes))
    }

    fn resolve(&self, locator: &Locator) -> Result<Resolved, Error> {
        let Json(record) = Json::<LocatorRecord>::decode(locator.as_bytes())?;
        let stale = match std::fs::metadata(&record.path) {
            Ok(meta) => fingerprint_of(&meta) != record.fingerprint,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
            Err(err) => return Err(Error::from_io_at(&record.path, err)),
        };
        debug!(path = %record.path.display(), stale, "resolved locator");
        Ok(Resolved {
            handle: ResourceHandle::new(record.path),
            stale,
        })
    }
}

// ==============================================================================
// BookmarkRegistry
// ==============================================================================

/// Provider plus key-value persistence: remember locators by key.
#[derive(Clone)]
pub struct BookmarkRegistry {
    provider: Arc<dyn BookmarkProvider>,
    store: Arc<dyn KeyValueStore>,
}

impl BookmarkRegistry {
    pub fn new(provider: Arc<dyn BookmarkProvider>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { provider, store }
    }

    pub fn create(&self, handle: &ResourceHandle) -> Result<Locator, Error> {
        self.provider.create(handle)
    }

    pub fn resolve(&self, locator: &Locator) -> Result<Resolved, Error> {
        self.provider.resolve(locator)
    }

    pub fn store(&self, key: &str, locator: &Locator) -> Result<(), Error> {
        self.store.set(key, locator.as_bytes())
    }

    pub fn load(&self, key: &str) -> Result<Locator, Error> {
        self.store.get(key).map(Locator::from_bytes)
    }

    /// Forget the locator stored under `key`; absent keys are a no-op.
    pub fn remove(&self, key: &str) -> Result<(), Error> {
        self.store.delete(key)
    }
}
