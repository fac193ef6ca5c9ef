//! Key-value persistence behind the [`KeyValueStore`] trait.
//!
//! Two implementations ship: [`MemoryStore`] (shared in-memory state, the
//! fake the façade tests run against) and [`DiskStore`] (one file per key
//! under a root directory). Both are last-write-wins with no transactions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::codec::Payload;
use crate::error::Error;

pub trait KeyValueStore: Send + Sync {
    /// Overwrite any existing entry and persist immediately.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), Error>;

    /// Fetch the entry, or `Error::NotFound`.
    fn get(&self, key: &str) -> Result<Vec<u8>, Error>;

    /// Remove the entry; absent keys are a no-op.
    fn delete(&self, key: &str) -> Result<(), Error>;
}

/// Typed convenience over any store: encode/decode a [`Payload`] in place of
/// raw bytes.
pub trait KeyValueStoreExt: KeyValueStore {
    fn set_payload<P: Payload>(&self, key: &str, value: &P) -> Result<(), Error> {
        self.set(key, &value.encode(false)?)
    }

    fn get_payload<P: Payload>(&self, key: &str) -> Result<P, Error> {
        P::decode(&self.get(key)?).map_err(Error::from)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

// ==============================================================================
// MemoryStore
// ==============================================================================

/// In-memory store. Clones share the same entries, mirroring the
/// process-wide nature of the platform store it stands in for.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        self.lock().insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_owned()))
    }

    fn delete(&self, key: &str) -> Result<(), Error> {
        self.lock().remove(key);
        Ok(())
    }
}

// ==============================================================================
// DiskStore
// ==============================================================================

/// File-per-key store under a root directory. Keys are escaped into
/// filesystem-safe names; writes go through create-dir + write so the root
/// may be created lazily.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(escape_key(key))
    }
}

impl KeyValueStore for DiskStore {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.entry_path(key);
        std::fs::write(&path, value).map_err(|err| Error::from_io_at(&path, err))?;
        debug!(key, path = %path.display(), len = value.len(), "stored entry");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        let path = self.entry_path(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(key.to_owned()))
            }
            Err(err) => Err(Error::from_io_at(&path, err)),
        }
    }

    fn delete(&self, key: &str) -> Result<(), Error> {
        let path = self.entry_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::from_io_at(&path, err)),
        }
    }
}

/// Escape an opaque key into a single path component. Alphanumerics, `-`,
/// and `_` pass through; every other byte becomes `%XX`, so distinct keys
/// never collide and keys like `../x` cannot leave the root.
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
