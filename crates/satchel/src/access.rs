//! Scoped access brackets for external resources.
//!
//! Platform access grants are modelled by the [`AccessBroker`] trait;
//! [`AccessScope`] is the RAII bracket that releases the grant on every
//! exit path, including unwinding. A handle must only be read or written
//! while a scope for it is alive.

use tracing::warn;

use crate::bookmark::ResourceHandle;
use crate::error::Error;

pub trait AccessBroker: Send + Sync {
    /// Obtain permission to operate on `handle`.
    fn acquire(&self, handle: &ResourceHandle) -> Result<(), Error>;

    /// Return a permission previously obtained from `acquire`.
    fn release(&self, handle: &ResourceHandle);
}

/// Live access bracket. Dropping the scope releases the grant exactly once.
pub struct AccessScope<'a> {
    broker: &'a dyn AccessBroker,
    handle: &'a ResourceHandle,
}

impl<'a> AccessScope<'a> {
    pub fn enter(
        broker: &'a dyn AccessBroker,
        handle: &'a ResourceHandle,
    ) -> Result<Self, Error> {
        broker.acquire(handle)?;
        Ok(Self { broker, handle })
    }

    pub fn handle(&self) -> &ResourceHandle {
        self.handle
    }
}

impl Drop for AccessScope<'_> {
    fn drop(&mut self) {
        self.broker.release(self.handle);
    }
}

/// Run `action` inside an access bracket for `handle`.
///
/// When acquisition is denied, `on_denied` is invoked, `action` never runs,
/// and the denial is returned. Otherwise the grant is released after
/// `action` finishes, whether it succeeds, fails, or unwinds.
pub fn with_access<T>(
    broker: &dyn AccessBroker,
    handle: &ResourceHandle,
    on_denied: impl FnOnce(&Error),
    action: impl FnOnce(&ResourceHandle) -> Result<T, Error>,
) -> Result<T, Error> {
    let scope = match AccessScope::enter(broker, handle) {
        Ok(scope) => scope,
        Err(err) => {
            warn!(path = %handle.path().display(), error = %err, "access denied");
            on_denied(&err);
            return Err(err);
        }
    };
    action(scope.handle())
}

// ==============================================================================
// FsAccessBroker
// ==============================================================================

/// Filesystem broker: acquisition probes the resource and maps permission
/// failures; POSIX holds no scoped grant, so release is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsAccessBroker;

impl AccessBroker for FsAccessBroker {
    fn acquire(&self, handle: &ResourceHandle) -> Result<(), Error> {
        std::fs::metadata(handle.path())
            .map(|_| ())
            .map_err(|err| Error::from_io_at(handle.path(), err))
    }

    fn release(&self, _handle: &ResourceHandle) {}
}
