use std::path::Path;

use crate::codec::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    PermissionDenied(String),

    #[error("file selection failed: {0}")]
    Picker(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map an I/O failure on `path`, keeping permission denials as their
    /// own variant so callers can re-prompt instead of surfacing raw I/O.
    pub(crate) fn from_io_at(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied(path.display().to_string())
        } else {
            Self::Io(err)
        }
    }
}
