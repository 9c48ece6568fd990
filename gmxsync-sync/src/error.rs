//! Error types for gmxsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use gmxsync_core::{ConfigError, ManifestError, NativeError};
use gmxsync_translate::ParseError;

/// All errors that can arise while synchronising one resource.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8: {source}")]
    Utf8 {
        path: PathBuf,
        #[source]
        source: std::str::Utf8Error,
    },

    /// A native object document failed to decode or encode.
    #[error("native document {path}: {source}")]
    Native {
        path: PathBuf,
        #[source]
        source: NativeError,
    },

    /// A mirror file does not follow the mirror grammar.
    #[error("mirror file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    /// An in-memory manifest document failed to decode.
    #[error("manifest: {0}")]
    ManifestDocument(#[from] ManifestError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Neither tree holds a resource with this name.
    #[error("no object or script named '{0}'")]
    UnknownResource(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
