use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop `gmxsync watch`. Per-event translation failures
/// are not here: the engine reports those and keeps watching.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Console, signal handler or runtime setup. `path` names the stream
    /// (`stdin`, `stdout`, `SIGTERM handler`) when there is no file.
    #[error("watch I/O failed on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The filesystem watcher could not be created or attached to a root.
    #[error("cannot watch project: {0}")]
    Notify(#[from] notify::Error),

    /// Engine construction or the initial pass over the native tree.
    #[error("sync setup failed: {0}")]
    Sync(#[from] gmxsync_sync::SyncError),

    #[error("invalid sync config: {0}")]
    Config(#[from] gmxsync_core::ConfigError),

    /// Encoding the `status` console reply.
    #[error("cannot encode status: {0}")]
    Json(#[from] serde_json::Error),

    /// The dispatch queue went away while the watcher still had events.
    #[error("{0} closed while events were pending")]
    ChannelClosed(&'static str),

    /// A watcher, dispatch, console or signal task (or the blocking initial
    /// pass) panicked or was cancelled before returning.
    #[error("watch task failed: {0}")]
    Runtime(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
