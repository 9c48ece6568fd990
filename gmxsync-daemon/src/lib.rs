//! # gmxsync-daemon
//!
//! Watch runtime for the sync engine: a `notify` watcher feeding a bounded
//! queue, a dispatch task running the engine one event at a time, a console
//! command listener and signal handling. On shutdown the mirror tree is
//! removed.

pub mod error;
pub mod runtime;

pub use error::DaemonError;
pub use runtime::{change_op, init_tracing, map_event, run, start_blocking, Command, Daemon};
