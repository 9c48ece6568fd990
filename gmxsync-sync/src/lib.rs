//! # gmxsync-sync
//!
//! Keeps the native object tree and the mirror tree consistent.
//!
//! [`SyncEngine::handle`] takes one [`ChangeEvent`] at a time: the
//! [`layout`] classifies the path, [`reverb`] drops echoes of the engine's own
//! writes, the translator converts, [`writer`] replaces the counterpart
//! atomically and [`manifest_updater`] registers resources created from the
//! mirror side.

pub mod bootstrap;
pub mod diff;
pub mod engine;
pub mod error;
pub mod layout;
pub mod manifest_updater;
pub mod reverb;
pub mod status;
pub mod writer;

pub use bootstrap::{initial_sync, InitialSyncSummary};
pub use diff::{diff_all, diff_resource, ResourceDiff};
pub use engine::{
    ChangeEvent, ChangeOp, Direction, Dispatch, EngineStats, Outcome, Reporter, SyncEngine,
    SyncReport, TracingReporter,
};
pub use error::SyncError;
pub use layout::{Classified, Layout, ResourcePaths};
pub use manifest_updater::ManifestUpdater;
pub use reverb::{decide, Side, Spacing, SyncState, Verdict};
pub use status::{scan_status, ResourceState, ResourceStatus};
pub use writer::{atomic_write, WriteResult};
