//! gmxsync core library: resource types, native codec, manifest, config.
//!
//! - [`types`]: [`NativeResource`] and its event/action tree
//! - [`native`]: `.object.gmx` parse / write
//! - [`manifest`]: `*.project.gmx` reading and append-only edits
//! - [`config`]: [`SyncConfig`]
//! - [`error`]: error enums

pub mod config;
pub mod error;
pub mod manifest;
pub mod native;
pub mod types;

pub use config::SyncConfig;
pub use error::{ConfigError, ManifestError, NativeError};
pub use manifest::{append_manifest_entry, ManifestEntry, ManifestGroup, NativeManifest};
pub use native::{parse_native, write_native};
pub use types::{
    ActionBlock, ActionKind, ArgKind, Argument, EventBlock, EventCategory, EventKey, EventSubtype,
    Field, FieldType, FieldValue, NativeResource, Number, ResourceKind, Target,
};
