//! Per-resource presence and freshness across both trees and the manifest.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::SystemTime;

use serde::Serialize;

use gmxsync_core::{ManifestError, NativeManifest, ResourceKind};

use crate::diff::expected_mirror;
use crate::error::SyncError;
use crate::layout::Layout;
use crate::reverb::Side;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResourceState {
    /// The mirror holds exactly what the native file translates to.
    InSync,
    /// Contents disagree; `newer` is the side with the later mtime.
    Differs { newer: Side },
    /// Only the native file exists.
    MirrorMissing,
    /// Only the mirror file exists.
    NativeMissing,
    /// The native file could not be read or decoded.
    Unreadable { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceStatus {
    pub kind: ResourceKind,
    pub name: String,
    pub native: bool,
    pub mirror: bool,
    pub in_manifest: bool,
    #[serde(flatten)]
    pub state: ResourceState,
}

/// Every object and script known to either tree, objects first, each group
/// sorted by name.
pub fn scan_status(layout: &Layout, manifest: &NativeManifest) -> Result<Vec<ResourceStatus>, SyncError> {
    let mut statuses = Vec::new();
    for kind in [ResourceKind::Object, ResourceKind::Script] {
        let listed = manifest_names(manifest, kind)?;

        let mut names = BTreeSet::new();
        names.extend(layout.names(Side::Native, kind)?);
        names.extend(layout.names(Side::Mirror, kind)?);

        for name in names {
            let native_path = layout.resource_path(Side::Native, kind, &name);
            let mirror_path = layout.resource_path(Side::Mirror, kind, &name);
            let native = native_path.is_file();
            let mirror = mirror_path.is_file();

            let state = match (native, mirror) {
                (true, false) => ResourceState::MirrorMissing,
                (false, _) => ResourceState::NativeMissing,
                (true, true) => compare(layout, kind, &name, &native_path, &mirror_path),
            };

            statuses.push(ResourceStatus {
                kind,
                in_manifest: listed.contains(&name),
                name,
                native,
                mirror,
                state,
            });
        }
    }
    Ok(statuses)
}

fn manifest_names(manifest: &NativeManifest, kind: ResourceKind) -> Result<BTreeSet<String>, SyncError> {
    match manifest.entries(kind.group()) {
        Ok(entries) => Ok(entries.into_iter().map(|e| e.name).collect()),
        Err(ManifestError::UnknownGroup(_)) => Ok(BTreeSet::new()),
        Err(e) => Err(e.into()),
    }
}

fn compare(layout: &Layout, kind: ResourceKind, name: &str, native: &Path, mirror: &Path) -> ResourceState {
    let expected = match expected_mirror(layout, kind, name) {
        Ok(text) => text,
        Err(e) => {
            return ResourceState::Unreadable {
                error: e.to_string(),
            }
        }
    };
    match std::fs::read(mirror) {
        Ok(bytes) if bytes == expected.as_bytes() => ResourceState::InSync,
        _ => ResourceState::Differs {
            newer: if modified(native) >= modified(mirror) {
                Side::Native
            } else {
                Side::Mirror
            },
        },
    }
}

fn modified(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
