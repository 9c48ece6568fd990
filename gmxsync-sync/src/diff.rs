//! Unified diffs between the mirror on disk and what the native tree
//! translates to. No files are written.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use gmxsync_core::ResourceKind;
use gmxsync_translate::native_to_mirror;

use crate::engine::decode_native;
use crate::error::{io_err, SyncError};
use crate::layout::Layout;
use crate::reverb::Side;
use crate::writer::read;

/// A single mirror file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDiff {
    pub kind: ResourceKind,
    pub name: String,
    pub mirror_path: PathBuf,
    pub unified_diff: String,
}

/// Diff the mirror copy of `name` (object first, then script) against its
/// native source. `None` when they agree.
pub fn diff_resource(layout: &Layout, name: &str) -> Result<Option<ResourceDiff>, SyncError> {
    let kind = if layout.native_object(name).is_file() {
        ResourceKind::Object
    } else if layout.native_script(name).is_file() {
        ResourceKind::Script
    } else {
        return Err(SyncError::UnknownResource(name.to_string()));
    };
    diff_kind(layout, kind, name)
}

/// Diff every native resource against the mirror, objects first.
pub fn diff_all(layout: &Layout) -> Result<Vec<ResourceDiff>, SyncError> {
    let mut diffs = Vec::new();
    for kind in [ResourceKind::Object, ResourceKind::Script] {
        for name in layout.names(Side::Native, kind)? {
            if let Some(diff) = diff_kind(layout, kind, &name)? {
                diffs.push(diff);
            }
        }
    }
    Ok(diffs)
}

fn diff_kind(layout: &Layout, kind: ResourceKind, name: &str) -> Result<Option<ResourceDiff>, SyncError> {
    let expected = expected_mirror(layout, kind, name)?;
    let mirror_path = layout.resource_path(Side::Mirror, kind, name);
    let existing = read_existing_or_empty(&mirror_path)?;
    if existing == expected {
        return Ok(None);
    }

    let file_name = mirror_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    let unified = TextDiff::from_lines(&existing, &expected)
        .unified_diff()
        .header(&format!("a/{file_name}"), &format!("b/{file_name}"))
        .context_radius(3)
        .to_string();

    Ok(Some(ResourceDiff {
        kind,
        name: name.to_string(),
        mirror_path,
        unified_diff: unified,
    }))
}

/// The mirror text the engine would write for the native resource.
pub(crate) fn expected_mirror(layout: &Layout, kind: ResourceKind, name: &str) -> Result<String, SyncError> {
    let source = layout.resource_path(Side::Native, kind, name);
    let bytes = read(&source)?;
    Ok(match kind {
        ResourceKind::Object => native_to_mirror(&decode_native(&source, &bytes)?),
        ResourceKind::Script => String::from_utf8_lossy(&bytes).into_owned(),
    })
}

fn read_existing_or_empty(path: &Path) -> Result<String, SyncError> {
    match std::fs::read(path) {
        Ok(content) => Ok(String::from_utf8_lossy(&content).into_owned()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(io_err(path, err)),
    }
}
