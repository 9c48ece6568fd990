//! Manifest Updater: append-only edits to the on-disk project manifest.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use gmxsync_core::{ManifestError, NativeManifest, ResourceKind};

use crate::error::SyncError;
use crate::writer::{atomic_write, read_text};

/// Serialises read-modify-write cycles on one manifest file.
#[derive(Debug)]
pub struct ManifestUpdater {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ManifestUpdater {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<NativeManifest, SyncError> {
        NativeManifest::parse(read_text(&self.path)?).map_err(|source| SyncError::Manifest {
            path: self.path.clone(),
            source,
        })
    }

    /// Make sure `group` references `name`. Returns `true` when an entry was
    /// appended, `false` when it was already present.
    pub fn ensure_entry(&self, group: &str, name: &str, kind: ResourceKind) -> Result<bool, SyncError> {
        // The file is only ever replaced by rename, so a poisoned lock
        // guards nothing half-written.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let manifest = self.load()?;
        let manifest_err = |source: ManifestError| SyncError::Manifest {
            path: self.path.clone(),
            source,
        };
        if manifest.contains(group, name).map_err(manifest_err)? {
            return Ok(false);
        }
        let updated = manifest.append_entry(group, name, kind).map_err(manifest_err)?;
        atomic_write(&self.path, updated.as_str().as_bytes())?;
        tracing::info!("manifest: added {kind} '{name}' to group '{group}'");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"<!--This Document is generated by GameMaker, if you edit it by hand then you do so at your own risk!-->
<assets>
  <objects name="objects">
    <object>objects\obj_player</object>
  </objects>
  <scripts name="scripts">
    <script>scripts\scr_move.gml</script>
  </scripts>
</assets>
"#;

    fn updater() -> (TempDir, ManifestUpdater) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("example.project.gmx");
        fs::write(&path, MANIFEST).unwrap();
        (tmp, ManifestUpdater::new(path))
    }

    #[test]
    fn appends_once() {
        let (_tmp, updater) = updater();
        assert!(updater
            .ensure_entry("objects", "Enemy", ResourceKind::Object)
            .unwrap());
        assert!(!updater
            .ensure_entry("objects", "Enemy", ResourceKind::Object)
            .unwrap());

        let entries = updater.load().unwrap().entries("objects").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["obj_player", "Enemy"]);
    }

    #[test]
    fn existing_entry_does_not_touch_the_file() {
        let (_tmp, updater) = updater();
        assert!(!updater
            .ensure_entry("scripts", "scr_move", ResourceKind::Script)
            .unwrap());
        assert_eq!(fs::read_to_string(updater.path()).unwrap(), MANIFEST);
    }

    #[test]
    fn unknown_group_is_reported() {
        let (_tmp, updater) = updater();
        let err = updater
            .ensure_entry("rooms", "rm_start", ResourceKind::Object)
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Manifest {
                source: ManifestError::UnknownGroup(ref g),
                ..
            } if g == "rooms"
        ));
    }

    #[test]
    fn missing_manifest_is_an_io_error() {
        let tmp = TempDir::new().unwrap();
        let updater = ManifestUpdater::new(tmp.path().join("missing.project.gmx"));
        let err = updater
            .ensure_entry("objects", "Enemy", ResourceKind::Object)
            .unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }
}
