//! Initial pass: populate the mirror tree from the native tree at startup.
//!
//! Any failure here is fatal to the caller; a partially built mirror would
//! leave the two trees inconsistent from the start.

use std::path::PathBuf;

use gmxsync_core::ResourceKind;
use gmxsync_translate::native_to_mirror;

use crate::engine::decode_native;
use crate::error::{io_err, SyncError};
use crate::layout::Layout;
use crate::reverb::{fingerprint, Side};
use crate::writer::{atomic_write, read, WriteResult};

/// What the initial pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialSyncSummary {
    pub objects: usize,
    pub scripts: usize,
    pub writes: Vec<WriteResult>,
    /// `(target, digest)` for every mirror file the pass produced.
    pub fingerprints: Vec<(PathBuf, String)>,
}

impl InitialSyncSummary {
    pub fn written(&self) -> usize {
        self.writes.iter().filter(|w| w.was_written()).count()
    }
}

/// Create the mirror root, translate every native object into it and copy
/// every native script.
pub fn initial_sync(layout: &Layout) -> Result<InitialSyncSummary, SyncError> {
    std::fs::create_dir_all(&layout.mirror_root).map_err(|e| io_err(&layout.mirror_root, e))?;

    let mut summary = InitialSyncSummary::default();

    for name in layout.names(Side::Native, ResourceKind::Object)? {
        let source = layout.native_object(&name);
        let resource = decode_native(&source, &read(&source)?)?;
        let text = native_to_mirror(&resource);
        let target = layout.mirror_object(&name);
        summary.writes.push(atomic_write(&target, text.as_bytes())?);
        summary.fingerprints.push((target, fingerprint(text.as_bytes())));
        summary.objects += 1;
    }

    for name in layout.names(Side::Native, ResourceKind::Script)? {
        let bytes = read(&layout.native_script(&name))?;
        let target = layout.mirror_script(&name);
        summary.writes.push(atomic_write(&target, &bytes)?);
        summary.fingerprints.push((target, fingerprint(&bytes)));
        summary.scripts += 1;
    }

    tracing::info!(
        "initial sync: {} object(s), {} script(s), {} file(s) written to {}",
        summary.objects,
        summary.scripts,
        summary.written(),
        layout.mirror_root.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmxsync_core::{write_native, FieldValue, NativeResource};
    use std::fs;
    use tempfile::TempDir;

    fn layout(root: &std::path::Path) -> Layout {
        Layout {
            objects_root: root.join("example.gmx/objects"),
            scripts_root: root.join("example.gmx/scripts"),
            mirror_root: root.join("NiceObjects"),
            object_suffix: ".object.gmx".into(),
            mirror_ext: "gmo".into(),
            script_ext: "gml".into(),
        }
    }

    #[test]
    fn mirrors_every_object_and_script() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(tmp.path());
        fs::create_dir_all(&layout.objects_root).unwrap();
        fs::create_dir_all(&layout.scripts_root).unwrap();

        let mut player = NativeResource::skeleton();
        player.set_field("solid", FieldValue::Bool(true));
        fs::write(
            layout.native_object("obj_player"),
            write_native(&player).unwrap(),
        )
        .unwrap();
        fs::write(layout.native_script("scr_move"), "x += 1;\r\n").unwrap();

        let summary = initial_sync(&layout).unwrap();
        assert_eq!((summary.objects, summary.scripts), (1, 1));
        assert_eq!(summary.written(), 2);

        let mirror = fs::read_to_string(layout.mirror_object("obj_player")).unwrap();
        assert!(mirror.contains("solid = true"));
        assert_eq!(
            fs::read(layout.mirror_script("scr_move")).unwrap(),
            b"x += 1;\r\n"
        );

        let again = initial_sync(&layout).unwrap();
        assert_eq!(again.written(), 0, "second pass must be a no-op");
    }

    #[test]
    fn missing_native_roots_yield_an_empty_mirror() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(tmp.path());
        let summary = initial_sync(&layout).unwrap();
        assert_eq!(summary, InitialSyncSummary::default());
        assert!(layout.mirror_root.is_dir());
    }

    #[test]
    fn malformed_native_object_aborts_the_pass() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(tmp.path());
        fs::create_dir_all(&layout.objects_root).unwrap();
        fs::write(layout.native_object("obj_broken"), "<object><solid>").unwrap();

        let err = initial_sync(&layout).unwrap_err();
        assert!(matches!(err, SyncError::Native { .. }));
    }
}
