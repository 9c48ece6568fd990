use std::fs;
use std::path::Path;
use std::time::Duration;

use gmxsync_core::{write_native, FieldValue, NativeResource, SyncConfig};
use gmxsync_daemon::Daemon;
use gmxsync_sync::Layout;
use tempfile::TempDir;

const MANIFEST: &str = "<assets>\n  <objects name=\"objects\">\n    <object>objects\\obj_player</object>\n  </objects>\n</assets>\n";

fn project(root: &Path) -> SyncConfig {
    let project_dir = root.join("example.gmx");
    fs::create_dir_all(project_dir.join("objects")).unwrap();
    fs::create_dir_all(project_dir.join("scripts")).unwrap();
    fs::write(project_dir.join("example.project.gmx"), MANIFEST).unwrap();
    let config = SyncConfig {
        project_dir,
        ..SyncConfig::default()
    };
    fs::write(
        Layout::from_config(&config).native_object("obj_player"),
        write_native(&NativeResource::skeleton()).unwrap(),
    )
    .unwrap();
    config
}

async fn eventually(what: &str, mut check: impl FnMut() -> bool, mut poke: impl FnMut()) {
    for _ in 0..60 {
        if check() {
            return;
        }
        poke();
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn native_edit_reaches_the_mirror_and_shutdown_removes_it() {
    let tmp = TempDir::new().unwrap();
    let config = project(tmp.path());
    let layout = Layout::from_config(&config);

    let daemon = Daemon::from_config(&config).unwrap();
    let shutdown = daemon.shutdown_handle();
    let running = tokio::spawn(daemon.run(tokio::io::empty(), tokio::io::sink()));

    let mirror = layout.mirror_object("obj_player");
    eventually("initial mirror", || mirror.is_file(), || {}).await;

    let mut edited = NativeResource::skeleton();
    edited.set_field("persistent", FieldValue::Bool(true));
    let native = layout.native_object("obj_player");
    let bytes = write_native(&edited).unwrap();

    // Rewritten until seen: the watcher may still be registering.
    eventually(
        "translated edit",
        || {
            fs::read_to_string(&mirror)
                .map(|text| text.contains("persistent = true"))
                .unwrap_or(false)
        },
        || fs::write(&native, &bytes).unwrap(),
    )
    .await;

    shutdown.send(()).unwrap();
    let stats = running.await.unwrap().unwrap();
    assert!(stats.processed >= 1);
    assert!(!layout.mirror_root.exists(), "mirror tree removed on shutdown");
    assert_eq!(fs::read(&native).unwrap(), bytes.as_bytes(), "native file left as edited");
}

#[tokio::test]
async fn malformed_native_tree_is_fatal_at_startup() {
    let tmp = TempDir::new().unwrap();
    let config = project(tmp.path());
    fs::write(
        Layout::from_config(&config).native_object("obj_broken"),
        "<object><solid>",
    )
    .unwrap();

    let err = Daemon::from_config(&config)
        .unwrap()
        .run(tokio::io::empty(), tokio::io::sink())
        .await
        .unwrap_err();
    assert!(matches!(err, gmxsync_daemon::DaemonError::Sync(_)), "{err}");
}
