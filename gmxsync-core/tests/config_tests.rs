//! Config loading against real project directories.

use std::path::PathBuf;

use assert_fs::prelude::*;
use gmxsync_core::{ConfigError, SyncConfig};
use predicates::prelude::*;
use rstest::rstest;

#[test]
fn missing_config_file_uses_defaults() {
    let project = assert_fs::TempDir::new().expect("project");
    let config = SyncConfig::load_for_project(project.path()).expect("load");
    assert_eq!(config.project_dir, project.path());
    assert_eq!(config.mirror_ext, "gmo");
    assert_eq!(config.reverb_spacing_ms, 1_000);
    assert_eq!(config.dedup_spacing_ms, 100);
}

#[test]
fn yaml_overrides_selected_keys() {
    let project = assert_fs::TempDir::new().expect("project");
    project
        .child("gmxsync.yaml")
        .write_str("object_suffix: .object.xml\nreverb_spacing_ms: 1500\n")
        .expect("write config");

    let config = SyncConfig::load_for_project(project.path()).expect("load");
    assert_eq!(config.object_suffix, ".object.xml");
    assert_eq!(config.reverb_spacing_ms, 1_500);
    assert_eq!(config.script_ext, "gml", "unset keys keep defaults");
}

#[test]
fn unknown_keys_are_rejected_with_path() {
    let project = assert_fs::TempDir::new().expect("project");
    project
        .child("gmxsync.yaml")
        .write_str("reverb: 10\n")
        .expect("write config");

    let err = SyncConfig::load_for_project(project.path()).expect_err("unknown key");
    match err {
        ConfigError::Parse { path, .. } => assert!(path.ends_with("gmxsync.yaml")),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[rstest]
#[case("object_suffix: object.gmx\n")]
#[case("mirror_ext: .gmo\n")]
#[case("script_ext: gmo\n")]
#[case("queue_capacity: 0\n")]
fn invalid_values_fail_validation(#[case] yaml: &str) {
    let project = assert_fs::TempDir::new().expect("project");
    project.child("gmxsync.yaml").write_str(yaml).expect("write");
    let err = SyncConfig::load_for_project(project.path()).expect_err("invalid");
    assert!(matches!(err, ConfigError::Invalid(_)), "{yaml}: {err:?}");
}

#[test]
fn manifest_is_detected_in_project_dir() {
    let project = assert_fs::TempDir::new().expect("project");
    project
        .child("example.project.gmx")
        .write_str("<assets/>")
        .expect("write manifest");
    project.child("objects").create_dir_all().expect("objects");

    let config = SyncConfig::load_for_project(project.path()).expect("load");
    let manifest = config.manifest_path().expect("manifest");
    assert_eq!(manifest, project.path().join("example.project.gmx"));
    project
        .child("example.project.gmx")
        .assert(predicate::path::exists());
}

#[test]
fn missing_manifest_is_reported() {
    let project = assert_fs::TempDir::new().expect("project");
    let config = SyncConfig::load_for_project(project.path()).expect("load");
    assert!(matches!(
        config.manifest_path(),
        Err(ConfigError::ManifestNotFound(_))
    ));
}

#[test]
fn explicit_manifest_resolves_against_project() {
    let config = SyncConfig {
        project_dir: PathBuf::from("/games/example.gmx"),
        manifest: Some(PathBuf::from("custom.project.gmx")),
        ..SyncConfig::default()
    };
    assert_eq!(
        config.manifest_path().expect("manifest"),
        PathBuf::from("/games/example.gmx/custom.project.gmx")
    );
}

#[test]
fn config_yaml_roundtrips() {
    let config = SyncConfig::default();
    let yaml = config.to_yaml().expect("yaml");
    let parsed: SyncConfig = serde_yaml_from(&yaml);
    assert_eq!(parsed, config);
}

fn serde_yaml_from(yaml: &str) -> SyncConfig {
    let dir = assert_fs::TempDir::new().expect("dir");
    let file = dir.child("gmxsync.yaml");
    file.write_str(yaml).expect("write");
    SyncConfig::load_file(file.path()).expect("load")
}
