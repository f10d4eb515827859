//! Integration tests for the default-config installer.

use mxm_config::error::ConfigError;
use mxm_config::installer::{
    DefaultsMode, InstallAction, InstallOptions, SENTINEL_FILE, install_config,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const APP: &str = "demo_config";

/// A seed directory with core files, YAML and non-YAML templates, and noise.
fn seed_dir() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("default.yaml"), "a: 1\n").unwrap();
    fs::write(root.join("environment.yaml"), "dev: {}\n").unwrap();
    fs::write(root.join("README.md"), "not copied\n").unwrap();
    fs::write(root.join("extra.yaml"), "not a core file\n").unwrap();
    fs::create_dir_all(root.join("templates")).unwrap();
    fs::write(root.join("templates").join("b.yaml"), "b: 1\n").unwrap();
    fs::write(root.join("templates").join("a.yaml"), "a: 1\n").unwrap();
    fs::write(root.join("templates").join("notes.txt"), "skip\n").unwrap();
    fs::write(root.join("templates").join("c.yml"), "skip\n").unwrap();
    temp
}

fn app_dir(dest: &Path) -> PathBuf {
    dest.join(APP)
}

#[test]
fn test_seed_mode_copies_core_files_and_yaml_templates() {
    let seeds = seed_dir();
    let dest = TempDir::new().unwrap();
    let report = install_config(
        APP,
        &InstallOptions::seed(seeds.path()).with_dest_root(dest.path()),
    )
    .unwrap();

    let app = app_dir(dest.path());
    assert!(app.join("default.yaml").is_file());
    assert!(app.join("environment.yaml").is_file());
    assert!(app.join("templates").join("a.yaml").is_file());
    assert!(app.join("templates").join("b.yaml").is_file());
    assert!(!app.join("README.md").exists());
    assert!(!app.join("extra.yaml").exists());
    assert!(!app.join("templates").join("notes.txt").exists());
    assert!(!app.join("templates").join("c.yml").exists());

    assert_eq!(report.mode, DefaultsMode::Seed);
    assert_eq!(report.dest_root, dest.path());
    assert_eq!(report.copied_count(), 4);
    // app dir and templates dir
    assert_eq!(report.created_count(), 2);
    assert_eq!(report.skipped_count(), 0);
}

#[test]
fn test_second_run_skips_and_overwrite_replaces() {
    let seeds = seed_dir();
    let dest = TempDir::new().unwrap();
    let options = InstallOptions::seed(seeds.path()).with_dest_root(dest.path());
    install_config(APP, &options).unwrap();

    let target = app_dir(dest.path()).join("default.yaml");
    fs::write(&target, "a: user-edited\n").unwrap();

    let again = install_config(APP, &options).unwrap();
    assert_eq!(again.copied_count(), 0);
    assert_eq!(again.created_count(), 0);
    assert_eq!(again.skipped_count(), 4);
    assert_eq!(fs::read_to_string(&target).unwrap(), "a: user-edited\n");
    assert!(again.written_paths().is_empty());

    let forced = install_config(APP, &options.clone().with_overwrite(true)).unwrap();
    assert_eq!(forced.copied_count(), 4);
    assert_eq!(fs::read_to_string(&target).unwrap(), "a: 1\n");
    assert_eq!(forced.written_paths().len(), 4);
}

#[test]
fn test_shipped_mode_installs_bundled_seeds() {
    let dest = TempDir::new().unwrap();
    let report = install_config(
        APP,
        &InstallOptions::shipped("mxm.config").with_dest_root(dest.path()),
    )
    .unwrap();
    let app = app_dir(dest.path());
    for name in [
        "default.yaml",
        "environment.yaml",
        "machine.yaml",
        "profile.yaml",
        "local.yaml",
    ] {
        assert!(app.join(name).is_file(), "{name} missing");
    }
    assert!(app.join("templates").join("example.yaml").is_file());
    assert_eq!(report.copied_count(), 6);

    let copied = report
        .installed
        .iter()
        .find(|f| f.action == InstallAction::Copied)
        .unwrap();
    assert!(copied.src.as_ref().unwrap().starts_with("mxm.config"));
}

#[test]
fn test_unknown_shipped_package() {
    let dest = TempDir::new().unwrap();
    let err = install_config(
        APP,
        &InstallOptions::shipped("no.such.pkg").with_dest_root(dest.path()),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownPackage(_)));
    assert!(!app_dir(dest.path()).exists());
}

#[test]
fn test_missing_seed_root() {
    let dest = TempDir::new().unwrap();
    let err = install_config(
        APP,
        &InstallOptions::seed(dest.path().join("absent")).with_dest_root(dest.path()),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

#[test]
fn test_empty_mode_sentinel() {
    let dest = TempDir::new().unwrap();
    let options = InstallOptions::empty().with_dest_root(dest.path());

    let first = install_config(APP, &options).unwrap();
    let app = app_dir(dest.path());
    assert!(app.join(SENTINEL_FILE).is_file());
    assert_eq!(first.created_count(), 2);
    assert!(!app.join("default.yaml").exists());

    let second = install_config(APP, &options).unwrap();
    assert_eq!(second.created_count(), 0);
    assert_eq!(second.skipped_count(), 1);

    let other = TempDir::new().unwrap();
    install_config(
        APP,
        &InstallOptions::empty()
            .with_dest_root(other.path())
            .with_sentinel(false),
    )
    .unwrap();
    assert!(app_dir(other.path()).is_dir());
    assert!(!app_dir(other.path()).join(SENTINEL_FILE).exists());
}

#[test]
fn test_every_destination_is_inside_app_dir() {
    let seeds = seed_dir();
    let dest = TempDir::new().unwrap();
    let report = install_config(
        APP,
        &InstallOptions::seed(seeds.path()).with_dest_root(dest.path()),
    )
    .unwrap();
    let app = report.app_dir();
    for file in &report.installed {
        assert!(file.dest.starts_with(&app), "{} escapes", file.dest.display());
    }
}

#[test]
fn test_missing_dest_root_is_created() {
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("fresh").join("root");
    let report = install_config(APP, &InstallOptions::empty().with_dest_root(&dest)).unwrap();
    assert!(dest.is_dir());
    assert_eq!(report.dest_root, dest);
    assert!(app_dir(&dest).join(SENTINEL_FILE).is_file());
}

#[test]
fn test_invalid_app_id() {
    let dest = TempDir::new().unwrap();
    let err = install_config(
        "Bad App",
        &InstallOptions::empty().with_dest_root(dest.path()),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidAppId { .. }));
    assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
}

#[test]
fn test_report_json_shape() {
    let dest = TempDir::new().unwrap();
    let report = install_config(APP, &InstallOptions::empty().with_dest_root(dest.path())).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["app_id"], APP);
    assert_eq!(json["mode"], "empty");
    assert!(json["installed"].as_array().unwrap().len() >= 2);
}
