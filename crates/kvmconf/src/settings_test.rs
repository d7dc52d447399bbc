// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

#[rstest]
fn test_defaults_without_files() {
    let settings = Settings::from_files::<PathBuf>(&[]).expect("Should load defaults");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.vm.defaults.cpu, 2);
    assert_eq!(settings.domain.defaults.machine, "q35");
    assert_eq!(settings.net.defaults.kind, "network");
    assert!(settings.paths.db.ends_with("kvmconf.db"));
}

#[rstest]
fn test_missing_files_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let settings = Settings::from_files(&[tmp.path().join("absent.toml")]).unwrap();
    assert_eq!(settings, Settings::default());
}

#[rstest]
fn test_later_files_override_earlier() {
    let tmp = TempDir::new().unwrap();
    let system = tmp.path().join("system.toml");
    let user = tmp.path().join("user.toml");

    std::fs::write(
        &system,
        r#"
[vm.defaults]
cpu = 4
memory = "8GiB"

[paths]
db = "/var/lib/kvmconf/kvmconf.db"
"#,
    )
    .unwrap();
    std::fs::write(
        &user,
        r#"
[vm.defaults]
cpu = 8

[net.defaults]
type = "bridge"
"#,
    )
    .unwrap();

    let settings = Settings::from_files(&[system, user]).expect("Should layer settings");

    assert_eq!(settings.vm.defaults.cpu, 8);
    assert_eq!(settings.vm.defaults.memory, "8GiB");
    assert_eq!(settings.vm.defaults.disk, Settings::default().vm.defaults.disk);
    assert_eq!(settings.net.defaults.kind, "bridge");
    assert_eq!(settings.net.defaults.model, "virtio");
    assert_eq!(
        settings.paths.db,
        PathBuf::from("/var/lib/kvmconf/kvmconf.db")
    );
}

#[rstest]
fn test_invalid_settings_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(SETTINGS_FILENAME);
    std::fs::write(&path, "[vm.defaults]\ncpu = \"many\"\n").unwrap();

    let result = Settings::from_files(&[path]);
    assert!(matches!(result, Err(Error::Settings(_))), "got {result:?}");
}

#[rstest]
fn test_single_section_override() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(SETTINGS_FILENAME);
    std::fs::write(&path, "[vm.defaults]\ncpu = 8\n").unwrap();

    let settings = Settings::from_files(&[path]).expect("Should load settings");
    assert_eq!(settings.vm.defaults.cpu, 8);
    assert_eq!(settings.vm.defaults.memory, "2GiB");
}

#[rstest]
#[case::flat_section("[vm]\ncpu = 8\n")]
#[case::unknown_default("[domain.defaults]\nfirmware = \"uefi\"\n")]
#[case::unknown_section("[storage]\npool = \"default\"\n")]
fn test_misplaced_keys_are_rejected(#[case] contents: &str) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(SETTINGS_FILENAME);
    std::fs::write(&path, contents).unwrap();

    let result = Settings::from_files(&[path]);
    assert!(matches!(result, Err(Error::Settings(_))), "got {result:?}");
}

#[rstest]
fn test_explicit_path_must_exist() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("missing.toml");

    match Settings::load(Some(&path)) {
        Err(Error::SettingsNotFound(reported)) => assert_eq!(reported, path),
        other => panic!("expected SettingsNotFound, got {other:?}"),
    }
}

#[rstest]
#[case("q35", "pc-q35-9.2")]
#[case("pc", "pc-i440fx-9.2")]
#[case("pc-q35-8.0", "pc-q35-8.0")]
fn test_machine_type(#[case] machine: &str, #[case] expected: &str) {
    let settings = Settings::default();
    assert_eq!(settings.machine_type(machine), expected);
}

#[rstest]
fn test_search_paths_start_with_system_file() {
    let paths = default_search_paths();
    assert_eq!(
        paths.first(),
        Some(&PathBuf::from("/etc/kvmconf/kvmconf.toml"))
    );
    assert!(paths.iter().all(|p| p.is_absolute()));
}
