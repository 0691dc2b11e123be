//! Settings files and `--host` resolution.

use std::fs;

use tempfile::TempDir;

use tvctl::config::{Settings, resolve_config_path};
use tvctl::device::DeviceAddress;
use tvctl::error::ErrorKind;

const FLEET: &str = r#"
command_port = 8001
upload_attempts = 3
default_matte = "modern_apricot"

[[devices]]
name = "Living Room"
host = "192.168.1.40"
model = "QE65LS03"

[[devices]]
name = "office"
host = "192.168.1.41"
port = 8002
"#;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_fleet_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, FLEET);

    let settings = Settings::load(&resolve_config_path(Some(&path)).unwrap()).unwrap();

    assert_eq!(settings.command_port, 8001);
    assert_eq!(settings.upload_policy().max_attempts, 3);
    assert_eq!(settings.default_matte, "modern_apricot");
    assert_eq!(settings.devices.len(), 2);
    // Unspecified keys keep their defaults.
    assert_eq!(settings.power_hold_seconds, 3);
}

#[test]
fn test_resolve_named_devices() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::load(&write_config(&dir, FLEET)).unwrap();

    assert_eq!(
        settings.resolve_target("living room", None).unwrap(),
        DeviceAddress::new("192.168.1.40", 8001)
    );
    assert_eq!(
        settings.resolve_target("OFFICE", None).unwrap(),
        DeviceAddress::new("192.168.1.41", 8002)
    );
    assert_eq!(
        settings.resolve_target("office", Some(9000)).unwrap(),
        DeviceAddress::new("192.168.1.41", 9000)
    );
}

#[test]
fn test_resolve_raw_addresses_use_configured_port() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::load(&write_config(&dir, FLEET)).unwrap();

    assert_eq!(
        settings.resolve_target("10.0.0.7", None).unwrap(),
        DeviceAddress::new("10.0.0.7", 8001)
    );
    assert_eq!(
        settings.resolve_target("10.0.0.7:8002", None).unwrap(),
        DeviceAddress::new("10.0.0.7", 8002)
    );
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();

    let unknown = write_config(&dir, "colour = \"red\"\n");
    let err = Settings::load(&unknown).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(err.to_string().contains("config.toml"));

    let zero = write_config(&dir, "upload_attempts = 0\n");
    assert!(Settings::load(&zero).is_err());
}
