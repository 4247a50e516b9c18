//! Integration tests for Settings loading from a TOML file.
//!
//! These tests never set `VTSCAN_*` variables, so the environment layer is
//! a no-op and only defaults and file contents are checked.

use std::fs;

use tempfile::TempDir;

use vtscan::application::ApplicationError;
use vtscan::config::{Settings, DEFAULT_BASE_URL};

#[test]
fn given_no_config_file_when_load_then_defaults() {
    let settings = Settings::load_from(None).expect("load settings");
    assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    assert_eq!(settings.timeout_secs, 120);
}

#[test]
fn given_missing_config_file_when_load_then_skipped() {
    let temp = TempDir::new().unwrap();
    let settings =
        Settings::load_from(Some(&temp.path().join("vtscan.toml"))).expect("load settings");
    assert_eq!(settings, Settings::load_from(None).unwrap());
}

#[test]
fn given_partial_config_file_when_load_then_file_fields_override_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("vtscan.toml");
    fs::write(
        &path,
        r#"
base_url = "http://localhost:8080/vtapi/v2"
timeout_secs = 5
"#,
    )
    .unwrap();

    let settings = Settings::load_from(Some(&path)).expect("load settings");

    assert_eq!(settings.base_url, "http://localhost:8080/vtapi/v2");
    assert_eq!(settings.timeout_secs, 5);
    // untouched fields keep their defaults
    assert_eq!(settings.log_level, "warn");
    assert!(settings.user_agent.starts_with("vtscan/"));
}

#[test]
fn given_non_http_base_url_when_load_then_config_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("vtscan.toml");
    fs::write(&path, "base_url = \"ftp://example.org\"\n").unwrap();

    let err = Settings::load_from(Some(&path)).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
    assert!(err.to_string().contains("base_url"));
}

#[test]
fn given_malformed_toml_when_load_then_config_error_names_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("vtscan.toml");
    fs::write(&path, "timeout_secs = \"soon\"\n").unwrap();

    let err = Settings::load_from(Some(&path)).unwrap_err();

    assert!(err.to_string().contains("vtscan.toml"));
}

#[test]
fn given_settings_when_round_tripped_through_toml_then_equal() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("vtscan.toml");
    let original = Settings {
        timeout_secs: 30,
        log_level: "debug".to_string(),
        ..Settings::default()
    };
    fs::write(&path, original.to_toml().unwrap()).unwrap();

    assert_eq!(Settings::load_from(Some(&path)).unwrap(), original);
}
