// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use eyecam::Config;
use eyecam::backends::camera::types::BackendType;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.backend, BackendType::Virtual);
    assert!(
        config.navigate_on_url,
        "URL payloads should navigate by default"
    );
    assert!(
        config.pose_helper.is_empty(),
        "Annotation needs an explicit helper"
    );
    assert_eq!(config.scan_interval(), Duration::from_millis(300));
}

#[test]
fn test_config_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        last_camera_id: Some("/dev/video2".to_string()),
        pose_helper: vec!["python3".to_string(), "helper.py".to_string()],
        navigate_on_url: false,
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    assert_eq!(Config::load_from(&path), config);
}

#[test]
fn test_partial_config_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "scan_interval_ms": 120, "record_fps": 15 }"#).unwrap();

    let config = Config::load_from(&path);
    assert_eq!(config.scan_interval(), Duration::from_millis(120));
    assert_eq!(config.record_fps, 15);
    assert!(config.navigate_on_url);
}

#[test]
fn test_malformed_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert_eq!(Config::load_from(&path), Config::default());
}
