//! Tests for vkstate.toml loading and scratch sizing.

use vkstate_core::config::{RebuildConfig, ScratchConfig};

#[test]
fn test_defaults() {
    let config = RebuildConfig::default();
    assert_eq!(config.scratch.memory_size, 64 * 1024 * 1024);
    assert_eq!(config.scratch.overcommit, 2);
    assert_eq!(config.scratch.alignment, 256);
    assert!(config.rebuild.prime_buffers);
    assert!(config.rebuild.prime_images);
    assert!(config.rebuild.restore_mappings);
    assert!(config.rebuild.rerecord_command_buffers);
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config: RebuildConfig = toml::from_str(
        r#"
        [scratch]
        memory_size = 1048576

        [rebuild]
        prime_images = false
        "#,
    )
    .unwrap();
    assert_eq!(config.scratch.memory_size, 1 << 20);
    assert_eq!(config.scratch.overcommit, 2);
    assert!(!config.rebuild.prime_images);
    assert!(config.rebuild.prime_buffers);
}

#[test]
fn test_empty_toml_is_default() {
    let config: RebuildConfig = toml::from_str("").unwrap();
    assert_eq!(config, RebuildConfig::default());
}

#[test]
fn test_request_size_applies_overcommit_and_alignment() {
    let scratch = ScratchConfig {
        memory_size: 1000,
        overcommit: 2,
        alignment: 256,
    };
    assert_eq!(scratch.request_size(100), 256);
    assert_eq!(scratch.request_size(128), 256);
    assert_eq!(scratch.request_size(129), 512);
    assert_eq!(scratch.allocation_size(), 2048);
}

#[test]
fn test_zero_overcommit_counts_as_one() {
    let scratch = ScratchConfig {
        memory_size: 64,
        overcommit: 0,
        alignment: 0,
    };
    assert_eq!(scratch.request_size(100), 100);
}

#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!("vkstate-config-{}.toml", std::process::id()));
    std::fs::write(&path, "[rebuild]\nrestore_mappings = false\n").unwrap();
    let config = RebuildConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(!config.rebuild.restore_mappings);
    assert!(config.rebuild.rerecord_command_buffers);
}

#[test]
fn test_load_missing_file_fails_and_defaults() {
    let path = std::env::temp_dir().join("vkstate-config-does-not-exist.toml");
    let err = RebuildConfig::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("reading"));
    assert_eq!(RebuildConfig::load_or_default(&path), RebuildConfig::default());
}

#[test]
fn test_malformed_toml_is_rejected() {
    let result: Result<RebuildConfig, _> = toml::from_str("[scratch]\nmemory_size = \"big\"\n");
    assert!(result.is_err());
}

#[test]
fn test_load_or_default_ignores_malformed_file() {
    let path = std::env::temp_dir().join(format!("vkstate-bad-{}.toml", std::process::id()));
    std::fs::write(&path, "[scratch]\nmemory_size = \"big\"\n").unwrap();
    let err = RebuildConfig::load(&path).unwrap_err();
    let config = RebuildConfig::load_or_default(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(format!("{err:#}").contains("parsing"));
    assert_eq!(config, RebuildConfig::default());
}
