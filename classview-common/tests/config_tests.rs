//! Integration tests for config file resolution and graceful degradation
//!
//! Covers:
//! - Priority order: command line > environment > config dir > defaults
//! - Missing config file degrades to compiled defaults
//! - Present-but-invalid config file is an error
//!
//! Note: Uses serial_test to prevent ENV variable races. Tests that
//! manipulate CLASSVIEW_TEST_CONFIG are marked #[serial].

use classview_common::config::{
    load_or_default, load_toml, ConfigResolver, ConfigSource, LoggingConfig,
};
use classview_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ENV_VAR: &str = "CLASSVIEW_TEST_CONFIG";

#[derive(Debug, Deserialize, Default, PartialEq)]
struct SampleConfig {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    threshold: Option<f32>,
}

#[test]
#[serial]
fn test_env_var_overrides_config_dir() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("from-env.toml");
    env::set_var(ENV_VAR, &path);

    let resolver = ConfigResolver::new("sample.toml", ENV_VAR);
    let source = resolver.resolve(None);

    env::remove_var(ENV_VAR);
    assert_eq!(source, ConfigSource::Environment(path));
}

#[test]
#[serial]
fn test_cli_overrides_env_var() {
    env::set_var(ENV_VAR, "/tmp/ignored.toml");

    let resolver = ConfigResolver::new("sample.toml", ENV_VAR);
    let source = resolver.resolve(Some(Path::new("/tmp/cli.toml")));

    env::remove_var(ENV_VAR);
    assert_eq!(source, ConfigSource::CommandLine(PathBuf::from("/tmp/cli.toml")));
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    env::set_var(ENV_VAR, "   ");

    let resolver = ConfigResolver::new("classview-test-nonexistent-file.toml", ENV_VAR);
    let source = resolver.resolve(None);

    env::remove_var(ENV_VAR);
    assert!(!matches!(source, ConfigSource::Environment(_)));
}

#[test]
fn test_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let source = ConfigSource::CommandLine(temp_dir.path().join("absent.toml"));

    let config: SampleConfig = load_or_default(&source).unwrap();
    assert_eq!(config, SampleConfig::default());
}

#[test]
fn test_defaults_source_uses_defaults() {
    let config: SampleConfig = load_or_default(&ConfigSource::Defaults).unwrap();
    assert_eq!(config.logging.level, "info");
    assert!(config.threshold.is_none());
}

#[test]
fn test_partial_file_fills_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("partial.toml");
    std::fs::write(&path, "threshold = 0.25\n").unwrap();

    let config: SampleConfig = load_toml(&path).unwrap();
    assert_eq!(config.threshold, Some(0.25));
    assert_eq!(config.logging, LoggingConfig::default());
}

#[test]
fn test_invalid_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "threshold = [not valid toml").unwrap();

    let source = ConfigSource::CommandLine(path);
    let result: classview_common::Result<SampleConfig> = load_or_default(&source);
    let err = result.unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_unreadable_file_is_io_error_with_path() {
    let temp_dir = TempDir::new().unwrap();
    // A directory exists but cannot be read as a file
    let path = temp_dir.path().join("classview-ai.toml");
    std::fs::create_dir(&path).unwrap();

    let result: classview_common::Result<SampleConfig> = load_toml(&path);
    match result {
        Err(Error::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected Io error, got {:?}", other),
    }
}
