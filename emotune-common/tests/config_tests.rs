//! Integration tests for configuration resolution
//!
//! Covers the resolution priority (CLI > environment > platform location >
//! compiled defaults) and graceful fallback when no file exists.
//!
//! Note: Uses serial_test to prevent ENV variable races. Tests that touch
//! EMOTUNE_CONFIG are marked with #[serial].

use std::env;
use std::fs;
use std::path::PathBuf;

use emotune_common::config::{
    ConfigResolver, ConfigSource, RetriggerPolicy, TomlConfig, CONFIG_ENV_VAR,
};
use emotune_common::Error;
use serial_test::serial;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_no_files_uses_compiled_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("config.toml");

    let resolver = ConfigResolver::with_locations(None, None, Some(missing));
    let (config, source) = resolver.resolve().unwrap();

    assert_eq!(source, ConfigSource::CompiledDefaults);
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_default_location_is_used_when_present() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "config.toml", "[detection]\npoll_interval_ms = 250\n");

    let resolver = ConfigResolver::with_locations(None, None, Some(path.clone()));
    let (config, source) = resolver.resolve().unwrap();

    assert_eq!(source, ConfigSource::DefaultLocation(path));
    assert_eq!(config.detection.poll_interval_ms, 250);
}

#[test]
fn test_cli_path_beats_environment_and_default() {
    let dir = TempDir::new().unwrap();
    let cli = write_config(&dir, "cli.toml", "[fade]\nstep = 0.2\n");
    let env_file = write_config(&dir, "env.toml", "[fade]\nstep = 0.3\n");
    let default = write_config(&dir, "default.toml", "[fade]\nstep = 0.4\n");

    let resolver = ConfigResolver::with_locations(Some(cli.clone()), Some(env_file), Some(default));
    let (config, source) = resolver.resolve().unwrap();

    assert_eq!(source, ConfigSource::CommandLine(cli));
    assert_eq!(config.fade.step, 0.2);
}

#[test]
fn test_missing_cli_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let resolver =
        ConfigResolver::with_locations(Some(dir.path().join("nope.toml")), None, None);

    assert!(matches!(resolver.resolve(), Err(Error::Config(_))));
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "bad.toml", "[fade]\nfloor = 3.0\n");

    let resolver = ConfigResolver::with_locations(Some(path), None, None);
    assert!(matches!(resolver.resolve(), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_environment_variable_is_read() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "env.toml", "[detection]\nretrigger = \"on_change\"\n");

    env::set_var(CONFIG_ENV_VAR, &path);
    let result = ConfigResolver::new(None).resolve();
    env::remove_var(CONFIG_ENV_VAR);

    let (config, source) = result.unwrap();
    assert_eq!(source, ConfigSource::Environment(path));
    assert_eq!(config.detection.retrigger, RetriggerPolicy::OnChange);
}

#[test]
#[serial]
fn test_cli_overrides_environment_variable() {
    let dir = TempDir::new().unwrap();
    let env_file = write_config(&dir, "env.toml", "[ui]\ntext_fade_ms = 10\n");
    let cli = write_config(&dir, "cli.toml", "[ui]\ntext_fade_ms = 20\n");

    env::set_var(CONFIG_ENV_VAR, &env_file);
    let result = ConfigResolver::new(Some(cli)).resolve();
    env::remove_var(CONFIG_ENV_VAR);

    let (config, _) = result.unwrap();
    assert_eq!(config.ui.text_fade_ms, 20);
}
