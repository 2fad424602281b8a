//! Integration tests for chirp-config loading and validation.

use chirp_config::{Config, ConfigError, MatchSource};
use std::fs;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
[settings]
shell = "/bin/bash"
min_gap_ms = 40
echo_timeout_ms = 5
burst_threshold = 64
sample_rate = 44100
channels = 1
audio = false

[settings.envelope]
attack = 0.05
decay = 0.1
sustain = 0.6
release = 0.25

[samples.enter]
frequency = 440.0
duration = 100
volume = 0.8

[samples.arrow]
frequency = 880
duration = 20
volume = 0.2
envelope = { attack = 0.0, decay = 0.0, sustain = 1.0, release = 0.5 }

[triggers.enter]
match = ["\n", "\r"]
sample = "enter"
max_length = 2
source = "input"

[triggers.arrows]
match = ["\u001b[A", "\u001b[B"]
sample = "arrow"
"#;

#[test]
fn test_full_config_parses() {
    let config = Config::from_toml_str(FULL_CONFIG).expect("config should load");

    assert_eq!(config.settings.shell.as_deref(), Some("/bin/bash"));
    assert_eq!(config.settings.min_gap_ms, 40);
    assert_eq!(config.settings.echo_timeout_ms, 5);
    assert_eq!(config.settings.burst_threshold, 64);
    assert_eq!(config.settings.sample_rate, 44100);
    assert_eq!(config.settings.channels, 1);
    assert!(!config.settings.audio);
    assert_eq!(config.settings.envelope.sustain, 0.6);

    let enter = &config.triggers["enter"];
    assert_eq!(enter.max_length, 2);
    assert_eq!(enter.source, MatchSource::Input);

    let arrows = &config.triggers["arrows"];
    assert_eq!(arrows.source, MatchSource::Both);
    assert_eq!(arrows.pattern_bytes()[0], b"\x1b[A".to_vec());

    let arrow = config.sample_for(arrows).unwrap();
    assert_eq!(arrow.frequency, 880.0);
    assert_eq!(arrow.envelope.unwrap().release, 0.5);
}

#[test]
fn test_queues_alias_is_accepted() {
    let config = Config::from_toml_str(
        r#"
[samples.local]
frequency = 392
duration = 50
volume = 0.3

[queues.local]
match = ["\r", "\n"]
sample = "local"
max_length = 1
"#,
    )
    .unwrap();
    assert!(config.triggers.contains_key("local"));
}

#[test]
fn test_missing_settings_use_defaults() {
    let config = Config::from_toml_str("").unwrap();
    assert_eq!(config.settings, chirp_config::Settings::default());
    assert!(config.samples.is_empty());
    assert!(config.triggers.is_empty());
}

#[test]
fn test_invalid_volume_is_validation_error() {
    let err = Config::from_toml_str(
        r#"
[samples.loud]
frequency = 440
duration = 10
volume = 2.0
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(err.to_string().contains("loud"));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let err = Config::from_toml_str("[samples.x\nfrequency = ").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_wrong_field_type_is_parse_error() {
    let err = Config::from_toml_str(
        r#"
[samples.x]
frequency = "high"
duration = 10
volume = 0.5
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, FULL_CONFIG).expect("Failed to write config");

    let config = Config::load(Some(&path)).expect("explicit config should load");
    assert_eq!(config.triggers.len(), 2);
}

#[test]
fn test_missing_explicit_file_is_io_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("absent.toml");

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_disabled_trigger_is_skipped() {
    let config = Config::from_toml_str(
        r#"
[samples.s]
frequency = 440
duration = 10
volume = 0.5

[triggers.on]
match = ["a"]
sample = "s"

[triggers.off]
match = ["b"]
sample = "s"
enabled = false
"#,
    )
    .unwrap();
    let names: Vec<&str> = config.enabled_triggers().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["on"]);
}

#[test]
fn test_config_path_lives_under_chirp_dir() {
    if let Some(path) = Config::config_path() {
        assert!(path.ends_with("chirp/config.toml"));
    }
}
