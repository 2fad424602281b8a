//! Top-level configuration: loading, discovery, validation and defaults.
//!
//! Covers:
//! - `load` (explicit path, then `~/.config/chirp/config.toml`, then defaults)
//! - `from_toml_str` (parse + validate + link samples to triggers)
//! - `to_toml` for printing the effective configuration

use crate::error::ConfigError;
use crate::sample::SampleConfig;
use crate::settings::Settings;
use crate::trigger::TriggerConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Complete chirp configuration.
///
/// Read-only once loaded; the engine never reloads it while a session runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub samples: BTreeMap<String, SampleConfig>,
    #[serde(default, alias = "queues")]
    pub triggers: BTreeMap<String, TriggerConfig>,
}

impl Default for Config {
    /// Two tones: a low one for line endings and a higher one for prompt
    /// characters.
    fn default() -> Self {
        let mut samples = BTreeMap::new();
        samples.insert(
            "local".to_string(),
            SampleConfig::new("local", 392.0, 50, 0.3), // G4
        );
        samples.insert(
            "remote".to_string(),
            SampleConfig::new("remote", 587.0, 50, 0.3), // D5
        );

        let mut triggers = BTreeMap::new();
        triggers.insert(
            "local".to_string(),
            TriggerConfig::new("local", &["\r", "\n"], "local", 1),
        );
        triggers.insert(
            "remote".to_string(),
            TriggerConfig::new("remote", &["$", "#", "%"], "remote", 1),
        );

        Self {
            settings: Settings::default(),
            samples,
            triggers,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default config file is
    /// used when present and the built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            log::info!("Loading config from {:?}", path);
            return Self::load_from(path);
        }

        match Self::config_path() {
            Some(path) if path.exists() => {
                log::info!("Loading existing config from {:?}", path);
                Self::load_from(&path)
            }
            path => {
                log::info!(
                    "Config file not found ({:?}), using built-in defaults",
                    path
                );
                Ok(Self::default())
            }
        }
    }

    /// Read, parse and validate a config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(contents)?;
        config.validate()?;
        log::debug!(
            "Configuration loaded: {} samples, {} triggers",
            config.samples.len(),
            config.triggers.len()
        );
        Ok(config)
    }

    /// Name entries after their table keys, validate them, and check that
    /// every trigger points at a defined sample.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.settings.validate()?;

        for (name, sample) in self.samples.iter_mut() {
            sample.name = name.clone();
            sample.validate()?;
            log::debug!("Validated sample '{}'", name);
        }

        for (name, trigger) in self.triggers.iter_mut() {
            trigger.name = name.clone();
            trigger.validate()?;
            if !self.samples.contains_key(&trigger.sample) {
                return Err(ConfigError::UnknownSample {
                    trigger: name.clone(),
                    sample: trigger.sample.clone(),
                });
            }
            log::debug!(
                "Validated trigger '{}' -> sample '{}'",
                name,
                trigger.sample
            );
        }
        Ok(())
    }

    /// The sample a trigger plays. Always `Some` for a validated config.
    pub fn sample_for(&self, trigger: &TriggerConfig) -> Option<&SampleConfig> {
        self.samples.get(&trigger.sample)
    }

    /// Triggers that are switched on, in name order.
    pub fn enabled_triggers(&self) -> impl Iterator<Item = &TriggerConfig> {
        self.triggers.values().filter(|t| t.enabled)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Directory holding the config file: `~/.config/chirp`.
    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|dir| dir.join("chirp"))
        }
        #[cfg(not(target_os = "windows"))]
        {
            // XDG layout on every Unix, including macOS.
            dirs::home_dir().map(|home| home.join(".config").join("chirp"))
        }
    }

    /// Default config file location.
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.samples.len(), 2);
        assert_eq!(config.triggers.len(), 2);
    }

    #[test]
    fn test_default_triggers_resolve_samples() {
        let config = Config::default();
        for trigger in config.triggers.values() {
            let sample = config.sample_for(trigger).expect("linked sample");
            assert_eq!(sample.name, trigger.sample);
        }
    }

    #[test]
    fn test_names_come_from_table_keys() {
        let config = Config::from_toml_str(
            r#"
[samples.beep]
frequency = 440
duration = 100
volume = 0.8

[triggers.enter]
match = ["\n"]
sample = "beep"
"#,
        )
        .unwrap();
        assert_eq!(config.samples["beep"].name, "beep");
        assert_eq!(config.triggers["enter"].name, "enter");
        assert_eq!(config.triggers["enter"].max_length, 1);
    }

    #[test]
    fn test_unknown_sample_is_load_error() {
        let err = Config::from_toml_str(
            r#"
[triggers.enter]
match = ["\n"]
sample = "missing"
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownSample { ref trigger, ref sample }
                if trigger == "enter" && sample == "missing"
        ));
    }

    #[test]
    fn test_default_config_survives_toml_round_trip() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
