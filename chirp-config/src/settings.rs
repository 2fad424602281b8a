//! Engine-wide settings: timing, audio format, envelope, shell.

use crate::envelope::EnvelopeConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Highest channel count accepted for the output format.
pub const MAX_CHANNELS: u16 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Shell to wrap. `None` means `$SHELL`, then `/bin/sh`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(default = "crate::defaults::min_gap_ms")]
    pub min_gap_ms: u64,
    #[serde(default = "crate::defaults::echo_timeout_ms")]
    pub echo_timeout_ms: u64,
    #[serde(default = "crate::defaults::burst_threshold")]
    pub burst_threshold: usize,
    #[serde(default = "crate::defaults::sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "crate::defaults::channels")]
    pub channels: u16,
    /// `false` plays through the simulated device instead of the sound card.
    #[serde(default = "crate::defaults::bool_true")]
    pub audio: bool,
    #[serde(default)]
    pub envelope: EnvelopeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shell: None,
            min_gap_ms: crate::defaults::min_gap_ms(),
            echo_timeout_ms: crate::defaults::echo_timeout_ms(),
            burst_threshold: crate::defaults::burst_threshold(),
            sample_rate: crate::defaults::sample_rate(),
            channels: crate::defaults::channels(),
            audio: true,
            envelope: EnvelopeConfig::default(),
        }
    }
}

impl Settings {
    pub fn min_gap(&self) -> Duration {
        Duration::from_millis(self.min_gap_ms)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::invalid("settings: sample_rate must be positive"));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(ConfigError::invalid(format!(
                "settings: channels must be between 1 and {MAX_CHANNELS}, got {}",
                self.channels
            )));
        }
        if self.burst_threshold == 0 {
            return Err(ConfigError::invalid(
                "settings: burst_threshold must be at least 1",
            ));
        }
        if let Some(shell) = &self.shell
            && shell.trim().is_empty()
        {
            return Err(ConfigError::invalid("settings: shell cannot be blank"));
        }
        self.envelope.validate().map_err(|e| match e {
            ConfigError::Validation(msg) => ConfigError::invalid(format!("settings: {msg}")),
            other => other,
        })
    }

    /// Resolve the shell to run: this setting, then `$SHELL`, then `/bin/sh`.
    pub fn resolve_shell(&self) -> String {
        if let Some(shell) = &self.shell {
            return shell.clone();
        }
        match std::env::var("SHELL") {
            Ok(shell) if !shell.trim().is_empty() => shell,
            _ => crate::defaults::FALLBACK_SHELL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.min_gap(), Duration::from_millis(25));
        assert_eq!(settings.channels, 2);
    }

    #[test]
    fn test_channel_bounds() {
        let mut settings = Settings::default();
        settings.channels = 0;
        assert!(settings.validate().is_err());
        settings.channels = MAX_CHANNELS + 1;
        assert!(settings.validate().is_err());
        settings.channels = 1;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let settings = Settings {
            sample_rate: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_configured_shell_wins() {
        let settings = Settings {
            shell: Some("/usr/bin/fish".to_string()),
            ..Settings::default()
        };
        assert_eq!(settings.resolve_shell(), "/usr/bin/fish");
    }

    #[test]
    fn test_blank_shell_rejected() {
        let settings = Settings {
            shell: Some("  ".to_string()),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
