//! Sample definitions: the distinct tones a trigger can play.

use crate::envelope::EnvelopeConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A synthesized tone, keyed by name in the `[samples]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Derived from the table key after loading.
    #[serde(skip)]
    pub name: String,
    /// Tone frequency in Hz.
    pub frequency: f64,
    /// Tone length in milliseconds.
    pub duration: u64,
    /// Peak amplitude, 0.0 to 1.0.
    pub volume: f64,
    /// Per-sample envelope; falls back to `settings.envelope` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<EnvelopeConfig>,
}

impl SampleConfig {
    pub fn new(name: &str, frequency: f64, duration: u64, volume: f64) -> Self {
        Self {
            name: name.to_string(),
            frequency,
            duration,
            volume,
            envelope: None,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration)
    }

    /// Check the sample's ranges. Errors name the sample.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration == 0 {
            return Err(ConfigError::invalid(format!(
                "sample '{}': duration must be positive",
                self.name
            )));
        }
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(ConfigError::invalid(format!(
                "sample '{}': frequency must be positive, got {}",
                self.name, self.frequency
            )));
        }
        if !self.volume.is_finite() || !(0.0..=1.0).contains(&self.volume) {
            return Err(ConfigError::invalid(format!(
                "sample '{}': volume must be between 0.0 and 1.0, got {}",
                self.name, self.volume
            )));
        }
        if let Some(envelope) = &self.envelope {
            envelope.validate().map_err(|e| match e {
                ConfigError::Validation(msg) => {
                    ConfigError::invalid(format!("sample '{}': {msg}", self.name))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}
