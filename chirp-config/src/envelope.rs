//! ADSR envelope shape, expressed as fractions of a tone's duration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Shape of the amplitude envelope applied to every rendered tone.
///
/// `attack`, `decay` and `release` are fractions of the tone's length; the
/// sustain phase fills whatever remains. `sustain` is a level, not a length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    #[serde(default = "crate::defaults::attack")]
    pub attack: f64,
    #[serde(default = "crate::defaults::decay")]
    pub decay: f64,
    #[serde(default = "crate::defaults::sustain")]
    pub sustain: f64,
    #[serde(default = "crate::defaults::release")]
    pub release: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack: crate::defaults::attack(),
            decay: crate::defaults::decay(),
            sustain: crate::defaults::sustain(),
            release: crate::defaults::release(),
        }
    }
}

impl EnvelopeConfig {
    /// Check that every phase is a fraction in `[0, 1]` and that attack,
    /// decay and release together fit inside the tone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("attack", self.attack),
            ("decay", self.decay),
            ("sustain", self.sustain),
            ("release", self.release),
        ];
        for (field, value) in fields {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(format!(
                    "envelope {field} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }

        let total = self.attack + self.decay + self.release;
        // Allow for the rounding of values such as 0.1 + 0.2 + 0.7.
        if total > 1.0 + 1e-9 {
            return Err(ConfigError::invalid(format!(
                "envelope attack + decay + release must not exceed 1.0, got {total}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_envelope_is_valid() {
        assert!(EnvelopeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_envelope_phases_may_fill_whole_tone() {
        let env = EnvelopeConfig {
            attack: 0.1,
            decay: 0.2,
            sustain: 0.5,
            release: 0.7,
        };
        assert!(env.validate().is_ok());
    }

    #[test]
    fn test_envelope_overlapping_phases_rejected() {
        let env = EnvelopeConfig {
            attack: 0.5,
            decay: 0.3,
            sustain: 0.5,
            release: 0.3,
        };
        assert!(matches!(env.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_envelope_out_of_range_rejected() {
        let env = EnvelopeConfig {
            sustain: 1.5,
            ..EnvelopeConfig::default()
        };
        assert!(env.validate().is_err());

        let env = EnvelopeConfig {
            attack: f64::NAN,
            ..EnvelopeConfig::default()
        };
        assert!(env.validate().is_err());
    }
}
