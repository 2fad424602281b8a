//! Trigger definitions: byte patterns that fire a sample.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Which side of the session a trigger listens to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// Keystrokes typed by the user.
    Input,
    /// Bytes written by the shell.
    Output,
    /// Both directions (the default).
    #[default]
    Both,
}

impl MatchSource {
    pub fn matches_input(self) -> bool {
        matches!(self, Self::Input | Self::Both)
    }

    pub fn matches_output(self) -> bool {
        matches!(self, Self::Output | Self::Both)
    }
}

/// A named rule mapping byte patterns to one sample and one bounded queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Derived from the table key after loading.
    #[serde(skip)]
    pub name: String,
    /// Literal patterns; each is matched as a byte sequence.
    #[serde(rename = "match")]
    pub patterns: Vec<String>,
    /// Name of the sample in `[samples]` to play.
    pub sample: String,
    /// Capacity of the trigger's playback queue, counting the tone in flight.
    #[serde(default = "crate::defaults::max_length")]
    pub max_length: usize,
    #[serde(default)]
    pub source: MatchSource,
    #[serde(default = "crate::defaults::bool_true")]
    pub enabled: bool,
}

impl TriggerConfig {
    pub fn new(name: &str, patterns: &[&str], sample: &str, max_length: usize) -> Self {
        Self {
            name: name.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            sample: sample.to_string(),
            max_length,
            source: MatchSource::Both,
            enabled: true,
        }
    }

    pub fn with_source(mut self, source: MatchSource) -> Self {
        self.source = source;
        self
    }

    /// Validate the trigger and normalise `max_length = 0` to 1.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.patterns.is_empty() {
            return Err(ConfigError::invalid(format!(
                "trigger '{}': match patterns cannot be empty",
                self.name
            )));
        }
        if self.patterns.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::invalid(format!(
                "trigger '{}': match patterns cannot contain an empty string",
                self.name
            )));
        }
        if self.sample.is_empty() {
            return Err(ConfigError::invalid(format!(
                "trigger '{}': sample name cannot be empty",
                self.name
            )));
        }
        if self.max_length == 0 {
            self.max_length = 1;
        }
        Ok(())
    }

    /// Patterns as raw byte sequences.
    pub fn pattern_bytes(&self) -> Vec<Vec<u8>> {
        self.patterns.iter().map(|p| p.as_bytes().to_vec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_max_length_defaults_to_one() {
        let mut trigger = TriggerConfig::new("t", &["\n"], "s", 0);
        trigger.validate().unwrap();
        assert_eq!(trigger.max_length, 1);
    }

    #[test]
    fn test_empty_patterns_rejected() {
        let mut trigger = TriggerConfig::new("t", &[], "s", 1);
        assert!(trigger.validate().is_err());

        let mut trigger = TriggerConfig::new("t", &[""], "s", 1);
        assert!(trigger.validate().is_err());
    }

    #[test]
    fn test_empty_sample_rejected() {
        let mut trigger = TriggerConfig::new("t", &["x"], "", 1);
        assert!(trigger.validate().is_err());
    }

    #[test]
    fn test_match_source_directions() {
        assert!(MatchSource::Both.matches_input());
        assert!(MatchSource::Both.matches_output());
        assert!(MatchSource::Input.matches_input());
        assert!(!MatchSource::Input.matches_output());
        assert!(!MatchSource::Output.matches_input());
    }

    #[test]
    fn test_pattern_bytes_keep_multibyte_sequences() {
        let trigger = TriggerConfig::new("arrows", &["\x1b[A", "\x1b[B"], "s", 1);
        assert_eq!(
            trigger.pattern_bytes(),
            vec![b"\x1b[A".to_vec(), b"\x1b[B".to_vec()]
        );
    }
}
