//! Configuration system for the chirp terminal feedback engine.
//!
//! This crate provides configuration loading, validation and default values:
//!
//! - Samples (tone frequency, duration, volume, optional envelope)
//! - Triggers (byte patterns, sample reference, queue length, direction)
//! - Engine settings (minimum gap, echo window, burst threshold, audio format)
//! - Config file discovery under `~/.config/chirp`

pub mod config;
pub mod defaults;
pub mod envelope;
pub mod error;
pub mod sample;
pub mod settings;
pub mod trigger;

// Re-export main types for convenience
pub use config::Config;
pub use envelope::EnvelopeConfig;
pub use error::ConfigError;
pub use sample::SampleConfig;
pub use settings::{MAX_CHANNELS, Settings};
pub use trigger::{MatchSource, TriggerConfig};
