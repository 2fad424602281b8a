//! Typed error variants for the chirp-config crate.
//!
//! Every failure here is a fatal-startup condition: the engine refuses to
//! start a session with a configuration that does not load or validate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration.
///
/// ```rust,no_run
/// use chirp_config::{Config, ConfigError};
///
/// match Config::load(None) {
///     Ok(config) => println!("{} triggers", config.triggers.len()),
///     Err(ConfigError::UnknownSample { trigger, sample }) => {
///         eprintln!("trigger '{trigger}' points at missing sample '{sample}'")
///     }
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config {path:?}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file contained invalid TOML or fields of the wrong type.
    #[error("TOML parse error in config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered back to TOML.
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A field value failed semantic validation.
    ///
    /// The inner string names the offending entry and why it was rejected.
    #[error("Config validation error: {0}")]
    Validation(String),

    /// A trigger references a sample that is not defined.
    #[error("Trigger '{trigger}' references unknown sample '{sample}'")]
    UnknownSample {
        /// Name of the trigger holding the dangling reference.
        trigger: String,
        /// The sample name it asked for.
        sample: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        ConfigError::Validation(what.into())
    }
}
