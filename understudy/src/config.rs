//! Substitute configuration.
//!
//! Configuration can be built in code or read from a TOML file:
//!
//! ```toml
//! name = "payments"
//! unmatched = "loose"
//! log_arguments = false
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for one substitute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstituteConfig {
    /// Name used in log events and error messages.
    pub name: String,

    /// What a call with no matching setup does.
    pub unmatched: UnmatchedPolicy,

    /// Include argument values in trace events.
    pub log_arguments: bool,
}

impl Default for SubstituteConfig {
    fn default() -> Self {
        Self {
            name: "substitute".to_string(),
            unmatched: UnmatchedPolicy::Strict,
            log_arguments: true,
        }
    }
}

/// Behavior for calls that no setup matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
    /// Surface the unmatched call as an error.
    #[default]
    Strict,
    /// Return the default value of the call's return kind.
    Loose,
}

impl SubstituteConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a default configuration with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns this configuration with a different unmatched-call policy.
    pub fn with_unmatched(mut self, policy: UnmatchedPolicy) -> Self {
        self.unmatched = policy;
        self
    }

    /// Parses a configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Renders this configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
