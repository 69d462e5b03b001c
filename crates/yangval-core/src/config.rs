//! Engine configuration
//!
//! All fields are defaulted so an empty TOML document is a valid config.
//!
//! ```
//! use yangval_core::config::{EngineConfig, ImpactPolicy};
//!
//! let config = EngineConfig::from_toml_str("impact_policy = \"full\"").unwrap();
//! assert_eq!(config.impact_policy, ImpactPolicy::Full);
//! assert_eq!(config.max_default_passes, 64);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the dependency tracker treats expressions that reference a list or
/// leaf-list as a bare node-set (no key or value predicate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImpactPolicy {
    /// Bare node-set references do not propagate impact (compatible behavior)
    #[default]
    PreserveUnkeyedSkip,
    /// Every reference propagates impact
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub impact_policy: ImpactPolicy,
    /// Iteration cap for the default pass fixed point
    pub max_default_passes: usize,
    /// Commit records retained by a datastore
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            impact_policy: ImpactPolicy::default(),
            max_default_passes: 64,
            history_limit: 16,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl EngineConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML or unknown enum values,
    /// `ConfigError::Invalid` when a value is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `max_default_passes` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_default_passes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_default_passes".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_impact_policy(mut self, policy: ImpactPolicy) -> Self {
        self.impact_policy = policy;
        self
    }
}
