//! # Model Configuration
//!
//! Knobs for the factory and composer. Loaded once at startup, usually from
//! a TOML table:
//!
//! ```toml
//! strict_overrides = true
//! publish_seal = "frozen"
//! recommended_chain_depth = 2
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::model::SealLevel;

/// Configuration shared by the factory and the composer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Reject override keys that no template on the chain defines.
    pub strict_overrides: bool,
    /// Seal level applied when a draft template is published implicitly
    /// (by creating an entity from it or composing with it).
    pub publish_seal: SealLevel,
    /// Chains longer than this still work but are logged as a warning.
    pub recommended_chain_depth: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            strict_overrides: false,
            publish_seal: SealLevel::Open,
            recommended_chain_depth: 2,
        }
    }
}

impl ModelConfig {
    /// Parses a configuration from TOML source.
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if the source is not valid TOML
    /// or contains unknown keys.
    pub fn from_toml(source: &str) -> ModelResult<Self> {
        toml::from_str(source).map_err(|e| ModelError::InvalidConfig(e.to_string()))
    }

    /// Enables strict override checking.
    #[must_use]
    pub const fn strict(mut self) -> Self {
        self.strict_overrides = true;
        self
    }

    /// Sets the seal level used for implicit publication.
    #[must_use]
    pub const fn with_publish_seal(mut self, level: SealLevel) -> Self {
        self.publish_seal = level;
        self
    }

    /// Sets the chain depth above which entity creation logs a warning.
    #[must_use]
    pub const fn with_recommended_chain_depth(mut self, depth: usize) -> Self {
        self.recommended_chain_depth = depth;
        self
    }
}
