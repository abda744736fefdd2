//! # Roster Error Types
//!
//! Loading a roster fails on the first bad recipe. Errors raised by the
//! entity model itself pass through unchanged.

use chimera_core::ModelError;
use thiserror::Error;

/// Errors that can occur while loading or using a roster.
#[derive(Error, Debug)]
pub enum RosterError {
    /// The recipe source is not valid TOML or does not match the schema.
    #[error("invalid roster config: {0}")]
    Config(String),

    /// The recipe file could not be read.
    #[error("cannot read roster file: {0}")]
    Io(#[from] std::io::Error),

    /// A method names a behavior the catalog does not have.
    #[error("method `{method}` uses unknown behavior `{behavior}`")]
    UnknownBehavior {
        /// The method being bound.
        method: String,
        /// The behavior it asked for.
        behavior: String,
    },

    /// A behavior was given a `with` argument it cannot use.
    #[error("behavior `{behavior}` expects {expected}")]
    BehaviorArgs {
        /// The behavior being built.
        behavior: String,
        /// Description of the accepted argument.
        expected: &'static str,
    },

    /// No trait with this name was loaded.
    #[error("unknown trait `{0}`")]
    UnknownTrait(String),

    /// Template parents loop back on themselves.
    #[error("template parents form a cycle through `{0}`")]
    ParentCycle(String),

    /// Error from the entity model.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result type for roster operations.
pub type RosterResult<T> = Result<T, RosterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_errors_are_transparent() {
        let err = RosterError::from(ModelError::UnknownTemplate("ghost".to_string()));
        assert_eq!(err.to_string(), "unknown template `ghost`");
        assert!(matches!(err, RosterError::Model(ModelError::UnknownTemplate(_))));
    }
}
