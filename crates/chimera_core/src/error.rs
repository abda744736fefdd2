//! # Model Error Types
//!
//! All errors that can occur while defining templates, building entities,
//! composing traits or invoking methods.
//!
//! Every variant is a programmer error raised at the call that broke the
//! contract. None of them is retryable. A lookup miss is NOT an error: the
//! resolver reports it as [`Lookup::NotFound`](crate::model::Lookup::NotFound).

use thiserror::Error;

use crate::model::SealLevel;

/// Errors that can occur in the entity model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A template with this name is already registered.
    #[error("template `{0}` is already defined")]
    DuplicateTemplateName(String),

    /// The requested parent is not a registered, published template.
    #[error("template `{template}` names parent `{parent}`, which is not a published template")]
    UnknownParent {
        /// The template being defined.
        template: String,
        /// The parent it asked for.
        parent: String,
    },

    /// No template is registered under this name.
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),

    /// Strict mode rejected an override key absent from the delegation chain.
    #[error("override key `{key}` does not exist on the delegation chain of `{template}`")]
    InvalidOverrideKey {
        /// The template the entity was created from.
        template: String,
        /// The offending key.
        key: String,
    },

    /// The mutability guard rejected a write to a template's own table.
    #[error("cannot write `{key}` to {level} template `{template}`")]
    WriteToFrozenTemplate {
        /// The template that was written to.
        template: String,
        /// The member key of the rejected write.
        key: String,
        /// The seal level that rejected it.
        level: SealLevel,
    },

    /// A member required by the operation does not resolve.
    #[error("member `{0}` not found")]
    MemberNotFound(String),

    /// A field was invoked as if it were a method.
    #[error("member `{0}` is a field, not a method")]
    NotCallable(String),

    /// A member resolved to a value of the wrong kind.
    #[error("member `{member}` is not {expected}")]
    TypeMismatch {
        /// The member that was read.
        member: String,
        /// What the caller expected, e.g. "an integer".
        expected: &'static str,
    },

    /// A method rejected its arguments or the receiver's state.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
