//! Error handling for tplforge
//!
//! Every fallible layer returns a [`TemplateError`]. Most variants describe
//! conditions the engine recovers from on its own:
//!
//! - [`TemplateError::NotFound`] drives the resolver's fallback chain and is never
//!   surfaced to callers of `resolve`.
//! - [`TemplateError::Parse`] and [`TemplateError::Io`] are logged and treated as
//!   "not found" during resolution.
//! - [`TemplateError::Expression`] is logged by the renderer, which keeps the
//!   offending construct verbatim in its output.
//!
//! Only configuration loading and source listing propagate errors to the caller.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// The error type for template loading, parsing and evaluation.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// No document exists at the requested location.
    #[error("Template not found: {location}")]
    NotFound {
        location: String,
    },

    /// The document text does not follow the line grammar.
    #[error("Failed to parse template '{location}' at line {line}, column {column}: {message}")]
    Parse {
        location: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// Reading the document failed for a reason other than absence.
    #[error("Failed to read template '{location}': {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// The location is absolute or escapes the template root.
    #[error("Invalid template location '{location}': {reason}")]
    InvalidLocation {
        location: String,
        reason: String,
    },

    /// An expression inside `{{ }}` or a block tag could not be parsed.
    #[error("Invalid expression '{expression}': {message}")]
    Expression {
        expression: String,
        message: String,
    },

    /// A render context could not be built from the supplied input.
    #[error("Invalid render context: {message}")]
    Context {
        message: String,
    },
}

impl TemplateError {
    /// Whether this error only signals absence of a document.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, TemplateError::NotFound { .. })
    }

    /// Whether the resolver may skip past this error to the next candidate.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TemplateError::NotFound { .. }
                | TemplateError::Parse { .. }
                | TemplateError::Io { .. }
                | TemplateError::InvalidLocation { .. }
        )
    }

    pub(crate) fn expression(expression: &str, message: impl Into<String>) -> Self {
        TemplateError::Expression {
            expression: expression.to_string(),
            message: message.into(),
        }
    }
}
