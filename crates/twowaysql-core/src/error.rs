//! Error types for the two-way SQL engine.

use thiserror::Error;

/// Errors produced while compiling a two-way SQL template.
///
/// Every error fails the whole parse; there is no partial result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A string literal or block comment ran off the end of the template.
    #[error("unterminated {what} starting on line {line}")]
    Unterminated {
        /// What was left open (`"string literal"` or `"block comment"`).
        what: &'static str,
        /// Line on which the construct opened.
        line: u32,
    },

    /// Illegal modifier combination on a parameter comment.
    #[error("illegal parameter modifier on line {line}: {snippet}")]
    Modifier {
        /// Line carrying the offending comment.
        line: u32,
        /// The comment body, when snippets are enabled.
        snippet: String,
    },

    /// An `@`-marked parameter was missing or negative.
    #[error("required parameter '{name}' is missing or empty (line {line})")]
    Required {
        /// Name of the required parameter.
        name: String,
        /// Line carrying the parameter comment.
        line: u32,
    },

    /// Unbalanced conditional block or unknown directive.
    #[error("directive error on line {line}: {message}")]
    Directive {
        /// Line of the offending directive.
        line: u32,
        /// What went wrong.
        message: String,
    },

    /// IN-list splitting could not locate a column expression.
    #[error("cannot split IN list: {message}")]
    Dialect {
        /// What went wrong.
        message: String,
    },

    /// `%include` reached a template already on the include stack.
    #[error("include cycle detected at '{path}'")]
    IncludeCycle {
        /// The logical path that closed the cycle.
        path: String,
    },

    /// A template file could not be resolved by the loader.
    #[error("SQL file not found: {path}")]
    SqlFileNotFound {
        /// The logical path that failed to resolve.
        path: String,
    },
}

impl ParseError {
    /// Returns the template line the error refers to, when known.
    #[must_use]
    pub const fn line(&self) -> Option<u32> {
        match self {
            Self::Unterminated { line, .. }
            | Self::Modifier { line, .. }
            | Self::Required { line, .. }
            | Self::Directive { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, ParseError>;
