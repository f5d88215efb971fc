//! Token types for the template tokenizer.

use super::Span;

/// The kind of token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Plain SQL text. Never contains newlines, quotes, or comment starts.
    Text(String),
    /// A string literal including its quotes; may span physical lines.
    StringLiteral(String),
    /// A `--` comment up to (excluding) the newline, including the `--`.
    LineComment(String),
    /// A `/* ... */` comment that is not a parameter comment, delimiters
    /// included.
    BlockComment(String),
    /// A parameter comment; carries the body between `/*` and `*/`.
    ParamComment(String),
    /// A line break.
    Newline,
}

/// A token with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// Byte range in the template.
    pub span: Span,
    /// 1-based line on which the token starts.
    pub line: u32,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span, line: u32) -> Self {
        Self { kind, span, line }
    }

    /// Returns true for line-break tokens.
    #[must_use]
    pub const fn is_newline(&self) -> bool {
        matches!(self.kind, TokenKind::Newline)
    }
}
