//! SQL dialect knobs.
//!
//! A dialect is a closed value object: placeholder syntax, IN-list split
//! threshold, LIKE escape set, and string-literal escape rules. Everything
//! upstream of the binder is dialect-agnostic apart from literal escaping.

use serde::{Deserialize, Serialize};

/// The escape character used for LIKE patterns built by `%L`.
pub const LIKE_ESCAPE_CHAR: char = '#';

/// Placeholder syntax emitted by the dialect binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` positional placeholders.
    Question,
    /// `%s` positional placeholders.
    Format,
    /// `:name` named placeholders.
    Named,
}

/// A supported SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// SQLite: `?` placeholders.
    #[default]
    Sqlite,
    /// PostgreSQL: `%s` placeholders.
    Postgresql,
    /// MySQL: `%s` placeholders, backslash escapes in string literals.
    Mysql,
    /// Oracle: `:name` placeholders, 1000-element IN-list limit.
    Oracle,
}

impl Dialect {
    /// Returns the stable identifier used in file suffixes and configuration.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgresql => "postgresql",
            Self::Mysql => "mysql",
            Self::Oracle => "oracle",
        }
    }

    /// Parses a stable identifier.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "sqlite" => Some(Self::Sqlite),
            "postgresql" => Some(Self::Postgresql),
            "mysql" => Some(Self::Mysql),
            "oracle" => Some(Self::Oracle),
            _ => None,
        }
    }

    /// Returns the placeholder syntax for this dialect.
    #[must_use]
    pub const fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            Self::Sqlite => PlaceholderStyle::Question,
            Self::Postgresql | Self::Mysql => PlaceholderStyle::Format,
            Self::Oracle => PlaceholderStyle::Named,
        }
    }

    /// Maximum number of elements allowed in a single IN list, if any.
    #[must_use]
    pub const fn in_list_limit(self) -> Option<usize> {
        match self {
            Self::Oracle => Some(1000),
            _ => None,
        }
    }

    /// Characters that must be escaped inside LIKE patterns.
    #[must_use]
    pub const fn like_escape_chars(self) -> &'static [char] {
        match self {
            // Oracle also treats the full-width forms as wildcards.
            Self::Oracle => &['%', '_', '％', '＿'],
            _ => &['%', '_'],
        }
    }

    /// Whether backslash starts an escape sequence inside string literals.
    #[must_use]
    pub const fn backslash_escapes(self) -> bool {
        matches!(self, Self::Mysql)
    }

    /// Escapes LIKE metacharacters (and the escape character itself) in `s`
    /// with [`LIKE_ESCAPE_CHAR`].
    #[must_use]
    pub fn escape_like(self, s: &str) -> String {
        let specials = self.like_escape_chars();
        let mut escaped = String::with_capacity(s.len());
        for c in s.chars() {
            if c == LIKE_ESCAPE_CHAR || specials.contains(&c) {
                escaped.push(LIKE_ESCAPE_CHAR);
            }
            escaped.push(c);
        }
        escaped
    }
}
