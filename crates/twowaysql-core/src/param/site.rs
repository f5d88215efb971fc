//! Parameter comment parsing.

use super::modifier::Modifiers;
use crate::error::{ParseError, Result};

/// A parsed parameter comment: modifiers plus one name, or an ordered name
/// list for `?` fallback chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParamSite {
    /// Modifier flags.
    pub mods: Modifiers,
    /// Parameter names; more than one only for fallback chains.
    pub names: Vec<String>,
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn modifier_error(body: &str, line: u32, snippets: bool) -> ParseError {
    ParseError::Modifier {
        line,
        snippet: if snippets {
            String::from(body.trim())
        } else {
            String::new()
        },
    }
}

/// Parses a parameter comment body.
///
/// Returns `Ok(None)` for bodies that carry no modifier and trail extra
/// words: those read as prose comments and pass through untouched. A body
/// with explicit modifiers must parse fully or it is a `Modifier` error.
pub(crate) fn parse(body: &str, line: u32, snippets: bool) -> Result<Option<ParamSite>> {
    let trimmed = body.trim();

    // Fallback chain: `?a ?b ?c`, optionally negated as a whole.
    if trimmed.starts_with('?') || trimmed.starts_with("!?") {
        let (bang, rest) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let mut names = Vec::new();
        for item in rest.split_whitespace() {
            let name = item
                .strip_prefix('?')
                .filter(|name| is_ident(name))
                .ok_or_else(|| modifier_error(body, line, snippets))?;
            names.push(String::from(name));
        }
        if names.is_empty() {
            return Err(modifier_error(body, line, snippets));
        }
        let mods = Modifiers {
            question: true,
            bang,
            ..Modifiers::default()
        };
        return Ok(Some(ParamSite { mods, names }));
    }

    let (mods, rest) =
        Modifiers::take(trimmed).ok_or_else(|| modifier_error(body, line, snippets))?;
    let mut words = rest.split_whitespace();
    let Some(name) = words.next() else {
        return Err(modifier_error(body, line, snippets));
    };
    let trailing = words.next().is_some();
    if !is_ident(name) || trailing {
        if mods.is_empty() {
            // `/* see the manual */` and friends: prose, not a site.
            return Ok(None);
        }
        return Err(modifier_error(body, line, snippets));
    }
    Ok(Some(ParamSite {
        mods,
        names: vec![String::from(name)],
    }))
}
