//! Auxiliary `%` functions inside parameter comments.
//!
//! `%concat(a, 'x', b)` and the shorthand `%C 'x' a 'y'` build one bound
//! string from resolved arguments. `%L` does the same and then escapes LIKE
//! metacharacters. `%STR(name)` / `%SQL(name)` splice a value verbatim.
//! `%include "path"` is consumed by the engine before evaluation.

use crate::error::{ParseError, Result};

/// One argument of a concatenating function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Arg {
    /// A binding name.
    Name(String),
    /// A literal chunk taken from the template.
    Lit(String),
}

/// A parsed auxiliary call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AuxCall {
    /// `%concat(...)` or `%C ...`.
    Concat(Vec<Arg>),
    /// `%L ...`: concat plus LIKE escaping.
    LikeConcat(Vec<Arg>),
    /// `%STR(name)` / `%SQL(name)`: verbatim splice.
    Splice(String),
    /// `%include "path"`.
    Include(String),
}

fn directive_error(line: u32, message: impl Into<String>) -> ParseError {
    ParseError::Directive {
        line,
        message: message.into(),
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Splits `'quoted'` and bare tokens, with `''` unescaped inside quotes.
/// `comma_separated` selects `%concat` argument syntax over the
/// whitespace-separated `%C`/`%L` form.
fn parse_args(input: &str, comma_separated: bool, line: u32) -> Result<Vec<Arg>> {
    let mut args = Vec::new();
    let mut chars = input.char_indices().peekable();
    let mut bare = String::new();

    let flush = |bare: &mut String, args: &mut Vec<Arg>, line: u32| -> Result<()> {
        let token = bare.trim();
        if token.is_empty() {
            bare.clear();
            return Ok(());
        }
        if is_ident(token) {
            args.push(Arg::Name(String::from(token)));
        } else if token.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') {
            args.push(Arg::Lit(String::from(token)));
        } else {
            return Err(directive_error(line, format!("malformed argument '{token}'")));
        }
        bare.clear();
        Ok(())
    };

    while let Some((_, c)) = chars.next() {
        match c {
            '\'' => {
                flush(&mut bare, &mut args, line)?;
                let mut lit = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\'')) => {
                            if chars.peek().is_some_and(|&(_, next)| next == '\'') {
                                chars.next();
                                lit.push('\'');
                            } else {
                                break;
                            }
                        }
                        Some((_, other)) => lit.push(other),
                        None => {
                            return Err(directive_error(line, "unterminated argument literal"));
                        }
                    }
                }
                args.push(Arg::Lit(lit));
            }
            ',' if comma_separated => flush(&mut bare, &mut args, line)?,
            c if c.is_whitespace() && !comma_separated => flush(&mut bare, &mut args, line)?,
            c => bare.push(c),
        }
    }
    flush(&mut bare, &mut args, line)?;
    Ok(args)
}

fn paren_interior<'a>(rest: &'a str, what: &str, line: u32) -> Result<&'a str> {
    let rest = rest.trim();
    rest.strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .ok_or_else(|| directive_error(line, format!("{what} expects parenthesized arguments")))
}

/// Parses an auxiliary function body (must start with `%`). Directive
/// keywords never reach this point; an unknown word is a `Directive` error.
pub(crate) fn parse_aux(body: &str, line: u32) -> Result<AuxCall> {
    let trimmed = body.trim();
    let rest = trimmed
        .strip_prefix('%')
        .ok_or_else(|| directive_error(line, "expected a % function"))?;
    let word_len = rest.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    let (word, tail) = rest.split_at(word_len);

    match word.to_ascii_lowercase().as_str() {
        "concat" => {
            let inner = paren_interior(tail, "%concat", line)?;
            Ok(AuxCall::Concat(parse_args(inner, true, line)?))
        }
        "c" => Ok(AuxCall::Concat(parse_args(tail, false, line)?)),
        "l" => Ok(AuxCall::LikeConcat(parse_args(tail, false, line)?)),
        "str" | "sql" => {
            let inner = paren_interior(tail, "%STR/%SQL", line)?.trim();
            if !is_ident(inner) {
                return Err(directive_error(line, format!("bad splice name '{inner}'")));
            }
            Ok(AuxCall::Splice(String::from(inner)))
        }
        "include" => {
            let path = tail
                .trim()
                .strip_prefix('"')
                .and_then(|p| p.strip_suffix('"'))
                .ok_or_else(|| directive_error(line, "%include expects a quoted path"))?;
            Ok(AuxCall::Include(String::from(path)))
        }
        other => Err(directive_error(line, format!("unknown directive '%{other}'"))),
    }
}
