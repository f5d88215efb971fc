//! The template tokenizer implementation.

use std::sync::LazyLock;

use regex::Regex;

use super::{Span, Token, TokenKind};
use crate::dialect::Dialect;
use crate::error::{ParseError, Result};

/// A block comment is a parameter comment when its body starts with an
/// optional modifier run followed by a name or `%` function head.
static PARAM_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[$&@?!]*[A-Za-z_%][\w%]*").unwrap());

/// Tokenizes a two-way SQL template.
pub struct Lexer<'a> {
    /// The template source.
    input: &'a str,
    /// Current byte position.
    pos: usize,
    /// Byte position where the current token started.
    start: usize,
    /// 1-based line of the current position.
    line: u32,
    /// Whether backslash escapes terminate early inside string literals.
    backslash_escapes: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given template and dialect.
    #[must_use]
    pub fn new(input: &'a str, dialect: Dialect) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
            line: 1,
            backslash_escapes: dialect.backslash_escapes(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn make_token(&self, kind: TokenKind, line: u32) -> Token {
        Token::new(kind, Span::new(self.start, self.pos), line)
    }

    /// Scans a `--` comment up to the newline (exclusive).
    fn scan_line_comment(&mut self) -> Token {
        let line = self.line;
        self.advance();
        self.advance();
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
        let text = String::from(&self.input[self.start..self.pos]);
        self.make_token(TokenKind::LineComment(text), line)
    }

    /// Scans a `/* ... */` comment, classifying parameter comments by their
    /// body head. Block comments do not nest.
    fn scan_block_comment(&mut self) -> Result<Token> {
        let line = self.line;
        self.advance();
        self.advance();
        let body_start = self.pos;
        loop {
            match self.peek() {
                Some('*') if self.peek_next() == Some('/') => {
                    let body_end = self.pos;
                    self.advance();
                    self.advance();
                    let body = &self.input[body_start..body_end];
                    let kind = if PARAM_HEAD.is_match(body) {
                        TokenKind::ParamComment(String::from(body))
                    } else {
                        TokenKind::BlockComment(String::from(&self.input[self.start..self.pos]))
                    };
                    return Ok(self.make_token(kind, line));
                }
                Some(_) => {
                    self.advance();
                }
                None => {
                    return Err(ParseError::Unterminated {
                        what: "block comment",
                        line,
                    });
                }
            }
        }
    }

    /// Scans a string literal, honouring `''` doubling and, when the dialect
    /// allows, backslash escapes. Literals may span physical lines.
    fn scan_string(&mut self) -> Result<Token> {
        let line = self.line;
        self.advance();
        loop {
            match self.peek() {
                Some('\'') => {
                    if self.peek_next() == Some('\'') {
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        let text = String::from(&self.input[self.start..self.pos]);
                        return Ok(self.make_token(TokenKind::StringLiteral(text), line));
                    }
                }
                Some('\\') if self.backslash_escapes => {
                    self.advance();
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
                None => {
                    return Err(ParseError::Unterminated {
                        what: "string literal",
                        line,
                    });
                }
            }
        }
    }

    /// Scans a run of plain text up to the next newline, quote, or comment
    /// start.
    fn scan_text(&mut self) -> Token {
        let line = self.line;
        while let Some(c) = self.peek() {
            if c == '\n' || c == '\'' {
                break;
            }
            if c == '-' && self.peek_next() == Some('-') {
                break;
            }
            if c == '/' && self.peek_next() == Some('*') {
                break;
            }
            self.advance();
        }
        let text = String::from(&self.input[self.start..self.pos]);
        self.make_token(TokenKind::Text(text), line)
    }

    /// Tokenizes the whole template.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            self.start = self.pos;
            let token = match c {
                '\n' => {
                    let line = self.line;
                    self.advance();
                    self.make_token(TokenKind::Newline, line)
                }
                '\'' => self.scan_string()?,
                '-' if self.peek_next() == Some('-') => self.scan_line_comment(),
                '/' if self.peek_next() == Some('*') => self.scan_block_comment()?,
                _ => self.scan_text(),
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input, Dialect::Sqlite)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn empty_input() {
        assert!(kinds("").is_empty());
    }

    #[test]
    fn plain_text_and_newlines() {
        assert_eq!(
            kinds("SELECT 1\nFROM t"),
            vec![
                TokenKind::Text(String::from("SELECT 1")),
                TokenKind::Newline,
                TokenKind::Text(String::from("FROM t")),
            ]
        );
    }

    #[test]
    fn string_literal_with_doubling() {
        assert_eq!(
            kinds("'it''s'"),
            vec![TokenKind::StringLiteral(String::from("'it''s'"))]
        );
    }

    #[test]
    fn comment_start_inside_literal_is_text() {
        // The tokenizer must never hunt for comments inside a literal.
        assert_eq!(
            kinds("'a /* b */ c'"),
            vec![TokenKind::StringLiteral(String::from("'a /* b */ c'"))]
        );
    }

    #[test]
    fn multi_line_literal_counts_lines() {
        let tokens = Lexer::new("'a\nb' x\ny", Dialect::Sqlite).tokenize().unwrap();
        assert_eq!(tokens[0].line, 1);
        // " x" follows the literal on what is physically line 2.
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[3].line, 3);
    }

    #[test]
    fn line_comment_excludes_newline() {
        assert_eq!(
            kinds("a -- note\nb"),
            vec![
                TokenKind::Text(String::from("a ")),
                TokenKind::LineComment(String::from("-- note")),
                TokenKind::Newline,
                TokenKind::Text(String::from("b")),
            ]
        );
    }

    #[test]
    fn parameter_comment_classification() {
        assert_eq!(
            kinds("/* $name */"),
            vec![TokenKind::ParamComment(String::from(" $name "))]
        );
        assert_eq!(
            kinds("/*%if cond*/"),
            vec![TokenKind::ParamComment(String::from("%if cond"))]
        );
        // A body that starts with punctuation is an ordinary comment.
        assert_eq!(
            kinds("/* +optimizer hint */"),
            vec![TokenKind::BlockComment(String::from("/* +optimizer hint */"))]
        );
    }

    #[test]
    fn unterminated_string_fails() {
        let err = Lexer::new("x = 'oops", Dialect::Sqlite).tokenize().unwrap_err();
        assert_eq!(
            err,
            ParseError::Unterminated {
                what: "string literal",
                line: 1
            }
        );
    }

    #[test]
    fn unterminated_block_comment_fails() {
        let err = Lexer::new("a\n/* $x ", Dialect::Sqlite).tokenize().unwrap_err();
        assert_eq!(
            err,
            ParseError::Unterminated {
                what: "block comment",
                line: 2
            }
        );
    }

    #[test]
    fn mysql_backslash_escape_does_not_close() {
        assert_eq!(
            Lexer::new(r"'a\'b'", Dialect::Mysql)
                .tokenize()
                .unwrap()
                .len(),
            1
        );
        // Without backslash escapes the literal closes at the second quote.
        let tokens = Lexer::new(r"'a\'b'", Dialect::Sqlite).tokenize();
        assert!(tokens.is_err() || tokens.unwrap().len() > 1);
    }
}
