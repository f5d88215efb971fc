//! The parse pipeline and its public entry points.
//!
//! `Engine` runs the staged transformation: include expansion, tokenizing,
//! line assembly, directive resolution, tree building, parameter
//! evaluation, removal propagation, cleanup, and dialect binding. The whole
//! pipeline is a pure function of (template, bindings, dialect); the engine
//! itself never logs and never touches I/O except through the caller's
//! include resolver.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::binder;
use crate::bindings::Bindings;
use crate::dialect::Dialect;
use crate::directive;
use crate::error::{ParseError, Result};
use crate::lexer::{Lexer, TokenKind};
use crate::line;
use crate::param;
use crate::tree;
use crate::value::BindValue;

static INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)^\s*%\s*include\s+"([^"]+)"\s*$"#).unwrap());

/// Knobs for a parse run.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Column width of a tab when computing indent depth.
    pub tab_width: usize,
    /// Whether error snippets quote the offending template text.
    pub snippets: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            tab_width: 4,
            snippets: true,
        }
    }
}

/// A note the engine wants the caller to see; never logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based template line.
    pub line: u32,
    /// Human-readable description.
    pub message: String,
}

/// The outcome of a successful parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    /// Final SQL in the dialect's placeholder syntax.
    pub sql: String,
    /// Positional parameters, in placeholder order.
    pub params: Vec<BindValue>,
    /// Named parameters keyed `name_N`; authoritative for the `:name`
    /// placeholder style.
    pub named_params: IndexMap<String, BindValue>,
    /// Diagnostics collected during the run.
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolves `%include` paths to template text.
///
/// The engine treats [`ParseError::SqlFileNotFound`] from a resolver as a
/// hard error and propagates it verbatim.
pub trait IncludeResolver {
    /// Returns the template text behind a logical path, preferring a
    /// dialect-specific variant when one exists.
    fn resolve(&self, path: &str, dialect: Option<Dialect>) -> Result<String>;
}

impl<F> IncludeResolver for F
where
    F: Fn(&str, Option<Dialect>) -> Result<String>,
{
    fn resolve(&self, path: &str, dialect: Option<Dialect>) -> Result<String> {
        self(path, dialect)
    }
}

/// The two-way SQL engine.
pub struct Engine {
    dialect: Dialect,
    options: ParseOptions,
    resolver: Option<Box<dyn IncludeResolver + Send + Sync>>,
}

impl Engine {
    /// Creates an engine for the given dialect.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            options: ParseOptions::default(),
            resolver: None,
        }
    }

    /// Overrides the parse options.
    #[must_use]
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Installs an include resolver for `%include` directives.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl IncludeResolver + Send + Sync + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Returns the engine's dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Compiles a template against the bindings.
    pub fn parse(&self, template: &str, bindings: &Bindings) -> Result<ParseResult> {
        let mut stack: Vec<String> = Vec::new();
        let text = self.expand_includes(template, &mut stack)?;

        let tokens = Lexer::new(&text, self.dialect).tokenize()?;
        let mut lines = line::assemble(tokens, self.options.tab_width);

        directive::apply_block(&mut lines, bindings)?;
        for logical in lines.iter_mut() {
            if !logical.removed {
                directive::apply_inline(logical, bindings)?;
            }
        }
        tree::build(&mut lines);

        let diagnostics = param::evaluate(&mut lines, bindings, self.dialect, &self.options)?;
        tree::propagate(&mut lines);
        let (sql, binds) = crate::rewrite::render(&mut lines);

        let bound = binder::bind(&sql, &binds, self.dialect)?;
        Ok(ParseResult {
            sql: bound.sql,
            params: bound.params,
            named_params: bound.named,
            diagnostics,
        })
    }

    /// Splices `%include` templates into the text before tokenizing. The
    /// visited stack rejects cycles; included text re-expands recursively.
    fn expand_includes(&self, template: &str, stack: &mut Vec<String>) -> Result<String> {
        let tokens = Lexer::new(template, self.dialect).tokenize()?;
        let mut has_include = false;
        for token in &tokens {
            if let TokenKind::ParamComment(body) = &token.kind {
                if INCLUDE.is_match(body) {
                    has_include = true;
                    break;
                }
            }
        }
        if !has_include {
            return Ok(String::from(template));
        }

        let mut out = String::with_capacity(template.len());
        let mut cursor = 0usize;
        for token in tokens {
            let TokenKind::ParamComment(body) = &token.kind else {
                continue;
            };
            let Some(caps) = INCLUDE.captures(body) else {
                continue;
            };
            let path = String::from(&caps[1]);
            out.push_str(&template[cursor..token.span.start]);
            cursor = token.span.end;

            if stack.iter().any(|seen| *seen == path) {
                return Err(ParseError::IncludeCycle { path });
            }
            let Some(resolver) = &self.resolver else {
                return Err(ParseError::SqlFileNotFound { path });
            };
            let loaded = resolver.resolve(&path, Some(self.dialect))?;
            stack.push(path);
            let expanded = self.expand_includes(&loaded, stack)?;
            stack.pop();

            // Re-indent continuation lines to the include site's column.
            let prefix: String = out
                .rsplit('\n')
                .next()
                .unwrap_or("")
                .chars()
                .take_while(|c| c.is_whitespace())
                .collect();
            let at_line_start = out.rsplit('\n').next().unwrap_or("").trim().is_empty();
            let body_text = expanded.trim_end_matches('\n');
            for (i, include_line) in body_text.split('\n').enumerate() {
                if i > 0 {
                    out.push('\n');
                    if at_line_start {
                        out.push_str(&prefix);
                    }
                }
                out.push_str(include_line);
            }
        }
        out.push_str(&template[cursor..]);
        Ok(out)
    }
}

/// Compiles a template with the default `?` placeholder dialect.
pub fn parse(template: &str, bindings: &Bindings) -> Result<ParseResult> {
    Engine::new(Dialect::default()).parse(template, bindings)
}
