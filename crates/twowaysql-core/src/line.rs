//! Logical lines: the unit of removal.
//!
//! The assembler groups tokens into logical lines, computes indent depth,
//! glues separator-only lines to their continuation, and keeps multi-line
//! string literals inside a single line.

use crate::lexer::{Token, TokenKind};
use crate::value::BindValue;

/// Sentinel emitted for every bound parameter; replaced by the dialect
/// binder at the very end.
pub(crate) const PLACEHOLDER: char = '\u{FFFC}';

/// A slice of a logical line, typed so later stages never rewrite text
/// inside literals or comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Seg {
    /// Plain SQL text.
    Sql(String),
    /// A string literal, quotes included.
    Literal(String),
    /// A comment passed through to the output.
    Comment(String),
    /// A parameter comment body with its source line.
    Param(ParamRef),
}

/// A parameter comment occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParamRef {
    /// The body between `/*` and `*/`, spacing preserved.
    pub body: String,
    /// 1-based source line.
    pub line: u32,
}

/// Output slice produced by the evaluator. `Sql` text may be rewritten by
/// the cleanup passes; `Raw` text (literals, comments) never is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OutSeg {
    /// Rewritable SQL text, possibly containing placeholder sentinels.
    Sql(String),
    /// Opaque text emitted verbatim.
    Raw(String),
}

/// A parameter recorded in emission order, one per sentinel.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Bind {
    /// Originating parameter name.
    pub name: String,
    /// The bound value.
    pub value: BindValue,
}

/// Structural classification of a logical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FragmentKind {
    /// Ordinary content.
    Normal,
    /// A separator with no continuation line to glue to.
    SeparatorOnly,
    /// A block-directive comment line.
    Directive,
    /// The body head of a `WITH name AS ( ... )` block; exempt from
    /// child-driven removal.
    CteHeader,
}

/// One logical line of the template.
#[derive(Debug, Clone)]
pub(crate) struct LogicalLine {
    /// 1-based number of the first physical line.
    pub number: u32,
    /// Indent depth in columns; the virtual root sits at -1.
    pub indent: i32,
    /// Structural classification.
    pub kind: FragmentKind,
    /// Input segments.
    pub segs: Vec<Seg>,
    /// Arena index of the parent line.
    pub parent: Option<usize>,
    /// Arena indices of child lines.
    pub children: Vec<usize>,
    /// Whether the line has been struck from the output.
    pub removed: bool,
    /// Evaluator output.
    pub out: Vec<OutSeg>,
    /// Parameters bound on this line, in sentinel order.
    pub binds: Vec<Bind>,
    /// Whether evaluation excised part of this line.
    pub pruned: bool,
    /// Whether cleanup shortened the tail of this line.
    pub tail_pruned: bool,
    /// Whether the line owns a surviving parameter site.
    pub live_site: bool,
}

impl LogicalLine {
    fn new(number: u32) -> Self {
        Self {
            number,
            indent: 0,
            kind: FragmentKind::Normal,
            segs: Vec::new(),
            parent: None,
            children: Vec::new(),
            removed: false,
            out: Vec::new(),
            binds: Vec::new(),
            pruned: false,
            tail_pruned: false,
            live_site: false,
        }
    }

    /// Returns true for structurally blank lines.
    pub fn is_blank(&self) -> bool {
        self.segs.is_empty()
    }

    /// The separator keyword when the line holds nothing else.
    fn separator_text(&self) -> Option<String> {
        if self.segs.is_empty() {
            return None;
        }
        let mut text = String::new();
        for seg in &self.segs {
            match seg {
                Seg::Sql(t) => text.push_str(t),
                _ => return None,
            }
        }
        let trimmed = text.trim();
        let upper = trimmed
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        match upper.as_str() {
            "AND" | "OR" | "UNION" | "UNION ALL" | "INTERSECT" | "EXCEPT" | "," => {
                Some(String::from(trimmed))
            }
            _ => None,
        }
    }
}

/// Expands leading whitespace to a column count and returns the stripped
/// remainder.
fn split_indent(text: &str, tab_width: usize) -> (i32, &str) {
    let mut column = 0usize;
    let mut offset = 0usize;
    for c in text.chars() {
        match c {
            ' ' => column += 1,
            '\t' => column = (column / tab_width + 1) * tab_width,
            _ => break,
        }
        offset += c.len_utf8();
    }
    #[allow(clippy::cast_possible_wrap)]
    (column as i32, &text[offset..])
}

/// Groups tokens into logical lines.
pub(crate) fn assemble(tokens: Vec<Token>, tab_width: usize) -> Vec<LogicalLine> {
    let mut physical: Vec<LogicalLine> = Vec::new();
    let mut current = LogicalLine::new(1);
    let mut started = false;

    for token in tokens {
        if !started {
            current.number = token.line;
            started = true;
        }
        match token.kind {
            TokenKind::Newline => {
                physical.push(finish_line(current, tab_width));
                current = LogicalLine::new(token.line + 1);
                started = true;
            }
            TokenKind::Text(t) => current.segs.push(Seg::Sql(t)),
            TokenKind::StringLiteral(t) => current.segs.push(Seg::Literal(t)),
            TokenKind::LineComment(t) | TokenKind::BlockComment(t) => {
                current.segs.push(Seg::Comment(t));
            }
            TokenKind::ParamComment(body) => current.segs.push(Seg::Param(ParamRef {
                body,
                line: token.line,
            })),
        }
    }
    if !current.segs.is_empty() {
        physical.push(finish_line(current, tab_width));
    }

    glue_separators(physical)
}

/// Computes indent and normalizes blank lines.
fn finish_line(mut line: LogicalLine, tab_width: usize) -> LogicalLine {
    if let Some(Seg::Sql(first)) = line.segs.first() {
        let (indent, rest) = split_indent(first, tab_width);
        line.indent = indent;
        let rest = String::from(rest);
        if rest.is_empty() && line.segs.len() > 1 {
            line.segs.remove(0);
        } else {
            line.segs[0] = Seg::Sql(rest);
        }
    }
    let blank = line.segs.iter().all(|seg| match seg {
        Seg::Sql(t) => t.trim().is_empty(),
        _ => false,
    });
    if blank {
        line.segs.clear();
        line.indent = 0;
    }
    line
}

/// Glues separator-only lines (`AND`, `UNION`, a bare comma, ...) onto the
/// following non-blank line, which adopts the separator as a prefix.
fn glue_separators(physical: Vec<LogicalLine>) -> Vec<LogicalLine> {
    let mut lines: Vec<LogicalLine> = Vec::with_capacity(physical.len());
    let mut pending: Option<(String, u32)> = None;

    for mut line in physical {
        if line.is_blank() {
            lines.push(line);
            continue;
        }
        if let Some(sep) = line.separator_text() {
            pending = match pending.take() {
                Some((prefix, number)) => Some((format!("{prefix} {sep}"), number)),
                None => Some((sep, line.number)),
            };
            continue;
        }
        if let Some((prefix, number)) = pending.take() {
            line.segs.insert(0, Seg::Sql(format!("{prefix} ")));
            line.number = number;
        }
        lines.push(line);
    }
    if let Some((prefix, number)) = pending {
        let mut line = LogicalLine::new(number);
        line.kind = FragmentKind::SeparatorOnly;
        line.segs.push(Seg::Sql(prefix));
        lines.push(line);
    }
    lines
}

/// Concatenates the rendered text of output segments.
pub(crate) fn out_text(out: &[OutSeg]) -> String {
    let mut text = String::new();
    for seg in out {
        match seg {
            OutSeg::Sql(t) | OutSeg::Raw(t) => text.push_str(t),
        }
    }
    text
}

/// Concatenates the raw text of input segments.
pub(crate) fn seg_text(segs: &[Seg]) -> String {
    let mut text = String::new();
    for seg in segs {
        match seg {
            Seg::Sql(t) | Seg::Literal(t) | Seg::Comment(t) => text.push_str(t),
            Seg::Param(p) => {
                text.push_str("/*");
                text.push_str(&p.body);
                text.push_str("*/");
            }
        }
    }
    text
}
