//! The parameter evaluator.
//!
//! Walks each surviving logical line left to right, resolving parameter
//! sites against the bindings: binding values behind placeholder sentinels,
//! expanding lists, rewriting comparisons whose value shape demands it
//! (`IS NULL`, `IN (...)`), and excising conditions whose `$`/`&`
//! parameters are negative.

use std::sync::LazyLock;

use regex::Regex;

use super::functions::{self, Arg, AuxCall};
use super::site::{self, ParamSite};
use crate::bindings::Bindings;
use crate::dialect::Dialect;
use crate::engine::{Diagnostic, ParseOptions};
use crate::error::{ParseError, Result};
use crate::line::{out_text, Bind, LogicalLine, OutSeg, ParamRef, Seg, PLACEHOLDER};
use crate::value::BindValue;

/// Operator token adjacent to a parameter site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpCtx {
    Eq,
    Ne,
    Is,
    IsNot,
    In,
    NotIn,
    Like,
    NotLike,
}

/// Operator found to the right of the comment, consumed from the input.
struct RightOp {
    ctx: OpCtx,
    text: String,
}

/// Resolved value shape driving the rewrite table.
enum Shape {
    Scalar(BindValue),
    List(Vec<BindValue>),
    Null,
}

static TRAILING_OP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:=|<>|!=|NOT\s+LIKE|LIKE|NOT\s+IN|IN|IS\s+NOT|IS)\s*$").unwrap()
});

static HAS_ESCAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bESCAPE\b").unwrap());

/// Evaluates every surviving line in place, returning collected
/// diagnostics.
pub(crate) fn evaluate(
    lines: &mut [LogicalLine],
    bindings: &Bindings,
    dialect: Dialect,
    options: &ParseOptions,
) -> Result<Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();
    for line in lines.iter_mut() {
        if line.removed || line.is_blank() {
            continue;
        }
        let segs = std::mem::take(&mut line.segs);
        let mut ev = LineEval::new(&segs, bindings, dialect, options.snippets, &mut diagnostics);
        ev.run()?;
        let LineEval {
            out,
            binds,
            pruned,
            live_site,
            ..
        } = ev;
        line.out = out;
        line.binds = binds;
        line.pruned = pruned;
        line.live_site = live_site;
        line.segs = segs;
        if out_text(&line.out).trim().is_empty() {
            line.removed = true;
        }
    }
    Ok(diagnostics)
}

/// Cut positions produced by the boundary scan. `remove_at` excludes the
/// connector (used by excision); `keep_at` retains it (used when a rewrite
/// re-emits the condition).
struct Boundary {
    seg: usize,
    remove_at: usize,
    keep_at: usize,
}

struct LineEval<'a> {
    segs: &'a [Seg],
    bindings: &'a Bindings,
    dialect: Dialect,
    snippets: bool,
    diagnostics: &'a mut Vec<Diagnostic>,
    seg_i: usize,
    off: usize,
    out: Vec<OutSeg>,
    binds: Vec<Bind>,
    pruned: bool,
    live_site: bool,
    line_has_escape: bool,
}

impl<'a> LineEval<'a> {
    fn new(
        segs: &'a [Seg],
        bindings: &'a Bindings,
        dialect: Dialect,
        snippets: bool,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        let line_has_escape = segs.iter().any(|seg| match seg {
            Seg::Sql(t) => HAS_ESCAPE.is_match(t),
            _ => false,
        });
        Self {
            segs,
            bindings,
            dialect,
            snippets,
            diagnostics,
            seg_i: 0,
            off: 0,
            out: Vec::new(),
            binds: Vec::new(),
            pruned: false,
            live_site: false,
            line_has_escape,
        }
    }

    fn run(&mut self) -> Result<()> {
        while self.seg_i < self.segs.len() {
            match self.segs[self.seg_i].clone() {
                Seg::Sql(t) => {
                    let rest = String::from(&t[self.off..]);
                    self.push_sql(&rest);
                    self.seg_i += 1;
                    self.off = 0;
                }
                Seg::Literal(t) | Seg::Comment(t) => {
                    self.out.push(OutSeg::Raw(t));
                    self.seg_i += 1;
                    self.off = 0;
                }
                Seg::Param(p) => {
                    self.seg_i += 1;
                    self.off = 0;
                    self.site(&p)?;
                }
            }
        }
        Ok(())
    }

    // ---- output helpers -------------------------------------------------

    fn push_sql(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(OutSeg::Sql(last)) = self.out.last_mut() {
            last.push_str(text);
        } else {
            self.out.push(OutSeg::Sql(String::from(text)));
        }
    }

    fn sql_tail(&self) -> &str {
        match self.out.last() {
            Some(OutSeg::Sql(t)) => t,
            _ => "",
        }
    }

    fn last_out_char(&self) -> Option<char> {
        match self.out.last() {
            Some(OutSeg::Sql(t) | OutSeg::Raw(t)) => t.chars().last(),
            None => None,
        }
    }

    fn ensure_space(&mut self) {
        if self
            .last_out_char()
            .is_some_and(|c| !c.is_whitespace() && c != '(')
        {
            self.push_sql(" ");
        }
    }

    fn emit_placeholder(&mut self, name: &str, value: BindValue) {
        self.push_sql(&PLACEHOLDER.to_string());
        self.binds.push(Bind {
            name: String::from(name),
            value,
        });
    }

    fn emit_chunks(&mut self, chunks: Vec<OutSeg>) {
        for chunk in chunks {
            match chunk {
                OutSeg::Sql(t) => self.push_sql(&t),
                raw @ OutSeg::Raw(_) => self.out.push(raw),
            }
        }
    }

    /// Emits `(S, S, ...)` and records one bind per element.
    fn emit_group(&mut self, name: &str, items: Vec<BindValue>) {
        let mut text = String::from("(");
        for i in 0..items.len() {
            if i > 0 {
                text.push_str(", ");
            }
            text.push(PLACEHOLDER);
        }
        text.push(')');
        self.push_sql(&text);
        for value in items {
            self.binds.push(Bind {
                name: String::from(name),
                value,
            });
        }
    }

    // ---- input cursor ---------------------------------------------------

    /// Consumes the default literal following a parameter comment: a string
    /// literal, a bare token, or a balanced parenthesized group. Defaults
    /// must be adjacent unless an operator was just consumed.
    fn consume_default(&mut self, allow_ws: bool) -> Option<Vec<OutSeg>> {
        match self.segs.get(self.seg_i).cloned() {
            Some(Seg::Literal(t)) if self.off == 0 => {
                self.seg_i += 1;
                Some(vec![OutSeg::Raw(t)])
            }
            Some(Seg::Sql(t)) => {
                let rest = &t[self.off..];
                let ws = rest.len() - rest.trim_start().len();
                if ws > 0 && !allow_ws {
                    return None;
                }
                if ws == rest.len() {
                    // Whitespace only; a literal may follow in the next seg.
                    if allow_ws {
                        if let Some(Seg::Literal(l)) = self.segs.get(self.seg_i + 1) {
                            let chunk = vec![OutSeg::Raw(l.clone())];
                            self.seg_i += 2;
                            self.off = 0;
                            return Some(chunk);
                        }
                    }
                    return None;
                }
                let after_ws = &rest[ws..];
                let first = after_ws.chars().next()?;
                if first == '(' {
                    self.off += ws;
                    return Some(self.consume_paren_group());
                }
                if first == ',' || first == ')' {
                    return None;
                }
                let len = after_ws
                    .find(|c: char| c.is_whitespace() || c == ',' || c == '(' || c == ')')
                    .unwrap_or(after_ws.len());
                let token = String::from(&after_ws[..len]);
                self.off += ws + len;
                Some(vec![OutSeg::Sql(token)])
            }
            _ => None,
        }
    }

    /// Consumes a balanced `( ... )` group, literals included.
    fn consume_paren_group(&mut self) -> Vec<OutSeg> {
        let mut chunks: Vec<OutSeg> = Vec::new();
        let mut depth = 0i32;
        while self.seg_i < self.segs.len() {
            match self.segs[self.seg_i].clone() {
                Seg::Sql(t) => {
                    let rest = &t[self.off..];
                    let mut consumed = 0usize;
                    let mut piece = String::new();
                    let mut closed = false;
                    for c in rest.chars() {
                        consumed += c.len_utf8();
                        piece.push(c);
                        match c {
                            '(' => depth += 1,
                            ')' => {
                                depth -= 1;
                                if depth == 0 {
                                    closed = true;
                                }
                            }
                            _ => {}
                        }
                        if closed {
                            break;
                        }
                    }
                    if !piece.is_empty() {
                        chunks.push(OutSeg::Sql(piece));
                    }
                    if closed {
                        self.off += consumed;
                        if self.off >= t.len() {
                            self.seg_i += 1;
                            self.off = 0;
                        }
                        return chunks;
                    }
                    self.seg_i += 1;
                    self.off = 0;
                }
                Seg::Literal(t) | Seg::Comment(t) => {
                    chunks.push(OutSeg::Raw(t));
                    self.seg_i += 1;
                    self.off = 0;
                }
                Seg::Param(_) => break,
            }
        }
        chunks
    }

    /// Matches a comparison operator directly after the comment and
    /// consumes it.
    fn peek_right_operator(&mut self) -> Option<RightOp> {
        let Some(Seg::Sql(t)) = self.segs.get(self.seg_i) else {
            return None;
        };
        let rest = &t[self.off..];
        let ws = rest.len() - rest.trim_start().len();
        let r = &rest[ws..];
        let (ctx, len) = if r.starts_with("<>") || r.starts_with("!=") {
            (OpCtx::Ne, 2)
        } else if r.starts_with('=') {
            (OpCtx::Eq, 1)
        } else if let Some(len) = match_word_ci(r, "IS") {
            let tail = &r[len..];
            let pad = tail.len() - tail.trim_start().len();
            match match_word_ci(&tail[pad..], "NOT") {
                Some(n) if pad > 0 => (OpCtx::IsNot, len + pad + n),
                _ => (OpCtx::Is, len),
            }
        } else if let Some(len) = match_word_ci(r, "NOT") {
            let tail = &r[len..];
            let pad = tail.len() - tail.trim_start().len();
            if pad == 0 {
                return None;
            }
            if let Some(n) = match_word_ci(&tail[pad..], "IN") {
                (OpCtx::NotIn, len + pad + n)
            } else if let Some(n) = match_word_ci(&tail[pad..], "LIKE") {
                (OpCtx::NotLike, len + pad + n)
            } else {
                return None;
            }
        } else if let Some(len) = match_word_ci(r, "IN") {
            (OpCtx::In, len)
        } else if let Some(len) = match_word_ci(r, "LIKE") {
            (OpCtx::Like, len)
        } else {
            return None;
        };
        let text = String::from(&r[..len]);
        self.off += ws + len;
        Some(RightOp { ctx, text })
    }

    /// Extends a `?` fallback chain across consecutive `?` comments.
    fn absorb_chain(&mut self, chain: &mut ParamSite) {
        loop {
            let mut i = self.seg_i;
            let mut off = self.off;
            while let Some(Seg::Sql(t)) = self.segs.get(i) {
                if t[off..].trim().is_empty() {
                    i += 1;
                    off = 0;
                } else {
                    return;
                }
            }
            let Some(Seg::Param(p)) = self.segs.get(i) else {
                return;
            };
            let Ok(Some(next)) = site::parse(&p.body, p.line, self.snippets) else {
                return;
            };
            if !next.mods.question || next.mods.bang {
                return;
            }
            chain.names.extend(next.names);
            self.seg_i = i + 1;
            self.off = 0;
        }
    }

    // ---- condition surgery ----------------------------------------------

    /// Truncates the output at (`seg`, `at`), dropping binds whose
    /// sentinels fall in the removed region.
    fn truncate_out(&mut self, seg: usize, at: usize) {
        let mut dropped = 0usize;
        for (i, s) in self.out.iter().enumerate().skip(seg) {
            let text = match s {
                OutSeg::Sql(t) | OutSeg::Raw(t) => t.as_str(),
            };
            let from = if i == seg { at } else { 0 };
            dropped += text[from..].matches(PLACEHOLDER).count();
        }
        for _ in 0..dropped {
            self.binds.pop();
        }
        if at == 0 {
            self.out.truncate(seg);
        } else {
            self.out.truncate(seg + 1);
            if let Some(OutSeg::Sql(t)) = self.out.last_mut() {
                t.truncate(at);
            }
        }
    }

    /// Removes the condition owning the current site, connector included.
    fn excise(&mut self) {
        let (seg, at) = match find_boundary(&self.out) {
            Some(b) => (b.seg, b.remove_at),
            None => (0, 0),
        };
        self.truncate_out(seg, at);
        self.pruned = true;
    }

    /// Captures and removes the column expression of the current condition.
    fn take_condition_col(&mut self, right_form: bool) -> Option<String> {
        if right_form {
            let OutSeg::Sql(t) = self.out.last()? else {
                return None;
            };
            let trimmed = t.trim_end();
            let mut start = trimmed.len();
            for (i, c) in trimmed.char_indices().rev() {
                if c.is_whitespace() {
                    break;
                }
                start = i;
            }
            if start >= trimmed.len() {
                return None;
            }
            let col = String::from(&trimmed[start..]);
            if col.contains('(') || col.contains(PLACEHOLDER) || is_boundary_word(&col) {
                return None;
            }
            let seg = self.out.len() - 1;
            self.truncate_out(seg, start);
            self.pruned = true;
            Some(col)
        } else {
            let boundary = find_boundary(&self.out).unwrap_or(Boundary {
                seg: 0,
                remove_at: 0,
                keep_at: 0,
            });
            let mut text = String::new();
            for (i, s) in self.out.iter().enumerate().skip(boundary.seg) {
                let t = match s {
                    OutSeg::Sql(t) | OutSeg::Raw(t) => t.as_str(),
                };
                let from = if i == boundary.seg { boundary.keep_at } else { 0 };
                text.push_str(&t[from..]);
            }
            let head = TRAILING_OP.replace(&text, "");
            let col = head.trim().to_owned();
            if col.is_empty() || col.contains(PLACEHOLDER) {
                return None;
            }
            self.truncate_out(boundary.seg, boundary.keep_at);
            self.pruned = true;
            Some(col)
        }
    }

    // ---- sites ----------------------------------------------------------

    fn site(&mut self, p: &ParamRef) -> Result<()> {
        if p.body.trim_start().starts_with('%') {
            return self.aux(p);
        }
        let Some(mut parsed) = site::parse(&p.body, p.line, self.snippets)? else {
            // Prose comment: pass through untouched.
            self.out.push(OutSeg::Raw(format!("/*{}*/", p.body)));
            return Ok(());
        };
        if parsed.mods.question {
            self.absorb_chain(&mut parsed);
        }
        let mods = parsed.mods;
        let mut primary = parsed.names[0].clone();

        // Resolve the value.
        let value: Option<BindValue> = if mods.at {
            let found = self.bindings.get(&primary);
            let positive = found.is_some_and(|v| !v.is_negative());
            if positive == mods.bang {
                return Err(ParseError::Required {
                    name: primary,
                    line: p.line,
                });
            }
            Some(found.cloned().unwrap_or(BindValue::Null))
        } else if mods.question {
            let picked = parsed.names.iter().find_map(|n| {
                self.bindings
                    .get(n)
                    .filter(|v| v.is_negative() == mods.bang)
                    .map(|v| (n.clone(), v.clone()))
            });
            match picked {
                Some((n, v)) => {
                    primary = n;
                    Some(v)
                }
                None => {
                    // No positive candidate: the default stays in place.
                    if let Some(chunks) = self.consume_default(false) {
                        self.emit_chunks(chunks);
                    }
                    self.live_site = true;
                    return Ok(());
                }
            }
        } else {
            self.bindings.get(&primary).cloned()
        };
        let negative = value.as_ref().map_or(true, BindValue::is_negative) != mods.bang;

        // Classify the operator context and consume the default.
        let lctx = left_context(self.sql_tail());
        let rop = if lctx.is_none() {
            self.peek_right_operator()
        } else {
            None
        };
        let default = self.consume_default(rop.is_some());
        let ctx = lctx.or(rop.as_ref().map(|r| r.ctx));

        // `$` and `&` strike the condition on a negative value. A list in
        // IN position is exempt: it expands to `IN (NULL)` instead.
        if (mods.dollar || mods.amp) && negative {
            let in_position = matches!(ctx, Some(OpCtx::In | OpCtx::NotIn));
            let is_list = matches!(value, Some(BindValue::List(_)));
            if !(in_position && is_list) {
                self.excise();
                return Ok(());
            }
        }

        // `&` guards the line but never binds: the template text stays.
        if mods.amp {
            if let Some(r) = &rop {
                self.ensure_space();
                let op = r.text.clone();
                self.push_sql(&op);
                self.push_sql(" ");
            }
            if let Some(chunks) = default {
                self.emit_chunks(chunks);
            }
            self.live_site = true;
            return Ok(());
        }

        let shape = if negative {
            Shape::Null
        } else {
            match value {
                Some(BindValue::List(items)) => Shape::List(items),
                Some(v) => Shape::Scalar(v),
                None => Shape::Null,
            }
        };
        self.apply(&primary, shape, ctx, rop)?;
        self.live_site = true;
        Ok(())
    }

    /// Emits the site according to the operator context and value shape.
    fn apply(
        &mut self,
        name: &str,
        shape: Shape,
        ctx: Option<OpCtx>,
        rop: Option<RightOp>,
    ) -> Result<()> {
        let right_form = rop.is_some();
        match ctx {
            Some(OpCtx::In | OpCtx::NotIn) => {
                if let Some(r) = &rop {
                    self.ensure_space();
                    let op = r.text.clone();
                    self.push_sql(&op);
                }
                self.ensure_space();
                match shape {
                    Shape::List(items) if !items.is_empty() => self.emit_group(name, items),
                    Shape::Scalar(v) => self.emit_group(name, vec![v]),
                    _ => self.push_sql("(NULL)"),
                }
            }
            Some(ctx @ (OpCtx::Eq | OpCtx::Ne | OpCtx::Like | OpCtx::NotLike)) => {
                match shape {
                    Shape::Scalar(v) => self.emit_scalar(name, v, rop),
                    Shape::List(mut items) if items.len() == 1 && ctx == OpCtx::Eq => {
                        let v = items.remove(0);
                        self.emit_scalar(name, v, rop);
                    }
                    Shape::List(items) if items.is_empty() => {
                        self.emit_null_test(name, ctx, right_form);
                    }
                    Shape::List(items) => self.emit_list_rewrite(name, ctx, right_form, items),
                    Shape::Null => self.emit_null_test(name, ctx, right_form),
                }
            }
            _ => {
                if let Some(r) = &rop {
                    self.ensure_space();
                    let op = r.text.clone();
                    self.push_sql(&op);
                    self.push_sql(" ");
                }
                match shape {
                    Shape::Scalar(v) => self.emit_placeholder(name, v),
                    Shape::List(items) if items.is_empty() => self.push_sql("NULL"),
                    Shape::List(items) => {
                        for (i, v) in items.into_iter().enumerate() {
                            if i > 0 {
                                self.push_sql(", ");
                            }
                            self.emit_placeholder(name, v);
                        }
                    }
                    Shape::Null => self.emit_placeholder(name, BindValue::Null),
                }
            }
        }
        Ok(())
    }

    fn emit_scalar(&mut self, name: &str, value: BindValue, rop: Option<RightOp>) {
        if let Some(r) = &rop {
            self.ensure_space();
            let op = r.text.clone();
            self.push_sql(&op);
            self.push_sql(" ");
        }
        self.emit_placeholder(name, value);
    }

    fn emit_null_test(&mut self, name: &str, ctx: OpCtx, right_form: bool) {
        match self.take_condition_col(right_form) {
            Some(col) => {
                self.ensure_space();
                let test = match ctx {
                    OpCtx::Ne | OpCtx::NotLike => "IS NOT NULL",
                    _ => "IS NULL",
                };
                self.push_sql(&format!("{col} {test}"));
            }
            None => self.emit_placeholder(name, BindValue::Null),
        }
    }

    fn emit_list_rewrite(
        &mut self,
        name: &str,
        ctx: OpCtx,
        right_form: bool,
        items: Vec<BindValue>,
    ) {
        match self.take_condition_col(right_form) {
            Some(col) => {
                self.ensure_space();
                match ctx {
                    OpCtx::Eq => {
                        self.push_sql(&format!("{col} IN "));
                        self.emit_group(name, items);
                    }
                    OpCtx::Ne => {
                        self.push_sql(&format!("{col} NOT IN "));
                        self.emit_group(name, items);
                    }
                    OpCtx::Like | OpCtx::NotLike => {
                        let (op, joiner) = if ctx == OpCtx::Like {
                            ("LIKE", "OR")
                        } else {
                            ("NOT LIKE", "AND")
                        };
                        for (i, v) in items.into_iter().enumerate() {
                            if i > 0 {
                                self.push_sql(&format!(" {joiner} "));
                            }
                            self.push_sql(&format!("{col} {op} "));
                            self.emit_placeholder(name, v);
                        }
                    }
                    _ => {}
                }
            }
            None => self.emit_group(name, items),
        }
    }

    // ---- auxiliary functions --------------------------------------------

    fn aux(&mut self, p: &ParamRef) -> Result<()> {
        match functions::parse_aux(&p.body, p.line)? {
            AuxCall::Concat(args) => self.emit_concat(&args, false),
            AuxCall::LikeConcat(args) => self.emit_concat(&args, true),
            AuxCall::Splice(name) => self.emit_splice(&name, p.line),
            AuxCall::Include(path) => Err(ParseError::Directive {
                line: p.line,
                message: format!("unresolved %include \"{path}\""),
            }),
        }
    }

    fn emit_concat(&mut self, args: &[Arg], like_mode: bool) -> Result<()> {
        let mut text = String::new();
        let mut bind_name: Option<String> = None;
        for arg in args {
            match arg {
                Arg::Lit(lit) => text.push_str(lit),
                Arg::Name(n) => {
                    if bind_name.is_none() {
                        bind_name = Some(n.clone());
                    }
                    let piece = match self.bindings.get(n) {
                        Some(v) if !v.is_negative() => v.plain_text(),
                        _ => String::new(),
                    };
                    if like_mode {
                        text.push_str(&self.dialect.escape_like(&piece));
                    } else {
                        text.push_str(&piece);
                    }
                }
            }
        }
        let _default = self.consume_default(false);
        let name = bind_name.unwrap_or_else(|| String::from("concat"));
        self.emit_placeholder(&name, BindValue::Text(text));
        if like_mode && !self.line_has_escape {
            self.push_sql(" ESCAPE ");
            self.out.push(OutSeg::Raw(String::from("'#'")));
        }
        self.live_site = true;
        Ok(())
    }

    fn emit_splice(&mut self, name: &str, line: u32) -> Result<()> {
        let value = self.bindings.get(name).cloned();
        let default = self.consume_default(false);
        match value {
            Some(v) if !v.is_negative() => {
                let text = v.plain_text();
                self.push_sql(&text);
                self.diagnostics.push(Diagnostic {
                    line,
                    message: format!("verbatim splice of parameter '{name}'"),
                });
            }
            _ => {
                if let Some(chunks) = default {
                    self.emit_chunks(chunks);
                }
            }
        }
        self.live_site = true;
        Ok(())
    }
}

// ---- free helpers -------------------------------------------------------

fn match_word_ci(s: &str, word: &str) -> Option<usize> {
    let head = s.get(..word.len())?;
    if !head.eq_ignore_ascii_case(word) {
        return None;
    }
    let next = s[word.len()..].chars().next();
    if next.is_some_and(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some(word.len())
}

/// Splits off the trailing identifier word: `"a = b"` -> `("a = ", "b")`.
fn trailing_word(t: &str) -> (&str, &str) {
    let mut start = t.len();
    for (i, c) in t.char_indices().rev() {
        if c.is_alphanumeric() || c == '_' {
            start = i;
        } else {
            break;
        }
    }
    (&t[..start], &t[start..])
}

fn is_boundary_word(word: &str) -> bool {
    matches!(
        word.to_ascii_uppercase().as_str(),
        "AND"
            | "OR"
            | "WHERE"
            | "ON"
            | "HAVING"
            | "WHEN"
            | "THEN"
            | "ELSE"
            | "SELECT"
            | "SET"
            | "BY"
            | "FROM"
            | "LIMIT"
            | "OFFSET"
            | "IN"
            | "NOT"
            | "IS"
            | "LIKE"
    )
}

/// Classifies the token immediately left of a parameter comment.
fn left_context(tail: &str) -> Option<OpCtx> {
    let t = tail.trim_end();
    if t.ends_with("<>") || t.ends_with("!=") {
        return Some(OpCtx::Ne);
    }
    if let Some(before) = t.strip_suffix('=') {
        if before.ends_with('>') || before.ends_with('<') {
            return None;
        }
        return Some(OpCtx::Eq);
    }
    let (before, word) = trailing_word(t);
    let (_, prev) = trailing_word(before.trim_end());
    match word.to_ascii_uppercase().as_str() {
        "IN" => Some(if prev.eq_ignore_ascii_case("NOT") {
            OpCtx::NotIn
        } else {
            OpCtx::In
        }),
        "LIKE" => Some(if prev.eq_ignore_ascii_case("NOT") {
            OpCtx::NotLike
        } else {
            OpCtx::Like
        }),
        "IS" => Some(OpCtx::Is),
        "NOT" if prev.eq_ignore_ascii_case("IS") => Some(OpCtx::IsNot),
        _ => None,
    }
}

/// Scans the emitted output for the last condition boundary at the site's
/// paren depth: a connector (`AND`/`OR`/`,`), an opening paren, or a clause
/// keyword. Raw segments never contain boundaries.
fn find_boundary(out: &[OutSeg]) -> Option<Boundary> {
    let mut site_depth = 0i32;
    for seg in out {
        if let OutSeg::Sql(t) = seg {
            for c in t.chars() {
                match c {
                    '(' => site_depth += 1,
                    ')' => site_depth -= 1,
                    _ => {}
                }
            }
        }
    }

    let mut depth = 0i32;
    let mut best: Option<Boundary> = None;
    for (si, seg) in out.iter().enumerate() {
        let OutSeg::Sql(t) = seg else { continue };
        let mut chars = t.char_indices().peekable();
        while let Some((bi, c)) = chars.next() {
            match c {
                '(' => {
                    depth += 1;
                    if depth == site_depth {
                        best = Some(Boundary {
                            seg: si,
                            remove_at: bi + 1,
                            keep_at: bi + 1,
                        });
                    }
                }
                ')' => depth -= 1,
                ',' => {
                    if depth == site_depth {
                        best = Some(Boundary {
                            seg: si,
                            remove_at: bi,
                            keep_at: bi + 1,
                        });
                    }
                }
                c if c.is_alphabetic() || c == '_' => {
                    let start = bi;
                    let mut end = bi + c.len_utf8();
                    while let Some(&(bj, cj)) = chars.peek() {
                        if cj.is_alphanumeric() || cj == '_' {
                            end = bj + cj.len_utf8();
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if depth == site_depth {
                        match t[start..end].to_ascii_uppercase().as_str() {
                            "AND" | "OR" => {
                                best = Some(Boundary {
                                    seg: si,
                                    remove_at: start,
                                    keep_at: end,
                                });
                            }
                            "WHERE" | "ON" | "HAVING" | "WHEN" | "THEN" | "ELSE" | "SELECT"
                            | "SET" | "BY" | "FROM" | "LIMIT" | "OFFSET" => {
                                best = Some(Boundary {
                                    seg: si,
                                    remove_at: end,
                                    keep_at: end,
                                });
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
    }
    best
}
