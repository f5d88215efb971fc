//! SQL rewriter: bounded cleanup and output assembly.
//!
//! Concatenates surviving lines and repairs the fragments removal leaves
//! behind: connectors dangling after `WHERE` or an open paren, trailing
//! connectors whose neighbour was struck, orphan `WHERE` keywords, empty
//! parentheses, and runs of blank lines. Every pass edits only `Sql`
//! output segments, so literals and comments are never touched, and the
//! whole cleanup is idempotent on its own output.

use std::sync::LazyLock;

use regex::Regex;

use crate::line::{out_text, Bind, FragmentKind, LogicalLine, OutSeg};

static WHERE_CONN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(WHERE)\s+(?:AND|OR)\b\s*").unwrap());
static PAREN_CONN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(\s*(?:AND|OR)\b\s*").unwrap());
static KW_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(WHERE|SELECT|SET|HAVING|ON|BY)\s*,\s*").unwrap());
static PAREN_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\s*,\s*").unwrap());
static CONN_CONN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(AND|OR)\s+(?:AND|OR)\b").unwrap());

/// Keywords that start a clause rather than continue a condition list.
const CLAUSE_STARTERS: &[&str] = &[
    "ORDER", "GROUP", "HAVING", "UNION", "INTERSECT", "EXCEPT", "LIMIT", "OFFSET", "FOR",
    "WINDOW", "FETCH",
];

/// Applies the cleanup passes to a fixed point and assembles the final
/// text plus the ordered bind stream.
pub(crate) fn render(lines: &mut Vec<LogicalLine>) -> (String, Vec<Bind>) {
    loop {
        let mut changed = false;
        for line in lines.iter_mut() {
            if line.removed || line.is_blank() {
                continue;
            }
            changed |= collapse_connectors(line);
            changed |= collapse_empty_parens(line);
        }
        changed |= cross_line_parens(lines);
        changed |= strip_leading_connectors(lines);
        changed |= strip_trailing_connectors(lines);
        changed |= strip_orphan_where(lines);
        changed |= drop_emptied(lines);
        if !changed {
            break;
        }
    }
    assemble(lines)
}

fn survivors(lines: &[LogicalLine]) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.removed && !l.is_blank())
        .map(|(i, _)| i)
        .collect()
}

/// Rewrites connector patterns inside `Sql` segments: `WHERE AND x`,
/// `( OR x`, `SET , x`, `( , x`, and doubled connectors.
fn collapse_connectors(line: &mut LogicalLine) -> bool {
    let mut changed = false;
    for seg in &mut line.out {
        let OutSeg::Sql(text) = seg else { continue };
        let mut t = WHERE_CONN.replace_all(text, "$1 ").into_owned();
        t = PAREN_CONN.replace_all(&t, "( ").into_owned();
        t = KW_COMMA.replace_all(&t, "$1 ").into_owned();
        t = PAREN_COMMA.replace_all(&t, "( ").into_owned();
        t = CONN_CONN.replace_all(&t, "$1").into_owned();
        if t != *text {
            *text = t;
            changed = true;
        }
    }
    changed
}

/// Removes `( )` pairs whose interior is whitespace, except function call
/// parens glued to an identifier.
fn collapse_empty_parens(line: &mut LogicalLine) -> bool {
    let mut changed = false;
    for seg in &mut line.out {
        let OutSeg::Sql(text) = seg else { continue };
        while let Some(collapsed) = collapse_one_pair(text) {
            *text = collapsed;
            changed = true;
            line.tail_pruned = true;
        }
    }
    changed
}

fn collapse_one_pair(text: &str) -> Option<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    for idx in 0..chars.len() {
        let (bi, c) = chars[idx];
        if c != '(' {
            continue;
        }
        if idx > 0 {
            let prev = chars[idx - 1].1;
            if prev.is_alphanumeric() || prev == '_' {
                continue;
            }
        }
        let mut j = idx + 1;
        while j < chars.len() && chars[j].1.is_whitespace() {
            j += 1;
        }
        if j < chars.len() && chars[j].1 == ')' {
            let end = chars[j].0 + 1;
            let mut out = String::from(&text[..bi]);
            out.push_str(&text[end..]);
            return Some(out);
        }
    }
    None
}

fn last_content_seg(line: &LogicalLine) -> Option<(usize, bool)> {
    for (i, seg) in line.out.iter().enumerate().rev() {
        let (text, is_sql) = match seg {
            OutSeg::Sql(t) => (t, true),
            OutSeg::Raw(t) => (t, false),
        };
        if !text.trim().is_empty() {
            return Some((i, is_sql));
        }
    }
    None
}

fn first_content_seg(line: &LogicalLine) -> Option<(usize, bool)> {
    for (i, seg) in line.out.iter().enumerate() {
        let (text, is_sql) = match seg {
            OutSeg::Sql(t) => (t, true),
            OutSeg::Raw(t) => (t, false),
        };
        if !text.trim().is_empty() {
            return Some((i, is_sql));
        }
    }
    None
}

fn seg_string(line: &LogicalLine, i: usize) -> &str {
    match &line.out[i] {
        OutSeg::Sql(t) | OutSeg::Raw(t) => t,
    }
}

/// Collapses a `(` at the end of one line with a `)` opening the next
/// surviving line when nothing survives between them.
fn cross_line_parens(lines: &mut Vec<LogicalLine>) -> bool {
    let mut changed = false;
    let order = survivors(lines);
    for (k, &i) in order.iter().enumerate() {
        let Some((last, last_is_sql)) = last_content_seg(&lines[i]) else {
            continue;
        };
        if !last_is_sql || !seg_string(&lines[i], last).trim_end().ends_with('(') {
            continue;
        }
        let Some(&j) = order.get(k + 1) else { continue };
        if lines[j].removed {
            continue;
        }
        let Some((first, first_is_sql)) = first_content_seg(&lines[j]) else {
            continue;
        };
        if !first_is_sql || !seg_string(&lines[j], first).trim_start().starts_with(')') {
            continue;
        }
        if let OutSeg::Sql(t) = &mut lines[i].out[last] {
            let trimmed = t.trim_end().len();
            t.truncate(trimmed - 1);
        }
        lines[i].tail_pruned = true;
        if let OutSeg::Sql(t) = &mut lines[j].out[first] {
            let stripped: String = {
                let s = t.trim_start();
                String::from(&s[1..])
            };
            *t = stripped;
        }
        changed = true;
    }
    changed
}

/// Strips a leading connector from a line that now directly follows a
/// `WHERE`, an open paren, or a join/case keyword.
fn strip_leading_connectors(lines: &mut Vec<LogicalLine>) -> bool {
    let mut changed = false;
    let order = survivors(lines);
    for (k, &i) in order.iter().enumerate() {
        let Some((first, first_is_sql)) = first_content_seg(&lines[i]) else {
            continue;
        };
        if !first_is_sql {
            continue;
        }
        let text = seg_string(&lines[i], first);
        let trimmed = text.trim_start();
        let offset = text.len() - trimmed.len();
        let conn_len = leading_connector_len(trimmed);
        if conn_len == 0 {
            continue;
        }
        let Some(&p) = k.checked_sub(1).and_then(|k| order.get(k)) else {
            continue;
        };
        if !previous_invites_strip(&lines[p]) {
            continue;
        }
        if let OutSeg::Sql(t) = &mut lines[i].out[first] {
            let rest = String::from(t[offset + conn_len..].trim_start());
            let mut head = String::from(&t[..offset]);
            head.push_str(&rest);
            *t = head;
        }
        changed = true;
    }
    changed
}

/// Byte length of a leading `AND`/`OR`/`,` connector, 0 if none.
fn leading_connector_len(trimmed: &str) -> usize {
    if trimmed.starts_with(',') {
        return 1;
    }
    for word in ["AND", "OR"] {
        if trimmed.len() >= word.len()
            && trimmed[..word.len()].eq_ignore_ascii_case(word)
            && !trimmed[word.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            return word.len();
        }
    }
    0
}

fn previous_invites_strip(prev: &LogicalLine) -> bool {
    let Some((last, is_sql)) = last_content_seg(prev) else {
        return false;
    };
    if !is_sql {
        return false;
    }
    let text = seg_string(prev, last).trim_end();
    if text.ends_with('(') {
        return true;
    }
    let word_start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map_or(text.len(), |(i, _)| i);
    let word = &text[word_start..];
    matches!(
        word.to_ascii_uppercase().as_str(),
        "WHERE" | "ON" | "HAVING" | "THEN" | "ELSE"
    )
}

/// Strips a trailing connector when the excision that exposed it happened
/// on this line or when the neighbour that consumed it was removed.
fn strip_trailing_connectors(lines: &mut Vec<LogicalLine>) -> bool {
    let mut changed = false;
    let count = lines.len();
    for i in 0..count {
        if lines[i].removed || lines[i].is_blank() {
            continue;
        }
        let Some((last, is_sql)) = last_content_seg(&lines[i]) else {
            continue;
        };
        if !is_sql {
            continue;
        }
        let text = seg_string(&lines[i], last).trim_end();
        let tail_len = trailing_connector_len(text);
        if tail_len == 0 {
            continue;
        }
        let next_removed = next_original(lines, i).is_some_and(|j| lines[j].removed);
        if !(lines[i].tail_pruned || next_removed) {
            continue;
        }
        let keep = text.len() - tail_len;
        if let OutSeg::Sql(t) = &mut lines[i].out[last] {
            t.truncate(keep);
            let trimmed = t.trim_end().len();
            t.truncate(trimmed);
        }
        changed = true;
    }
    changed
}

/// Byte length of a trailing `AND`/`OR`/`,` token, 0 if none.
fn trailing_connector_len(text: &str) -> usize {
    if text.ends_with(',') {
        return 1;
    }
    for word in ["AND", "OR"] {
        if text.len() >= word.len() && text[text.len() - word.len()..].eq_ignore_ascii_case(word) {
            let before = &text[..text.len() - word.len()];
            let boundary = before
                .chars()
                .last()
                .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
            if boundary {
                return word.len();
            }
        }
    }
    0
}

/// The next non-blank, non-directive line in original order.
fn next_original(lines: &[LogicalLine], i: usize) -> Option<usize> {
    lines
        .iter()
        .enumerate()
        .skip(i + 1)
        .find(|(_, l)| !l.is_blank() && l.kind != FragmentKind::Directive)
        .map(|(j, _)| j)
}

/// Returns true when the line after `i` (in surviving order) begins a new
/// clause instead of a condition.
fn no_condition_follows(lines: &[LogicalLine], i: usize) -> bool {
    let next = lines
        .iter()
        .enumerate()
        .skip(i + 1)
        .find(|(_, l)| !l.removed && !l.is_blank() && !out_text(&l.out).trim().is_empty());
    let Some((_, line)) = next else { return true };
    let text = out_text(&line.out);
    let trimmed = text.trim_start();
    if trimmed.starts_with(')') {
        return true;
    }
    let word: String = trimmed
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    CLAUSE_STARTERS
        .iter()
        .any(|kw| word.eq_ignore_ascii_case(kw))
}

/// Drops `WHERE` keywords whose conditions were all removed: whole lines
/// reading just `WHERE`, and pruned lines ending in a dangling clause
/// keyword.
fn strip_orphan_where(lines: &mut Vec<LogicalLine>) -> bool {
    let mut changed = false;
    for i in 0..lines.len() {
        if lines[i].removed || lines[i].is_blank() {
            continue;
        }
        let text = out_text(&lines[i].out);
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("WHERE") {
            if no_condition_follows(lines, i) {
                lines[i].removed = true;
                changed = true;
            }
            continue;
        }
        if !lines[i].pruned {
            continue;
        }
        let Some((last, is_sql)) = last_content_seg(&lines[i]) else {
            continue;
        };
        if !is_sql {
            continue;
        }
        let seg = seg_string(&lines[i], last).trim_end();
        let word_start = seg
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
            .last()
            .map_or(seg.len(), |(j, _)| j);
        let word = &seg[word_start..];
        let dangling = matches!(
            word.to_ascii_uppercase().as_str(),
            "WHERE" | "HAVING" | "LIMIT" | "OFFSET"
        );
        if dangling && word_start > 0 && no_condition_follows(lines, i) {
            if let OutSeg::Sql(t) = &mut lines[i].out[last] {
                t.truncate(word_start);
                let trimmed_len = t.trim_end().len();
                t.truncate(trimmed_len);
            }
            changed = true;
        }
    }
    changed
}

/// Marks lines whose content vanished entirely.
fn drop_emptied(lines: &mut Vec<LogicalLine>) -> bool {
    let mut changed = false;
    for line in lines.iter_mut() {
        if line.removed || line.is_blank() {
            continue;
        }
        if out_text(&line.out).trim().is_empty() {
            line.removed = true;
            changed = true;
        }
    }
    changed
}

/// Emits surviving lines with their indentation, collapsing blank-line
/// runs, and collects binds in line order.
fn assemble(lines: &mut Vec<LogicalLine>) -> (String, Vec<Bind>) {
    let mut parts: Vec<String> = Vec::new();
    let mut binds: Vec<Bind> = Vec::new();
    let mut prev_blank = false;
    for line in lines.iter_mut() {
        if line.removed {
            continue;
        }
        if line.is_blank() {
            if !prev_blank && !parts.is_empty() {
                parts.push(String::new());
                prev_blank = true;
            }
            continue;
        }
        prev_blank = false;
        #[allow(clippy::cast_sign_loss)]
        let indent = " ".repeat(line.indent.max(0) as usize);
        let text = out_text(&line.out);
        parts.push(format!("{indent}{}", text.trim_end()));
        binds.append(&mut line.binds);
    }
    while parts.last().is_some_and(String::is_empty) {
        parts.pop();
    }
    (parts.join("\n"), binds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::Bindings;
    use crate::dialect::Dialect;
    use crate::engine::ParseOptions;
    use crate::lexer::Lexer;
    use crate::line::assemble as assemble_lines;
    use crate::param::evaluate;
    use crate::tree;

    fn rendered(input: &str, bindings: &Bindings) -> (String, Vec<Bind>) {
        let tokens = Lexer::new(input, Dialect::Sqlite).tokenize().unwrap();
        let mut lines = assemble_lines(tokens, 4);
        tree::build(&mut lines);
        evaluate(&mut lines, bindings, Dialect::Sqlite, &ParseOptions::default()).unwrap();
        tree::propagate(&mut lines);
        render(&mut lines)
    }

    const S: char = crate::line::PLACEHOLDER;

    #[test]
    fn trailing_and_after_intra_line_excision() {
        let (sql, binds) = rendered(
            "WHERE x >= /* $a */1 AND x <= /* $b */2",
            &Bindings::new().bind("a", 10),
        );
        assert_eq!(sql, format!("WHERE x >= {S}"));
        assert_eq!(binds.len(), 1);
    }

    #[test]
    fn empty_paren_group_collapses() {
        let (sql, _) = rendered(
            "WHERE a = /* $a */1 AND ( s = /* $s1 */'p' OR s = /* $s2 */'q' )",
            &Bindings::new().bind("a", 1),
        );
        assert_eq!(sql, format!("WHERE a = {S}"));
    }

    #[test]
    fn leading_connector_after_where_line() {
        let (sql, _) = rendered(
            "WHERE a = /* $a */1\nAND b = /* $b */2",
            &Bindings::new().bind("b", 2),
        );
        assert_eq!(sql, format!("WHERE\nb = {S}"));
    }

    #[test]
    fn orphan_where_is_dropped() {
        let (sql, _) = rendered("SELECT * FROM t WHERE a = /* $a */1", &Bindings::new());
        assert_eq!(sql, "SELECT * FROM t");
    }

    #[test]
    fn where_line_with_all_conditions_removed() {
        let (sql, _) = rendered(
            "SELECT * FROM t\nWHERE a = /* $a */1\nORDER BY id",
            &Bindings::new(),
        );
        assert_eq!(sql, "SELECT * FROM t\nORDER BY id");
    }

    #[test]
    fn cross_line_empty_parens() {
        let (sql, _) = rendered(
            "WHERE a = /* $a */1 AND (\n    s = /* $s */'x'\n)",
            &Bindings::new().bind("a", 1),
        );
        assert_eq!(sql, format!("WHERE a = {S}"));
    }

    #[test]
    fn trailing_connector_before_removed_line() {
        let (sql, _) = rendered(
            "WHERE a = /* $a */1 AND\nb = /* $b */2",
            &Bindings::new().bind("a", 1),
        );
        assert_eq!(sql, format!("WHERE a = {S}"));
    }

    #[test]
    fn blank_runs_collapse() {
        let (sql, _) = rendered("SELECT 1\n\n\n\nFROM t", &Bindings::new());
        assert_eq!(sql, "SELECT 1\n\nFROM t");
    }

    #[test]
    fn literals_are_never_rewritten() {
        let (sql, _) = rendered("SELECT 'WHERE AND ( )' FROM t", &Bindings::new());
        assert_eq!(sql, "SELECT 'WHERE AND ( )' FROM t");
    }

    #[test]
    fn cleanup_is_idempotent() {
        let (once, _) = rendered(
            "SELECT * FROM t WHERE a = /* $a */1 AND b = /* $b */2",
            &Bindings::new().bind("a", 1),
        );
        let (twice, _) = rendered(&once.replace(S, "0"), &Bindings::new());
        assert_eq!(twice, once.replace(S, "0"));
    }
}
