//! Parent/child structure over logical lines.
//!
//! All lines live in one arena; parents are referenced by index. A line's
//! parent is the nearest prior line of strictly smaller indent, except that
//! a line starting inside a parenthesized group attaches to the line that
//! opened the group.

use std::sync::LazyLock;

use regex::Regex;

use crate::line::{out_text, FragmentKind, LogicalLine, Seg};

/// Matches a line that opens a CTE body: `WITH name AS (` or `name AS (`.
static CTE_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bAS\s*\(\s*$").unwrap());

static SELECT_HEAD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*SELECT\b").unwrap());

/// Keyword-only remainders that dangle once their condition is excised.
static BARE_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(LIMIT|OFFSET|HAVING|ON|SET|ORDER\s+BY|GROUP\s+BY)$").unwrap()
});

fn sql_text(line: &LogicalLine) -> String {
    let mut text = String::new();
    for seg in &line.segs {
        if let Seg::Sql(t) = seg {
            text.push_str(t);
        } else {
            // Literals and comments break token adjacency for the
            // patterns below.
            text.push(' ');
        }
    }
    text
}

/// Attaches every line to its parent and tags CTE headers.
pub(crate) fn build(lines: &mut Vec<LogicalLine>) {
    let mut indent_stack: Vec<usize> = Vec::new();
    let mut paren_stack: Vec<usize> = Vec::new();

    for i in 0..lines.len() {
        if lines[i].is_blank() || lines[i].removed {
            continue;
        }
        let parent = if let Some(&open) = paren_stack.last() {
            Some(open)
        } else {
            while let Some(&top) = indent_stack.last() {
                if lines[top].indent >= lines[i].indent {
                    indent_stack.pop();
                } else {
                    break;
                }
            }
            indent_stack.last().copied()
        };
        if let Some(p) = parent {
            lines[i].parent = Some(p);
            lines[p].children.push(i);
            if CTE_OPEN.is_match(sql_text(&lines[p]).trim_end())
                && SELECT_HEAD.is_match(&sql_text(&lines[i]))
            {
                lines[i].kind = FragmentKind::CteHeader;
            }
        }
        indent_stack.push(i);

        for seg in &lines[i].segs {
            if let Seg::Sql(t) = seg {
                for c in t.chars() {
                    match c {
                        '(' => paren_stack.push(i),
                        ')' => {
                            paren_stack.pop();
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

/// Propagates removal through the tree after evaluation.
///
/// Top-down first: a removed line takes its whole subtree with it. Then
/// bottom-up: a non-leaf line with no surviving site of its own is removed
/// once every child is removed, with CTE headers exempt. Finally,
/// keyword-only leaves left dangling by an excision are dropped.
pub(crate) fn propagate(lines: &mut Vec<LogicalLine>) {
    for i in 0..lines.len() {
        if let Some(p) = lines[i].parent {
            if lines[p].removed {
                lines[i].removed = true;
            }
        }
    }

    for i in (0..lines.len()).rev() {
        if lines[i].removed || lines[i].is_blank() {
            continue;
        }
        let remove = {
            let line = &lines[i];
            let children_gone = !line.children.is_empty()
                && line.children.iter().all(|&c| lines[c].removed);
            let dangling_keyword = line.children.is_empty()
                && line.pruned
                && is_bare_clause(&out_text(&line.out));
            (children_gone && !line.live_site && line.kind != FragmentKind::CteHeader)
                || dangling_keyword
        };
        if remove {
            lines[i].removed = true;
        }
    }
}

fn is_bare_clause(text: &str) -> bool {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    BARE_CLAUSE.is_match(&collapsed)
}
