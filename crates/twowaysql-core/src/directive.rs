//! Conditional directives.
//!
//! Two surface forms select template text before parameter evaluation:
//! whole-line blocks (`-- %IF name` / `-- %ELSE` / `-- %END`) and inline
//! branches (`/*%if c*/ a /*%elseif d*/ b /*%else*/ e /*%end*/`). A removed
//! branch never contributes parameter sites.

use std::sync::LazyLock;

use regex::Regex;

use crate::bindings::Bindings;
use crate::error::{ParseError, Result};
use crate::line::{FragmentKind, LogicalLine, Seg};

static BLOCK_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%\s*([A-Za-z]+)\s*(.*)$").unwrap());

static INLINE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*%\s*(if|elseif|else|end)\b\s*(.*?)\s*$").unwrap());

/// Evaluates a directive condition: the named binding's polarity, with an
/// optional leading `!` negation. An unbound name is negative.
fn truth(cond: &str, bindings: &Bindings, line: u32) -> Result<bool> {
    let cond = cond.trim();
    let (negated, name) = match cond.strip_prefix('!') {
        Some(rest) => (true, rest.trim()),
        None => (false, cond),
    };
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ParseError::Directive {
            line,
            message: format!("malformed condition '{cond}'"),
        });
    }
    let positive = bindings.get(name).is_some_and(|v| !v.is_negative());
    Ok(positive != negated)
}

/// Returns the directive comment body when the whole line is one `-- %...`
/// comment.
fn block_directive_body(line: &LogicalLine) -> Option<&str> {
    let mut comment: Option<&str> = None;
    for seg in &line.segs {
        match seg {
            Seg::Sql(t) if t.trim().is_empty() => {}
            Seg::Comment(t) if comment.is_none() && t.starts_with("--") => {
                comment = Some(t);
            }
            _ => return None,
        }
    }
    let body = comment?.trim_start_matches('-').trim();
    body.starts_with('%').then_some(body)
}

struct OpenBlock {
    selecting: bool,
    seen_else: bool,
    start_line: u32,
}

/// Resolves `-- %IF` blocks, striking unselected branches and the directive
/// lines themselves. Blocks do not nest; `-- %END` is optional at
/// end-of-file unless `-- %ELSE` was used.
pub(crate) fn apply_block(lines: &mut [LogicalLine], bindings: &Bindings) -> Result<()> {
    let mut open: Option<OpenBlock> = None;

    for line in lines.iter_mut() {
        let Some(body) = block_directive_body(line) else {
            if let Some(block) = &open {
                if !block.selecting {
                    line.removed = true;
                }
            }
            continue;
        };
        let number = line.number;
        let caps = BLOCK_WORD.captures(body).ok_or_else(|| ParseError::Directive {
            line: number,
            message: format!("malformed directive '{body}'"),
        })?;
        let word = caps[1].to_ascii_uppercase();
        let rest = caps.get(2).map_or("", |m| m.as_str());
        match word.as_str() {
            "IF" => {
                if open.is_some() {
                    return Err(ParseError::Directive {
                        line: number,
                        message: String::from("nested %IF blocks are not supported"),
                    });
                }
                open = Some(OpenBlock {
                    selecting: truth(rest, bindings, number)?,
                    seen_else: false,
                    start_line: number,
                });
            }
            "ELSE" => {
                let block = open.as_mut().ok_or_else(|| ParseError::Directive {
                    line: number,
                    message: String::from("%ELSE without %IF"),
                })?;
                if block.seen_else {
                    return Err(ParseError::Directive {
                        line: number,
                        message: String::from("duplicate %ELSE"),
                    });
                }
                block.seen_else = true;
                block.selecting = !block.selecting;
            }
            "END" => {
                if open.take().is_none() {
                    return Err(ParseError::Directive {
                        line: number,
                        message: String::from("%END without %IF"),
                    });
                }
            }
            other => {
                return Err(ParseError::Directive {
                    line: number,
                    message: format!("unknown directive '%{other}'"),
                });
            }
        }
        line.removed = true;
        line.kind = FragmentKind::Directive;
    }

    if let Some(block) = open {
        if block.seen_else {
            return Err(ParseError::Directive {
                line: block.start_line,
                message: String::from("%IF with %ELSE is missing %END"),
            });
        }
    }
    Ok(())
}

/// A parameter comment that is an inline directive marker.
enum InlineMarker {
    If(String),
    ElseIf(String),
    Else,
    End,
}

fn inline_marker(seg: &Seg) -> Option<(InlineMarker, u32)> {
    let Seg::Param(p) = seg else { return None };
    let caps = INLINE_WORD.captures(&p.body)?;
    let cond = caps.get(2).map_or("", |m| m.as_str()).to_owned();
    let marker = match caps[1].to_ascii_lowercase().as_str() {
        "if" => InlineMarker::If(cond),
        "elseif" => InlineMarker::ElseIf(cond),
        "else" => InlineMarker::Else,
        _ => InlineMarker::End,
    };
    Some((marker, p.line))
}

/// Resolves inline `%if` constructs within one logical line: exactly one
/// branch body replaces the whole construct.
pub(crate) fn apply_inline(line: &mut LogicalLine, bindings: &Bindings) -> Result<()> {
    loop {
        let mut if_idx: Option<(usize, String, u32)> = None;
        let mut stray: Option<u32> = None;
        for (i, seg) in line.segs.iter().enumerate() {
            match inline_marker(seg) {
                Some((InlineMarker::If(cond), number)) => {
                    if_idx = Some((i, cond, number));
                    break;
                }
                Some((_, number)) => {
                    stray = Some(number);
                    break;
                }
                None => {}
            }
        }
        if let Some(number) = stray {
            return Err(ParseError::Directive {
                line: number,
                message: String::from("directive outside an inline %if"),
            });
        }
        let Some((start, first_cond, number)) = if_idx else {
            return Ok(());
        };

        // Branch boundaries: (condition, body start index).
        let mut branches: Vec<(Option<String>, usize)> = vec![(Some(first_cond), start + 1)];
        let mut end_idx: Option<usize> = None;
        let mut seen_else = false;
        for i in start + 1..line.segs.len() {
            match inline_marker(&line.segs[i]) {
                Some((InlineMarker::If(_), n)) => {
                    return Err(ParseError::Directive {
                        line: n,
                        message: String::from("nested inline %if is not supported"),
                    });
                }
                Some((InlineMarker::ElseIf(cond), n)) => {
                    if seen_else {
                        return Err(ParseError::Directive {
                            line: n,
                            message: String::from("%elseif after %else"),
                        });
                    }
                    branches.push((Some(cond), i + 1));
                }
                Some((InlineMarker::Else, n)) => {
                    if seen_else {
                        return Err(ParseError::Directive {
                            line: n,
                            message: String::from("duplicate %else"),
                        });
                    }
                    seen_else = true;
                    branches.push((None, i + 1));
                }
                Some((InlineMarker::End, _)) => {
                    end_idx = Some(i);
                    break;
                }
                None => {}
            }
        }
        let end = end_idx.ok_or_else(|| ParseError::Directive {
            line: number,
            message: String::from("inline %if is missing %end"),
        })?;

        // Pick the winning branch body.
        let mut selected: Vec<Seg> = Vec::new();
        for (bi, (cond, body_start)) in branches.iter().enumerate() {
            let body_end = branches
                .get(bi + 1)
                .map_or(end, |(_, next_start)| next_start - 1);
            let taken = match cond {
                Some(c) => truth(c, bindings, number)?,
                None => true,
            };
            if taken {
                selected = line.segs[*body_start..body_end].to_vec();
                break;
            }
        }
        line.segs.splice(start..=end, selected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::lexer::Lexer;
    use crate::line::{assemble, seg_text};

    fn lines(input: &str) -> Vec<LogicalLine> {
        let tokens = Lexer::new(input, Dialect::Sqlite).tokenize().unwrap();
        assemble(tokens, 4)
    }

    #[test]
    fn block_selects_if_branch() {
        let mut ls = lines("a\n-- %IF flag\nb\n-- %ELSE\nc\n-- %END\nd");
        apply_block(&mut ls, &Bindings::new().bind("flag", true)).unwrap();
        let survivors: Vec<u32> = ls
            .iter()
            .filter(|l| !l.removed)
            .map(|l| l.number)
            .collect();
        assert_eq!(survivors, vec![1, 3, 7]);
    }

    #[test]
    fn block_selects_else_branch_when_negative() {
        let mut ls = lines("-- %IF flag\nb\n-- %ELSE\nc\n-- %END");
        apply_block(&mut ls, &Bindings::new()).unwrap();
        let survivors: Vec<u32> = ls
            .iter()
            .filter(|l| !l.removed)
            .map(|l| l.number)
            .collect();
        assert_eq!(survivors, vec![4]);
    }

    #[test]
    fn block_end_optional_without_else() {
        let mut ls = lines("a\n-- %IF flag\nb");
        apply_block(&mut ls, &Bindings::new()).unwrap();
        assert!(!ls[0].removed);
        assert!(ls[2].removed);
    }

    #[test]
    fn block_with_else_requires_end() {
        let mut ls = lines("-- %IF flag\nb\n-- %ELSE\nc");
        let err = apply_block(&mut ls, &Bindings::new()).unwrap_err();
        assert!(matches!(err, ParseError::Directive { .. }));
    }

    #[test]
    fn unknown_block_directive_fails() {
        let mut ls = lines("-- %WHILE x\nb");
        let err = apply_block(&mut ls, &Bindings::new()).unwrap_err();
        assert!(matches!(err, ParseError::Directive { line: 1, .. }));
    }

    #[test]
    fn nested_blocks_fail() {
        let mut ls = lines("-- %IF a\n-- %IF b\nx\n-- %END\n-- %END");
        let err = apply_block(&mut ls, &Bindings::new()).unwrap_err();
        assert!(matches!(err, ParseError::Directive { line: 2, .. }));
    }

    #[test]
    fn inline_selects_first_true_branch() {
        let mut ls = lines("ORDER BY /*%if newest*/ created_at DESC /*%else*/ id /*%end*/");
        apply_inline(&mut ls[0], &Bindings::new().bind("newest", true)).unwrap();
        assert_eq!(seg_text(&ls[0].segs).trim_end(), "ORDER BY  created_at DESC");
    }

    #[test]
    fn inline_falls_through_to_else() {
        let mut ls = lines("ORDER BY /*%if newest*/ created_at DESC /*%else*/ id /*%end*/");
        apply_inline(&mut ls[0], &Bindings::new()).unwrap();
        assert_eq!(seg_text(&ls[0].segs).trim_end(), "ORDER BY  id");
    }

    #[test]
    fn inline_without_match_drops_construct() {
        let mut ls = lines("x /*%if a*/ y /*%end*/");
        apply_inline(&mut ls[0], &Bindings::new()).unwrap();
        assert_eq!(seg_text(&ls[0].segs), "x ");
    }

    #[test]
    fn inline_missing_end_fails() {
        let mut ls = lines("x /*%if a*/ y");
        let err = apply_inline(&mut ls[0], &Bindings::new()).unwrap_err();
        assert!(matches!(err, ParseError::Directive { .. }));
    }

    #[test]
    fn stray_end_fails() {
        let mut ls = lines("x /*%end*/");
        let err = apply_inline(&mut ls[0], &Bindings::new()).unwrap_err();
        assert!(matches!(err, ParseError::Directive { .. }));
    }

    #[test]
    fn negated_condition() {
        let mut ls = lines("a /*%if !flag*/ b /*%end*/");
        apply_inline(&mut ls[0], &Bindings::new()).unwrap();
        assert_eq!(seg_text(&ls[0].segs), "a  b ");
    }
}
