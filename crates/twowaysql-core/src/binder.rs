//! Dialect binder: projects the internal placeholder stream onto the
//! dialect's parameter syntax.
//!
//! The rewriter leaves a sentinel character per bound parameter; this
//! module substitutes `?`, `%s`, or `:name_N` in a single pass and splits
//! IN lists that exceed the dialect's limit.

use indexmap::IndexMap;

use crate::dialect::{Dialect, PlaceholderStyle};
use crate::error::{ParseError, Result};
use crate::line::{Bind, PLACEHOLDER};
use crate::value::BindValue;

/// The bound statement produced from the sentinel stream.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoundSql {
    /// Final SQL text in the dialect's placeholder syntax.
    pub sql: String,
    /// Positional parameters, in placeholder order.
    pub params: Vec<BindValue>,
    /// Named parameters keyed `name_N`, in insertion order.
    pub named: IndexMap<String, BindValue>,
}

/// Substitutes sentinels and applies the dialect's IN-list limit.
pub(crate) fn bind(sql: &str, binds: &[Bind], dialect: Dialect) -> Result<BoundSql> {
    let sql = match dialect.in_list_limit() {
        Some(limit) => split_in_lists(sql, limit)?,
        None => String::from(sql),
    };

    let mut text = String::with_capacity(sql.len());
    let mut params = Vec::with_capacity(binds.len());
    let mut named: IndexMap<String, BindValue> = IndexMap::new();
    let mut per_name: IndexMap<String, usize> = IndexMap::new();
    let mut next = 0usize;

    for c in sql.chars() {
        if c != PLACEHOLDER {
            text.push(c);
            continue;
        }
        let Some(bind) = binds.get(next) else {
            // More sentinels than binds would be an engine bug; keep the
            // invariant visible rather than emitting a silent mismatch.
            return Err(ParseError::Dialect {
                message: String::from("placeholder count exceeds bound parameters"),
            });
        };
        next += 1;
        match dialect.placeholder_style() {
            PlaceholderStyle::Question => text.push('?'),
            PlaceholderStyle::Format => text.push_str("%s"),
            PlaceholderStyle::Named => {
                let counter = per_name.entry(bind.name.clone()).or_insert(0);
                let key = format!("{}_{}", bind.name, *counter);
                *counter += 1;
                text.push(':');
                text.push_str(&key);
                named.insert(key, bind.value.clone());
            }
        }
        params.push(bind.value.clone());
    }
    if matches!(
        dialect.placeholder_style(),
        PlaceholderStyle::Question | PlaceholderStyle::Format
    ) {
        for bind in &binds[..next.min(binds.len())] {
            // Named view for positional dialects, same suffix scheme.
            let counter = per_name.entry(bind.name.clone()).or_insert(0);
            named.insert(format!("{}_{}", bind.name, *counter), bind.value.clone());
            *counter += 1;
        }
    }
    Ok(BoundSql {
        sql: text,
        params,
        named,
    })
}

/// One `IN ( S, S, ... )` group found in the sentinel text.
struct InGroup {
    /// Byte offset where the replacement starts (the column expression).
    start: usize,
    /// Byte offset just past the closing paren.
    end: usize,
    column: String,
    negated: bool,
    count: usize,
}

/// Rewrites `COL IN (S x N)` with `N > limit` into
/// `( COL IN (...) OR COL IN (...) ... )`, preserving sentinel order.
fn split_in_lists(sql: &str, limit: usize) -> Result<String> {
    let mut groups: Vec<InGroup> = Vec::new();
    let mut search = 0usize;
    while let Some(group) = find_in_group(sql, search, limit)? {
        search = group.end;
        groups.push(group);
    }
    if groups.is_empty() {
        return Ok(String::from(sql));
    }

    let mut text = String::from(sql);
    for group in groups.iter().rev() {
        let op = if group.negated { "NOT IN" } else { "IN" };
        let joiner = if group.negated { "AND" } else { "OR" };
        let mut chunks: Vec<String> = Vec::new();
        let mut remaining = group.count;
        while remaining > 0 {
            let take = remaining.min(limit);
            remaining -= take;
            let mut placeholders = String::new();
            for i in 0..take {
                if i > 0 {
                    placeholders.push_str(", ");
                }
                placeholders.push(PLACEHOLDER);
            }
            chunks.push(format!("{} {op} ({placeholders})", group.column));
        }
        let replacement = format!("( {} )", chunks.join(&format!(" {joiner} ")));
        text.replace_range(group.start..group.end, &replacement);
    }
    Ok(text)
}

/// Finds the next pure-sentinel IN group over the limit at or after `from`.
fn find_in_group(sql: &str, from: usize, limit: usize) -> Result<Option<InGroup>> {
    let bytes = sql.as_bytes();
    let mut i = from;
    while i < sql.len() {
        // Word-boundary scan for IN / in.
        let Some(rel) = sql[i..].to_ascii_uppercase().find("IN") else {
            return Ok(None);
        };
        let at = i + rel;
        i = at + 2;
        let left_ok = at == 0 || !is_ident_byte(bytes[at - 1]);
        let right_ok = at + 2 >= sql.len() || !is_ident_byte(bytes[at + 2]);
        if !left_ok || !right_ok {
            continue;
        }
        // Opening paren after optional whitespace.
        let mut j = at + 2;
        while j < sql.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= sql.len() || bytes[j] != b'(' {
            continue;
        }
        // Interior must be sentinels, commas, and whitespace only.
        let interior_start = j + 1;
        let Some(close_rel) = sql[interior_start..].find(')') else {
            continue;
        };
        let interior = &sql[interior_start..interior_start + close_rel];
        let count = interior.matches(PLACEHOLDER).count();
        let pure = count > 0
            && interior
                .chars()
                .all(|c| c == PLACEHOLDER || c == ',' || c.is_whitespace());
        if !pure || count <= limit {
            continue;
        }
        let end = interior_start + close_rel + 1;

        // Column expression and optional NOT before the IN keyword.
        let (negated, before_op) = {
            let head = sql[..at].trim_end();
            match head.to_ascii_uppercase().strip_suffix("NOT") {
                Some(_) if head.len() >= 3 && !ends_with_ident(&head[..head.len() - 3]) => {
                    (true, head.len() - 3)
                }
                _ => (false, head.len()),
            }
        };
        let head = sql[..before_op].trim_end();
        let column_start = column_start(head);
        let column = String::from(&head[column_start..]);
        if column.is_empty() || is_keyword(&column) || column.contains(PLACEHOLDER) {
            return Err(ParseError::Dialect {
                message: format!(
                    "no column expression before oversized IN list at byte {at}"
                ),
            });
        }
        return Ok(Some(InGroup {
            start: column_start,
            end,
            column,
            negated,
            count,
        }));
    }
    Ok(None)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn ends_with_ident(s: &str) -> bool {
    s.chars().last().is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Start of the contiguous column token preceding the operator: an
/// identifier path (`t.col`) or a balanced call (`UPPER(c)`).
fn column_start(head: &str) -> usize {
    let mut depth = 0i32;
    let mut start = head.len();
    for (i, c) in head.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            c if depth == 0 && (c.is_whitespace() || c == ',') => break,
            _ => {}
        }
        start = i;
    }
    start
}

fn is_keyword(word: &str) -> bool {
    matches!(
        word.to_ascii_uppercase().as_str(),
        "AND" | "OR" | "WHERE" | "ON" | "HAVING" | "SELECT" | "SET" | "BY" | "FROM" | "NOT"
            | "IN" | "LIKE" | "IS"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: char = PLACEHOLDER;

    fn b(name: &str, value: i64) -> Bind {
        Bind {
            name: String::from(name),
            value: BindValue::Int(value),
        }
    }

    #[test]
    fn question_style() {
        let bound = bind(
            &format!("WHERE a = {S} AND b = {S}"),
            &[b("a", 1), b("b", 2)],
            Dialect::Sqlite,
        )
        .unwrap();
        assert_eq!(bound.sql, "WHERE a = ? AND b = ?");
        assert_eq!(bound.params, vec![BindValue::Int(1), BindValue::Int(2)]);
    }

    #[test]
    fn format_style() {
        let bound = bind(
            &format!("WHERE id IN ({S}, {S})"),
            &[b("ids", 7), b("ids", 8)],
            Dialect::Postgresql,
        )
        .unwrap();
        assert_eq!(bound.sql, "WHERE id IN (%s, %s)");
        assert_eq!(bound.params, vec![BindValue::Int(7), BindValue::Int(8)]);
    }

    #[test]
    fn named_style_counts_per_name() {
        let bound = bind(
            &format!("WHERE a = {S} AND b = {S} AND c = {S}"),
            &[b("x", 1), b("y", 2), b("x", 3)],
            Dialect::Oracle,
        )
        .unwrap();
        assert_eq!(bound.sql, "WHERE a = :x_0 AND b = :y_0 AND c = :x_1");
        assert_eq!(bound.named.get("x_1"), Some(&BindValue::Int(3)));
        assert_eq!(bound.named.len(), 3);
    }

    #[test]
    fn named_map_matches_sql_tokens() {
        let bound = bind(
            &format!("WHERE id IN ({S}, {S})"),
            &[b("ids", 7), b("ids", 8)],
            Dialect::Oracle,
        )
        .unwrap();
        for key in bound.named.keys() {
            assert!(bound.sql.contains(&format!(":{key}")));
        }
    }

    #[test]
    fn oracle_splits_oversized_in_list() {
        let mut sql = String::from("SELECT * FROM t WHERE id IN (");
        let mut binds = Vec::new();
        for i in 0..1500 {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push(S);
            binds.push(b("ids", i));
        }
        sql.push(')');
        let bound = bind(&sql, &binds, Dialect::Oracle).unwrap();
        assert!(bound.sql.contains("( id IN (:ids_0"));
        assert!(bound.sql.contains(":ids_999"));
        assert!(bound.sql.contains(") OR id IN (:ids_1000"));
        assert!(bound.sql.contains(":ids_1499"));
        assert_eq!(bound.named.len(), 1500);
        assert_eq!(bound.params.len(), 1500);
    }

    #[test]
    fn oracle_under_limit_is_untouched() {
        let bound = bind(
            &format!("WHERE id IN ({S}, {S})"),
            &[b("ids", 1), b("ids", 2)],
            Dialect::Oracle,
        )
        .unwrap();
        assert_eq!(bound.sql, "WHERE id IN (:ids_0, :ids_1)");
    }

    #[test]
    fn split_preserves_order() {
        let mut sql = String::from("id IN (");
        let mut binds = Vec::new();
        for i in 0..1001 {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push(S);
            binds.push(b("ids", i));
        }
        sql.push(')');
        let bound = bind(&sql, &binds, Dialect::Oracle).unwrap();
        let first = bound.sql.find(":ids_0,").unwrap();
        let last = bound.sql.find(":ids_1000").unwrap();
        assert!(first < last);
        assert_eq!(bound.params[1000], BindValue::Int(1000));
    }

    #[test]
    fn split_without_column_fails() {
        let mut sql = String::from("IN (");
        let mut binds = Vec::new();
        for i in 0..1001 {
            if i > 0 {
                sql.push(',');
            }
            sql.push(S);
            binds.push(b("ids", i));
        }
        sql.push(')');
        let err = bind(&sql, &binds, Dialect::Oracle).unwrap_err();
        assert!(matches!(err, ParseError::Dialect { .. }));
    }

    #[test]
    fn literal_in_word_is_not_an_in_group() {
        let bound = bind(
            &format!("WHERE domain = {S}"),
            &[b("d", 5)],
            Dialect::Oracle,
        )
        .unwrap();
        assert_eq!(bound.sql, "WHERE domain = :d_0");
    }
}
