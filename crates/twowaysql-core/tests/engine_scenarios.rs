//! End-to-end template scenarios: binding, pruning, expansion, repair.

mod common;
use common::*;

use pretty_assertions::assert_eq;
use twowaysql_core::{BindValue, Bindings, Dialect};

#[test]
fn binds_and_prunes_in_one_line() {
    let result = compile(
        "SELECT * FROM t WHERE a = /* $a */1 AND b = /* $b */2",
        &Bindings::new().bind("a", 10).bind("b", Option::<i64>::None),
    );
    assert_eq!(result.sql, "SELECT * FROM t WHERE a = ?");
    assert_eq!(result.params, vec![BindValue::Int(10)]);
    stable(&result);
}

#[test]
fn expands_in_list_for_postgresql() {
    let result = compile_with(
        Dialect::Postgresql,
        "WHERE id IN /* $ids */(1,2,3)",
        &Bindings::new().bind("ids", vec![7_i64, 8]),
    );
    assert_eq!(result.sql, "WHERE id IN (%s, %s)");
    assert_eq!(result.params, vec![BindValue::Int(7), BindValue::Int(8)]);
}

#[test]
fn empty_list_in_position_becomes_null_literal() {
    let result = compile(
        "WHERE id IN /* $ids */(1,2,3)",
        &Bindings::new().bind("ids", Vec::<i64>::new()),
    );
    assert_eq!(result.sql, "WHERE id IN (NULL)");
    assert!(result.params.is_empty());
    stable(&result);
}

#[test]
fn comment_before_operator_list_rewrites_to_in() {
    let result = compile(
        "FIELD1 /* p */= 100",
        &Bindings::new().bind("p", vec![5_i64, 6, 7]),
    );
    assert_eq!(result.sql, "FIELD1 IN (?, ?, ?)");
    assert_eq!(
        result.params,
        vec![BindValue::Int(5), BindValue::Int(6), BindValue::Int(7)]
    );
}

#[test]
fn comment_before_operator_null_rewrites_to_is_null() {
    let result = compile("FIELD1 /* p */= 100", &Bindings::new().bind("p", BindValue::Null));
    assert_eq!(result.sql, "FIELD1 IS NULL");
    assert!(result.params.is_empty());
}

#[test]
fn trailing_and_is_stripped() {
    let result = compile(
        "WHERE x >= /* $a */1 AND x <= /* $b */2",
        &Bindings::new().bind("a", 10).bind("b", Option::<i64>::None),
    );
    assert_eq!(result.sql, "WHERE x >= ?");
    assert_eq!(result.params, vec![BindValue::Int(10)]);
    stable(&result);
}

#[test]
fn empty_parens_collapse() {
    let result = compile(
        "WHERE a = /* $a */1 AND ( s = /* $s1 */'p' OR s = /* $s2 */'q' )",
        &Bindings::new()
            .bind("a", 1)
            .bind("s1", Option::<i64>::None)
            .bind("s2", Option::<i64>::None),
    );
    assert_eq!(result.sql, "WHERE a = ?");
    assert_eq!(result.params, vec![BindValue::Int(1)]);
    stable(&result);
}

#[test]
fn oracle_splits_long_in_lists() {
    let ids: Vec<i64> = (0..1500).collect();
    let result = compile_with(
        Dialect::Oracle,
        "SELECT * FROM t WHERE id IN /* $ids */(1)",
        &Bindings::new().bind("ids", ids),
    );
    assert!(result.sql.contains("( id IN (:ids_0"));
    assert!(result.sql.contains(":ids_999)"));
    assert!(result.sql.contains("OR id IN (:ids_1000"));
    assert!(result.sql.contains(":ids_1499)"));
    assert_eq!(result.named_params.len(), 1500);
    assert_eq!(result.params.len(), 1500);
    assert_eq!(result.params[0], BindValue::Int(0));
    assert_eq!(result.params[1499], BindValue::Int(1499));
}

#[test]
fn like_builder_escapes_and_appends_escape_clause() {
    let result = compile(
        "WHERE name LIKE /*%L '%' k '%' */'%x%'",
        &Bindings::new().bind("k", "10%病気"),
    );
    assert_eq!(result.sql, "WHERE name LIKE ? ESCAPE '#'");
    assert_eq!(
        result.params,
        vec![BindValue::Text(String::from("%10#%病気%"))]
    );
    stable(&result);
}

#[test]
fn scalar_list_and_null_through_equality() {
    let result = compile("WHERE a = /* $a */1", &Bindings::new().bind("a", vec![1_i64, 2]));
    assert_eq!(result.sql, "WHERE a IN (?, ?)");

    let result = compile("WHERE a = /* a */1", &Bindings::new());
    assert_eq!(result.sql, "WHERE a IS NULL");

    let result = compile("WHERE a <> /* a */1", &Bindings::new().bind("a", vec![3_i64, 4]));
    assert_eq!(result.sql, "WHERE a NOT IN (?, ?)");

    let result = compile("WHERE a != /* a */1", &Bindings::new());
    assert_eq!(result.sql, "WHERE a IS NOT NULL");
}

#[test]
fn multi_line_statement_keeps_layout() {
    let template = "SELECT id, name\nFROM users\nWHERE status = /* $status */'active'\n  AND age >= /* $min_age */18\nORDER BY id";
    let result = compile(
        template,
        &Bindings::new().bind("status", "retired").bind("min_age", 65),
    );
    assert_eq!(
        result.sql,
        "SELECT id, name\nFROM users\nWHERE status = ?\n  AND age >= ?\nORDER BY id"
    );
    assert_eq!(result.params.len(), 2);
    stable(&result);
}

#[test]
fn removed_condition_lines_drop_their_where() {
    let template = "SELECT id\nFROM users\nWHERE status = /* $status */'active'\nORDER BY id";
    let result = compile(template, &Bindings::new());
    assert_eq!(result.sql, "SELECT id\nFROM users\nORDER BY id");
    stable(&result);
}

#[test]
fn cte_body_survives_pruned_where() {
    let template = "WITH recent AS (\n    SELECT id FROM orders\n        WHERE placed_at >= /* $since */'2020-01-01'\n)\nSELECT * FROM recent";
    let result = compile(template, &Bindings::new());
    assert_eq!(
        result.sql,
        "WITH recent AS (\n    SELECT id FROM orders\n)\nSELECT * FROM recent"
    );
    stable(&result);
}

#[test]
fn union_separator_glues_to_next_line() {
    let template = "SELECT id FROM a\nUNION\nSELECT id FROM b WHERE x = /* $x */1";
    let result = compile(template, &Bindings::new().bind("x", 9));
    assert_eq!(
        result.sql,
        "SELECT id FROM a\nUNION SELECT id FROM b WHERE x = ?"
    );
    assert_eq!(result.params, vec![BindValue::Int(9)]);
}

#[test]
fn defaults_run_as_plain_sql_when_unbound() {
    // The two-way property: with a `?`-chain nothing binds and the
    // template's literal default remains executable.
    let result = compile("WHERE a = /* ?x ?y */0", &Bindings::new());
    assert_eq!(result.sql, "WHERE a = 0");
    assert!(result.params.is_empty());
}
