//! Block and inline conditional directives, end to end.

mod common;
use common::*;

use pretty_assertions::assert_eq;
use twowaysql_core::{BindValue, Bindings};

#[test]
fn block_if_selects_branch_by_polarity() {
    let template = "SELECT * FROM t\n-- %IF by_name\nWHERE name = /* $name */'x'\n-- %ELSE\nWHERE id = /* $id */0\n-- %END\nORDER BY 1";
    let result = compile(
        template,
        &Bindings::new().bind("by_name", true).bind("name", "alice"),
    );
    assert_eq!(
        result.sql,
        "SELECT * FROM t\nWHERE name = ?\nORDER BY 1"
    );
    assert_eq!(result.params, vec![BindValue::Text(String::from("alice"))]);
}

#[test]
fn block_else_branch_taken_when_unbound() {
    let template = "SELECT * FROM t\n-- %IF by_name\nWHERE name = /* $name */'x'\n-- %ELSE\nWHERE id = /* $id */0\n-- %END";
    let result = compile(template, &Bindings::new().bind("id", 7));
    assert_eq!(result.sql, "SELECT * FROM t\nWHERE id = ?");
    assert_eq!(result.params, vec![BindValue::Int(7)]);
}

#[test]
fn struck_branch_contributes_no_parameters() {
    let template = "SELECT 1\n-- %IF flag\nWHERE a = /* @required_in_dead_branch */1\n-- %END";
    // The @-site sits in a removed branch, so its Required check never runs.
    let result = compile(template, &Bindings::new());
    assert_eq!(result.sql, "SELECT 1");
    assert!(result.params.is_empty());
}

#[test]
fn block_end_is_optional_for_single_branch_at_eof() {
    let template = "SELECT 1\n-- %IF flag\nAND a = /* $a */1";
    let result = compile(template, &Bindings::new());
    assert_eq!(result.sql, "SELECT 1");
}

#[test]
fn inline_if_selects_exactly_one_branch() {
    let template =
        "ORDER BY /*%if newest*/ created_at DESC /*%elseif oldest*/ created_at ASC /*%else*/ id /*%end*/";
    let newest = compile(template, &Bindings::new().bind("newest", true));
    assert_eq!(newest.sql.trim_end(), "ORDER BY  created_at DESC");
    let oldest = compile(template, &Bindings::new().bind("oldest", true));
    assert_eq!(oldest.sql.trim_end(), "ORDER BY  created_at ASC");
    let neither = compile(template, &Bindings::new());
    assert_eq!(neither.sql.trim_end(), "ORDER BY  id");
}

#[test]
fn inline_branch_parameters_resolve() {
    let template = "WHERE /*%if by_id*/ id = /* $id */0 /*%else*/ name = /* $name */'x' /*%end*/";
    let result = compile(template, &Bindings::new().bind("by_id", true).bind("id", 5));
    assert_eq!(result.sql.trim_end(), "WHERE  id = ?");
    assert_eq!(result.params, vec![BindValue::Int(5)]);
}

#[test]
fn negated_conditions() {
    let template = "SELECT 1\n-- %IF !archived\nAND active = 1\n-- %END";
    let result = compile(template, &Bindings::new());
    assert_eq!(result.sql, "SELECT 1\nAND active = 1");
    let result = compile(template, &Bindings::new().bind("archived", true));
    assert_eq!(result.sql, "SELECT 1");
}
