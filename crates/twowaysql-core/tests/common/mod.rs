#![allow(dead_code)]

use twowaysql_core::{Bindings, Dialect, Engine, ParseError, ParseResult};

pub fn compile(template: &str, bindings: &Bindings) -> ParseResult {
    twowaysql_core::parse(template, bindings)
        .unwrap_or_else(|e| panic!("Failed to compile: {template}\nError: {e:?}"))
}

pub fn compile_with(dialect: Dialect, template: &str, bindings: &Bindings) -> ParseResult {
    Engine::new(dialect)
        .parse(template, bindings)
        .unwrap_or_else(|e| panic!("Failed to compile: {template}\nError: {e:?}"))
}

pub fn compile_err(template: &str, bindings: &Bindings) -> ParseError {
    twowaysql_core::parse(template, bindings)
        .expect_err(&format!("Expected parse error for: {template}"))
}

/// Verifies that a produced statement is a fixed point of the engine:
/// compiling the output again (it carries no parameter comments) must
/// reproduce it byte for byte.
pub fn stable(result: &ParseResult) {
    let again = compile(&result.sql, &Bindings::new());
    assert_eq!(
        again.sql, result.sql,
        "Cleanup is not idempotent.\n  First:  {}\n  Second: {}",
        result.sql, again.sql
    );
    assert!(again.params.is_empty());
}
