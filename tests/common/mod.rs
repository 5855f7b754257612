//! Shared test helpers for the integration suites.

use cypher_frontend::ast::Ast;
use cypher_frontend::{Frontend, QueryError};

/// Runs the full pipeline, panicking with the error on failure.
pub fn prepare(query: &str) -> Ast {
    match Frontend::default().prepare(query) {
        Ok(ast) => ast,
        Err(err) => panic!("`{query}` should validate, got {}: {err}", err.code()),
    }
}

/// Runs the full pipeline, panicking if the query is accepted.
pub fn prepare_err(query: &str) -> QueryError {
    match Frontend::default().prepare(query) {
        Ok(_) => panic!("`{query}` should be rejected"),
        Err(err) => err,
    }
}

/// Asserts that the pipeline rejects `query` with the given error code.
pub fn assert_error_code(query: &str, code: &str) {
    let err = prepare_err(query);
    assert_eq!(
        err.code(),
        code,
        "`{query}` should fail with {code}, got {}: {err}",
        err.code()
    );
}

/// Asserts that the pipeline accepts `query`.
pub fn assert_valid(query: &str) {
    prepare(query);
}
