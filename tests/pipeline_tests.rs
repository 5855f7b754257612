//! End-to-end pipeline tests: parse-stage errors and the boundary
//! behaviors of the parse → rewrite → validate sequence.

mod common;

use common::{assert_error_code, assert_valid, prepare, prepare_err};
use cypher_frontend::{Frontend, QueryError};

// ==================== Parse stage ====================

#[test]
fn empty_query() {
    assert_eq!(prepare_err(""), QueryError::EmptyQuery);
    assert_eq!(prepare_err("   "), QueryError::EmptyQuery);
    assert_eq!(prepare_err(";"), QueryError::EmptyQuery);
}

#[test]
fn comment_only_input_is_empty() {
    assert_eq!(prepare_err("// nothing"), QueryError::EmptyQuery);
    assert_eq!(prepare_err("/* still nothing */"), QueryError::EmptyQuery);
}

#[test]
fn multiple_statements() {
    assert_eq!(
        prepare_err("RETURN 1; RETURN 2"),
        QueryError::MultipleStatements
    );
}

#[test]
fn leading_comment_is_skipped() {
    assert_valid("// comment\nMATCH (n) RETURN n");
}

#[test]
fn syntax_error_carries_position() {
    let err = prepare_err("MATCH (a RETURN a");
    let QueryError::Parser {
        line,
        column,
        offset,
        context,
        ..
    } = err
    else {
        panic!("expected a parser error, got {err:?}");
    };
    assert_eq!(line, 1);
    assert!(column > 1);
    assert!(offset > 0);
    assert!(!context.is_empty());
}

#[test]
fn constraint_commands_are_rejected() {
    assert_error_code(
        "CREATE CONSTRAINT ON (p:Person) ASSERT p.id IS UNIQUE",
        "InvalidConstraintCommand",
    );
    assert_error_code("DROP CONSTRAINT whatever", "InvalidConstraintCommand");
}

#[test]
fn index_commands_are_not_queries() {
    assert_error_code("CREATE INDEX ON :Person(name)", "UnsupportedQueryType");
}

// ==================== Literal boundary scenarios ====================

#[test]
fn redeclare_in_create() {
    // a single-node CREATE path over a bound variable creates nothing
    assert_error_code("MATCH (a) CREATE (a)", "Redeclare");
}

#[test]
fn bound_node_extends_create_pattern() {
    // using a bound alias inside a longer CREATE path is allowed
    assert_valid("MATCH (a) CREATE (a)-[:R]->(:B)");
}

#[test]
fn subquery_import_must_be_simple() {
    assert_error_code(
        "WITH 1 AS a CALL {WITH a+1 AS b RETURN b} RETURN b",
        "CallSubqueryInvalidReferences",
    );
}

#[test]
fn all_shortest_paths_minimal_length() {
    assert_error_code(
        "MATCH (a),(b),p = allShortestPaths((a)-[*2..]->(b)) RETURN p",
        "AllShortestPathMinimalLength",
    );
}

#[test]
fn create_hides_its_own_bindings_from_siblings() {
    assert_eq!(
        prepare_err("CREATE (a {v:1}),(b {v:a.v+1})"),
        QueryError::NotDefined("a".into())
    );
}

#[test]
fn union_all_chain_is_accepted() {
    assert_valid("MATCH (a) RETURN a UNION ALL MATCH (a) RETURN a");
}

#[test]
fn mixed_union_flavours_are_rejected() {
    assert_error_code(
        "MATCH (a) RETURN a UNION MATCH (a) RETURN a UNION ALL MATCH (a) RETURN a",
        "UnionCombination",
    );
}

#[test]
fn unwind_variable_reused_as_node() {
    assert_eq!(
        prepare_err("UNWIND [1,2] AS n MATCH (n) RETURN n"),
        QueryError::VariableAlreadyDeclared("n".into())
    );
}

// ==================== Pipeline-level properties ====================

#[test]
fn validation_is_idempotent_over_rewrites() {
    // queries that trigger every rewrite still validate after re-running
    assert_valid("MATCH (a:N) MATCH (b:N) RETURN *");
    assert_valid("MATCH (m) CALL { CREATE (n:N) RETURN n } RETURN n, m");
    assert_valid("MATCH (a), (b) WITH * RETURN a, b");
}

#[test]
fn star_projection_is_expanded() {
    let ast = prepare("MATCH (b), (a) RETURN *");
    let clause = ast.clause_by_index(1);
    let projection = clause.as_projection().unwrap();
    assert!(!projection.star);
    let columns = ast.build_return_column_names(projection);
    assert_eq!(columns, vec!["b", "a"]);
}

#[test]
fn adjacent_matches_are_coalesced() {
    let ast = prepare("MATCH (a:N) MATCH (b:N) RETURN a, b");
    assert_eq!(ast.clause_count(), 2);
    let cypher_frontend::Clause::Match(m) = ast.clause_by_index(0) else {
        panic!("expected MATCH");
    };
    assert_eq!(m.pattern.paths.len(), 2);
}

#[test]
fn returning_subquery_threads_outer_names() {
    let ast = prepare("MATCH (m) CALL { CREATE (n:N) RETURN n } RETURN n, m");
    let cypher_frontend::Clause::CallSubquery(sub) = ast.clause_by_index(1) else {
        panic!("expected subquery");
    };
    // the rewrite injected an import WITH at the head of the subquery
    assert!(matches!(
        sub.query.clauses.first(),
        Some(cypher_frontend::Clause::With(_))
    ));
}

#[test]
fn parameters_prefix_round_trip() {
    let frontend = Frontend::default();
    let (params, ast) = frontend
        .prepare_with_params("CYPHER limit=10 MATCH (n) RETURN n LIMIT $limit")
        .unwrap();
    assert_eq!(params.len(), 1);
    assert!(params.contains_key("limit"));
    assert_eq!(ast.clause_count(), 2);
}

#[test]
fn load_csv_binds_its_row_variable() {
    assert_valid("LOAD CSV WITH HEADERS FROM 'file:///x.csv' AS row CREATE (:Row {v: row})");
}

#[test]
fn merge_actions_validate_under_merge() {
    assert_valid("MERGE (n:Person {id: 1}) ON CREATE SET n.created = 1 ON MATCH SET n.seen = 2");
    assert_error_code(
        "MERGE (n:Person) ON CREATE SET n.v = count(n)",
        "InvalidUseOfAggregation",
    );
}
