//! Semantic validation rules, clause by clause.

mod common;

use common::{assert_error_code, assert_valid, prepare_err};
use cypher_frontend::QueryError;

// ==================== Query structure ====================

#[test]
fn query_must_terminate_properly() {
    assert_error_code("MATCH (a)", "InvalidLastClause");
    assert_error_code("MATCH (a) WITH a", "InvalidLastClause");
    assert_error_code("MATCH (a) UNWIND [1] AS x", "InvalidLastClause");

    assert_valid("CREATE (:X)");
    assert_valid("MATCH (a) DELETE a");
    assert_valid("MATCH (a) SET a.v = 1");
    assert_valid("MATCH (a) REMOVE a.v");
    assert_valid("CALL db.labels()");
    assert_valid("MATCH (a) FOREACH (x IN [1] | SET a.v = x)");
}

#[test]
fn terminal_subquery_must_not_return() {
    assert_error_code("MATCH (m) CALL { MATCH (x) RETURN x }", "InvalidLastClause");
    assert_valid("MATCH (m) CALL { CREATE (:X) }");
}

#[test]
fn only_union_may_follow_return() {
    assert_error_code(
        "MATCH (a) RETURN a MATCH (b) RETURN b",
        "UnexpectedClauseFollowingReturn",
    );
}

#[test]
fn query_cannot_begin_with_star_projection() {
    assert_error_code("RETURN *", "QueryCannotBeginWith");
    assert_error_code("WITH * MATCH (n) RETURN n", "QueryCannotBeginWith");
}

#[test]
fn reading_after_updating_needs_with() {
    assert_error_code("CREATE (a) MATCH (b) RETURN b", "MissingWith");
    assert_error_code(
        "MATCH (a) SET a.v = 1 UNWIND [1] AS x RETURN x",
        "MissingWith",
    );
    assert_error_code(
        "CREATE (a) CALL db.labels() YIELD label RETURN label",
        "MissingWith",
    );

    assert_valid("CREATE (a) WITH a MATCH (b) RETURN a, b");
}

#[test]
fn match_after_optional_match_needs_with() {
    assert_error_code(
        "OPTIONAL MATCH (a) MATCH (b) RETURN a, b",
        "MissingWithAfterOptionalMatch",
    );

    assert_valid("MATCH (a) OPTIONAL MATCH (b) RETURN a, b");
    assert_valid("OPTIONAL MATCH (a) OPTIONAL MATCH (b) RETURN a, b");
    assert_valid("OPTIONAL MATCH (a) WITH a MATCH (b) RETURN a, b");
}

// ==================== Scoping ====================

#[test]
fn references_must_be_bound() {
    assert_eq!(prepare_err("MATCH (a) RETURN b"), QueryError::NotDefined("b".into()));
    assert_error_code("MATCH (a) WHERE b.v = 1 RETURN a", "NotDefined");
    assert_error_code("MATCH (a), (b) WITH a RETURN b", "NotDefined");
}

#[test]
fn same_alias_for_node_and_relationship() {
    assert_error_code(
        "MATCH (a)-[a]->(b) RETURN a",
        "SameAliasNodeAndRelationship",
    );
}

#[test]
fn relationship_alias_is_single_use_in_match() {
    assert_error_code(
        "MATCH (a)-[r:R]->(b), (c)-[r:R]->(d) RETURN r",
        "SameAliasMultiplePatterns",
    );
}

#[test]
fn unwind_variable_must_be_new() {
    assert_error_code("MATCH (n) UNWIND [1,2] AS n RETURN n", "VariableAlreadyDeclared");
}

#[test]
fn with_opens_a_fresh_scope() {
    assert_valid("MATCH (a), (b) WITH a, b RETURN a, b");
    assert_valid("MATCH (a) WITH a AS b MATCH (c) RETURN b, c");
}

#[test]
fn with_predicate_sees_prior_scope() {
    assert_valid("MATCH (a), (b) WITH a WHERE b.v = 1 RETURN a");
}

#[test]
fn with_projections_must_be_nameable() {
    assert_error_code("MATCH (a) WITH a.v RETURN 1", "WithProjectionMissingAlias");
}

#[test]
fn result_columns_must_be_unique() {
    assert_error_code("MATCH (a), (b) RETURN a AS x, b AS x", "SameResultColumnName");
    assert_error_code(
        "MATCH (a), (b) WITH a AS x, b AS x RETURN x",
        "SameResultColumnName",
    );
}

// ==================== MATCH / CREATE / MERGE patterns ====================

#[test]
fn create_relationships_need_exactly_one_type() {
    assert_error_code("MATCH (a),(b) CREATE (a)-[]->(b)", "OneRelationshipType");
    assert_error_code("MATCH (a),(b) CREATE (a)-[:A|:B]->(b)", "OneRelationshipType");
    assert_valid("MATCH (a),(b) CREATE (a)-[:R]->(b)");
}

#[test]
fn create_relationships_must_be_directed() {
    assert_error_code(
        "MATCH (a),(b) CREATE (a)-[:R]-(b)",
        "CreateDirectedRelationship",
    );
}

#[test]
fn variable_length_is_update_hostile() {
    assert_error_code("MATCH (a),(b) CREATE (a)-[:R*2]->(b)", "VarLen");
    assert_error_code("MERGE (a)-[:R*2]->(b)", "VarLen");
    assert_valid("MATCH (a)-[:R*1..3]->(b) RETURN a");
}

#[test]
fn variable_length_range_must_be_ordered() {
    assert_error_code("MATCH (a)-[*3..1]->(b) RETURN a", "VarLenInvalidRange");
    assert_valid("MATCH (a)-[*2..2]->(b) RETURN a");
}

#[test]
fn merge_cannot_redeclare_bound_entities() {
    assert_error_code("MATCH (a) MERGE (a:L)", "Redeclare");
    assert_error_code("MATCH (a) MERGE (a {v: 1})", "Redeclare");
    assert_error_code("MATCH (a)-[r:R]->(b) MERGE (a)-[r:R]->(b)", "Redeclare");

    // reusing a bound node without labels or properties is allowed
    assert_valid("MATCH (a) MERGE (a)-[:R]->(:B)");
}

#[test]
fn merge_relationships_need_exactly_one_type() {
    assert_error_code("MERGE (a)-[]->(b)", "OneRelationshipType");
    assert_valid("MERGE (a)-[:R]->(b)");
}

#[test]
fn inline_properties_must_be_plain_maps() {
    assert_error_code(
        "MATCH (p {v: (a)-[:R]->(b)}) RETURN p",
        "UnhandledTypeInlineProperties",
    );
    assert_valid("MATCH (p {v: 1, w: 'x'}) RETURN p");
    assert_valid("MATCH (p $props) RETURN p");
}

// ==================== Shortest paths ====================

#[test]
fn shortest_path_endpoints_must_be_bound() {
    assert_error_code(
        "MATCH (a) WITH a RETURN shortestPath((a)-[*]->(b))",
        "ShortestPathBoundNodes",
    );
    assert_error_code(
        "MATCH (a) RETURN shortestPath((a)-[*]->())",
        "ShortestPathBoundNodes",
    );
    assert_valid("MATCH (a), (b) RETURN shortestPath((a)-[*]->(b))");
}

#[test]
fn shortest_path_is_not_allowed_in_match_patterns() {
    assert_error_code(
        "MATCH (a), (b), p = shortestPath((a)-[*]->(b)) RETURN p",
        "ShortestPathSupport",
    );
}

#[test]
fn all_shortest_paths_belongs_in_match_patterns() {
    assert_error_code(
        "MATCH (a), (b) WHERE allShortestPaths((a)-[*]->(b)) RETURN a",
        "AllShortestPathSupport",
    );
    assert_error_code(
        "MATCH (a), (b) RETURN allShortestPaths((a)-[*]->(b))",
        "AllShortestPathSupport",
    );
    assert_valid("MATCH (a), (b), p = allShortestPaths((a)-[*]->(b)) RETURN p");
}

// ==================== SET / REMOVE / DELETE ====================

#[test]
fn set_lhs_must_be_an_alias() {
    assert_error_code("MATCH (n) SET nodes(n)[0].v = 1", "SetLhsNonAlias");
    assert_valid("MATCH (n) SET n.v = 1");
    assert_valid("MATCH (n) SET n = {v: 1}");
    assert_valid("MATCH (n) SET n += {v: 1}");
    assert_valid("MATCH (n) SET n:Extra");
}

#[test]
fn subscript_assignment_is_unsupported() {
    assert_error_code("MATCH (n) SET n.arr[0] = 1", "UnsupportedOperator");
}

#[test]
fn remove_targets_must_be_alias_properties() {
    assert_error_code(
        "MATCH p = (a)-[:R]->(b) REMOVE last(nodes(p)).name",
        "RemoveInvalidInput",
    );
    assert_valid("MATCH (n) REMOVE n.name");
    assert_valid("MATCH (n:L) REMOVE n:L");
}

#[test]
fn delete_takes_entities_only() {
    assert_error_code("MATCH (n) DELETE n.v", "DeleteInvalidArguments");
    assert_error_code("MATCH (n) DELETE 1", "DeleteInvalidArguments");
    assert_valid("MATCH (n) DELETE n");
    assert_valid("MATCH (n), (m) DETACH DELETE n, m");
    assert_valid("MATCH p = (a)-[:R]->(b) DELETE nodes(p)[0]");
}

// ==================== WITH / RETURN modifiers ====================

#[test]
fn limit_and_skip_take_integers_or_parameters() {
    assert_error_code("MATCH (n) RETURN n LIMIT 'a'", "LimitMustBeNonNegative");
    assert_error_code("MATCH (n) RETURN n SKIP n", "SkipMustBeNonNegative");
    assert_valid("MATCH (n) RETURN n SKIP 5 LIMIT 10");
    assert_valid("MATCH (n) RETURN n LIMIT $l");
}

#[test]
fn order_by_sees_projected_aliases() {
    assert_valid("MATCH (n) RETURN n.v AS v ORDER BY v");
    assert_valid("MATCH (n) WITH n.v AS v ORDER BY v RETURN v");
}

// ==================== Functions & procedures ====================

#[test]
fn unknown_functions_are_rejected() {
    assert_eq!(
        prepare_err("RETURN nosuchfn(1)"),
        QueryError::UnknownFunction("nosuchfn".into())
    );
}

#[test]
fn aggregation_is_only_legal_in_projections() {
    assert_error_code("MATCH (n) WHERE sum(n.v) > 1 RETURN n", "InvalidUseOfAggregation");
    assert_valid("MATCH (n) RETURN sum(n.v)");
    assert_valid("MATCH (n) WITH count(n) AS c RETURN c");
}

#[test]
fn star_argument_rules() {
    assert_valid("MATCH (n) RETURN count(*)");
    assert_error_code("MATCH (n) RETURN sum(*)", "InvalidUsageOfStarParameter");
    assert_error_code(
        "MATCH (n) RETURN count(DISTINCT *)",
        "InvalidUsageOfDistinctStar",
    );
}

#[test]
fn procedures_must_be_registered() {
    assert_error_code("CALL nope.proc()", "ProcedureNotRegistered");
}

#[test]
fn procedure_arity_is_checked() {
    assert_error_code(
        "CALL db.labels(1) YIELD label RETURN label",
        "ProcedureInvalidArguments",
    );
    // variadic procedures skip the arity check
    assert_valid("CALL db.idx.fulltext.createNodeIndex('idx', 'a', 'b')");
}

#[test]
fn yield_outputs_must_exist_and_be_unique() {
    assert_error_code(
        "CALL db.labels() YIELD wrong RETURN wrong",
        "ProcedureInvalidOutput",
    );
    assert_error_code(
        "CALL db.labels() YIELD label, label RETURN label",
        "VariableAlreadyDeclared",
    );
}

#[test]
fn aliased_yield_outputs_replace_the_original_name() {
    assert_valid("CALL db.labels() YIELD label AS l RETURN l");
    assert_error_code(
        "CALL db.labels() YIELD label AS l RETURN label",
        "NotDefined",
    );
}

// ==================== FOREACH ====================

#[test]
fn foreach_body_must_be_updating() {
    assert_error_code("MATCH (n) FOREACH (x IN [1] | MATCH (m))", "ForeachInvalidBody");
    assert_valid("MATCH (n) FOREACH (x IN [1,2] | SET n.v = x)");
    assert_valid("MATCH (n) FOREACH (x IN [[1],[2]] | FOREACH (y IN x | CREATE (:V {v: y})))");
}

#[test]
fn foreach_scope_is_isolated() {
    assert_error_code(
        "MATCH (n) FOREACH (x IN [1,2] | SET n.v = x) RETURN x",
        "NotDefined",
    );
}

#[test]
fn foreach_variable_must_be_new() {
    assert_error_code(
        "MATCH (x) FOREACH (x IN [1] | SET x.v = 1)",
        "VariableAlreadyDeclared",
    );
}

// ==================== Comprehensions & reduce ====================

#[test]
fn comprehension_variables_are_local() {
    assert_valid("MATCH (a) RETURN [x IN [1,2] WHERE x > 1 | x] AS l");
    assert_error_code("MATCH (a) WITH [x IN [1,2] | x] AS l RETURN x", "NotDefined");
}

#[test]
fn pattern_comprehension_bindings_are_local() {
    assert_valid("MATCH (a) RETURN [(a)-[:R]->(b) | b.v] AS vs");
    assert_error_code(
        "MATCH (a) WITH [(a)-[:R]->(b) | b.v] AS vs RETURN b",
        "NotDefined",
    );
}

#[test]
fn quantifiers_bind_their_variable() {
    assert_valid("MATCH (n) WHERE any(x IN n.vals WHERE x > 1) RETURN n");
    assert_valid("MATCH (n) WHERE none(x IN n.vals WHERE x < 0) RETURN n");
}

#[test]
fn reduce_requires_an_eval_expression() {
    assert_valid("RETURN reduce(s = 0, x IN [1,2] | s + x)");
    assert_error_code("RETURN reduce(s = 0, x IN [1,2])", "MissingEvalExpInReduce");
}

#[test]
fn reduce_list_must_resolve() {
    assert_error_code("RETURN reduce(s = 0, x IN lst | s + x)", "NotDefined");
}

#[test]
fn aggregation_is_forbidden_inside_reduce() {
    assert_error_code(
        "MATCH (n) RETURN reduce(s = 0, x IN [1] | s + count(x))",
        "InvalidUseOfAggregation",
    );
}

// ==================== Subqueries ====================

#[test]
fn subquery_imports_must_be_plain_identifiers() {
    assert_error_code(
        "MATCH (a) CALL {WITH a AS b RETURN b} RETURN b",
        "CallSubqueryInvalidReferences",
    );
    assert_error_code(
        "MATCH (a) CALL {WITH a ORDER BY a.v RETURN a.v AS v} RETURN v",
        "CallSubqueryInvalidReferences",
    );
    assert_valid("MATCH (m) CALL { WITH m RETURN m.v AS v } RETURN v, m");
}

#[test]
fn subquery_without_imports_starts_empty() {
    assert_error_code("MATCH (m) CALL { RETURN m.v AS v } RETURN v", "NotDefined");
}

#[test]
fn subquery_returns_extend_the_outer_scope() {
    assert_valid("MATCH (m) CALL { MATCH (q) RETURN q } RETURN q, m");
    assert_error_code(
        "MATCH (n) CALL { MATCH (m) RETURN m AS n } RETURN n",
        "VariableAlreadyDeclaredInOuterScope",
    );
}

#[test]
fn subquery_union_branches_revalidate_imports() {
    assert_valid(
        "MATCH (m) CALL { WITH m RETURN m.v AS v UNION WITH m RETURN m.w AS v } RETURN v, m",
    );
}

// ==================== Unions ====================

#[test]
fn union_requires_matching_returns() {
    assert_error_code("MATCH (a) RETURN a UNION MATCH (b) DELETE b", "UnionMissingReturns");
    assert_error_code(
        "MATCH (a) RETURN a UNION MATCH (b) RETURN b",
        "UnionMismatchedReturns",
    );
    assert_valid("MATCH (a) RETURN a AS x UNION MATCH (b) RETURN b AS x");
}

// ==================== Unsupported constructs ====================

#[test]
fn legacy_and_administrative_constructs_are_rejected() {
    assert_error_code("START n=node(0) RETURN n", "UnsupportedASTNodeType");
    assert_error_code(
        "USING PERIODIC COMMIT 500 LOAD CSV FROM 'f' AS row CREATE (:R)",
        "UnsupportedASTNodeType",
    );
    assert_error_code(
        "MATCH (n:L) USING INDEX n:L(v) WHERE n.v = 1 RETURN n",
        "UnsupportedASTNodeType",
    );
    assert_error_code(
        "MATCH (n) RETURN filter(x IN [1] WHERE x > 0)",
        "UnsupportedASTNodeType",
    );
}

#[test]
fn unsupported_operators_are_rejected() {
    assert_error_code("MATCH (n) WHERE n.name =~ 'A.*' RETURN n", "UnsupportedOperator");
    assert_error_code("MATCH (n) RETURN n {.name}", "UnsupportedOperator");
}
