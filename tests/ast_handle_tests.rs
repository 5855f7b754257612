//! AST handle behavior: segments, reference maps, sharing, naming, and the
//! planner-facing predicates.

mod common;

use common::prepare;
use cypher_frontend::ast::{Ast, PathBody, PatternElement};
use cypher_frontend::procedures::{BuiltinFunctions, InMemoryProcedureRegistry};
use cypher_frontend::{Clause, ClauseKind};

#[test]
fn master_handle_covers_all_clauses() {
    let ast = prepare("MATCH (a) WITH a MATCH (b) RETURN a, b");
    assert!(ast.is_master());
    assert_eq!(ast.clause_count(), 4);
    assert_eq!(ast.window(), 0..4);
}

#[test]
fn segments_window_the_master() {
    let ast = prepare("MATCH (a) WITH a MATCH (b) RETURN a, b");

    let first = Ast::segment(&ast, 0, 2);
    assert!(!first.is_master());
    assert_eq!(first.clause_count(), 2);
    assert_eq!(first.clause_by_index(0).kind(), ClauseKind::Match);
    assert_eq!(first.clause_by_index(1).kind(), ClauseKind::With);

    let second = Ast::segment(&ast, 2, 4);
    assert_eq!(second.clause_count(), 2);
    assert_eq!(second.clause_by_index(1).kind(), ClauseKind::Return);
}

#[test]
fn handles_share_one_allocation() {
    let ast = prepare("MATCH (a) RETURN a");
    assert_eq!(ast.handle_count(), 1);

    let segment = Ast::segment(&ast, 0, 1);
    let copy = ast.clone();
    assert_eq!(ast.handle_count(), 3);

    drop(segment);
    drop(copy);
    assert_eq!(ast.handle_count(), 1);
}

#[test]
fn segment_reference_map_includes_the_boundary_projection() {
    let ast = prepare("MATCH (a), (b) WITH a MATCH (c) RETURN a, c");

    // the first segment's boundary is the WITH clause: `a` is referenced
    // across it, `b` is not
    let first = Ast::segment(&ast, 0, 1);
    assert!(first.alias_is_referenced("a"));
    assert!(first.alias_is_referenced("b")); // bound within the window itself

    let second = Ast::segment(&ast, 1, 2);
    assert!(second.alias_is_referenced("a"));
    assert!(!second.alias_is_referenced("b"));
}

#[test]
fn clause_lookup_by_kind() {
    let ast = prepare("MATCH (a) WITH a MATCH (b) RETURN a, b");
    assert!(ast.get_clause(ClauseKind::With).is_some());
    assert!(ast.get_clause(ClauseKind::Create).is_none());
    assert_eq!(ast.clause_index(ClauseKind::With), Some(1));
    assert_eq!(ast.clause_indices(ClauseKind::Match), vec![0, 2]);
}

#[test]
fn anonymous_entities_get_stable_names() {
    let ast = prepare("MATCH (a)-[:R]->() RETURN a");

    let Clause::Match(m) = ast.clause_by_index(0) else {
        panic!("expected MATCH");
    };
    let PathBody::Elements(elements) = &m.pattern.paths[0].body else {
        panic!("expected an element chain");
    };
    let PatternElement::Node(named) = &elements[0] else {
        panic!("expected a node");
    };
    let PatternElement::Relationship(rel) = &elements[1] else {
        panic!("expected a relationship");
    };
    let PatternElement::Node(anon) = &elements[2] else {
        panic!("expected a node");
    };

    assert_eq!(ast.node_name(named), "a");
    // enrichment assigned anonymous names in source order
    assert_eq!(ast.rel_name(rel), "@anon_0");
    assert_eq!(ast.node_name(anon), "@anon_1");
    // repeated lookups return the same string
    assert_eq!(ast.rel_name(rel), "@anon_0");
}

#[test]
fn expression_stringification_slices_the_source() {
    let ast = prepare("MATCH (a) RETURN a.v + 1");
    let Clause::Return(projection) = ast.clause_by_index(1) else {
        panic!("expected RETURN");
    };
    let rendered = ast.to_string_expression(&projection.projections[0].expression);
    assert_eq!(rendered, "a.v + 1");
}

#[test]
fn return_column_names() {
    let ast = prepare("MATCH (a) RETURN a, a.v AS value, a.v + 1");
    let Clause::Return(projection) = ast.clause_by_index(1) else {
        panic!("expected RETURN");
    };
    assert_eq!(
        ast.build_return_column_names(projection),
        vec!["a", "value", "a.v + 1"]
    );
}

#[test]
fn call_column_names_fall_back_to_procedure_outputs() {
    let registry = InMemoryProcedureRegistry::with_builtins();

    let ast = prepare("CALL db.labels()");
    let Clause::Call(call) = ast.clause_by_index(0) else {
        panic!("expected CALL");
    };
    assert_eq!(ast.build_call_column_names(call, &registry), vec!["label"]);

    let ast = prepare("CALL db.labels() YIELD label AS l RETURN l");
    let Clause::Call(call) = ast.clause_by_index(0) else {
        panic!("expected CALL");
    };
    assert_eq!(ast.build_call_column_names(call, &registry), vec!["l"]);
}

#[test]
fn eagerness_is_driven_by_updates_and_aggregations() {
    let functions = BuiltinFunctions;

    assert!(!prepare("MATCH (n) RETURN n").is_eager(&functions));
    assert!(prepare("CREATE (:X)").is_eager(&functions));
    assert!(prepare("MATCH (n) RETURN count(n)").is_eager(&functions));
    assert!(prepare("MATCH (n) WITH collect(n) AS ns RETURN ns").is_eager(&functions));
    assert!(prepare("MATCH (m) CALL { CREATE (:X) } RETURN m").is_eager(&functions));
}

#[test]
fn read_only_consults_the_procedure_registry() {
    let registry = InMemoryProcedureRegistry::with_builtins();

    assert!(prepare("MATCH (n) RETURN n").read_only(&registry));
    assert!(prepare("CALL db.labels()").read_only(&registry));
    assert!(!prepare("CREATE (:X)").read_only(&registry));
    assert!(!prepare("MATCH (n) SET n.v = 1").read_only(&registry));
    assert!(!prepare("CALL db.idx.fulltext.createNodeIndex('i', 'f')").read_only(&registry));
    assert!(!prepare("MATCH (m) CALL { CREATE (:X) } RETURN m").read_only(&registry));
}

#[test]
fn segments_share_the_annotation_contexts() {
    let ast = prepare("MATCH (a)-[:R]->() WITH a MATCH (b)-[:S]->() RETURN a, b");
    let segment = Ast::segment(&ast, 2, 4);

    let Clause::Match(m) = segment.clause_by_index(0) else {
        panic!("expected MATCH");
    };
    let PathBody::Elements(elements) = &m.pattern.paths[0].body else {
        panic!("expected elements");
    };
    let PatternElement::Relationship(rel) = &elements[1] else {
        panic!("expected a relationship");
    };

    // names assigned through the master are visible through the segment
    let via_master = ast.rel_name(rel);
    let via_segment = segment.rel_name(rel);
    assert_eq!(via_master, via_segment);
    assert!(via_master.starts_with("@anon_"));
}
