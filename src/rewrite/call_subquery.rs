//! Rewrite of returning `CALL {}` subqueries.
//!
//! A returning subquery resets the variable environment, so outer names
//! used after it would be lost. The rewrite threads them through explicitly:
//! every outer identifier referenced downstream of the subquery is imported
//! under an internal `@`-prefixed alias and re-projected by each terminal
//! `RETURN`:
//!
//! ```text
//! MATCH (m) CALL { CREATE (n:N) RETURN n } RETURN n, m
//! =>
//! MATCH (m) CALL { WITH m AS @m CREATE (n:N) RETURN n, @m AS m } RETURN n, m
//! ```

use super::bind_clause;
use crate::ast::expression::{Expression, Identifier};
use crate::ast::query::{Clause, Projection, ProjectionClause, Query};
use crate::ast::visitor::collect_clause_names;
use crate::ast::Span;
use indexmap::IndexSet;
use smol_str::SmolStr;

/// Rewrites returning subqueries in place. Returns true when anything
/// changed.
pub fn rewrite_call_subqueries(query: &mut Query) -> bool {
    rewrite_list(&mut query.clauses)
}

fn rewrite_list(clauses: &mut Vec<Clause>) -> bool {
    let mut rewritten = false;
    let mut env: IndexSet<SmolStr> = IndexSet::new();

    for i in 0..clauses.len() {
        if let Clause::CallSubquery(sub) = &mut clauses[i] {
            // nested subqueries first
            rewritten |= rewrite_list(&mut sub.query.clauses);
        }

        if matches!(&clauses[i], Clause::CallSubquery(sub) if sub.is_returning()) {
            // outer names referenced downstream of the subquery
            let mut used_after = IndexSet::new();
            for later in &clauses[i + 1..] {
                collect_clause_names(later, &mut used_after);
            }

            let Clause::CallSubquery(sub) = &mut clauses[i] else {
                unreachable!();
            };
            let returned = returned_columns(&sub.query);
            let imports: Vec<SmolStr> = env
                .iter()
                .filter(|name| {
                    !name.starts_with('@')
                        && used_after.contains(*name)
                        && !returned.contains(*name)
                })
                .cloned()
                .collect();

            if !imports.is_empty() {
                thread_imports(&mut sub.query, &imports, sub.span.clone());
                rewritten = true;
            }
        }

        bind_clause(&mut env, &clauses[i]);
    }

    rewritten
}

/// The column names of the subquery's terminal RETURN.
fn returned_columns(query: &Query) -> IndexSet<SmolStr> {
    let mut columns = IndexSet::new();
    if let Some(Clause::Return(projection)) = query.clauses.last() {
        for p in &projection.projections {
            if let Some(name) = p.column_name() {
                columns.insert(name.clone());
            }
        }
    }
    columns
}

/// Imports `names` at the head of every union branch and re-projects them
/// in every terminal RETURN.
fn thread_imports(query: &mut Query, names: &[SmolStr], span: Span) {
    // branch head indices: position 0 and every clause after a UNION
    let mut heads = vec![0usize];
    for (i, clause) in query.clauses.iter().enumerate() {
        if matches!(clause, Clause::Union(_)) {
            heads.push(i + 1);
        }
    }

    // walk back to front so indices stay valid while inserting
    for head in heads.into_iter().rev() {
        match query.clauses.get_mut(head) {
            Some(Clause::With(projection)) => {
                for name in names {
                    projection.projections.push(import_projection(name, &span));
                }
            }
            _ => {
                let projections = names
                    .iter()
                    .map(|name| import_projection(name, &span))
                    .collect();
                query.clauses.insert(
                    head,
                    Clause::With(ProjectionClause {
                        distinct: false,
                        star: false,
                        projections,
                        order_by: Vec::new(),
                        skip: None,
                        limit: None,
                        predicate: None,
                        span: span.clone(),
                    }),
                );
            }
        }
    }

    // re-project the internal aliases under their outer names
    for clause in &mut query.clauses {
        if let Clause::Return(projection) = clause {
            for name in names {
                projection.projections.push(Projection {
                    expression: Expression::Identifier(Identifier::new(
                        SmolStr::new(format!("@{}", name)),
                        span.clone(),
                    )),
                    alias: Some(Identifier::new(name.clone(), span.clone())),
                    span: span.clone(),
                });
            }
        }
    }
}

/// A `name AS @name` import projection.
fn import_projection(name: &SmolStr, span: &Span) -> Projection {
    Projection {
        expression: Expression::Identifier(Identifier::new(name.clone(), span.clone())),
        alias: Some(Identifier::new(
            SmolStr::new(format!("@{}", name)),
            span.clone(),
        )),
        span: span.clone(),
    }
}
