//! Expansion of `*` projections.
//!
//! `RETURN *` and `WITH *` are replaced by the explicit list of identifiers
//! bound at that point in the scope, in source order of first binding:
//!
//! ```text
//! MATCH (a), (b) RETURN *
//! =>
//! MATCH (a), (b) RETURN a, b
//! ```
//!
//! Internal `@`-prefixed names never appear in an expansion.

use super::bind_clause;
use crate::ast::expression::{Expression, Identifier};
use crate::ast::query::{Clause, Projection, ProjectionClause, Query};
use indexmap::IndexSet;
use smol_str::SmolStr;

/// Expands star projections in place. Returns true when anything changed.
pub fn expand_star_projections(query: &mut Query) -> bool {
    expand_list(&mut query.clauses)
}

fn expand_list(clauses: &mut [Clause]) -> bool {
    let mut rewritten = false;
    let mut env: IndexSet<SmolStr> = IndexSet::new();

    for clause in clauses.iter_mut() {
        if let Clause::CallSubquery(sub) = clause {
            // the subquery opens its own scope; its leading imports (if
            // any) seed the inner environment during its own expansion
            rewritten |= expand_list(&mut sub.query.clauses);
        }

        if let Clause::With(projection) | Clause::Return(projection) = clause {
            if projection.star {
                rewritten |= expand(projection, &env);
            }
        }

        bind_clause(&mut env, clause);
    }

    rewritten
}

fn expand(projection: &mut ProjectionClause, env: &IndexSet<SmolStr>) -> bool {
    let explicit: IndexSet<SmolStr> = projection
        .projections
        .iter()
        .filter_map(|p| p.column_name().cloned())
        .collect();

    let mut expanded: Vec<Projection> = env
        .iter()
        .filter(|name| !name.starts_with('@') && !explicit.contains(*name))
        .map(|name| {
            let span = projection.span.clone();
            Projection {
                expression: Expression::Identifier(Identifier::new(name.clone(), span.clone())),
                alias: None,
                span,
            }
        })
        .collect();

    if expanded.is_empty() && projection.projections.is_empty() {
        // nothing in scope to expand into; leave the star for validation
        return false;
    }

    expanded.extend(projection.projections.drain(..));
    projection.projections = expanded;
    projection.star = false;
    true
}
