//! AST canonicalization rewrites.
//!
//! Three idempotent transformations run between validation passes, in
//! order: [`compact_clauses`], [`rewrite_call_subqueries`] and
//! [`expand_star_projections`]. Each returns a *rewrote?* flag; the
//! pipeline re-validates when any of them changed the tree.

mod call_subquery;
mod compact_clauses;
mod star_projections;

pub use call_subquery::rewrite_call_subqueries;
pub use compact_clauses::compact_clauses;
pub use star_projections::expand_star_projections;

use crate::ast::query::{Clause, PathBody, Pattern, PatternElement, PatternPath};
use indexmap::IndexSet;
use smol_str::SmolStr;

/// Adds the names a clause binds for everything downstream of it, in source
/// order. `WITH` without `*` replaces the environment; `UNION` clears it.
pub(crate) fn bind_clause(env: &mut IndexSet<SmolStr>, clause: &Clause) {
    match clause {
        Clause::Match(m) => collect_pattern_binders(&m.pattern, env),
        Clause::Create(c) => collect_pattern_binders(&c.pattern, env),
        Clause::Merge(m) => collect_path_binders(&m.path, env),
        Clause::Unwind(u) => {
            env.insert(u.alias.name.clone());
        }
        Clause::LoadCsv(l) => {
            env.insert(l.alias.name.clone());
        }
        Clause::Call(c) => {
            for item in &c.yield_items {
                if let Some(name) = item.column_name() {
                    env.insert(name.clone());
                }
            }
        }
        Clause::With(p) => {
            if !p.star {
                let mut next = IndexSet::new();
                for projection in &p.projections {
                    if let Some(name) = projection.column_name() {
                        next.insert(name.clone());
                    }
                }
                *env = next;
            } else {
                for projection in &p.projections {
                    if let Some(name) = projection.column_name() {
                        env.insert(name.clone());
                    }
                }
            }
        }
        Clause::Return(p) => {
            for projection in &p.projections {
                if let Some(alias) = &projection.alias {
                    env.insert(alias.name.clone());
                }
            }
        }
        Clause::Union(_) => env.clear(),
        Clause::CallSubquery(sub) => {
            // a returning subquery adds its final RETURN columns
            if let Some(Clause::Return(projection)) = sub.query.clauses.last() {
                for p in &projection.projections {
                    if let Some(name) = p.column_name() {
                        env.insert(name.clone());
                    }
                }
            }
        }
        Clause::Foreach(_)
        | Clause::Delete(_)
        | Clause::Set(_)
        | Clause::Remove(_)
        | Clause::Unsupported { .. } => {}
    }
}

/// Collects the variables a pattern binds (path, node and relationship
/// aliases), in source order.
pub(crate) fn collect_pattern_binders(pattern: &Pattern, env: &mut IndexSet<SmolStr>) {
    for path in &pattern.paths {
        collect_path_binders(path, env);
    }
}

pub(crate) fn collect_path_binders(path: &PatternPath, env: &mut IndexSet<SmolStr>) {
    if let Some(variable) = &path.variable {
        env.insert(variable.name.clone());
    }
    match &path.body {
        PathBody::Elements(elements) => {
            for element in elements {
                let variable = match element {
                    PatternElement::Node(n) => &n.variable,
                    PatternElement::Relationship(r) => &r.variable,
                };
                if let Some(variable) = variable {
                    env.insert(variable.name.clone());
                }
            }
        }
        PathBody::Shortest { inner, .. } => collect_path_binders(inner, env),
    }
}
