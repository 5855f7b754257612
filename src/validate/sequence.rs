//! Query-level structural rules: termination, clause order, union column
//! discipline, and shortest-path placement.

use crate::ast::query::{Clause, ClauseKind, PatternPath, Projection, Query};
use crate::ast::visitor::{walk_clause, walk_expression, ExpressionVisitor, Flow, Strategy};
use crate::ast::Expression;
use crate::error::{QueryError, Result};
use smol_str::SmolStr;

/// The final clause must terminate the query, `UNION` is the only clause
/// permitted after `RETURN`, and the query may not open with a star
/// projection.
pub(super) fn validate_query_sequence(query: &Query) -> Result<()> {
    validate_termination(&query.clauses)?;

    let Some(first) = query.clauses.first() else {
        return Ok(());
    };
    match first {
        Clause::With(p) if p.star => {
            return Err(QueryError::QueryCannotBeginWith("WITH"));
        }
        Clause::Return(p) if p.star => {
            return Err(QueryError::QueryCannotBeginWith("RETURN"));
        }
        _ => {}
    }

    Ok(())
}

/// A query must end in RETURN, an update clause, a procedure call or a
/// non-returning subquery. Applied recursively to embedded subqueries.
fn validate_termination(clauses: &[Clause]) -> Result<()> {
    let Some(last) = clauses.last() else {
        return Ok(());
    };
    let kind = last.kind();
    if !matches!(
        kind,
        ClauseKind::Return
            | ClauseKind::Create
            | ClauseKind::Merge
            | ClauseKind::Delete
            | ClauseKind::Set
            | ClauseKind::Remove
            | ClauseKind::Call
            | ClauseKind::CallSubquery
            | ClauseKind::Foreach
    ) {
        return Err(QueryError::InvalidLastClause(kind.name().to_string()));
    }

    if let Clause::CallSubquery(sub) = last {
        if sub.is_returning() {
            return Err(QueryError::InvalidLastClause(
                "a returning subquery".to_string(),
            ));
        }
    }

    let mut last_was_return = false;
    for clause in clauses {
        if last_was_return && !matches!(clause, Clause::Union(_)) {
            return Err(QueryError::UnexpectedClauseFollowingReturn);
        }
        if let Clause::CallSubquery(sub) = clause {
            validate_termination(&sub.query.clauses)?;
        }
        last_was_return = matches!(clause, Clause::Return(_));
    }

    Ok(())
}

/// Within a scope, reading clauses may not follow updating clauses without
/// a WITH boundary, and a non-optional MATCH may not follow OPTIONAL MATCH.
pub(super) fn validate_clause_order(clauses: &[Clause]) -> Result<()> {
    let mut encountered_optional_match = false;
    let mut encountered_updating = false;

    for clause in clauses {
        let kind = clause.kind();

        if encountered_updating
            && matches!(
                kind,
                ClauseKind::Match
                    | ClauseKind::Unwind
                    | ClauseKind::Call
                    | ClauseKind::CallSubquery
            )
        {
            return Err(QueryError::MissingWith(kind.name().to_string()));
        }
        encountered_updating |= kind.is_updating();

        match clause {
            Clause::Match(m) => {
                if !m.optional && encountered_optional_match {
                    return Err(QueryError::MissingWithAfterOptionalMatch);
                }
                encountered_optional_match |= m.optional;
            }
            Clause::With(_) | Clause::Union(_) => {
                encountered_optional_match = false;
                encountered_updating = false;
            }
            Clause::CallSubquery(sub) => {
                validate_clause_order(&sub.query.clauses)?;
            }
            _ => {}
        }
    }

    Ok(())
}

/// Every RETURN flanking a UNION chain must project the same ordered
/// column names, in this clause list and in every embedded subquery.
pub(super) fn validate_union_clauses(source: &str, clauses: &[Clause]) -> Result<()> {
    let unions = clauses
        .iter()
        .filter(|c| matches!(c, Clause::Union(_)))
        .count();

    if unions != 0 {
        let returns: Vec<&Clause> = clauses
            .iter()
            .filter(|c| matches!(c, Clause::Return(_)))
            .collect();

        if returns.len() != unions + 1 {
            return Err(QueryError::UnionMissingReturns {
                unions,
                returns: returns.len(),
            });
        }

        let Clause::Return(first) = returns[0] else {
            unreachable!();
        };
        let reference: Vec<SmolStr> = first
            .projections
            .iter()
            .map(|p| column_name(source, p))
            .collect();

        for clause in &returns[1..] {
            let Clause::Return(ret) = clause else {
                unreachable!();
            };
            if ret.projections.len() != reference.len() {
                return Err(QueryError::UnionMismatchedReturns);
            }
            for (projection, expected) in ret.projections.iter().zip(&reference) {
                if column_name(source, projection) != *expected {
                    return Err(QueryError::UnionMismatchedReturns);
                }
            }
        }
    }

    for clause in clauses {
        if let Clause::CallSubquery(sub) = clause {
            validate_union_clauses(source, &sub.query.clauses)?;
        }
    }

    Ok(())
}

fn column_name(source: &str, projection: &Projection) -> SmolStr {
    match projection.column_name() {
        Some(name) => name.clone(),
        None => {
            let span = projection.expression.span();
            let len = source.len();
            let start = span.start.min(len);
            let end = span.end.min(len).max(start);
            SmolStr::new(source[start..end].trim())
        }
    }
}

// ============================================================================
// Shortest-path placement
// ============================================================================

struct ShortestFinder {
    /// True hunts `shortestPath`, false hunts `allShortestPaths`.
    single: bool,
}

impl ExpressionVisitor for ShortestFinder {
    type Error = ();

    fn enter_shortest_path(&mut self, _path: &PatternPath, single: bool) -> Flow<()> {
        if single == self.single {
            return Err(());
        }
        Ok(Strategy::Recurse)
    }
}

fn expr_contains_shortest(expr: &Expression, single: bool) -> bool {
    walk_expression(&mut ShortestFinder { single }, expr).is_err()
}

fn clause_contains_shortest(clause: &Clause, single: bool) -> bool {
    walk_clause(&mut ShortestFinder { single }, clause).is_err()
}

/// `allShortestPaths` may appear only inside a MATCH pattern; in
/// particular it may not appear inside the MATCH predicate.
pub(super) fn validate_all_shortest_placement(clauses: &[Clause]) -> Result<()> {
    for clause in clauses {
        match clause {
            Clause::Match(m) => {
                if let Some(predicate) = &m.predicate {
                    if expr_contains_shortest(predicate, false) {
                        return Err(QueryError::AllShortestPathSupport);
                    }
                }
            }
            Clause::CallSubquery(sub) => {
                validate_all_shortest_placement(&sub.query.clauses)?;
            }
            Clause::Foreach(f) => {
                if expr_contains_shortest(&f.list, false) {
                    return Err(QueryError::AllShortestPathSupport);
                }
                validate_all_shortest_placement(&f.clauses)?;
            }
            _ => {
                if clause_contains_shortest(clause, false) {
                    return Err(QueryError::AllShortestPathSupport);
                }
            }
        }
    }
    Ok(())
}

/// `shortestPath` may appear in WITH/RETURN projections and in MATCH
/// predicates, but not inside a MATCH pattern or an update clause.
pub(super) fn validate_shortest_placement(clauses: &[Clause]) -> Result<()> {
    for clause in clauses {
        match clause {
            Clause::With(_) | Clause::Return(_) => {}
            Clause::Match(m) => {
                let mut finder = ShortestFinder { single: true };
                let mut found = false;
                for path in &m.pattern.paths {
                    if crate::ast::visitor::walk_pattern_path(&mut finder, path).is_err() {
                        found = true;
                        break;
                    }
                }
                if found {
                    return Err(QueryError::ShortestPathSupport);
                }
            }
            Clause::CallSubquery(sub) => {
                validate_shortest_placement(&sub.query.clauses)?;
            }
            Clause::Foreach(f) => {
                if expr_contains_shortest(&f.list, true) {
                    return Err(QueryError::ShortestPathSupport);
                }
                validate_shortest_placement(&f.clauses)?;
            }
            _ => {
                if clause_contains_shortest(clause, true) {
                    return Err(QueryError::ShortestPathSupport);
                }
            }
        }
    }
    Ok(())
}
