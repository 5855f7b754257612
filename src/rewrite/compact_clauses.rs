//! Coalescing of adjacent same-kind clauses.
//!
//! Two consecutive `MATCH` clauses with no update in between become one
//! clause with the combined pattern:
//!
//! ```text
//! MATCH (a:N) MATCH (b:N) RETURN a, b
//! =>
//! MATCH (a:N), (b:N) RETURN a, b
//! ```
//!
//! The same applies to `CREATE` (pattern paths), and to `SET`, `REMOVE` and
//! `DELETE` (item lists). Clauses carrying predicates or hints are left
//! alone.

use crate::ast::merge_spans;
use crate::ast::query::{Clause, Query};

/// Coalesces mergeable adjacent clauses in place. Returns true when
/// anything changed.
pub fn compact_clauses(query: &mut Query) -> bool {
    let mut rewritten = compact_list(&mut query.clauses);

    for clause in &mut query.clauses {
        match clause {
            Clause::CallSubquery(sub) => rewritten |= compact_clauses(&mut sub.query),
            Clause::Foreach(foreach) => rewritten |= compact_list(&mut foreach.clauses),
            _ => {}
        }
    }

    rewritten
}

fn compact_list(clauses: &mut Vec<Clause>) -> bool {
    let mut rewritten = false;
    let mut i = 0;
    while i + 1 < clauses.len() {
        if mergeable(&clauses[i], &clauses[i + 1]) {
            let second = clauses.remove(i + 1);
            merge_into(&mut clauses[i], second);
            rewritten = true;
        } else {
            i += 1;
        }
    }
    rewritten
}

fn mergeable(first: &Clause, second: &Clause) -> bool {
    match (first, second) {
        (Clause::Match(a), Clause::Match(b)) => {
            !a.optional
                && !b.optional
                && a.predicate.is_none()
                && b.predicate.is_none()
                && a.hints.is_empty()
                && b.hints.is_empty()
        }
        (Clause::Create(_), Clause::Create(_)) => true,
        (Clause::Set(_), Clause::Set(_)) => true,
        (Clause::Remove(_), Clause::Remove(_)) => true,
        (Clause::Delete(a), Clause::Delete(b)) => a.detach == b.detach,
        _ => false,
    }
}

fn merge_into(first: &mut Clause, second: Clause) {
    match (first, second) {
        (Clause::Match(a), Clause::Match(b)) => {
            a.pattern.paths.extend(b.pattern.paths);
            a.pattern.span = merge_spans(&a.pattern.span, &b.pattern.span);
            a.span = merge_spans(&a.span, &b.span);
        }
        (Clause::Create(a), Clause::Create(b)) => {
            a.pattern.paths.extend(b.pattern.paths);
            a.pattern.span = merge_spans(&a.pattern.span, &b.pattern.span);
            a.span = merge_spans(&a.span, &b.span);
        }
        (Clause::Set(a), Clause::Set(b)) => {
            a.items.extend(b.items);
            a.span = merge_spans(&a.span, &b.span);
        }
        (Clause::Remove(a), Clause::Remove(b)) => {
            a.items.extend(b.items);
            a.span = merge_spans(&a.span, &b.span);
        }
        (Clause::Delete(a), Clause::Delete(b)) => {
            a.expressions.extend(b.expressions);
            a.span = merge_spans(&a.span, &b.span);
        }
        _ => unreachable!("merge_into called on non-mergeable clauses"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::query::ClauseKind;
    use crate::parser::{parse, Root, StatementBody};

    fn parse_body(source: &str) -> Query {
        let result = parse(source);
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        for root in result.roots {
            if let Root::Statement(StatementBody::Query(query)) = root {
                return query;
            }
        }
        panic!("no statement in `{source}`");
    }

    #[test]
    fn merges_adjacent_matches() {
        let mut query = parse_body("MATCH (a:N) MATCH (b:N) RETURN a, b");
        assert!(compact_clauses(&mut query));
        assert_eq!(query.clauses.len(), 2);
        let Clause::Match(m) = &query.clauses[0] else {
            panic!("expected MATCH");
        };
        assert_eq!(m.pattern.paths.len(), 2);

        // a second run is a no-op
        assert!(!compact_clauses(&mut query));
    }

    #[test]
    fn keeps_predicated_matches_apart() {
        let mut query = parse_body("MATCH (a) WHERE a.v = 1 MATCH (b) RETURN a, b");
        assert!(!compact_clauses(&mut query));
        assert_eq!(query.clauses.len(), 3);
    }

    #[test]
    fn optional_match_is_never_merged() {
        let mut query = parse_body("MATCH (a) OPTIONAL MATCH (b) RETURN a, b");
        assert!(!compact_clauses(&mut query));
    }

    #[test]
    fn merges_creates_and_sets() {
        let mut query =
            parse_body("MATCH (a) CREATE (b) CREATE (c) SET a.x = 1 SET a.y = 2");
        assert!(compact_clauses(&mut query));
        let kinds: Vec<_> = query.clauses.iter().map(Clause::kind).collect();
        assert_eq!(
            kinds,
            vec![ClauseKind::Match, ClauseKind::Create, ClauseKind::Set]
        );
        let Clause::Set(set) = &query.clauses[2] else {
            panic!("expected SET");
        };
        assert_eq!(set.items.len(), 2);
    }

    #[test]
    fn detach_and_plain_delete_stay_apart() {
        let mut query = parse_body("MATCH (a), (b) DELETE a DETACH DELETE b");
        assert!(!compact_clauses(&mut query));
    }

    #[test]
    fn merges_inside_subqueries() {
        let mut query = parse_body("CALL { MATCH (a) MATCH (b) RETURN a, b } RETURN 1");
        assert!(compact_clauses(&mut query));
        let Clause::CallSubquery(sub) = &query.clauses[0] else {
            panic!("expected subquery");
        };
        assert_eq!(sub.query.clauses.len(), 2);
    }
}
