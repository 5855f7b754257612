//! The shared AST handle.
//!
//! An [`Ast`] is a reference-counted view over a validated query body. The
//! master handle owns the body, the (parameter-stripped) query text and the
//! annotation-context collection; segments are value objects sharing the
//! master's state and windowing a contiguous slice `[start, end)` of its
//! top-level clauses. Cloning a handle retains it, dropping releases it; the
//! owned state is disposed exactly once, when the last handle drops.

use crate::ast::annotations::Annotations;
use crate::ast::expression::Expression;
use crate::ast::query::{
    CallClause, Clause, ClauseKind, NodePattern, ProjectionClause, Query, RelPattern,
};
use crate::ast::visitor::{
    collect_clause_names, collect_expression_names, walk_clause, ExpressionVisitor, Flow, Never,
    Strategy,
};
use crate::ast::Span;
use crate::procedures::{FunctionRegistry, ProcedureRegistry};
use indexmap::IndexSet;
use smol_str::SmolStr;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard};

/// State owned by the master handle and shared by all segments.
#[derive(Debug)]
struct AstShared {
    /// The query body.
    root: Query,
    /// The parameter-stripped query text, for source-range stringification.
    text: String,
    /// Annotation contexts (entity naming).
    annotations: Mutex<Annotations>,
}

/// A shared, reference-counted handle over a query body or a segment of one.
#[derive(Debug, Clone)]
pub struct Ast {
    shared: Arc<AstShared>,
    /// Window into the master's top-level clauses.
    window: Range<usize>,
    /// Names referenced within this window (and its boundary projection).
    referenced: Arc<IndexSet<SmolStr>>,
}

impl Ast {
    /// Builds the master handle over a validated query body.
    ///
    /// Enrichment assigns `@anon_N` names to unaliased pattern entities in
    /// source order and builds the master reference map.
    pub fn build(root: Query, text: String) -> Self {
        let mut annotations = Annotations::new();
        let mut namer = AnonymousNamer {
            annotations: &mut annotations,
        };
        for clause in &root.clauses {
            match walk_clause(&mut namer, clause) {
                Ok(()) => {}
                Err(never) => match never {},
            }
        }

        let window = 0..root.clauses.len();
        let referenced = Arc::new(build_reference_map(&root.clauses[window.clone()], None));

        Self {
            shared: Arc::new(AstShared {
                root,
                text,
                annotations: Mutex::new(annotations),
            }),
            window,
            referenced,
        }
    }

    /// Builds a segment over the master's clauses `[start, end)`.
    ///
    /// The segment shares the master's annotation contexts. Its reference
    /// map covers the windowed clauses plus, when the clause at `end` is a
    /// projection (`WITH`/`RETURN`), that clause, so references crossing
    /// the segment boundary are preserved.
    pub fn segment(master: &Ast, start: usize, end: usize) -> Self {
        let clause_count = master.shared.root.clauses.len();
        debug_assert!(start < end && end <= clause_count);

        let boundary_idx = if end == clause_count { end - 1 } else { end };
        let boundary = master.shared.root.clauses[boundary_idx].as_projection();

        let referenced = Arc::new(build_reference_map(
            &master.shared.root.clauses[start..end],
            boundary,
        ));

        Self {
            shared: Arc::clone(&master.shared),
            window: start..end,
            referenced,
        }
    }

    /// True for the handle whose window spans the whole query body.
    pub fn is_master(&self) -> bool {
        self.window == (0..self.shared.root.clauses.len())
    }

    /// The clause window of this handle.
    pub fn window(&self) -> Range<usize> {
        self.window.clone()
    }

    /// Number of live handles sharing this AST's state.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.shared)
    }

    /// The parameter-stripped query text.
    pub fn query_text(&self) -> &str {
        &self.shared.text
    }

    /// The clauses visible through this handle's window.
    pub fn clauses(&self) -> &[Clause] {
        &self.shared.root.clauses[self.window.clone()]
    }

    /// Number of clauses in the window.
    pub fn clause_count(&self) -> usize {
        self.window.len()
    }

    /// The clause at window-relative index `i`.
    pub fn clause_by_index(&self, i: usize) -> &Clause {
        &self.clauses()[i]
    }

    /// The first clause of the given kind, if any.
    pub fn get_clause(&self, kind: ClauseKind) -> Option<&Clause> {
        self.clauses().iter().find(|c| c.kind() == kind)
    }

    /// Window-relative index of the first clause of the given kind.
    pub fn clause_index(&self, kind: ClauseKind) -> Option<usize> {
        self.clauses().iter().position(|c| c.kind() == kind)
    }

    /// Window-relative indices of every clause of the given kind.
    pub fn clause_indices(&self, kind: ClauseKind) -> Vec<usize> {
        self.clauses()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind() == kind)
            .map(|(i, _)| i)
            .collect()
    }

    /// True when the windowed query demands materialization of preceding
    /// results: an update clause, an aggregating projection, or an eager
    /// returning subquery.
    pub fn is_eager(&self, functions: &dyn FunctionRegistry) -> bool {
        clauses_eager(self.clauses(), functions)
    }

    /// True when the windowed query performs no writes: no update clause and
    /// no write-modifying procedure call.
    pub fn read_only(&self, procedures: &dyn ProcedureRegistry) -> bool {
        clauses_read_only(self.clauses(), procedures)
    }

    /// True when `alias` is referenced within this handle's window (or its
    /// boundary projection).
    pub fn alias_is_referenced(&self, alias: &str) -> bool {
        self.referenced.contains(alias)
    }

    /// The canonical name of a node pattern: its user alias, or a stable
    /// generated `@anon_N` name.
    pub fn node_name(&self, node: &NodePattern) -> SmolStr {
        match &node.variable {
            Some(variable) => variable.name.clone(),
            None => self.annotations().name_anonymous(node.id),
        }
    }

    /// The canonical name of a relationship pattern.
    pub fn rel_name(&self, rel: &RelPattern) -> SmolStr {
        match &rel.variable {
            Some(variable) => variable.name.clone(),
            None => self.annotations().name_anonymous(rel.id),
        }
    }

    /// Stringifies an expression: identifier name when the expression is a
    /// plain reference, the source-range slice otherwise.
    pub fn to_string_expression(&self, expr: &Expression) -> SmolStr {
        if let Some(id) = expr.as_identifier() {
            return id.name.clone();
        }
        SmolStr::new(self.slice(&expr.span()).trim())
    }

    /// The source text under a span, clamped to bounds.
    pub fn slice(&self, span: &Span) -> &str {
        let len = self.shared.text.len();
        let start = span.start.min(len);
        let end = span.end.min(len).max(start);
        &self.shared.text[start..end]
    }

    /// The ordered column names of a RETURN clause. Star projections must
    /// have been expanded before this is called.
    pub fn build_return_column_names(&self, clause: &ProjectionClause) -> Vec<SmolStr> {
        debug_assert!(!clause.star, "star projections must be expanded first");
        clause
            .projections
            .iter()
            .map(|p| match p.column_name() {
                Some(name) => name.clone(),
                None => self.to_string_expression(&p.expression),
            })
            .collect()
    }

    /// The ordered column names of a procedure call: the YIELD projections
    /// when present, the procedure's declared outputs otherwise.
    pub fn build_call_column_names(
        &self,
        call: &CallClause,
        procedures: &dyn ProcedureRegistry,
    ) -> Vec<SmolStr> {
        if !call.yield_items.is_empty() {
            return call
                .yield_items
                .iter()
                .map(|p| match p.column_name() {
                    Some(name) => name.clone(),
                    None => self.to_string_expression(&p.expression),
                })
                .collect();
        }
        procedures
            .lookup(&call.name)
            .map(|proc| proc.outputs.to_vec())
            .unwrap_or_default()
    }

    /// Collects every identifier name appearing under an expression.
    pub fn collect_aliases(expr: &Expression) -> Vec<SmolStr> {
        let mut names = IndexSet::new();
        collect_expression_names(expr, &mut names);
        names.into_iter().collect()
    }

    fn annotations(&self) -> MutexGuard<'_, Annotations> {
        self.shared
            .annotations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Assigns `@anon_N` names to unaliased pattern entities, in walk order.
struct AnonymousNamer<'a> {
    annotations: &'a mut Annotations,
}

impl ExpressionVisitor for AnonymousNamer<'_> {
    type Error = Never;

    fn enter_node_pattern(&mut self, node: &NodePattern) -> Flow<Never> {
        if node.variable.is_none() {
            self.annotations.name_anonymous(node.id);
        }
        Ok(Strategy::Recurse)
    }

    fn enter_rel_pattern(&mut self, rel: &RelPattern) -> Flow<Never> {
        if rel.variable.is_none() {
            self.annotations.name_anonymous(rel.id);
        }
        Ok(Strategy::Recurse)
    }
}

/// Builds the set of names referenced by a clause window, optionally
/// including a boundary projection clause.
fn build_reference_map(
    clauses: &[Clause],
    boundary: Option<&ProjectionClause>,
) -> IndexSet<SmolStr> {
    let mut names = IndexSet::new();
    for clause in clauses {
        collect_clause_names(clause, &mut names);
    }
    if let Some(projection) = boundary {
        for p in &projection.projections {
            collect_expression_names(&p.expression, &mut names);
            if let Some(alias) = &p.alias {
                names.insert(alias.name.clone());
            }
        }
        for sort in &projection.order_by {
            collect_expression_names(&sort.expression, &mut names);
        }
    }
    names
}

fn clauses_eager(clauses: &[Clause], functions: &dyn FunctionRegistry) -> bool {
    clauses.iter().any(|clause| match clause {
        Clause::CallSubquery(sub) => clauses_eager(&sub.query.clauses, functions),
        Clause::With(_) | Clause::Return(_) => clause_contains_aggregation(clause, functions),
        _ => clause.kind().is_updating(),
    })
}

fn clauses_read_only(clauses: &[Clause], procedures: &dyn ProcedureRegistry) -> bool {
    clauses.iter().all(|clause| match clause {
        Clause::CallSubquery(sub) => clauses_read_only(&sub.query.clauses, procedures),
        Clause::Foreach(_) => false,
        Clause::Call(call) => procedures
            .lookup(&call.name)
            .map(|proc| proc.read_only)
            .unwrap_or(true),
        _ => !clause.kind().is_updating(),
    })
}

/// True when any function referred to by the clause is an aggregation.
pub fn clause_contains_aggregation(clause: &Clause, functions: &dyn FunctionRegistry) -> bool {
    let mut names = IndexSet::new();
    crate::ast::visitor::collect_clause_functions(clause, &mut names);
    names.iter().any(|name| functions.is_aggregate(name))
}
