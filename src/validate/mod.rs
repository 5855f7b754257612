//! Semantic validation.
//!
//! Validation is a depth-first walk of the clause list driven by
//! strategy-returning handlers (see [`crate::ast::visitor`]). The walk
//! carries a [`ValidateCtx`]: the environment of defined identifiers with
//! their typing hints, the enclosing clause kind, the union flavour chosen
//! for the current scope, and the flag suppressing identifier checks after
//! an inner subquery returned `*`. The first error aborts the walk; every
//! handler that mutated the environment restores it before propagating.

mod expressions;
mod sequence;

use crate::ast::query::{
    CallClause, CallSubqueryClause, Clause, ClauseKind, CreateClause, DeleteClause, ForeachClause,
    MatchClause, MergeClause, PatternElement, PatternPath, ProjectionClause, Query, RemoveClause,
    RemoveItem, SetClause, SetItem, UnionClause, UnwindClause,
};
use crate::ast::visitor::{walk_expression, walk_pattern, walk_pattern_element, walk_pattern_path};
use crate::ast::Expression;
use crate::error::{QueryError, Result};
use crate::procedures::{FunctionRegistry, ProcedureRegistry};
use expressions::{contains_identifier, ExprValidator};
use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;

/// Typing hint of a bound identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IdentKind {
    /// Bound by a node pattern.
    Node,
    /// Bound by a relationship pattern.
    Edge,
    /// Bound by an UNWIND or FOREACH loop variable.
    Loop,
    /// Bound with no typing information (projections, paths, LOAD CSV rows).
    Unspecified,
}

/// Chosen union flavour for the current query scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnionAll {
    NotDefined,
    Regular,
    All,
}

/// Mutable state of a validation walk.
pub(crate) struct ValidateCtx {
    /// All bound names visible in the current scope.
    env: IndexMap<SmolStr, IdentKind>,
    /// The enclosing top-level clause kind.
    pub(crate) clause: ClauseKind,
    /// The union flavour for the current scope.
    union_all: UnionAll,
    /// Suppresses identifier-binding checks after an inner `RETURN *`.
    pub(crate) ignore_identifiers: bool,
    /// Inside a reduce expression aggregations are never allowed.
    pub(crate) in_reduce: bool,
}

impl ValidateCtx {
    fn new() -> Self {
        Self {
            env: IndexMap::new(),
            clause: ClauseKind::Match,
            union_all: UnionAll::NotDefined,
            ignore_identifiers: false,
            in_reduce: false,
        }
    }

    pub(crate) fn find(&self, name: &str) -> Option<IdentKind> {
        self.env.get(name).copied()
    }

    /// Introduces a name. Returns false when it was already bound; the
    /// original typing hint is kept in that case.
    pub(crate) fn add(&mut self, name: &SmolStr, kind: IdentKind) -> bool {
        if self.env.contains_key(name) {
            return false;
        }
        self.env.insert(name.clone(), kind);
        true
    }

    pub(crate) fn remove(&mut self, name: &str) {
        self.env.shift_remove(name);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.env.is_empty()
    }

    /// Aggregation functions are permitted only in WITH/RETURN projections,
    /// and never inside reduce.
    pub(crate) fn aggregation_allowed(&self) -> bool {
        !self.in_reduce
            && matches!(self.clause, ClauseKind::With | ClauseKind::Return)
    }

    /// A referenced name must be bound, unless checks are suppressed.
    pub(crate) fn check_defined(&self, name: &SmolStr) -> Result<()> {
        if self.ignore_identifiers || self.env.contains_key(name) {
            Ok(())
        } else {
            Err(QueryError::NotDefined(name.clone()))
        }
    }
}

/// The semantic validator.
pub struct Validator<'a> {
    procedures: &'a dyn ProcedureRegistry,
    functions: &'a dyn FunctionRegistry,
    source: &'a str,
}

impl<'a> Validator<'a> {
    /// Creates a validator over the given registries and query text.
    pub fn new(
        procedures: &'a dyn ProcedureRegistry,
        functions: &'a dyn FunctionRegistry,
        source: &'a str,
    ) -> Self {
        Self {
            procedures,
            functions,
            source,
        }
    }

    pub(crate) fn functions(&self) -> &dyn FunctionRegistry {
        self.functions
    }

    /// Validates a query body: structural rules first, then the scoped
    /// clause walk.
    pub fn validate_query(&self, query: &Query) -> Result<()> {
        sequence::validate_query_sequence(query)?;
        sequence::validate_clause_order(&query.clauses)?;
        sequence::validate_union_clauses(self.source, &query.clauses)?;
        sequence::validate_all_shortest_placement(&query.clauses)?;
        sequence::validate_shortest_placement(&query.clauses)?;

        let mut ctx = ValidateCtx::new();
        self.visit_clauses(&query.clauses, &mut ctx)
    }

    fn visit_clauses(&self, clauses: &[Clause], ctx: &mut ValidateCtx) -> Result<()> {
        for clause in clauses {
            self.visit_clause(clause, ctx)?;
        }
        Ok(())
    }

    fn visit_clause(&self, clause: &Clause, ctx: &mut ValidateCtx) -> Result<()> {
        match clause {
            Clause::Match(m) => self.visit_match(m, ctx),
            Clause::Create(c) => self.visit_create(c, ctx),
            Clause::Merge(m) => self.visit_merge(m, ctx),
            Clause::Delete(d) => self.visit_delete(d, ctx),
            Clause::Set(s) => self.visit_set(s, ctx),
            Clause::Remove(r) => self.visit_remove(r, ctx),
            Clause::With(p) => self.visit_projection(p, ctx, true),
            Clause::Return(p) => self.visit_projection(p, ctx, false),
            Clause::Unwind(u) => self.visit_unwind(u, ctx),
            Clause::Foreach(f) => self.visit_foreach(f, ctx),
            Clause::Call(c) => self.visit_call(c, ctx),
            Clause::CallSubquery(sub) => self.visit_call_subquery(sub, ctx),
            Clause::Union(u) => self.visit_union(u, ctx),
            Clause::LoadCsv(l) => {
                ctx.clause = ClauseKind::LoadCsv;
                ctx.add(&l.alias.name, IdentKind::Unspecified);
                Ok(())
            }
            Clause::Unsupported { kind, .. } => Err(QueryError::UnsupportedAstNodeType(*kind)),
        }
    }

    pub(crate) fn walk_expr(&self, expr: &Expression, ctx: &mut ValidateCtx) -> Result<()> {
        let mut visitor = ExprValidator::new(self, ctx);
        walk_expression(&mut visitor, expr)
    }

    fn walk_path(&self, path: &PatternPath, ctx: &mut ValidateCtx) -> Result<()> {
        let mut visitor = ExprValidator::new(self, ctx);
        walk_pattern_path(&mut visitor, path)
    }

    // ------------------------------------------------------------------
    // clause handlers
    // ------------------------------------------------------------------

    fn visit_match(&self, m: &MatchClause, ctx: &mut ValidateCtx) -> Result<()> {
        ctx.clause = ClauseKind::Match;
        if !m.hints.is_empty() {
            return Err(QueryError::UnsupportedAstNodeType("USING"));
        }
        {
            let mut visitor = ExprValidator::new(self, ctx);
            walk_pattern(&mut visitor, &m.pattern)?;
        }
        if let Some(predicate) = &m.predicate {
            self.walk_expr(predicate, ctx)?;
        }
        Ok(())
    }

    /// CREATE is traversed manually: the clause may not read its own new
    /// bindings, so every created entity is hidden from scope while the
    /// sibling entities are validated, then introduced at the end.
    fn visit_create(&self, c: &CreateClause, ctx: &mut ValidateCtx) -> Result<()> {
        ctx.clause = ClauseKind::Create;

        let mut introduced: Vec<(SmolStr, IdentKind)> = Vec::new();

        for path in &c.pattern.paths {
            let elements = path.elements();

            // a single-node path must create something new;
            // MATCH (a) CREATE (a) creates nothing
            if elements.len() == 1 {
                if let PatternElement::Node(node) = &elements[0] {
                    if let Some(variable) = &node.variable {
                        if ctx.find(&variable.name).is_some() {
                            return Err(QueryError::Redeclare {
                                kind: "variable",
                                name: variable.name.clone(),
                                clause: "CREATE",
                            });
                        }
                    }
                }
            }

            for element in elements {
                let (variable, kind) = match element {
                    PatternElement::Node(n) => (&n.variable, IdentKind::Node),
                    PatternElement::Relationship(r) => (&r.variable, IdentKind::Edge),
                };
                let hide = variable
                    .as_ref()
                    .map(|v| ctx.find(&v.name).is_none())
                    .unwrap_or(false);

                {
                    let mut visitor = ExprValidator::new(self, ctx);
                    walk_pattern_element(&mut visitor, element)?;
                }

                if hide {
                    let name = variable.as_ref().map(|v| v.name.clone());
                    if let Some(name) = name {
                        ctx.remove(&name);
                        introduced.push((name, kind));
                    }
                }
            }

            if let Some(variable) = &path.variable {
                ctx.add(&variable.name, IdentKind::Unspecified);
            }
        }

        for (name, kind) in introduced {
            if !ctx.add(&name, kind) && kind == IdentKind::Edge {
                return Err(QueryError::VariableAlreadyDeclared(name));
            }
        }

        Ok(())
    }

    fn visit_merge(&self, m: &MergeClause, ctx: &mut ValidateCtx) -> Result<()> {
        ctx.clause = ClauseKind::Merge;
        self.walk_path(&m.path, ctx)?;
        for action in &m.actions {
            self.visit_set_items(&action.items, ctx)?;
        }
        Ok(())
    }

    fn visit_delete(&self, d: &DeleteClause, ctx: &mut ValidateCtx) -> Result<()> {
        ctx.clause = ClauseKind::Delete;
        for expr in &d.expressions {
            // identifiers and calls that don't resolve to a node, path or
            // edge raise an error at run time
            if !matches!(
                expr,
                Expression::Identifier(_)
                    | Expression::FunctionCall(_)
                    | Expression::ApplyAll(_)
                    | Expression::Subscript { .. }
            ) {
                return Err(QueryError::DeleteInvalidArguments);
            }
            self.walk_expr(expr, ctx)?;
        }
        Ok(())
    }

    fn visit_set(&self, s: &SetClause, ctx: &mut ValidateCtx) -> Result<()> {
        ctx.clause = ClauseKind::Set;
        self.visit_set_items(&s.items, ctx)
    }

    fn visit_set_items(&self, items: &[SetItem], ctx: &mut ValidateCtx) -> Result<()> {
        for item in items {
            match item {
                SetItem::Property { subject, value, .. } => {
                    if subject.as_identifier().is_none() {
                        return Err(QueryError::SetLhsNonAlias);
                    }
                    self.walk_expr(subject, ctx)?;
                    self.walk_expr(value, ctx)?;
                }
                SetItem::AllProperties { target, value, .. } => {
                    ctx.check_defined(&target.name)?;
                    self.walk_expr(value, ctx)?;
                }
                SetItem::Labels { target, .. } => {
                    ctx.check_defined(&target.name)?;
                }
                SetItem::SubscriptAssign { .. } => {
                    return Err(QueryError::UnsupportedOperator("subscript assignment"));
                }
            }
        }
        Ok(())
    }

    fn visit_remove(&self, r: &RemoveClause, ctx: &mut ValidateCtx) -> Result<()> {
        ctx.clause = ClauseKind::Remove;
        for item in &r.items {
            match item {
                RemoveItem::Property { subject, .. } => {
                    if subject.as_identifier().is_none() {
                        return Err(QueryError::RemoveInvalidInput);
                    }
                    self.walk_expr(subject, ctx)?;
                }
                RemoveItem::Labels { target, .. } => {
                    ctx.check_defined(&target.name)?;
                }
            }
        }
        Ok(())
    }

    fn visit_projection(
        &self,
        p: &ProjectionClause,
        ctx: &mut ValidateCtx,
        is_with: bool,
    ) -> Result<()> {
        ctx.clause = if is_with {
            ClauseKind::With
        } else {
            ClauseKind::Return
        };

        validate_limit_skip(p)?;

        if !is_with && !p.star {
            // duplicate result column names
            let mut seen: IndexSet<SmolStr> = IndexSet::new();
            for projection in &p.projections {
                let name = match projection.column_name() {
                    Some(name) => name.clone(),
                    None => SmolStr::new(slice_source(self.source, projection).trim()),
                };
                if !seen.insert(name) {
                    return Err(QueryError::SameResultColumnName);
                }
            }
        }

        // projections are validated against the pre-projection environment
        for projection in &p.projections {
            self.walk_expr(&projection.expression, ctx)?;
        }

        // the predicate and ORDER BY see the projected aliases as well
        if is_with {
            self.introduce_with_aliases(p, ctx)?;
        } else {
            for projection in &p.projections {
                if let Some(alias) = &projection.alias {
                    ctx.add(&alias.name, IdentKind::Unspecified);
                }
            }
        }

        if let Some(predicate) = &p.predicate {
            self.walk_expr(predicate, ctx)?;
        }
        for sort in &p.order_by {
            self.walk_expr(&sort.expression, ctx)?;
        }

        // a WITH without `*` opens a fresh scope holding only its columns
        if is_with && !p.star {
            let mut next = IndexMap::new();
            for projection in &p.projections {
                if let Some(name) = projection.column_name() {
                    next.insert(name.clone(), IdentKind::Unspecified);
                }
            }
            ctx.env = next;
        }

        Ok(())
    }

    /// Introduces WITH aliases into the environment, checking that every
    /// projection is nameable and that column names are unique (internal
    /// `@`-prefixed names excepted).
    fn introduce_with_aliases(&self, p: &ProjectionClause, ctx: &mut ValidateCtx) -> Result<()> {
        let mut seen: IndexSet<SmolStr> = IndexSet::new();
        for projection in &p.projections {
            let name = match projection.column_name() {
                Some(name) => name.clone(),
                None => return Err(QueryError::WithProjectionMissingAlias),
            };
            ctx.add(&name, IdentKind::Unspecified);
            if !seen.insert(name.clone()) && !name.starts_with('@') {
                return Err(QueryError::SameResultColumnName);
            }
        }
        Ok(())
    }

    fn visit_unwind(&self, u: &UnwindClause, ctx: &mut ValidateCtx) -> Result<()> {
        ctx.clause = ClauseKind::Unwind;
        self.walk_expr(&u.expression, ctx)?;
        if !ctx.add(&u.alias.name, IdentKind::Loop) {
            return Err(QueryError::VariableAlreadyDeclared(u.alias.name.clone()));
        }
        Ok(())
    }

    fn visit_foreach(&self, f: &ForeachClause, ctx: &mut ValidateCtx) -> Result<()> {
        // the body runs in a scoped environment; the parent environment is
        // unchanged on exit
        let outer = ctx.env.clone();
        let result = self.visit_foreach_scoped(f, ctx);
        ctx.env = outer;
        result
    }

    fn visit_foreach_scoped(&self, f: &ForeachClause, ctx: &mut ValidateCtx) -> Result<()> {
        ctx.clause = ClauseKind::Foreach;
        self.walk_expr(&f.list, ctx)?;

        if !ctx.add(&f.variable.name, IdentKind::Loop) {
            return Err(QueryError::VariableAlreadyDeclared(f.variable.name.clone()));
        }

        for clause in &f.clauses {
            if !clause.kind().is_updating() {
                return Err(QueryError::ForeachInvalidBody);
            }
            self.visit_clause(clause, ctx)?;
        }
        Ok(())
    }

    fn visit_call(&self, c: &CallClause, ctx: &mut ValidateCtx) -> Result<()> {
        ctx.clause = ClauseKind::Call;

        // introduce YIELD names: the output identifier and its alias
        for item in &c.yield_items {
            if let Some(alias) = &item.alias {
                ctx.add(&alias.name, IdentKind::Unspecified);
            }
            if let Some(output) = item.expression.as_identifier() {
                ctx.add(&output.name, IdentKind::Unspecified);
            }
        }

        let Some(procedure) = self.procedures.lookup(&c.name) else {
            return Err(QueryError::ProcedureNotRegistered(c.name.clone()));
        };

        if let crate::procedures::Arity::Fixed(expected) = procedure.arity {
            if expected != c.args.len() {
                return Err(QueryError::ProcedureInvalidArguments {
                    name: c.name.clone(),
                    expected,
                    given: c.args.len(),
                });
            }
        }

        let mut seen: IndexSet<SmolStr> = IndexSet::new();
        for item in &c.yield_items {
            let Some(output) = item.expression.as_identifier() else {
                continue;
            };
            if !seen.insert(output.name.clone()) {
                return Err(QueryError::VariableAlreadyDeclared(output.name.clone()));
            }
            if !procedure.contains_output(&output.name) {
                return Err(QueryError::ProcedureInvalidOutput {
                    name: c.name.clone(),
                    output: output.name.clone(),
                });
            }
        }

        for arg in &c.args {
            self.walk_expr(arg, ctx)?;
        }

        // an aliased output is visible only under its alias
        for item in &c.yield_items {
            if item.alias.is_some() {
                if let Some(output) = item.expression.as_identifier() {
                    ctx.remove(&output.name);
                }
            }
        }

        Ok(())
    }

    fn visit_call_subquery(&self, sub: &CallSubqueryClause, ctx: &mut ValidateCtx) -> Result<()> {
        ctx.clause = ClauseKind::CallSubquery;

        let in_env = ctx.env.clone();

        // without a leading WITH the subquery starts from an empty scope;
        // with one, the import list is validated against the outer scope
        match sub.query.clauses.first() {
            Some(Clause::With(with)) => {
                if !valid_import_list(with) {
                    return Err(QueryError::CallSubqueryInvalidReferences);
                }
            }
            _ => ctx.env = IndexMap::new(),
        }

        let saved_union = ctx.union_all;
        ctx.union_all = UnionAll::NotDefined;

        let result = self.visit_subquery_clauses(sub, &in_env, ctx);

        ctx.union_all = saved_union;
        ctx.env = in_env;
        result?;

        // the outer scope regains its bindings plus the subquery's
        // projected aliases
        if let Some(Clause::Return(projection)) = sub.query.clauses.last() {
            for p in &projection.projections {
                // artificial re-projections of imported names are skipped
                if let Some(inner) = p.expression.as_identifier() {
                    if p.alias.is_some() && inner.name.starts_with('@') {
                        continue;
                    }
                }
                let Some(name) = p.column_name() else {
                    continue;
                };
                if !ctx.add(name, IdentKind::Unspecified) {
                    return Err(QueryError::VariableAlreadyDeclaredInOuterScope(name.clone()));
                }
            }
        }

        Ok(())
    }

    fn visit_subquery_clauses(
        &self,
        sub: &CallSubqueryClause,
        in_env: &IndexMap<SmolStr, IdentKind>,
        ctx: &mut ValidateCtx,
    ) -> Result<()> {
        let mut last_was_union = false;
        for clause in &sub.query.clauses {
            // a UNION reset the environment; a branch-leading WITH is an
            // import list evaluated against the subquery's input scope
            if last_was_union {
                if let Clause::With(with) = clause {
                    ctx.env = in_env.clone();
                    if !valid_import_list(with) {
                        return Err(QueryError::CallSubqueryInvalidReferences);
                    }
                }
            }

            self.visit_clause(clause, ctx)?;

            last_was_union = matches!(clause, Clause::Union(_));
            if let Clause::Return(projection) = clause {
                if projection.star {
                    ctx.ignore_identifiers = true;
                }
            }
        }
        Ok(())
    }

    fn visit_union(&self, u: &UnionClause, ctx: &mut ValidateCtx) -> Result<()> {
        let flavour = if u.all {
            UnionAll::All
        } else {
            UnionAll::Regular
        };
        if ctx.union_all == UnionAll::NotDefined {
            ctx.union_all = flavour;
        } else if ctx.union_all != flavour {
            return Err(QueryError::UnionCombination);
        }

        ctx.clause = ClauseKind::Union;
        ctx.env = IndexMap::new();
        Ok(())
    }
}

/// LIMIT/SKIP accept integer literals and parameters only; value range
/// checks stay in the runtime.
fn validate_limit_skip(p: &ProjectionClause) -> Result<()> {
    if let Some(limit) = &p.limit {
        if !matches!(
            limit,
            Expression::Literal(crate::ast::Literal::Integer(_), _) | Expression::Parameter(..)
        ) {
            return Err(QueryError::LimitMustBeNonNegative);
        }
    }
    if let Some(skip) = &p.skip {
        if !matches!(
            skip,
            Expression::Literal(crate::ast::Literal::Integer(_), _) | Expression::Parameter(..)
        ) {
            return Err(QueryError::SkipMustBeNonNegative);
        }
    }
    Ok(())
}

/// Checks a subquery's leading WITH as an import list: plain identifier
/// imports (internal `@`-aliases excepted), no expressions referencing
/// outer names, no modifiers.
fn valid_import_list(with: &ProjectionClause) -> bool {
    let mut found_simple = false;
    let mut found_non_simple = false;

    for projection in &with.projections {
        match projection.expression.as_identifier() {
            Some(_) => {
                if let Some(alias) = &projection.alias {
                    if alias.name.starts_with('@') {
                        continue;
                    }
                    return false;
                }
                if found_non_simple {
                    return false;
                }
                found_simple = true;
            }
            None => {
                if found_simple || contains_identifier(&projection.expression) {
                    return false;
                }
                found_non_simple = true;
            }
        }
    }

    with.order_by.is_empty()
        && with.skip.is_none()
        && with.limit.is_none()
        && with.predicate.is_none()
}

fn slice_source<'s>(source: &'s str, projection: &crate::ast::Projection) -> &'s str {
    let span = projection.expression.span();
    let len = source.len();
    let start = span.start.min(len);
    let end = span.end.min(len).max(start);
    &source[start..end]
}
