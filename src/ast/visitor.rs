//! Strategy-returning AST walkers.
//!
//! Traversal is driven by handlers that return a [`Strategy`]: `Recurse`
//! lets the walker descend into children, `Continue` tells it the handler
//! already visited the children it needs. Aborting the walk is expressed as
//! `Err`, which unwinds through every frame. Expression handlers are phased:
//! `enter_*` runs before children, `leave_expression` after.

use crate::ast::expression::Expression;
use crate::ast::query::{
    Clause, NodePattern, Pattern, PatternElement, PatternPath, RelPattern, RemoveItem, SetItem,
};
use indexmap::IndexSet;
use smol_str::SmolStr;

/// What the walker should do after a handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Descend into children automatically.
    Recurse,
    /// Children were already visited (or must be skipped); do not descend.
    Continue,
}

/// Result of a strategy-returning handler.
pub type Flow<E> = Result<Strategy, E>;

/// Visitor over expressions and the pattern nodes nested inside them.
///
/// Default implementations recurse everywhere, so implementors override only
/// the node kinds they care about.
pub trait ExpressionVisitor {
    /// Error type that aborts the walk.
    type Error;

    fn enter_expression(&mut self, _expr: &Expression) -> Flow<Self::Error> {
        Ok(Strategy::Recurse)
    }

    fn leave_expression(&mut self, _expr: &Expression) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_pattern_path(&mut self, _path: &PatternPath) -> Flow<Self::Error> {
        Ok(Strategy::Recurse)
    }

    /// Called for a shortest-path wrapper before its inner path is walked.
    fn enter_shortest_path(&mut self, _path: &PatternPath, _single: bool) -> Flow<Self::Error> {
        Ok(Strategy::Recurse)
    }

    fn enter_node_pattern(&mut self, _node: &NodePattern) -> Flow<Self::Error> {
        Ok(Strategy::Recurse)
    }

    fn enter_rel_pattern(&mut self, _rel: &RelPattern) -> Flow<Self::Error> {
        Ok(Strategy::Recurse)
    }
}

/// Walks an expression tree, honoring handler strategies.
pub fn walk_expression<V: ExpressionVisitor>(
    visitor: &mut V,
    expr: &Expression,
) -> Result<(), V::Error> {
    if visitor.enter_expression(expr)? == Strategy::Recurse {
        match expr {
            Expression::Literal(..)
            | Expression::Identifier(_)
            | Expression::Parameter(..)
            | Expression::MapProjection(_)
            | Expression::Legacy(..) => {}
            Expression::Property { subject, .. } => walk_expression(visitor, subject)?,
            Expression::Subscript { subject, index, .. } => {
                walk_expression(visitor, subject)?;
                walk_expression(visitor, index)?;
            }
            Expression::Slice {
                subject, from, to, ..
            } => {
                walk_expression(visitor, subject)?;
                if let Some(from) = from {
                    walk_expression(visitor, from)?;
                }
                if let Some(to) = to {
                    walk_expression(visitor, to)?;
                }
            }
            Expression::List(items, _) => {
                for item in items {
                    walk_expression(visitor, item)?;
                }
            }
            Expression::Map(entries, _) => {
                for (_, value) in entries {
                    walk_expression(visitor, value)?;
                }
            }
            Expression::Unary { operand, .. } => walk_expression(visitor, operand)?,
            Expression::Binary { left, right, .. } => {
                walk_expression(visitor, left)?;
                walk_expression(visitor, right)?;
            }
            Expression::FunctionCall(call) => {
                for arg in &call.args {
                    walk_expression(visitor, arg)?;
                }
            }
            Expression::ApplyAll(_) => {}
            Expression::Case(case) => {
                if let Some(subject) = &case.subject {
                    walk_expression(visitor, subject)?;
                }
                for (condition, result) in &case.alternatives {
                    walk_expression(visitor, condition)?;
                    walk_expression(visitor, result)?;
                }
                if let Some(default) = &case.default {
                    walk_expression(visitor, default)?;
                }
            }
            Expression::ListComprehension(comp) => {
                walk_expression(visitor, &comp.list)?;
                if let Some(predicate) = &comp.predicate {
                    walk_expression(visitor, predicate)?;
                }
                if let Some(eval) = &comp.eval {
                    walk_expression(visitor, eval)?;
                }
            }
            Expression::Quantifier(q) => {
                walk_expression(visitor, &q.list)?;
                if let Some(predicate) = &q.predicate {
                    walk_expression(visitor, predicate)?;
                }
            }
            Expression::PatternComprehension(comp) => {
                walk_pattern_path(visitor, &comp.pattern)?;
                if let Some(predicate) = &comp.predicate {
                    walk_expression(visitor, predicate)?;
                }
                walk_expression(visitor, &comp.eval)?;
            }
            Expression::Reduce(reduce) => {
                walk_expression(visitor, &reduce.init)?;
                walk_expression(visitor, &reduce.list)?;
                if let Some(eval) = &reduce.eval {
                    walk_expression(visitor, eval)?;
                }
            }
            Expression::PatternPredicate(path) => walk_pattern_path(visitor, path)?,
        }
    }
    visitor.leave_expression(expr)
}

/// Walks every path of a pattern.
pub fn walk_pattern<V: ExpressionVisitor>(
    visitor: &mut V,
    pattern: &Pattern,
) -> Result<(), V::Error> {
    for path in &pattern.paths {
        walk_pattern_path(visitor, path)?;
    }
    Ok(())
}

/// Walks a single pattern path.
pub fn walk_pattern_path<V: ExpressionVisitor>(
    visitor: &mut V,
    path: &PatternPath,
) -> Result<(), V::Error> {
    if visitor.enter_pattern_path(path)? == Strategy::Continue {
        return Ok(());
    }
    match &path.body {
        crate::ast::query::PathBody::Elements(elements) => {
            for element in elements {
                walk_pattern_element(visitor, element)?;
            }
        }
        crate::ast::query::PathBody::Shortest { single, inner } => {
            if visitor.enter_shortest_path(path, *single)? == Strategy::Recurse {
                walk_pattern_path(visitor, inner)?;
            }
        }
    }
    Ok(())
}

/// Walks one pattern element.
pub fn walk_pattern_element<V: ExpressionVisitor>(
    visitor: &mut V,
    element: &PatternElement,
) -> Result<(), V::Error> {
    match element {
        PatternElement::Node(node) => {
            if visitor.enter_node_pattern(node)? == Strategy::Recurse {
                if let Some(properties) = &node.properties {
                    walk_expression(visitor, properties)?;
                }
            }
        }
        PatternElement::Relationship(rel) => {
            if visitor.enter_rel_pattern(rel)? == Strategy::Recurse {
                if let Some(properties) = &rel.properties {
                    walk_expression(visitor, properties)?;
                }
            }
        }
    }
    Ok(())
}

/// Walks every expression and pattern node of a clause, recursing into
/// FOREACH bodies and `CALL {}` subqueries.
pub fn walk_clause<V: ExpressionVisitor>(visitor: &mut V, clause: &Clause) -> Result<(), V::Error> {
    match clause {
        Clause::Match(m) => {
            walk_pattern(visitor, &m.pattern)?;
            if let Some(predicate) = &m.predicate {
                walk_expression(visitor, predicate)?;
            }
        }
        Clause::Create(c) => walk_pattern(visitor, &c.pattern)?,
        Clause::Merge(m) => {
            walk_pattern_path(visitor, &m.path)?;
            for action in &m.actions {
                for item in &action.items {
                    walk_set_item(visitor, item)?;
                }
            }
        }
        Clause::Delete(d) => {
            for e in &d.expressions {
                walk_expression(visitor, e)?;
            }
        }
        Clause::Set(s) => {
            for item in &s.items {
                walk_set_item(visitor, item)?;
            }
        }
        Clause::Remove(r) => {
            for item in &r.items {
                if let RemoveItem::Property { subject, .. } = item {
                    walk_expression(visitor, subject)?;
                }
            }
        }
        Clause::With(p) | Clause::Return(p) => {
            for projection in &p.projections {
                walk_expression(visitor, &projection.expression)?;
            }
            for sort in &p.order_by {
                walk_expression(visitor, &sort.expression)?;
            }
            if let Some(predicate) = &p.predicate {
                walk_expression(visitor, predicate)?;
            }
            if let Some(skip) = &p.skip {
                walk_expression(visitor, skip)?;
            }
            if let Some(limit) = &p.limit {
                walk_expression(visitor, limit)?;
            }
        }
        Clause::Unwind(u) => walk_expression(visitor, &u.expression)?,
        Clause::Foreach(f) => {
            walk_expression(visitor, &f.list)?;
            for inner in &f.clauses {
                walk_clause(visitor, inner)?;
            }
        }
        Clause::Call(c) => {
            for arg in &c.args {
                walk_expression(visitor, arg)?;
            }
        }
        Clause::CallSubquery(sub) => {
            for inner in &sub.query.clauses {
                walk_clause(visitor, inner)?;
            }
        }
        Clause::LoadCsv(l) => walk_expression(visitor, &l.source)?,
        Clause::Union(_) | Clause::Unsupported { .. } => {}
    }
    Ok(())
}

fn walk_set_item<V: ExpressionVisitor>(visitor: &mut V, item: &SetItem) -> Result<(), V::Error> {
    match item {
        SetItem::Property { subject, value, .. } => {
            walk_expression(visitor, subject)?;
            walk_expression(visitor, value)?;
        }
        SetItem::AllProperties { value, .. } => walk_expression(visitor, value)?,
        SetItem::Labels { .. } | SetItem::SubscriptAssign { .. } => {}
    }
    Ok(())
}

// ============================================================================
// Collectors
// ============================================================================

/// Never-failing error type for pure collectors.
#[derive(Debug)]
pub enum Never {}

struct NameCollector<'a> {
    names: &'a mut IndexSet<SmolStr>,
}

impl ExpressionVisitor for NameCollector<'_> {
    type Error = Never;

    fn enter_expression(&mut self, expr: &Expression) -> Flow<Never> {
        match expr {
            Expression::Identifier(id) => {
                self.names.insert(id.name.clone());
            }
            Expression::ListComprehension(comp) => {
                self.names.insert(comp.variable.name.clone());
            }
            Expression::Quantifier(q) => {
                self.names.insert(q.variable.name.clone());
            }
            Expression::PatternComprehension(comp) => {
                if let Some(variable) = &comp.variable {
                    self.names.insert(variable.name.clone());
                }
            }
            Expression::Reduce(reduce) => {
                self.names.insert(reduce.accumulator.name.clone());
                self.names.insert(reduce.variable.name.clone());
            }
            _ => {}
        }
        Ok(Strategy::Recurse)
    }

    fn enter_pattern_path(&mut self, path: &PatternPath) -> Flow<Never> {
        if let Some(variable) = &path.variable {
            self.names.insert(variable.name.clone());
        }
        Ok(Strategy::Recurse)
    }

    fn enter_node_pattern(&mut self, node: &NodePattern) -> Flow<Never> {
        if let Some(variable) = &node.variable {
            self.names.insert(variable.name.clone());
        }
        Ok(Strategy::Recurse)
    }

    fn enter_rel_pattern(&mut self, rel: &RelPattern) -> Flow<Never> {
        if let Some(variable) = &rel.variable {
            self.names.insert(variable.name.clone());
        }
        Ok(Strategy::Recurse)
    }
}

fn unreachable_never<T>(result: Result<T, Never>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Collects every name mentioned in an expression (references and local
/// binders alike) into `names`.
pub fn collect_expression_names(expr: &Expression, names: &mut IndexSet<SmolStr>) {
    let mut collector = NameCollector { names: &mut *names };
    unreachable_never(walk_expression(&mut collector, expr));
}

/// Collects every name mentioned in a pattern.
pub fn collect_pattern_names(pattern: &Pattern, names: &mut IndexSet<SmolStr>) {
    let mut collector = NameCollector { names: &mut *names };
    unreachable_never(walk_pattern(&mut collector, pattern));
}

/// Collects every name mentioned anywhere in a clause: pattern variables,
/// expression identifiers, projection aliases, loop variables.
pub fn collect_clause_names(clause: &Clause, names: &mut IndexSet<SmolStr>) {
    match clause {
        Clause::Match(m) => {
            collect_pattern_names(&m.pattern, names);
            if let Some(predicate) = &m.predicate {
                collect_expression_names(predicate, names);
            }
        }
        Clause::Create(c) => collect_pattern_names(&c.pattern, names),
        Clause::Merge(m) => {
            let mut collector = NameCollector { names: &mut *names };
            unreachable_never(walk_pattern_path(&mut collector, &m.path));
            for action in &m.actions {
                for item in &action.items {
                    collect_set_item_names(item, names);
                }
            }
        }
        Clause::Delete(d) => {
            for e in &d.expressions {
                collect_expression_names(e, names);
            }
        }
        Clause::Set(s) => {
            for item in &s.items {
                collect_set_item_names(item, names);
            }
        }
        Clause::Remove(r) => {
            for item in &r.items {
                match item {
                    RemoveItem::Property { subject, .. } => {
                        collect_expression_names(subject, names)
                    }
                    RemoveItem::Labels { target, .. } => {
                        names.insert(target.name.clone());
                    }
                }
            }
        }
        Clause::With(p) | Clause::Return(p) => {
            for projection in &p.projections {
                collect_expression_names(&projection.expression, names);
                if let Some(alias) = &projection.alias {
                    names.insert(alias.name.clone());
                }
            }
            for sort in &p.order_by {
                collect_expression_names(&sort.expression, names);
            }
            if let Some(predicate) = &p.predicate {
                collect_expression_names(predicate, names);
            }
        }
        Clause::Unwind(u) => {
            collect_expression_names(&u.expression, names);
            names.insert(u.alias.name.clone());
        }
        Clause::Foreach(f) => {
            collect_expression_names(&f.list, names);
            names.insert(f.variable.name.clone());
            for inner in &f.clauses {
                collect_clause_names(inner, names);
            }
        }
        Clause::Call(c) => {
            for arg in &c.args {
                collect_expression_names(arg, names);
            }
            for item in &c.yield_items {
                collect_expression_names(&item.expression, names);
                if let Some(alias) = &item.alias {
                    names.insert(alias.name.clone());
                }
            }
        }
        Clause::CallSubquery(sub) => {
            for inner in &sub.query.clauses {
                collect_clause_names(inner, names);
            }
        }
        Clause::LoadCsv(l) => {
            collect_expression_names(&l.source, names);
            names.insert(l.alias.name.clone());
        }
        Clause::Union(_) | Clause::Unsupported { .. } => {}
    }
}

fn collect_set_item_names(item: &SetItem, names: &mut IndexSet<SmolStr>) {
    match item {
        SetItem::Property { subject, value, .. } => {
            collect_expression_names(subject, names);
            collect_expression_names(value, names);
        }
        SetItem::AllProperties { target, value, .. } => {
            names.insert(target.name.clone());
            collect_expression_names(value, names);
        }
        SetItem::Labels { target, .. } => {
            names.insert(target.name.clone());
        }
        SetItem::SubscriptAssign { .. } => {}
    }
}

struct FunctionCollector<'a> {
    names: &'a mut IndexSet<SmolStr>,
}

impl ExpressionVisitor for FunctionCollector<'_> {
    type Error = Never;

    fn enter_expression(&mut self, expr: &Expression) -> Flow<Never> {
        match expr {
            Expression::FunctionCall(call) => {
                self.names.insert(call.name.clone());
            }
            Expression::ApplyAll(apply) => {
                self.names.insert(apply.name.clone());
            }
            _ => {}
        }
        Ok(Strategy::Recurse)
    }
}

/// Collects the names of all function calls beneath an expression.
///
/// Given `abs(max(min(a), abs(k)))` the set will hold `abs`, `max` and `min`.
pub fn collect_expression_functions(expr: &Expression, names: &mut IndexSet<SmolStr>) {
    let mut collector = FunctionCollector { names: &mut *names };
    unreachable_never(walk_expression(&mut collector, expr));
}

/// Collects the names of all function calls anywhere in a clause.
pub fn collect_clause_functions(clause: &Clause, names: &mut IndexSet<SmolStr>) {
    match clause {
        Clause::Match(m) => {
            for path in &m.pattern.paths {
                let mut collector = FunctionCollector { names: &mut *names };
                unreachable_never(walk_pattern_path(&mut collector, path));
            }
            if let Some(predicate) = &m.predicate {
                collect_expression_functions(predicate, names);
            }
        }
        Clause::Create(c) => {
            for path in &c.pattern.paths {
                let mut collector = FunctionCollector { names: &mut *names };
                unreachable_never(walk_pattern_path(&mut collector, path));
            }
        }
        Clause::Merge(m) => {
            let mut collector = FunctionCollector { names: &mut *names };
            unreachable_never(walk_pattern_path(&mut collector, &m.path));
            for action in &m.actions {
                for item in &action.items {
                    if let SetItem::Property { subject, value, .. } = item {
                        collect_expression_functions(subject, names);
                        collect_expression_functions(value, names);
                    }
                }
            }
        }
        Clause::Delete(d) => {
            for e in &d.expressions {
                collect_expression_functions(e, names);
            }
        }
        Clause::Set(s) => {
            for item in &s.items {
                match item {
                    SetItem::Property { subject, value, .. } => {
                        collect_expression_functions(subject, names);
                        collect_expression_functions(value, names);
                    }
                    SetItem::AllProperties { value, .. } => {
                        collect_expression_functions(value, names);
                    }
                    _ => {}
                }
            }
        }
        Clause::With(p) | Clause::Return(p) => {
            for projection in &p.projections {
                collect_expression_functions(&projection.expression, names);
            }
            for sort in &p.order_by {
                collect_expression_functions(&sort.expression, names);
            }
            if let Some(predicate) = &p.predicate {
                collect_expression_functions(predicate, names);
            }
        }
        Clause::Unwind(u) => collect_expression_functions(&u.expression, names),
        Clause::Foreach(f) => {
            collect_expression_functions(&f.list, names);
            for inner in &f.clauses {
                collect_clause_functions(inner, names);
            }
        }
        Clause::Call(c) => {
            for arg in &c.args {
                collect_expression_functions(arg, names);
            }
        }
        Clause::CallSubquery(sub) => {
            for inner in &sub.query.clauses {
                collect_clause_functions(inner, names);
            }
        }
        Clause::LoadCsv(l) => collect_expression_functions(&l.source, names),
        Clause::Remove(_) | Clause::Union(_) | Clause::Unsupported { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expression::{FunctionCall, Identifier, Literal};

    fn ident(name: &str) -> Expression {
        Expression::Identifier(Identifier::new(name, 0..0))
    }

    #[test]
    fn collects_nested_function_names() {
        let expr = Expression::FunctionCall(FunctionCall {
            name: "abs".into(),
            distinct: false,
            args: vec![Expression::FunctionCall(FunctionCall {
                name: "max".into(),
                distinct: false,
                args: vec![ident("a")],
                span: 0..0,
            })],
            span: 0..0,
        });

        let mut names = IndexSet::new();
        collect_expression_functions(&expr, &mut names);
        assert!(names.contains("abs"));
        assert!(names.contains("max"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn collects_identifiers_in_order() {
        let expr = Expression::Binary {
            op: crate::ast::expression::BinaryOperator::Add,
            left: Box::new(ident("b")),
            right: Box::new(ident("a")),
            span: 0..0,
        };
        let mut names = IndexSet::new();
        collect_expression_names(&expr, &mut names);
        let names: Vec<_> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn continue_skips_children() {
        struct SkipAll {
            seen: usize,
        }
        impl ExpressionVisitor for SkipAll {
            type Error = Never;
            fn enter_expression(&mut self, _: &Expression) -> Flow<Never> {
                self.seen += 1;
                Ok(Strategy::Continue)
            }
        }

        let expr = Expression::List(
            vec![
                Expression::Literal(Literal::Integer(1), 0..1),
                Expression::Literal(Literal::Integer(2), 2..3),
            ],
            0..3,
        );
        let mut visitor = SkipAll { seen: 0 };
        unreachable_never(walk_expression(&mut visitor, &expr));
        assert_eq!(visitor.seen, 1);
    }
}
