//! Expression and pattern handlers of the validation walk.

use super::{IdentKind, ValidateCtx, Validator};
use crate::ast::expression::{ApplyAll, Expression, FunctionCall, Quantifier, Reduce};
use crate::ast::query::{
    ClauseKind, Direction, NodePattern, PatternElement, PatternPath, RelPattern, VarLengthRange,
};
use crate::ast::visitor::{walk_expression, walk_pattern_path, ExpressionVisitor, Flow, Strategy};
use crate::ast::ListComprehension;
use crate::error::{QueryError, Result};
use smol_str::SmolStr;

/// Strategy-returning expression visitor carrying the validation context.
pub(crate) struct ExprValidator<'v, 'c, 'a> {
    validator: &'v Validator<'a>,
    ctx: &'c mut ValidateCtx,
}

impl<'v, 'c, 'a> ExprValidator<'v, 'c, 'a> {
    pub(crate) fn new(validator: &'v Validator<'a>, ctx: &'c mut ValidateCtx) -> Self {
        Self { validator, ctx }
    }

    fn validate_function_call(&self, call: &FunctionCall) -> Result<()> {
        let functions = self.validator.functions();
        if !functions.exists(&call.name) {
            return Err(QueryError::UnknownFunction(call.name.clone()));
        }
        if !self.ctx.aggregation_allowed() && functions.is_aggregate(&call.name) {
            return Err(QueryError::InvalidUseOfAggregation(call.name.clone()));
        }
        Ok(())
    }

    /// `fn(*)`: only `COUNT(*)`, and never with DISTINCT.
    fn validate_apply_all(&self, apply: &ApplyAll) -> Result<()> {
        if !apply.name.eq_ignore_ascii_case("count") {
            return Err(QueryError::InvalidUsageOfStarParameter);
        }
        if apply.distinct {
            return Err(QueryError::InvalidUsageOfDistinctStar);
        }
        Ok(())
    }

    /// A comprehension binds its loop variable for the body only: the name
    /// is introduced if new, the sub-expressions are visited in a
    /// controlled order, and the name is removed iff it was introduced.
    fn validate_list_comprehension(&mut self, comp: &ListComprehension) -> Result<()> {
        let name = comp.variable.name.clone();
        let is_new = self.ctx.find(&name).is_none();
        if is_new {
            self.ctx.add(&name, IdentKind::Unspecified);
        }

        let result = self.list_comprehension_body(comp);

        if is_new {
            self.ctx.remove(&name);
        }
        result
    }

    fn list_comprehension_body(&mut self, comp: &ListComprehension) -> Result<()> {
        walk_expression(self, &comp.list)?;
        if let Some(predicate) = &comp.predicate {
            walk_expression(self, predicate)?;
        }
        if let Some(eval) = &comp.eval {
            walk_expression(self, eval)?;
        }
        Ok(())
    }

    fn validate_quantifier(&mut self, q: &Quantifier) -> Result<()> {
        let name = q.variable.name.clone();
        let is_new = self.ctx.find(&name).is_none();
        if is_new {
            self.ctx.add(&name, IdentKind::Unspecified);
        }

        let result = self.quantifier_body(q);

        if is_new {
            self.ctx.remove(&name);
        }
        result
    }

    fn quantifier_body(&mut self, q: &Quantifier) -> Result<()> {
        walk_expression(self, &q.list)?;
        if let Some(predicate) = &q.predicate {
            walk_expression(self, predicate)?;
        }
        Ok(())
    }

    fn validate_pattern_comprehension(
        &mut self,
        comp: &crate::ast::PatternComprehension,
    ) -> Result<()> {
        // the pattern binds entity names for the body only; the environment
        // is restored wholesale on exit
        let outer = self.ctx.env.clone();

        let result = self.pattern_comprehension_body(comp);

        self.ctx.env = outer;
        result
    }

    fn pattern_comprehension_body(&mut self, comp: &crate::ast::PatternComprehension) -> Result<()> {
        if let Some(variable) = &comp.variable {
            self.ctx.add(&variable.name, IdentKind::Unspecified);
        }
        walk_pattern_path(self, &comp.pattern)?;
        if let Some(predicate) = &comp.predicate {
            walk_expression(self, predicate)?;
        }
        walk_expression(self, &comp.eval)?;
        Ok(())
    }

    fn validate_reduce(&mut self, reduce: &Reduce) -> Result<()> {
        let was_in_reduce = self.ctx.in_reduce;
        self.ctx.in_reduce = true;

        let result = self.validate_reduce_body(reduce);

        self.ctx.in_reduce = was_in_reduce;
        result
    }

    fn validate_reduce_body(&mut self, reduce: &Reduce) -> Result<()> {
        // the init expression is either a known variable or an expression
        match reduce.init.as_identifier() {
            Some(id) => {
                if self.ctx.find(&id.name).is_none() {
                    return Err(QueryError::NotDefined(id.name.clone()));
                }
            }
            None => walk_expression(self, &reduce.init)?,
        }

        // the list expression must resolve; a bare name must be bound
        if let Some(id) = reduce.list.as_identifier() {
            if self.ctx.find(&id.name).is_none() {
                return Err(QueryError::NotDefined(id.name.clone()));
            }
        }
        walk_expression(self, &reduce.list)?;

        if reduce.eval.is_none() {
            return Err(QueryError::MissingEvalExpInReduce);
        }

        let acc = reduce.accumulator.name.clone();
        let var = reduce.variable.name.clone();
        let introduce_acc = self.ctx.find(&acc).is_none();
        if introduce_acc {
            self.ctx.add(&acc, IdentKind::Unspecified);
        }
        let introduce_var = self.ctx.find(&var).is_none();
        if introduce_var {
            self.ctx.add(&var, IdentKind::Unspecified);
        }

        let result = match &reduce.eval {
            Some(eval) => walk_expression(self, eval),
            None => Ok(()),
        };

        if introduce_acc {
            self.ctx.remove(&acc);
        }
        if introduce_var {
            self.ctx.remove(&var);
        }
        result
    }

    fn validate_inline_properties(&self, properties: &Option<Expression>) -> Result<()> {
        let Some(props) = properties else {
            return Ok(());
        };
        match props {
            Expression::Parameter(..) => Ok(()),
            Expression::Map(entries, _) => {
                for (_, value) in entries {
                    if contains_pattern(value) {
                        return Err(QueryError::UnhandledTypeInlineProperties);
                    }
                }
                Ok(())
            }
            _ => Err(QueryError::UnhandledTypeInlineProperties),
        }
    }
}

impl ExpressionVisitor for ExprValidator<'_, '_, '_> {
    type Error = QueryError;

    fn enter_expression(&mut self, expr: &Expression) -> Flow<QueryError> {
        match expr {
            Expression::Identifier(id) => {
                self.ctx.check_defined(&id.name)?;
                Ok(Strategy::Recurse)
            }
            Expression::FunctionCall(call) => {
                self.validate_function_call(call)?;
                Ok(Strategy::Recurse)
            }
            Expression::ApplyAll(apply) => {
                self.validate_apply_all(apply)?;
                Ok(Strategy::Recurse)
            }
            Expression::Binary { op, .. } => {
                if *op == crate::ast::BinaryOperator::Regex {
                    return Err(QueryError::UnsupportedOperator(op.name()));
                }
                Ok(Strategy::Recurse)
            }
            Expression::MapProjection(_) => Err(QueryError::UnsupportedOperator("map projection")),
            Expression::Legacy(kind, _) => Err(QueryError::UnsupportedAstNodeType(*kind)),
            Expression::ListComprehension(comp) => {
                self.validate_list_comprehension(comp)?;
                Ok(Strategy::Continue)
            }
            Expression::Quantifier(q) => {
                self.validate_quantifier(q)?;
                Ok(Strategy::Continue)
            }
            Expression::PatternComprehension(comp) => {
                self.validate_pattern_comprehension(comp)?;
                Ok(Strategy::Continue)
            }
            Expression::Reduce(reduce) => {
                self.validate_reduce(reduce)?;
                Ok(Strategy::Continue)
            }
            _ => Ok(Strategy::Recurse),
        }
    }

    fn enter_pattern_path(&mut self, path: &PatternPath) -> Flow<QueryError> {
        if let Some(variable) = &path.variable {
            self.ctx.add(&variable.name, IdentKind::Unspecified);
        }
        Ok(Strategy::Recurse)
    }

    fn enter_shortest_path(&mut self, path: &PatternPath, single: bool) -> Flow<QueryError> {
        if single {
            // both endpoints must already be resolved
            let elements = path.elements();
            let endpoint = |element: Option<&PatternElement>| -> Option<SmolStr> {
                match element {
                    Some(PatternElement::Node(node)) => {
                        node.variable.as_ref().map(|v| v.name.clone())
                    }
                    _ => None,
                }
            };
            let start = endpoint(elements.first());
            let end = endpoint(elements.last());
            let (Some(start), Some(end)) = (start, end) else {
                return Err(QueryError::ShortestPathBoundNodes);
            };
            if self.ctx.find(&start).is_none() || self.ctx.find(&end).is_none() {
                return Err(QueryError::ShortestPathBoundNodes);
            }
        } else {
            // allShortestPaths requires a minimal traversal length of 1
            for element in path.elements() {
                if let PatternElement::Relationship(rel) = element {
                    if let Some(VarLengthRange { start, .. }) = &rel.varlength {
                        if start.unwrap_or(1) != 1 {
                            return Err(QueryError::AllShortestPathMinimalLength);
                        }
                    }
                }
            }
        }
        Ok(Strategy::Recurse)
    }

    fn enter_node_pattern(&mut self, node: &NodePattern) -> Flow<QueryError> {
        self.validate_inline_properties(&node.properties)?;

        let Some(variable) = &node.variable else {
            return Ok(Strategy::Recurse);
        };
        let alias = &variable.name;

        if self.ctx.clause == ClauseKind::Merge {
            // a bound node may be reused by MERGE, but the pattern may not
            // introduce labels or properties on it
            if !self.ctx.is_empty()
                && self.ctx.find(alias).is_some()
                && (!node.labels.is_empty() || node.properties.is_some())
            {
                return Err(QueryError::Redeclare {
                    kind: "node",
                    name: alias.clone(),
                    clause: "MERGE",
                });
            }
        } else {
            match self.ctx.find(alias) {
                Some(IdentKind::Edge) => {
                    return Err(QueryError::SameAliasNodeAndRelationship(alias.clone()));
                }
                Some(IdentKind::Loop) => {
                    return Err(QueryError::VariableAlreadyDeclared(alias.clone()));
                }
                _ => {}
            }
        }
        self.ctx.add(alias, IdentKind::Node);

        Ok(Strategy::Recurse)
    }

    fn enter_rel_pattern(&mut self, rel: &RelPattern) -> Flow<QueryError> {
        if self.ctx.clause == ClauseKind::Create {
            if let Some(variable) = &rel.variable {
                if self.ctx.find(&variable.name).is_some() {
                    return Err(QueryError::Redeclare {
                        kind: "variable",
                        name: variable.name.clone(),
                        clause: "CREATE",
                    });
                }
            }
            if rel.types.len() != 1 {
                return Err(QueryError::OneRelationshipType("CREATE"));
            }
            if rel.direction == Direction::Bidirectional {
                return Err(QueryError::CreateDirectedRelationship);
            }
            if rel.varlength.is_some() {
                return Err(QueryError::VarLen("CREATE"));
            }
        }

        self.validate_inline_properties(&rel.properties)?;

        if self.ctx.clause == ClauseKind::Merge {
            // an undirected MERGE edge creates a single outgoing edge, so
            // the direction needs no check here
            if rel.varlength.is_some() {
                return Err(QueryError::VarLen("MERGE"));
            }
            if let Some(variable) = &rel.variable {
                if self.ctx.find(&variable.name).is_some() {
                    return Err(QueryError::Redeclare {
                        kind: "variable",
                        name: variable.name.clone(),
                        clause: "MERGE",
                    });
                }
            }
            if rel.types.len() != 1 {
                return Err(QueryError::OneRelationshipType("MERGE"));
            }
        }

        if rel.variable.is_none() && rel.varlength.is_none() {
            // unaliased single-hop entities need no scope bookkeeping
            return Ok(Strategy::Recurse);
        }

        if let Some(VarLengthRange { start, end, .. }) = &rel.varlength {
            let low = start.unwrap_or(1);
            let high = end.unwrap_or(i64::MAX - 2);
            if low > high {
                return Err(QueryError::VarLenInvalidRange);
            }
        }

        if let Some(variable) = &rel.variable {
            let alias = &variable.name;
            match self.ctx.find(alias) {
                None => {
                    self.ctx.add(alias, IdentKind::Edge);
                }
                Some(kind) => {
                    if kind == IdentKind::Node {
                        return Err(QueryError::SameAliasNodeAndRelationship(alias.clone()));
                    }
                    if kind == IdentKind::Loop {
                        return Err(QueryError::VariableAlreadyDeclared(alias.clone()));
                    }
                    if self.ctx.clause == ClauseKind::Match && kind != IdentKind::Unspecified {
                        return Err(QueryError::SameAliasMultiplePatterns(alias.clone()));
                    }
                }
            }
        }

        Ok(Strategy::Recurse)
    }
}

/// True when the expression subtree mentions any identifier.
pub(crate) fn contains_identifier(expr: &Expression) -> bool {
    struct Finder;
    impl ExpressionVisitor for Finder {
        type Error = ();
        fn enter_expression(&mut self, expr: &Expression) -> Flow<()> {
            if matches!(expr, Expression::Identifier(_)) {
                return Err(());
            }
            Ok(Strategy::Recurse)
        }
        fn enter_pattern_path(&mut self, path: &PatternPath) -> Flow<()> {
            if path.variable.is_some() {
                return Err(());
            }
            Ok(Strategy::Recurse)
        }
        fn enter_node_pattern(&mut self, node: &NodePattern) -> Flow<()> {
            if node.variable.is_some() {
                return Err(());
            }
            Ok(Strategy::Recurse)
        }
        fn enter_rel_pattern(&mut self, rel: &RelPattern) -> Flow<()> {
            if rel.variable.is_some() {
                return Err(());
            }
            Ok(Strategy::Recurse)
        }
    }
    walk_expression(&mut Finder, expr).is_err()
}

/// True when the expression subtree contains a pattern form.
fn contains_pattern(expr: &Expression) -> bool {
    struct Finder;
    impl ExpressionVisitor for Finder {
        type Error = ();
        fn enter_expression(&mut self, expr: &Expression) -> Flow<()> {
            if matches!(
                expr,
                Expression::PatternPredicate(_) | Expression::PatternComprehension(_)
            ) {
                return Err(());
            }
            Ok(Strategy::Recurse)
        }
    }
    walk_expression(&mut Finder, expr).is_err()
}
