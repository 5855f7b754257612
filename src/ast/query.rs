//! Clause and pattern AST nodes.
//!
//! A parsed query is a flat list of top-level clauses; `UNION` appears as a
//! clause separating its branches, mirroring the parse shape the validator
//! and rewriters operate on. Subqueries (`CALL { ... }`) and `FOREACH`
//! bodies nest full clause lists.

use crate::ast::expression::{Expression, Identifier};
use crate::ast::Span;
use smol_str::SmolStr;

/// Stable identity of a pattern entity, assigned at parse time.
///
/// Annotation side-tables (entity naming) key on this rather than on node
/// addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// A parsed query body: a flat, ordered clause list.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Top-level clauses in source order.
    pub clauses: Vec<Clause>,
    /// Source span of the whole body.
    pub span: Span,
}

/// Top-level clause kinds, used for dispatch, accessors and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    Match,
    Create,
    Merge,
    Delete,
    Set,
    Remove,
    With,
    Return,
    Unwind,
    Foreach,
    Call,
    CallSubquery,
    Union,
    LoadCsv,
    Unsupported,
}

impl ClauseKind {
    /// Clause spelling for error messages.
    pub fn name(self) -> &'static str {
        match self {
            ClauseKind::Match => "MATCH",
            ClauseKind::Create => "CREATE",
            ClauseKind::Merge => "MERGE",
            ClauseKind::Delete => "DELETE",
            ClauseKind::Set => "SET",
            ClauseKind::Remove => "REMOVE",
            ClauseKind::With => "WITH",
            ClauseKind::Return => "RETURN",
            ClauseKind::Unwind => "UNWIND",
            ClauseKind::Foreach => "FOREACH",
            ClauseKind::Call => "CALL",
            ClauseKind::CallSubquery => "CALL {}",
            ClauseKind::Union => "UNION",
            ClauseKind::LoadCsv => "LOAD CSV",
            ClauseKind::Unsupported => "unsupported clause",
        }
    }

    /// Returns true for clauses that modify the graph.
    pub fn is_updating(self) -> bool {
        matches!(
            self,
            ClauseKind::Create
                | ClauseKind::Merge
                | ClauseKind::Delete
                | ClauseKind::Set
                | ClauseKind::Remove
                | ClauseKind::Foreach
        )
    }
}

/// A top-level clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match(MatchClause),
    Create(CreateClause),
    Merge(MergeClause),
    Delete(DeleteClause),
    Set(SetClause),
    Remove(RemoveClause),
    With(ProjectionClause),
    Return(ProjectionClause),
    Unwind(UnwindClause),
    Foreach(ForeachClause),
    Call(CallClause),
    CallSubquery(CallSubqueryClause),
    Union(UnionClause),
    LoadCsv(LoadCsvClause),
    /// A construct recognized by the grammar but rejected by the validator
    /// (START, USING PERIODIC COMMIT).
    Unsupported { kind: &'static str, span: Span },
}

impl Clause {
    /// Returns the kind of this clause.
    pub fn kind(&self) -> ClauseKind {
        match self {
            Clause::Match(_) => ClauseKind::Match,
            Clause::Create(_) => ClauseKind::Create,
            Clause::Merge(_) => ClauseKind::Merge,
            Clause::Delete(_) => ClauseKind::Delete,
            Clause::Set(_) => ClauseKind::Set,
            Clause::Remove(_) => ClauseKind::Remove,
            Clause::With(_) => ClauseKind::With,
            Clause::Return(_) => ClauseKind::Return,
            Clause::Unwind(_) => ClauseKind::Unwind,
            Clause::Foreach(_) => ClauseKind::Foreach,
            Clause::Call(_) => ClauseKind::Call,
            Clause::CallSubquery(_) => ClauseKind::CallSubquery,
            Clause::Union(_) => ClauseKind::Union,
            Clause::LoadCsv(_) => ClauseKind::LoadCsv,
            Clause::Unsupported { .. } => ClauseKind::Unsupported,
        }
    }

    /// Returns the span of this clause.
    pub fn span(&self) -> Span {
        match self {
            Clause::Match(c) => c.span.clone(),
            Clause::Create(c) => c.span.clone(),
            Clause::Merge(c) => c.span.clone(),
            Clause::Delete(c) => c.span.clone(),
            Clause::Set(c) => c.span.clone(),
            Clause::Remove(c) => c.span.clone(),
            Clause::With(c) | Clause::Return(c) => c.span.clone(),
            Clause::Unwind(c) => c.span.clone(),
            Clause::Foreach(c) => c.span.clone(),
            Clause::Call(c) => c.span.clone(),
            Clause::CallSubquery(c) => c.span.clone(),
            Clause::Union(c) => c.span.clone(),
            Clause::LoadCsv(c) => c.span.clone(),
            Clause::Unsupported { span, .. } => span.clone(),
        }
    }

    /// Returns the projection clause if this is WITH or RETURN.
    pub fn as_projection(&self) -> Option<&ProjectionClause> {
        match self {
            Clause::With(p) | Clause::Return(p) => Some(p),
            _ => None,
        }
    }
}

// ============================================================================
// Patterns
// ============================================================================

/// A comma-separated list of pattern paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// The paths.
    pub paths: Vec<PatternPath>,
    /// Source span.
    pub span: Span,
}

/// A single pattern path, optionally named.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternPath {
    /// Path variable, e.g. `p` in `p = (a)-->(b)`.
    pub variable: Option<Identifier>,
    /// The path body.
    pub body: PathBody,
    /// Source span.
    pub span: Span,
}

/// The body of a pattern path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathBody {
    /// An alternating node/relationship element chain (always odd length,
    /// nodes at even positions).
    Elements(Vec<PatternElement>),
    /// A `shortestPath(...)` / `allShortestPaths(...)` form wrapping an
    /// anonymous element chain.
    Shortest {
        /// True for `shortestPath`, false for `allShortestPaths`.
        single: bool,
        /// The wrapped path.
        inner: Box<PatternPath>,
    },
}

impl PatternPath {
    /// Returns the element chain of this path, looking through shortest-path
    /// wrappers.
    pub fn elements(&self) -> &[PatternElement] {
        match &self.body {
            PathBody::Elements(elements) => elements,
            PathBody::Shortest { inner, .. } => inner.elements(),
        }
    }
}

/// One element of a path: a node or a relationship.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternElement {
    Node(NodePattern),
    Relationship(RelPattern),
}

/// A node pattern `(n:Label {props})`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    /// Stable identity for annotations.
    pub id: NodeId,
    /// Optional alias.
    pub variable: Option<Identifier>,
    /// Labels.
    pub labels: Vec<SmolStr>,
    /// Inline properties (a map literal or parameter).
    pub properties: Option<Expression>,
    /// Source span.
    pub span: Span,
}

/// Relationship direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `-[]->`
    Outgoing,
    /// `<-[]-`
    Incoming,
    /// `-[]-`
    Bidirectional,
}

/// A variable-length range `*min..max`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarLengthRange {
    /// Minimum hop count, if spelled.
    pub start: Option<i64>,
    /// Maximum hop count, if spelled.
    pub end: Option<i64>,
    /// Source span.
    pub span: Span,
}

/// A relationship pattern `-[r:TYPE*1..2 {props}]->`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelPattern {
    /// Stable identity for annotations.
    pub id: NodeId,
    /// Optional alias.
    pub variable: Option<Identifier>,
    /// Relationship types (zero or more alternatives).
    pub types: Vec<SmolStr>,
    /// Traversal direction.
    pub direction: Direction,
    /// Variable-length range, if any.
    pub varlength: Option<VarLengthRange>,
    /// Inline properties (a map literal or parameter).
    pub properties: Option<Expression>,
    /// Source span.
    pub span: Span,
}

// ============================================================================
// Clauses
// ============================================================================

/// A MATCH clause.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchClause {
    /// OPTIONAL MATCH.
    pub optional: bool,
    /// The pattern.
    pub pattern: Pattern,
    /// WHERE predicate.
    pub predicate: Option<Expression>,
    /// Spans of `USING` hints; recognized only to be rejected.
    pub hints: Vec<Span>,
    /// Source span.
    pub span: Span,
}

/// A CREATE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateClause {
    /// The pattern to create.
    pub pattern: Pattern,
    /// Source span.
    pub span: Span,
}

/// Trigger of a MERGE action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeActionKind {
    /// `ON CREATE SET ...`
    OnCreate,
    /// `ON MATCH SET ...`
    OnMatch,
}

/// A MERGE action: `ON CREATE SET ...` or `ON MATCH SET ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeAction {
    /// When the action fires.
    pub kind: MergeActionKind,
    /// The SET items to apply.
    pub items: Vec<SetItem>,
    /// Source span.
    pub span: Span,
}

/// A MERGE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeClause {
    /// The single path to merge.
    pub path: PatternPath,
    /// ON CREATE / ON MATCH actions.
    pub actions: Vec<MergeAction>,
    /// Source span.
    pub span: Span,
}

/// A DELETE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteClause {
    /// DETACH DELETE.
    pub detach: bool,
    /// The expressions to delete.
    pub expressions: Vec<Expression>,
    /// Source span.
    pub span: Span,
}

/// One item of a SET clause.
#[derive(Debug, Clone, PartialEq)]
pub enum SetItem {
    /// `subject.key = value`
    Property {
        subject: Expression,
        key: SmolStr,
        value: Expression,
        span: Span,
    },
    /// `target = value` or `target += value`
    AllProperties {
        target: Identifier,
        value: Expression,
        merge: bool,
        span: Span,
    },
    /// `target:Label1:Label2`
    Labels {
        target: Identifier,
        labels: Vec<SmolStr>,
        span: Span,
    },
    /// `subject[key] = value`; recognized only to be rejected.
    SubscriptAssign { span: Span },
}

impl SetItem {
    /// Returns the span of this item.
    pub fn span(&self) -> Span {
        match self {
            SetItem::Property { span, .. }
            | SetItem::AllProperties { span, .. }
            | SetItem::Labels { span, .. }
            | SetItem::SubscriptAssign { span } => span.clone(),
        }
    }
}

/// A SET clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SetClause {
    /// The items.
    pub items: Vec<SetItem>,
    /// Source span.
    pub span: Span,
}

/// One item of a REMOVE clause.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveItem {
    /// `subject.key`
    Property {
        subject: Expression,
        key: SmolStr,
        span: Span,
    },
    /// `target:Label1:Label2`
    Labels {
        target: Identifier,
        labels: Vec<SmolStr>,
        span: Span,
    },
}

/// A REMOVE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveClause {
    /// The items.
    pub items: Vec<RemoveItem>,
    /// Source span.
    pub span: Span,
}

/// An expression-plus-optional-alias appearing in WITH/RETURN/YIELD.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// The projected expression.
    pub expression: Expression,
    /// The alias, if spelled.
    pub alias: Option<Identifier>,
    /// Source span.
    pub span: Span,
}

impl Projection {
    /// The projected column name: the alias, or the identifier name when the
    /// expression is a plain reference.
    pub fn column_name(&self) -> Option<&SmolStr> {
        match &self.alias {
            Some(alias) => Some(&alias.name),
            None => self.expression.as_identifier().map(|id| &id.name),
        }
    }
}

/// A sort key in ORDER BY.
#[derive(Debug, Clone, PartialEq)]
pub struct SortItem {
    /// The sort expression.
    pub expression: Expression,
    /// Ascending order.
    pub ascending: bool,
}

/// A WITH or RETURN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionClause {
    /// DISTINCT quantifier.
    pub distinct: bool,
    /// `*` projection (may be combined with explicit projections).
    pub star: bool,
    /// Explicit projections.
    pub projections: Vec<Projection>,
    /// ORDER BY keys.
    pub order_by: Vec<SortItem>,
    /// SKIP expression.
    pub skip: Option<Expression>,
    /// LIMIT expression.
    pub limit: Option<Expression>,
    /// WHERE predicate (WITH only).
    pub predicate: Option<Expression>,
    /// Source span.
    pub span: Span,
}

/// An UNWIND clause.
#[derive(Debug, Clone, PartialEq)]
pub struct UnwindClause {
    /// The collection expression.
    pub expression: Expression,
    /// The loop variable.
    pub alias: Identifier,
    /// Source span.
    pub span: Span,
}

/// A FOREACH clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeachClause {
    /// The loop variable.
    pub variable: Identifier,
    /// The list expression.
    pub list: Expression,
    /// The body clauses (updating clauses only).
    pub clauses: Vec<Clause>,
    /// Source span.
    pub span: Span,
}

/// A procedure invocation `CALL name(args) [YIELD out [AS alias], ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallClause {
    /// The dotted procedure name.
    pub name: SmolStr,
    /// Span of the procedure name.
    pub name_span: Span,
    /// Argument expressions.
    pub args: Vec<Expression>,
    /// YIELD projections; each expression is a plain identifier.
    pub yield_items: Vec<Projection>,
    /// Source span.
    pub span: Span,
}

/// A subquery `CALL { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSubqueryClause {
    /// The nested query.
    pub query: Query,
    /// Source span.
    pub span: Span,
}

impl CallSubqueryClause {
    /// Returns true when the subquery's last clause is RETURN.
    pub fn is_returning(&self) -> bool {
        matches!(self.query.clauses.last(), Some(Clause::Return(_)))
    }
}

/// A UNION separator clause.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionClause {
    /// UNION ALL.
    pub all: bool,
    /// Source span.
    pub span: Span,
}

/// A LOAD CSV clause.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadCsvClause {
    /// WITH HEADERS.
    pub with_headers: bool,
    /// The source URI expression.
    pub source: Expression,
    /// The row variable.
    pub alias: Identifier,
    /// Source span.
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clause_kind_names() {
        assert_eq!(ClauseKind::Match.name(), "MATCH");
        assert_eq!(ClauseKind::CallSubquery.name(), "CALL {}");
    }

    #[test]
    fn updating_clauses() {
        assert!(ClauseKind::Create.is_updating());
        assert!(ClauseKind::Foreach.is_updating());
        assert!(!ClauseKind::Match.is_updating());
        assert!(!ClauseKind::With.is_updating());
        assert!(!ClauseKind::Call.is_updating());
    }

    #[test]
    fn projection_column_name() {
        let aliased = Projection {
            expression: Expression::Literal(crate::ast::expression::Literal::Integer(1), 7..8),
            alias: Some(Identifier::new("one", 12..15)),
            span: 7..15,
        };
        assert_eq!(aliased.column_name().unwrap(), "one");

        let bare = Projection {
            expression: Expression::Identifier(Identifier::new("n", 7..8)),
            alias: None,
            span: 7..8,
        };
        assert_eq!(bare.column_name().unwrap(), "n");

        let unnamed = Projection {
            expression: Expression::Literal(crate::ast::expression::Literal::Null, 7..11),
            alias: None,
            span: 7..11,
        };
        assert!(unnamed.column_name().is_none());
    }

    #[test]
    fn shortest_path_elements_look_through() {
        let node = |id: u32| {
            PatternElement::Node(NodePattern {
                id: NodeId(id),
                variable: None,
                labels: vec![],
                properties: None,
                span: 0..0,
            })
        };
        let inner = PatternPath {
            variable: None,
            body: PathBody::Elements(vec![node(0)]),
            span: 0..0,
        };
        let path = PatternPath {
            variable: None,
            body: PathBody::Shortest {
                single: true,
                inner: Box::new(inner),
            },
            span: 0..0,
        };
        assert_eq!(path.elements().len(), 1);
    }
}
