//! AST foundation types and node structures.

pub mod annotations;
pub mod expression;
pub mod handle;
pub mod query;
mod span;
pub mod visitor;

// Re-export span types
pub use span::{merge_spans, Span};

// Re-export the shared handle
pub use handle::{clause_contains_aggregation, Ast};

// Re-export expression types
pub use expression::{
    ApplyAll, BinaryOperator, CaseExpression, Expression, FunctionCall, Identifier,
    ListComprehension, Literal, PatternComprehension, Quantifier, QuantifierKind, Reduce,
    UnaryOperator,
};

// Re-export clause and pattern types
pub use query::{
    CallClause, CallSubqueryClause, Clause, ClauseKind, CreateClause, DeleteClause, Direction,
    ForeachClause, LoadCsvClause, MatchClause, MergeAction, MergeActionKind, MergeClause, NodeId,
    NodePattern, PathBody, Pattern, PatternElement, PatternPath, Projection, ProjectionClause,
    Query, RelPattern, RemoveClause, RemoveItem, SetClause, SetItem, SortItem, UnionClause,
    UnwindClause, VarLengthRange,
};

// Re-export visitor infrastructure
pub use visitor::{walk_clause, walk_expression, walk_pattern, ExpressionVisitor, Flow, Strategy};
