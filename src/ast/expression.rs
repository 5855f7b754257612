//! Expression AST nodes for the Cypher dialect.
//!
//! Expressions cover literals, references, operators, function application,
//! comprehensions and pattern forms. Pattern nodes appearing inside
//! expressions (pattern comprehensions, pattern predicates, shortest paths)
//! reuse the pattern types from [`crate::ast::query`].

use crate::ast::query::PatternPath;
use crate::ast::Span;
use smol_str::SmolStr;

/// A named reference with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// The referenced name.
    pub name: SmolStr,
    /// Source span of the reference.
    pub span: Span,
}

impl Identifier {
    /// Creates a new identifier.
    pub fn new(name: impl Into<SmolStr>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// An integer literal. Kept as source text plus parsed value so range
    /// checks can report the original spelling.
    Integer(i64),
    /// A floating-point literal.
    Float(f64),
    /// A string literal (unescaped).
    String(SmolStr),
    /// A boolean literal.
    Boolean(bool),
    /// The NULL literal.
    Null,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Logical negation.
    Not,
    /// Arithmetic negation.
    Minus,
    /// Unary plus.
    Plus,
    /// `IS NULL` postfix test.
    IsNull,
    /// `IS NOT NULL` postfix test.
    IsNotNull,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Xor,
    In,
    StartsWith,
    EndsWith,
    Contains,
    /// `=~`; recognized by the grammar, rejected by the validator.
    Regex,
}

impl BinaryOperator {
    /// Operator spelling for error messages.
    pub fn name(self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            Modulo => "%",
            Power => "^",
            Equals => "=",
            NotEquals => "<>",
            LessThan => "<",
            LessThanOrEqual => "<=",
            GreaterThan => ">",
            GreaterThanOrEqual => ">=",
            And => "AND",
            Or => "OR",
            Xor => "XOR",
            In => "IN",
            StartsWith => "STARTS WITH",
            EndsWith => "ENDS WITH",
            Contains => "CONTAINS",
            Regex => "=~",
        }
    }
}

/// A function application, e.g. `toUpper(n.name)` or `count(DISTINCT x)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// The (possibly dotted) function name.
    pub name: SmolStr,
    /// DISTINCT argument quantifier.
    pub distinct: bool,
    /// Argument expressions.
    pub args: Vec<Expression>,
    /// Source span.
    pub span: Span,
}

/// A `fn(*)` application. Only `COUNT(*)` survives validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyAll {
    /// The function name.
    pub name: SmolStr,
    /// DISTINCT quantifier (always invalid with `*`).
    pub distinct: bool,
    /// Source span.
    pub span: Span,
}

/// A CASE expression, simple (with a subject) or searched.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpression {
    /// Subject of a simple CASE, absent for the searched form.
    pub subject: Option<Box<Expression>>,
    /// `WHEN condition THEN result` arms.
    pub alternatives: Vec<(Expression, Expression)>,
    /// The ELSE arm.
    pub default: Option<Box<Expression>>,
    /// Source span.
    pub span: Span,
}

/// A list comprehension `[x IN list WHERE pred | eval]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListComprehension {
    /// The loop variable.
    pub variable: Identifier,
    /// The source list expression.
    pub list: Box<Expression>,
    /// Optional filter predicate.
    pub predicate: Option<Box<Expression>>,
    /// Optional projection expression.
    pub eval: Option<Box<Expression>>,
    /// Source span.
    pub span: Span,
}

/// Quantifier kind for predicate comprehensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    Any,
    All,
    None,
    Single,
}

/// A quantified predicate `any(x IN list WHERE pred)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantifier {
    /// Which quantifier.
    pub kind: QuantifierKind,
    /// The loop variable.
    pub variable: Identifier,
    /// The source list expression.
    pub list: Box<Expression>,
    /// The predicate; optional so validation can flag the elided form.
    pub predicate: Option<Box<Expression>>,
    /// Source span.
    pub span: Span,
}

/// A pattern comprehension `[p = (a)-->(b) WHERE pred | eval]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternComprehension {
    /// Optional path variable.
    pub variable: Option<Identifier>,
    /// The pattern to match.
    pub pattern: PatternPath,
    /// Optional filter predicate.
    pub predicate: Option<Box<Expression>>,
    /// The projection expression.
    pub eval: Box<Expression>,
    /// Source span.
    pub span: Span,
}

/// A `reduce(acc = init, x IN list | eval)` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduce {
    /// The accumulator variable.
    pub accumulator: Identifier,
    /// The accumulator's initial value.
    pub init: Box<Expression>,
    /// The loop variable.
    pub variable: Identifier,
    /// The source list expression.
    pub list: Box<Expression>,
    /// The eval expression; optional so validation can report its absence.
    pub eval: Option<Box<Expression>>,
    /// Source span.
    pub span: Span,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value.
    Literal(Literal, Span),
    /// An identifier reference.
    Identifier(Identifier),
    /// A query parameter `$name`.
    Parameter(SmolStr, Span),
    /// Property access `subject.key`.
    Property {
        subject: Box<Expression>,
        key: SmolStr,
        span: Span,
    },
    /// Subscript access `subject[index]`.
    Subscript {
        subject: Box<Expression>,
        index: Box<Expression>,
        span: Span,
    },
    /// Slice access `subject[from..to]`.
    Slice {
        subject: Box<Expression>,
        from: Option<Box<Expression>>,
        to: Option<Box<Expression>>,
        span: Span,
    },
    /// A list literal.
    List(Vec<Expression>, Span),
    /// A map literal.
    Map(Vec<(SmolStr, Expression)>, Span),
    /// A map projection `n {.key, ...}`, rejected by the validator.
    MapProjection(Span),
    /// A unary operation.
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
        span: Span,
    },
    /// A binary operation.
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        span: Span,
    },
    /// A function application.
    FunctionCall(FunctionCall),
    /// A `fn(*)` application.
    ApplyAll(ApplyAll),
    /// A CASE expression.
    Case(CaseExpression),
    /// A list comprehension.
    ListComprehension(ListComprehension),
    /// A quantified predicate.
    Quantifier(Quantifier),
    /// A pattern comprehension.
    PatternComprehension(PatternComprehension),
    /// A reduce expression.
    Reduce(Reduce),
    /// A pattern used as a predicate, e.g. `WHERE (a)-[:R]->()`.
    PatternPredicate(PatternPath),
    /// A legacy construct recognized only to be rejected (FILTER, EXTRACT).
    Legacy(&'static str, Span),
}

impl Expression {
    /// Returns the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expression::Literal(_, span) => span.clone(),
            Expression::Identifier(id) => id.span.clone(),
            Expression::Parameter(_, span) => span.clone(),
            Expression::Property { span, .. } => span.clone(),
            Expression::Subscript { span, .. } => span.clone(),
            Expression::Slice { span, .. } => span.clone(),
            Expression::List(_, span) => span.clone(),
            Expression::Map(_, span) => span.clone(),
            Expression::MapProjection(span) => span.clone(),
            Expression::Unary { span, .. } => span.clone(),
            Expression::Binary { span, .. } => span.clone(),
            Expression::FunctionCall(call) => call.span.clone(),
            Expression::ApplyAll(apply) => apply.span.clone(),
            Expression::Case(case) => case.span.clone(),
            Expression::ListComprehension(comp) => comp.span.clone(),
            Expression::Quantifier(q) => q.span.clone(),
            Expression::PatternComprehension(comp) => comp.span.clone(),
            Expression::Reduce(reduce) => reduce.span.clone(),
            Expression::PatternPredicate(path) => path.span.clone(),
            Expression::Legacy(_, span) => span.clone(),
        }
    }

    /// Returns the identifier if this expression is a plain reference.
    pub fn as_identifier(&self) -> Option<&Identifier> {
        match self {
            Expression::Identifier(id) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_identifier_only_for_references() {
        let id = Expression::Identifier(Identifier::new("n", 0..1));
        assert_eq!(id.as_identifier().unwrap().name, "n");

        let lit = Expression::Literal(Literal::Integer(1), 0..1);
        assert!(lit.as_identifier().is_none());
    }

    #[test]
    fn spans_propagate() {
        let call = Expression::FunctionCall(FunctionCall {
            name: "count".into(),
            distinct: false,
            args: vec![],
            span: 3..11,
        });
        assert_eq!(call.span(), 3..11);
    }

    #[test]
    fn operator_names() {
        assert_eq!(BinaryOperator::Regex.name(), "=~");
        assert_eq!(BinaryOperator::StartsWith.name(), "STARTS WITH");
    }
}
