//! Error taxonomy for the query front-end.
//!
//! Every failure in the parse → rewrite → validate pipeline is expressed as a
//! [`QueryError`]. The first error encountered wins: handlers propagate it
//! with `?` and the walk unwinds without visiting further nodes.

use smol_str::SmolStr;
use std::fmt;

/// A front-end error: parse failure, structural violation, or semantic
/// validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    // -- parse ---------------------------------------------------------------
    /// The lexer or parser rejected the input.
    Parser {
        message: String,
        line: usize,
        column: usize,
        offset: usize,
        context: String,
        context_offset: usize,
    },
    /// The query contained no statement.
    EmptyQuery,
    /// More than one statement was supplied.
    MultipleStatements,
    /// The statement root is not a query (e.g. an administrative command).
    UnsupportedQueryType(String),
    /// Constraint commands are handled outside the query pipeline.
    InvalidConstraintCommand,

    // -- structure -----------------------------------------------------------
    /// The query concludes with a clause that cannot terminate it.
    InvalidLastClause(String),
    /// A clause other than UNION follows RETURN.
    UnexpectedClauseFollowingReturn,
    /// The query opens with a star projection.
    QueryCannotBeginWith(&'static str),
    /// A reading clause follows an updating clause without a WITH boundary.
    MissingWith(String),
    /// A MATCH follows an OPTIONAL MATCH in the same scope.
    MissingWithAfterOptionalMatch,

    // -- patterns ------------------------------------------------------------
    /// A created or merged relationship does not carry exactly one type.
    OneRelationshipType(&'static str),
    /// CREATE requires directed relationships.
    CreateDirectedRelationship,
    /// Variable-length relationships are not allowed in this clause.
    VarLen(&'static str),
    /// A variable-length range with minimum above maximum.
    VarLenInvalidRange,
    /// Inline properties were not a literal map.
    UnhandledTypeInlineProperties,
    /// shortestPath endpoints must already be bound.
    ShortestPathBoundNodes,
    /// allShortestPaths requires a minimal length of 1.
    AllShortestPathMinimalLength,
    /// allShortestPaths appeared outside a MATCH pattern.
    AllShortestPathSupport,
    /// shortestPath appeared inside a MATCH pattern.
    ShortestPathSupport,

    // -- scoping -------------------------------------------------------------
    /// A referenced identifier is not in scope.
    NotDefined(SmolStr),
    /// An identifier was declared more than once.
    VariableAlreadyDeclared(SmolStr),
    /// A subquery return collides with an outer-scope identifier.
    VariableAlreadyDeclaredInOuterScope(SmolStr),
    /// The same alias was used for both a node and a relationship.
    SameAliasNodeAndRelationship(SmolStr),
    /// The same relationship alias appeared in multiple patterns.
    SameAliasMultiplePatterns(SmolStr),
    /// A bound entity was redeclared in an updating clause.
    Redeclare {
        kind: &'static str,
        name: SmolStr,
        clause: &'static str,
    },
    /// A WITH projection of a non-identifier carries no alias.
    WithProjectionMissingAlias,
    /// Two result columns share a name.
    SameResultColumnName,

    // -- procedures & functions ----------------------------------------------
    /// CALL names a procedure the registry does not know.
    ProcedureNotRegistered(SmolStr),
    /// CALL argument count does not match the procedure signature.
    ProcedureInvalidArguments {
        name: SmolStr,
        expected: usize,
        given: usize,
    },
    /// YIELD names an output the procedure does not declare.
    ProcedureInvalidOutput { name: SmolStr, output: SmolStr },
    /// A function name the registry does not know.
    UnknownFunction(SmolStr),
    /// An aggregation function outside WITH/RETURN.
    InvalidUseOfAggregation(SmolStr),
    /// `*` as an argument to a function other than COUNT.
    InvalidUsageOfStarParameter,
    /// `DISTINCT *` is never legal.
    InvalidUsageOfDistinctStar,

    // -- unions & subqueries -------------------------------------------------
    /// A UNION chain is missing RETURN clauses.
    UnionMissingReturns { unions: usize, returns: usize },
    /// RETURNs flanking a UNION project different column names.
    UnionMismatchedReturns,
    /// UNION and UNION ALL were mixed in one scope.
    UnionCombination,
    /// A subquery import list is not a set of simple references.
    CallSubqueryInvalidReferences,

    // -- miscellaneous -------------------------------------------------------
    /// LIMIT must be an integer literal or parameter.
    LimitMustBeNonNegative,
    /// SKIP must be an integer literal or parameter.
    SkipMustBeNonNegative,
    /// DELETE was applied to an unsupported expression.
    DeleteInvalidArguments,
    /// REMOVE target is not `identifier.property`.
    RemoveInvalidInput,
    /// SET property left-hand side is not a plain identifier.
    SetLhsNonAlias,
    /// reduce(...) is missing its eval expression.
    MissingEvalExpInReduce,
    /// FOREACH body contained a non-updating clause.
    ForeachInvalidBody,
    /// A construct the front-end does not support.
    UnsupportedAstNodeType(&'static str),
    /// An operator the front-end does not support.
    UnsupportedOperator(&'static str),
}

impl QueryError {
    /// A stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        use QueryError::*;
        match self {
            Parser { .. } => "ParserError",
            EmptyQuery => "EmptyQuery",
            MultipleStatements => "MultipleStatements",
            UnsupportedQueryType(_) => "UnsupportedQueryType",
            InvalidConstraintCommand => "InvalidConstraintCommand",
            InvalidLastClause(_) => "InvalidLastClause",
            UnexpectedClauseFollowingReturn => "UnexpectedClauseFollowingReturn",
            QueryCannotBeginWith(_) => "QueryCannotBeginWith",
            MissingWith(_) => "MissingWith",
            MissingWithAfterOptionalMatch => "MissingWithAfterOptionalMatch",
            OneRelationshipType(_) => "OneRelationshipType",
            CreateDirectedRelationship => "CreateDirectedRelationship",
            VarLen(_) => "VarLen",
            VarLenInvalidRange => "VarLenInvalidRange",
            UnhandledTypeInlineProperties => "UnhandledTypeInlineProperties",
            ShortestPathBoundNodes => "ShortestPathBoundNodes",
            AllShortestPathMinimalLength => "AllShortestPathMinimalLength",
            AllShortestPathSupport => "AllShortestPathSupport",
            ShortestPathSupport => "ShortestPathSupport",
            NotDefined(_) => "NotDefined",
            VariableAlreadyDeclared(_) => "VariableAlreadyDeclared",
            VariableAlreadyDeclaredInOuterScope(_) => "VariableAlreadyDeclaredInOuterScope",
            SameAliasNodeAndRelationship(_) => "SameAliasNodeAndRelationship",
            SameAliasMultiplePatterns(_) => "SameAliasMultiplePatterns",
            Redeclare { .. } => "Redeclare",
            WithProjectionMissingAlias => "WithProjectionMissingAlias",
            SameResultColumnName => "SameResultColumnName",
            ProcedureNotRegistered(_) => "ProcedureNotRegistered",
            ProcedureInvalidArguments { .. } => "ProcedureInvalidArguments",
            ProcedureInvalidOutput { .. } => "ProcedureInvalidOutput",
            UnknownFunction(_) => "UnknownFunction",
            InvalidUseOfAggregation(_) => "InvalidUseOfAggregation",
            InvalidUsageOfStarParameter => "InvalidUsageOfStarParameter",
            InvalidUsageOfDistinctStar => "InvalidUsageOfDistinctStar",
            UnionMissingReturns { .. } => "UnionMissingReturns",
            UnionMismatchedReturns => "UnionMismatchedReturns",
            UnionCombination => "UnionCombination",
            CallSubqueryInvalidReferences => "CallSubqueryInvalidReferences",
            LimitMustBeNonNegative => "LimitMustBeNonNegative",
            SkipMustBeNonNegative => "SkipMustBeNonNegative",
            DeleteInvalidArguments => "DeleteInvalidArguments",
            RemoveInvalidInput => "RemoveInvalidInput",
            SetLhsNonAlias => "SetLhsNonAlias",
            MissingEvalExpInReduce => "MissingEvalExpInReduce",
            ForeachInvalidBody => "ForeachInvalidBody",
            UnsupportedAstNodeType(_) => "UnsupportedASTNodeType",
            UnsupportedOperator(_) => "UnsupportedOperator",
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use QueryError::*;
        match self {
            Parser {
                message,
                line,
                column,
                offset,
                context,
                context_offset,
            } => write!(
                f,
                "{} line: {}, column: {}, offset: {} errCtx: {} errCtxOffset: {}",
                message, line, column, offset, context, context_offset
            ),
            EmptyQuery => write!(f, "Error: empty query."),
            MultipleStatements => {
                write!(f, "Error: query with more than one statement is not supported.")
            }
            UnsupportedQueryType(kind) => {
                write!(f, "Encountered unsupported query type '{}'", kind)
            }
            InvalidConstraintCommand => {
                write!(f, "Invalid constraint command, expected a query")
            }
            InvalidLastClause(kind) => {
                write!(f, "Query cannot conclude with {} (must be a RETURN clause, an update clause, a procedure call or a non-returning subquery)", kind)
            }
            UnexpectedClauseFollowingReturn => {
                write!(f, "Unexpected clause following RETURN, expected UNION")
            }
            QueryCannotBeginWith(kind) => {
                write!(f, "Query cannot begin with a {} * projection", kind)
            }
            MissingWith(kind) => {
                write!(
                    f,
                    "A WITH clause is required to introduce {} after an updating clause",
                    kind
                )
            }
            MissingWithAfterOptionalMatch => {
                write!(
                    f,
                    "A WITH clause is required to introduce MATCH after OPTIONAL MATCH"
                )
            }
            OneRelationshipType(clause) => {
                write!(
                    f,
                    "Exactly one relationship type must be specified for {}",
                    clause
                )
            }
            CreateDirectedRelationship => {
                write!(f, "Only directed relationships are supported in CREATE")
            }
            VarLen(clause) => {
                write!(
                    f,
                    "Variable length relationships cannot be used in {}",
                    clause
                )
            }
            VarLenInvalidRange => write!(
                f,
                "Variable length path, maximum number of hops must be greater or equal to minimum number of hops"
            ),
            UnhandledTypeInlineProperties => {
                write!(f, "Encountered unhandled type in inlined properties")
            }
            ShortestPathBoundNodes => write!(
                f,
                "Source and destination must already be resolved to call shortestPath"
            ),
            AllShortestPathMinimalLength => write!(
                f,
                "allShortestPaths(...) does not support a minimal length different from 1"
            ),
            AllShortestPathSupport => {
                write!(f, "allShortestPaths is only supported within a MATCH pattern")
            }
            ShortestPathSupport => {
                write!(f, "shortestPath is not supported within a MATCH pattern")
            }
            NotDefined(name) => write!(f, "'{}' not defined", name),
            VariableAlreadyDeclared(name) => {
                write!(f, "Variable `{}` already declared", name)
            }
            VariableAlreadyDeclaredInOuterScope(name) => {
                write!(f, "Variable `{}` already declared in outer scope", name)
            }
            SameAliasNodeAndRelationship(name) => write!(
                f,
                "The alias '{}' was specified for both a node and a relationship",
                name
            ),
            SameAliasMultiplePatterns(name) => write!(
                f,
                "Cannot use the same relationship variable '{}' for multiple patterns",
                name
            ),
            Redeclare { kind, name, clause } => write!(
                f,
                "The bound {} '{}' can't be redeclared in a {} clause",
                kind, name, clause
            ),
            WithProjectionMissingAlias => {
                write!(f, "WITH clause projections must be aliased")
            }
            SameResultColumnName => write!(
                f,
                "Error: Multiple result columns with the same name are not supported."
            ),
            ProcedureNotRegistered(name) => {
                write!(f, "Procedure `{}` is not registered", name)
            }
            ProcedureInvalidArguments {
                name,
                expected,
                given,
            } => write!(
                f,
                "Procedure `{}` requires {} arguments, got {}",
                name, expected, given
            ),
            ProcedureInvalidOutput { name, output } => {
                write!(f, "Procedure `{}` does not yield output `{}`", name, output)
            }
            UnknownFunction(name) => write!(f, "Unknown function '{}'", name),
            InvalidUseOfAggregation(name) => {
                write!(f, "Invalid use of aggregating function '{}'", name)
            }
            InvalidUsageOfStarParameter => write!(
                f,
                "COUNT is the only function which can accept * as an argument"
            ),
            InvalidUsageOfDistinctStar => {
                write!(f, "Cannot use DISTINCT with * as an argument")
            }
            UnionMissingReturns { unions, returns } => write!(
                f,
                "Found {} UNION clauses but only {} RETURN clauses",
                unions, returns
            ),
            UnionMismatchedReturns => write!(
                f,
                "All sub queries in a UNION must have the same column names"
            ),
            UnionCombination => write!(f, "Invalid combination of UNION and UNION ALL."),
            CallSubqueryInvalidReferences => write!(
                f,
                "WITH imports in CALL {{}} must consist of only simple references to outside variables"
            ),
            LimitMustBeNonNegative => write!(
                f,
                "LIMIT specified value of invalid type, must be a positive integer"
            ),
            SkipMustBeNonNegative => write!(
                f,
                "SKIP specified value of invalid type, must be a positive integer"
            ),
            DeleteInvalidArguments => write!(
                f,
                "DELETE can only be called on nodes, paths and relationships"
            ),
            RemoveInvalidInput => write!(
                f,
                "REMOVE expects each property removal target to be identifier.property"
            ),
            SetLhsNonAlias => write!(
                f,
                "SET clause expects a plain identifier as its left-hand side"
            ),
            MissingEvalExpInReduce => {
                write!(f, "reduce(...) requires an eval expression")
            }
            ForeachInvalidBody => {
                write!(f, "Error: Only updating clauses may reside in FOREACH")
            }
            UnsupportedAstNodeType(kind) => {
                write!(f, "{} is not currently supported", kind)
            }
            UnsupportedOperator(op) => {
                write!(f, "The {} operator is not currently supported", op)
            }
        }
    }
}

impl std::error::Error for QueryError {}

/// Front-end result alias.
pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(QueryError::EmptyQuery.code(), "EmptyQuery");
        assert_eq!(
            QueryError::NotDefined("a".into()).code(),
            "NotDefined"
        );
        assert_eq!(
            QueryError::UnsupportedAstNodeType("START").code(),
            "UnsupportedASTNodeType"
        );
    }

    #[test]
    fn messages_carry_names() {
        let err = QueryError::Redeclare {
            kind: "variable",
            name: "a".into(),
            clause: "CREATE",
        };
        assert_eq!(
            err.to_string(),
            "The bound variable 'a' can't be redeclared in a CREATE clause"
        );

        let err = QueryError::ProcedureInvalidArguments {
            name: "db.labels".into(),
            expected: 0,
            given: 2,
        };
        assert!(err.to_string().contains("db.labels"));
        assert!(err.to_string().contains("got 2"));
    }
}
