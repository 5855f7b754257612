//! Cypher query-language front-end for a property-graph engine.
//!
//! The crate implements the pipeline that takes raw query text, parses it
//! into an AST, rewrites the AST into a canonical form, and validates it
//! under scoping and semantic rules, producing a shared [`Ast`] handle a
//! downstream planner can consume:
//!
//! ```
//! use cypher_frontend::Frontend;
//!
//! let frontend = Frontend::default();
//! let ast = frontend.prepare("MATCH (n:Person) RETURN n.name").unwrap();
//! assert_eq!(ast.clause_count(), 2);
//! ```
//!
//! Failures surface as [`QueryError`] values carrying a stable code and a
//! formatted message:
//!
//! ```
//! use cypher_frontend::Frontend;
//!
//! let err = frontend_err("MATCH (a) RETURN b");
//! assert_eq!(err.code(), "NotDefined");
//!
//! fn frontend_err(q: &str) -> cypher_frontend::QueryError {
//!     Frontend::default().prepare(q).unwrap_err()
//! }
//! ```

pub mod ast;
pub mod diag;
pub mod error;
pub mod lexer;
pub mod params;
pub mod parser;
pub mod procedures;
pub mod rewrite;
pub mod validate;

use crate::ast::query::Query;
use crate::ast::Ast;
use crate::diag::SourceFile;
use crate::error::Result;
use crate::params::Params;
use crate::parser::{ParseResult, Root, StatementBody};
use crate::procedures::{
    BuiltinFunctions, FunctionRegistry, InMemoryProcedureRegistry, ProcedureRegistry,
};
use crate::validate::Validator;
use std::sync::Arc;

pub use crate::ast::{Clause, ClauseKind};
pub use crate::error::QueryError;
pub use crate::error::QueryError as Error;

/// The query front-end: registries plus the parse → validate → rewrite →
/// build pipeline.
#[derive(Clone)]
pub struct Frontend {
    procedures: Arc<dyn ProcedureRegistry>,
    functions: Arc<dyn FunctionRegistry>,
}

impl Default for Frontend {
    fn default() -> Self {
        Self {
            procedures: Arc::new(InMemoryProcedureRegistry::with_builtins()),
            functions: Arc::new(BuiltinFunctions),
        }
    }
}

impl Frontend {
    /// Creates a front-end over the given registries.
    pub fn new(
        procedures: Arc<dyn ProcedureRegistry>,
        functions: Arc<dyn FunctionRegistry>,
    ) -> Self {
        Self {
            procedures,
            functions,
        }
    }

    /// The procedure registry consulted by validation.
    pub fn procedures(&self) -> &dyn ProcedureRegistry {
        &*self.procedures
    }

    /// The arithmetic-function registry consulted by validation.
    pub fn functions(&self) -> &dyn FunctionRegistry {
        &*self.functions
    }

    /// Runs the full pipeline over query text, producing the master AST
    /// handle of a validated, canonicalized query.
    pub fn prepare(&self, query_text: &str) -> Result<Ast> {
        // trailing semicolons are not part of the statement
        let text = query_text.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
        if text.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        tracing::debug!(len = text.len(), "parsing query");
        let parsed = parser::parse(text);
        let mut query = self.select_statement(parsed, text)?;

        let validator = Validator::new(&*self.procedures, &*self.functions, text);
        validator.validate_query(&query)?;

        // canonicalize; any rewrite invalidates the previous verdict
        let mut rewritten = rewrite::compact_clauses(&mut query);
        rewritten |= rewrite::rewrite_call_subqueries(&mut query);
        rewritten |= rewrite::expand_star_projections(&mut query);
        if rewritten {
            tracing::debug!("query rewritten, re-validating");
            validator.validate_query(&query)?;
        }

        Ok(Ast::build(query, text.to_string()))
    }

    /// Strips a `CYPHER name=value ...` prefix, then runs [`Self::prepare`]
    /// on the remaining body.
    pub fn prepare_with_params(&self, query_text: &str) -> Result<(Params, Ast)> {
        let (params, body) = params::strip_parameters(query_text)?;
        let ast = self.prepare(body)?;
        Ok((params, ast))
    }

    /// Selects the single statement root: comments are skipped, a missing
    /// statement is an empty query, and non-query statements are rejected.
    fn select_statement(&self, parsed: ParseResult, text: &str) -> Result<Query> {
        if parsed.has_errors() {
            return Err(parse_error(&parsed, text));
        }
        if !parsed.eof {
            return Err(QueryError::MultipleStatements);
        }

        for root in parsed.roots {
            match root {
                Root::Comment(_) => continue,
                Root::Statement(StatementBody::Constraint(_)) => {
                    return Err(QueryError::InvalidConstraintCommand);
                }
                Root::Statement(StatementBody::Unsupported { kind, .. }) => {
                    return Err(QueryError::UnsupportedQueryType(kind.to_string()));
                }
                Root::Statement(StatementBody::Query(query)) => return Ok(query),
            }
        }

        Err(QueryError::EmptyQuery)
    }
}

/// Converts the first parser diagnostic into the caller-facing error,
/// with line, column, offset and a context slice.
fn parse_error(parsed: &ParseResult, text: &str) -> QueryError {
    let source = SourceFile::new(text);
    let diag = parsed
        .diagnostics
        .iter()
        .find(|d| d.severity == diag::DiagSeverity::Error);
    let Some(diag) = diag else {
        return QueryError::EmptyQuery;
    };

    let offset = diag.primary_span().map(|s| s.start).unwrap_or(0);
    let (line, column) = source.line_column(offset);
    let (context, context_offset) = source.context(offset);
    QueryError::Parser {
        message: diag.message.clone(),
        line,
        column,
        offset,
        context: context.to_string(),
        context_offset,
    }
}
