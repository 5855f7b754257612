//! Recursive-descent parser for Cypher queries.
//!
//! The parser consumes the token stream produced by the lexer and constructs
//! a clause-list AST. It runs in single-statement mode: one statement is
//! parsed, and the [`ParseResult::eof`] flag records whether the whole input
//! was consumed. Comment roots are surfaced alongside the statement so the
//! builder can skip them.

mod clauses;
mod expressions;
mod patterns;

use crate::ast::query::{NodeId, Query};
use crate::ast::Span;
use crate::diag::Diag;
use crate::lexer::token::{Token, TokenKind};
use crate::lexer::Lexer;
use smol_str::SmolStr;

/// The body of a statement root.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementBody {
    /// A regular query.
    Query(Query),
    /// A constraint command; recognized so the pipeline can reject it with a
    /// dedicated error.
    Constraint(Span),
    /// An administrative statement the front-end does not handle.
    Unsupported { kind: &'static str, span: Span },
}

/// A parse root. Only statement roots are queries; comment roots are
/// skipped by the AST builder.
#[derive(Debug, Clone, PartialEq)]
pub enum Root {
    /// A statement.
    Statement(StatementBody),
    /// A comment appearing outside any statement.
    Comment(Span),
}

/// Result of parsing a query in single-statement mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    /// The parse roots: comments and at most one statement.
    pub roots: Vec<Root>,
    /// Diagnostics from the lexer and parser.
    pub diagnostics: Vec<Diag>,
    /// True when the parser consumed the entire input.
    pub eof: bool,
}

impl ParseResult {
    /// Number of roots.
    pub fn nroots(&self) -> usize {
        self.roots.len()
    }

    /// The i-th root.
    pub fn get_root(&self, i: usize) -> Option<&Root> {
        self.roots.get(i)
    }

    /// True when any error-severity diagnostic was produced.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == crate::diag::DiagSeverity::Error)
    }
}

/// Parses query text in single-statement mode.
pub fn parse(source: &str) -> ParseResult {
    let lexed = Lexer::new(source).tokenize();
    let mut roots: Vec<Root> = lexed.comments.into_iter().map(Root::Comment).collect();

    if !lexed.diagnostics.is_empty() {
        return ParseResult {
            roots,
            diagnostics: lexed.diagnostics,
            eof: true,
        };
    }

    // comment-only input has no statement tokens
    if lexed.tokens.len() == 1 {
        return ParseResult {
            roots,
            diagnostics: Vec::new(),
            eof: true,
        };
    }

    let mut parser = Parser::new(lexed.tokens);
    match parser.parse_statement() {
        Ok(body) => roots.push(Root::Statement(body)),
        Err(ParseAbort) => {}
    }
    let eof = parser.at(TokenKind::Eof);

    ParseResult {
        roots,
        diagnostics: parser.diagnostics,
        eof,
    }
}

/// Marker for an aborted parse; the diagnostic was already recorded.
pub(crate) struct ParseAbort;

/// Internal result alias for parser methods.
pub(crate) type PResult<T> = Result<T, ParseAbort>;

/// The Cypher parser.
pub(crate) struct Parser {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: Vec<Diag>,
    next_node_id: u32,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
            next_node_id: 0,
        }
    }

    /// Parses one statement: a constraint command or a clause-list query.
    fn parse_statement(&mut self) -> PResult<StatementBody> {
        // constraint and index DDL are recognized up front and rejected
        // downstream
        if self.at(TokenKind::Create) || self.at(TokenKind::Drop) {
            let second = self.peek_kind(1);
            if second == TokenKind::Constraint || second == TokenKind::Index {
                let start = self.peek().span.start;
                while !self.at(TokenKind::Eof) && !self.at(TokenKind::Semicolon) {
                    self.advance();
                }
                let span = start..self.prev_end();
                return Ok(if second == TokenKind::Constraint {
                    StatementBody::Constraint(span)
                } else {
                    StatementBody::Unsupported {
                        kind: "index management",
                        span,
                    }
                });
            }
        }

        let query = self.parse_query_body(None)?;
        Ok(StatementBody::Query(query))
    }

    // ------------------------------------------------------------------
    // token navigation
    // ------------------------------------------------------------------

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.current + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!("expected {}", what)))
        }
    }

    /// Accepts an identifier or any keyword usable as a plain name (labels,
    /// property keys, function names).
    pub(crate) fn expect_name(&mut self, what: &str) -> PResult<(SmolStr, Span)> {
        let token = self.peek().clone();
        if token.kind == TokenKind::Identifier || token.kind.is_keyword() {
            self.advance();
            Ok((token.text, token.span))
        } else {
            Err(self.error_here(format!("expected {}", what)))
        }
    }

    pub(crate) fn error_here(&mut self, message: impl Into<String>) -> ParseAbort {
        let span = self.peek().span.clone();
        let span = if span.is_empty() {
            span.start..span.start + 1
        } else {
            span
        };
        self.diagnostics
            .push(Diag::error(message).with_label(span, "here"));
        ParseAbort
    }

    /// End offset of the most recently consumed token.
    pub(crate) fn prev_end(&self) -> usize {
        if self.current == 0 {
            0
        } else {
            self.tokens[self.current - 1].span.end
        }
    }

    /// Saves the cursor for backtracking.
    pub(crate) fn save(&self) -> (usize, usize) {
        (self.current, self.diagnostics.len())
    }

    /// Restores a saved cursor, discarding diagnostics recorded since.
    pub(crate) fn restore(&mut self, saved: (usize, usize)) {
        self.current = saved.0;
        self.diagnostics.truncate(saved.1);
    }

    /// Allocates a stable id for a pattern entity.
    pub(crate) fn fresh_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    /// True when the current token starts a new top-level clause (or ends
    /// the clause list).
    pub(crate) fn at_clause_boundary(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Match
                | TokenKind::Optional
                | TokenKind::Create
                | TokenKind::Merge
                | TokenKind::Delete
                | TokenKind::Detach
                | TokenKind::Set
                | TokenKind::Remove
                | TokenKind::With
                | TokenKind::Return
                | TokenKind::Unwind
                | TokenKind::Foreach
                | TokenKind::Call
                | TokenKind::Union
                | TokenKind::Load
                | TokenKind::Start
                | TokenKind::Using
                | TokenKind::Eof
                | TokenKind::Semicolon
                | TokenKind::RBrace
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::query::{Clause, ClauseKind};

    fn parse_query(source: &str) -> Query {
        let result = parse(source);
        assert!(
            !result.has_errors(),
            "unexpected diagnostics for `{source}`: {:?}",
            result.diagnostics
        );
        let statement = result
            .roots
            .iter()
            .find_map(|root| match root {
                Root::Statement(StatementBody::Query(query)) => Some(query.clone()),
                _ => None,
            })
            .expect("expected a statement root");
        statement
    }

    fn kinds(source: &str) -> Vec<ClauseKind> {
        parse_query(source).clauses.iter().map(Clause::kind).collect()
    }

    #[test]
    fn simple_match_return() {
        assert_eq!(
            kinds("MATCH (n) RETURN n"),
            vec![ClauseKind::Match, ClauseKind::Return]
        );
    }

    #[test]
    fn single_statement_mode_flags_trailing_input() {
        let result = parse("RETURN 1; RETURN 2");
        assert!(!result.has_errors());
        assert!(!result.eof);
    }

    #[test]
    fn comment_roots_are_kept() {
        let result = parse("// hello\nMATCH (n) RETURN n");
        assert_eq!(result.nroots(), 2);
        assert!(matches!(result.get_root(0), Some(Root::Comment(_))));
        assert!(matches!(result.get_root(1), Some(Root::Statement(_))));
    }

    #[test]
    fn comment_only_input_has_no_statement() {
        let result = parse("/* nothing here */");
        assert!(!result.has_errors());
        assert_eq!(result.nroots(), 1);
        assert!(matches!(result.get_root(0), Some(Root::Comment(_))));
    }

    #[test]
    fn constraint_commands_are_tagged() {
        let result = parse("CREATE CONSTRAINT ON (p:Person) ASSERT p.id IS UNIQUE");
        assert!(matches!(
            result.get_root(0),
            Some(Root::Statement(StatementBody::Constraint(_)))
        ));
    }

    #[test]
    fn full_clause_inventory() {
        assert_eq!(
            kinds(
                "MATCH (a) UNWIND [1,2] AS x FOREACH (i IN [1] | SET a.v = i) \
                 WITH a CALL db.labels() YIELD label RETURN a, label"
            ),
            vec![
                ClauseKind::Match,
                ClauseKind::Unwind,
                ClauseKind::Foreach,
                ClauseKind::With,
                ClauseKind::Call,
                ClauseKind::Return,
            ]
        );
    }

    #[test]
    fn union_chain() {
        assert_eq!(
            kinds("MATCH (a) RETURN a UNION ALL MATCH (a) RETURN a"),
            vec![
                ClauseKind::Match,
                ClauseKind::Return,
                ClauseKind::Union,
                ClauseKind::Match,
                ClauseKind::Return,
            ]
        );
    }
}
