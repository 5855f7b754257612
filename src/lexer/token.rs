//! Token types for Cypher lexical analysis.

use crate::ast::Span;
use smol_str::SmolStr;
use std::fmt;

/// The kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Clause keywords
    Match,
    Optional,
    Create,
    Merge,
    Delete,
    Detach,
    Set,
    Remove,
    With,
    Return,
    Unwind,
    Foreach,
    Call,
    Yield,
    Union,
    Where,
    Order,
    By,
    Asc,
    Desc,
    Skip,
    Limit,
    As,
    Distinct,
    On,
    Load,
    Csv,
    From,
    Headers,

    // Legacy / administrative keywords, recognized so the validator can
    // reject them with a dedicated error
    Start,
    Using,
    Index,
    Scan,
    Join,
    Periodic,
    Commit,
    Constraint,
    Drop,

    // Operators that are keywords
    And,
    Or,
    Xor,
    Not,
    In,
    Is,
    Starts,
    Ends,
    Contains,

    // Literal keywords
    Null,
    True,
    False,

    // CASE expression keywords
    Case,
    When,
    Then,
    Else,
    End,

    // Literals and names
    Integer,
    Float,
    String,
    Identifier,
    Parameter,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    DotDot,
    Colon,
    Semicolon,
    Pipe,

    // Operators
    Plus,
    PlusEq,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    RegexMatch,

    /// End of input.
    Eof,
}

impl TokenKind {
    /// Returns true for keyword kinds, which the parser may accept as plain
    /// names in identifier position (labels, property keys, function names).
    pub fn is_keyword(self) -> bool {
        !matches!(
            self,
            TokenKind::Integer
                | TokenKind::Float
                | TokenKind::String
                | TokenKind::Identifier
                | TokenKind::Parameter
                | TokenKind::LParen
                | TokenKind::RParen
                | TokenKind::LBracket
                | TokenKind::RBracket
                | TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::Comma
                | TokenKind::Dot
                | TokenKind::DotDot
                | TokenKind::Colon
                | TokenKind::Semicolon
                | TokenKind::Pipe
                | TokenKind::Plus
                | TokenKind::PlusEq
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Caret
                | TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::LtEq
                | TokenKind::GtEq
                | TokenKind::RegexMatch
                | TokenKind::Eof
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A lexical token with its source span and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// The span in source text.
    pub span: Span,
    /// The token text. For string literals this is the unescaped content;
    /// for parameters the name without the `$` sigil; for backtick-quoted
    /// identifiers the name without the backticks.
    pub text: SmolStr,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, span: Span, text: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            span,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_classification() {
        assert!(TokenKind::Match.is_keyword());
        assert!(TokenKind::Contains.is_keyword());
        assert!(!TokenKind::Identifier.is_keyword());
        assert!(!TokenKind::LParen.is_keyword());
        assert!(!TokenKind::Eof.is_keyword());
    }

    #[test]
    fn token_carries_text() {
        let tok = Token::new(TokenKind::Identifier, 0..3, "abc");
        assert_eq!(tok.text, "abc");
        assert_eq!(tok.span, 0..3);
    }
}
