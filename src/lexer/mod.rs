//! Lexical analysis for Cypher.
//!
//! The lexer converts query text into a stream of tokens, skipping comments
//! but recording their spans so the parser can surface comment-only roots.
//! Scanning continues after errors so diagnostics are comprehensive.

pub mod keywords;
pub mod token;

use crate::ast::Span;
use crate::diag::Diag;
use keywords::keyword_kind;
use smol_str::SmolStr;
use token::{Token, TokenKind};

/// Result of lexical analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct LexerResult {
    /// The tokens produced, including an EOF token at the end.
    pub tokens: Vec<Token>,
    /// Spans of comments encountered while scanning.
    pub comments: Vec<Span>,
    /// Diagnostics encountered during lexing.
    pub diagnostics: Vec<Diag>,
}

/// A lexical analyzer for Cypher query text.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    comments: Vec<Span>,
    diagnostics: Vec<Diag>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given source text.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            tokens: Vec::new(),
            comments: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Tokenizes the source text and returns the result.
    pub fn tokenize(mut self) -> LexerResult {
        while !self.is_at_end() {
            self.skip_whitespace_and_comments();
            if self.is_at_end() {
                break;
            }
            self.scan_token();
        }

        let eof = self.source.len();
        self.tokens.push(Token::new(TokenKind::Eof, eof..eof, ""));

        LexerResult {
            tokens: self.tokens,
            comments: self.comments,
            diagnostics: self.diagnostics,
        }
    }

    fn scan_token(&mut self) {
        let start = self.pos;
        let ch = self.advance();

        match ch {
            '(' => self.push(TokenKind::LParen, start),
            ')' => self.push(TokenKind::RParen, start),
            '[' => self.push(TokenKind::LBracket, start),
            ']' => self.push(TokenKind::RBracket, start),
            '{' => self.push(TokenKind::LBrace, start),
            '}' => self.push(TokenKind::RBrace, start),
            ',' => self.push(TokenKind::Comma, start),
            ';' => self.push(TokenKind::Semicolon, start),
            ':' => self.push(TokenKind::Colon, start),
            '|' => self.push(TokenKind::Pipe, start),
            '-' => self.push(TokenKind::Minus, start),
            '*' => self.push(TokenKind::Star, start),
            '/' => self.push(TokenKind::Slash, start),
            '%' => self.push(TokenKind::Percent, start),
            '^' => self.push(TokenKind::Caret, start),
            '+' => {
                if self.match_char('=') {
                    self.push(TokenKind::PlusEq, start);
                } else {
                    self.push(TokenKind::Plus, start);
                }
            }
            '.' => {
                if self.match_char('.') {
                    self.push(TokenKind::DotDot, start);
                } else {
                    self.push(TokenKind::Dot, start);
                }
            }
            '=' => {
                if self.match_char('~') {
                    self.push(TokenKind::RegexMatch, start);
                } else {
                    self.push(TokenKind::Eq, start);
                }
            }
            '<' => {
                if self.match_char('=') {
                    self.push(TokenKind::LtEq, start);
                } else if self.match_char('>') {
                    self.push(TokenKind::NotEq, start);
                } else {
                    self.push(TokenKind::Lt, start);
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.push(TokenKind::GtEq, start);
                } else {
                    self.push(TokenKind::Gt, start);
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.push(TokenKind::NotEq, start);
                } else {
                    self.error(start, "unexpected character '!'");
                }
            }
            '\'' | '"' => self.scan_string(start, ch),
            '`' => self.scan_quoted_identifier(start),
            '$' => self.scan_parameter(start),
            c if c.is_ascii_digit() => self.scan_number(start),
            c if is_identifier_start(c) => self.scan_identifier(start),
            c => self.error(start, format!("unexpected character '{}'", c)),
        }
    }

    fn scan_string(&mut self, start: usize, quote: char) {
        let mut value = String::new();
        loop {
            if self.is_at_end() {
                self.error(start, "unterminated string literal");
                break;
            }
            let ch = self.advance();
            if ch == quote {
                break;
            }
            if ch == '\\' {
                if self.is_at_end() {
                    self.error(start, "unterminated string literal");
                    break;
                }
                let esc = self.advance();
                match esc {
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    't' => value.push('\t'),
                    '\\' => value.push('\\'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    other => {
                        // unknown escapes pass through verbatim
                        value.push('\\');
                        value.push(other);
                    }
                }
            } else {
                value.push(ch);
            }
        }
        self.tokens
            .push(Token::new(TokenKind::String, start..self.pos, value));
    }

    fn scan_quoted_identifier(&mut self, start: usize) {
        let content_start = self.pos;
        while !self.is_at_end() && self.peek() != '`' {
            self.advance();
        }
        if self.is_at_end() {
            self.error(start, "unterminated quoted identifier");
            return;
        }
        let name = SmolStr::new(&self.source[content_start..self.pos]);
        self.advance(); // closing backtick
        self.tokens
            .push(Token::new(TokenKind::Identifier, start..self.pos, name));
    }

    fn scan_parameter(&mut self, start: usize) {
        if !self.is_at_end() && self.peek() == '`' {
            self.advance();
            let content_start = self.pos;
            while !self.is_at_end() && self.peek() != '`' {
                self.advance();
            }
            if self.is_at_end() {
                self.error(start, "unterminated parameter name");
                return;
            }
            let name = SmolStr::new(&self.source[content_start..self.pos]);
            self.advance();
            self.tokens
                .push(Token::new(TokenKind::Parameter, start..self.pos, name));
            return;
        }

        let name_start = self.pos;
        while !self.is_at_end() && is_identifier_continue(self.peek()) {
            self.advance();
        }
        if name_start == self.pos {
            self.error(start, "expected parameter name after '$'");
            return;
        }
        let name = SmolStr::new(&self.source[name_start..self.pos]);
        self.tokens
            .push(Token::new(TokenKind::Parameter, start..self.pos, name));
    }

    fn scan_number(&mut self, start: usize) {
        // hexadecimal and octal forms
        if self.source[start..].starts_with("0x") || self.source[start..].starts_with("0X") {
            self.advance(); // 'x'
            while !self.is_at_end() && self.peek().is_ascii_hexdigit() {
                self.advance();
            }
            self.push_text(TokenKind::Integer, start);
            return;
        }

        while !self.is_at_end() && self.peek().is_ascii_digit() {
            self.advance();
        }

        // a fractional part must be `.` followed by a digit; `1..2` is a range
        let mut is_float = false;
        if !self.is_at_end()
            && self.peek() == '.'
            && self
                .source[self.pos + 1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            self.advance(); // '.'
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        if !self.is_at_end() && (self.peek() == 'e' || self.peek() == 'E') {
            let mut lookahead = self.source[self.pos + 1..].chars();
            let mut next = lookahead.next();
            if next == Some('+') || next == Some('-') {
                next = lookahead.next();
            }
            if next.is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.advance(); // 'e'
                if self.peek() == '+' || self.peek() == '-' {
                    self.advance();
                }
                while !self.is_at_end() && self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        let kind = if is_float {
            TokenKind::Float
        } else {
            TokenKind::Integer
        };
        self.push_text(kind, start);
    }

    fn scan_identifier(&mut self, start: usize) {
        while !self.is_at_end() && is_identifier_continue(self.peek()) {
            self.advance();
        }
        let text = &self.source[start..self.pos];
        match keyword_kind(text) {
            Some(kind) => self.push_text(kind, start),
            None => self.push_text(TokenKind::Identifier, start),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            if self.is_at_end() {
                return;
            }
            let ch = self.peek();
            if ch.is_whitespace() {
                self.advance();
            } else if self.source[self.pos..].starts_with("//") {
                let start = self.pos;
                while !self.is_at_end() && self.peek() != '\n' {
                    self.advance();
                }
                self.comments.push(start..self.pos);
            } else if self.source[self.pos..].starts_with("/*") {
                let start = self.pos;
                self.advance();
                self.advance();
                loop {
                    if self.is_at_end() {
                        self.error(start, "unterminated block comment");
                        return;
                    }
                    if self.source[self.pos..].starts_with("*/") {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
                self.comments.push(start..self.pos);
            } else {
                return;
            }
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.push_text(kind, start);
    }

    fn push_text(&mut self, kind: TokenKind, start: usize) {
        let text = SmolStr::new(&self.source[start..self.pos]);
        self.tokens.push(Token::new(kind, start..self.pos, text));
    }

    fn error(&mut self, start: usize, message: impl Into<String>) {
        self.diagnostics.push(
            Diag::error(message)
                .with_label(start..self.pos.max(start + 1), "here"),
        );
    }

    fn advance(&mut self) -> char {
        let ch = self.peek();
        self.pos += ch.len_utf8();
        ch
    }

    fn match_char(&mut self, expected: char) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> char {
        self.source[self.pos..].chars().next().unwrap_or('\0')
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let result = Lexer::new(source).tokenize();
        assert!(
            result.diagnostics.is_empty(),
            "unexpected diagnostics for `{source}`: {:?}",
            result.diagnostics
        );
        result.tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_query() {
        use TokenKind::*;
        assert_eq!(
            kinds("MATCH (n) RETURN n"),
            vec![Match, LParen, Identifier, RParen, Return, Identifier, Eof]
        );
    }

    #[test]
    fn relationship_punctuation() {
        use TokenKind::*;
        assert_eq!(
            kinds("(a)-[r:KNOWS*1..3]->(b)"),
            vec![
                LParen, Identifier, RParen, Minus, LBracket, Identifier, Colon, Identifier,
                Star, Integer, DotDot, Integer, RBracket, Minus, Gt, LParen, Identifier,
                RParen, Eof
            ]
        );
    }

    #[test]
    fn numbers() {
        let result = Lexer::new("1 2.5 1e3 0xff 1..2").tokenize();
        let kinds: Vec<_> = result.tokens.iter().map(|t| t.kind).collect();
        use TokenKind::*;
        assert_eq!(
            kinds,
            vec![Integer, Float, Float, Integer, Integer, DotDot, Integer, Eof]
        );
    }

    #[test]
    fn string_escapes() {
        let result = Lexer::new(r#"RETURN 'a\'b', "c\nd""#).tokenize();
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.tokens[1].text, "a'b");
        assert_eq!(result.tokens[3].text, "c\nd");
    }

    #[test]
    fn backtick_identifier_and_parameter() {
        let result = Lexer::new("MATCH (`weird name`) RETURN $param").tokenize();
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.tokens[2].kind, TokenKind::Identifier);
        assert_eq!(result.tokens[2].text, "weird name");
        let param = result
            .tokens
            .iter()
            .find(|t| t.kind == TokenKind::Parameter)
            .unwrap();
        assert_eq!(param.text, "param");
    }

    #[test]
    fn comments_are_recorded_not_tokenized() {
        let result = Lexer::new("// leading\nRETURN 1 /* mid */ + 2").tokenize();
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.comments.len(), 2);
        let kinds: Vec<_> = result.tokens.iter().map(|t| t.kind).collect();
        use TokenKind::*;
        assert_eq!(kinds, vec![Return, Integer, Plus, Integer, Eof]);
    }

    #[test]
    fn at_sign_is_rejected() {
        let result = Lexer::new("RETURN @anon_0").tokenize();
        assert!(!result.diagnostics.is_empty());
    }

    #[test]
    fn unterminated_string_reports_error() {
        let result = Lexer::new("RETURN 'oops").tokenize();
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].message.contains("unterminated"));
    }

    #[test]
    fn keywords_case_insensitive() {
        use TokenKind::*;
        assert_eq!(
            kinds("optional match (n) where n.v = true return distinct n"),
            vec![
                Optional, Match, LParen, Identifier, RParen, Where, Identifier, Dot,
                Identifier, Eq, True, Return, Distinct, Identifier, Eof
            ]
        );
    }
}
