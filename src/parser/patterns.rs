//! Pattern grammar: paths, node patterns, relationship patterns.

use super::{PResult, Parser};
use crate::ast::expression::Expression;
use crate::ast::query::{
    Direction, NodePattern, PathBody, Pattern, PatternElement, PatternPath, RelPattern,
    VarLengthRange,
};
use crate::ast::Identifier;
use crate::lexer::token::TokenKind;
use smol_str::SmolStr;

impl Parser {
    /// Parses a comma-separated pattern.
    pub(crate) fn parse_pattern(&mut self) -> PResult<Pattern> {
        let start = self.peek().span.start;
        let mut paths = vec![self.parse_pattern_path()?];
        while self.eat(TokenKind::Comma) {
            paths.push(self.parse_pattern_path()?);
        }
        Ok(Pattern {
            paths,
            span: start..self.prev_end(),
        })
    }

    /// Parses one pattern path, optionally named (`p = ...`) and optionally
    /// a shortest-path form.
    pub(crate) fn parse_pattern_path(&mut self) -> PResult<PatternPath> {
        let start = self.peek().span.start;

        let variable = if self.at(TokenKind::Identifier) && self.peek_kind(1) == TokenKind::Eq {
            let token = self.advance();
            self.advance(); // '='
            Some(Identifier::new(token.text, token.span))
        } else {
            None
        };

        if let Some(single) = self.peek_shortest_path() {
            self.advance(); // the function-like keyword
            self.expect(TokenKind::LParen, "'(' after shortestPath")?;
            let inner = self.parse_pattern_path()?;
            self.expect(TokenKind::RParen, "')' closing shortestPath")?;
            return Ok(PatternPath {
                variable,
                body: PathBody::Shortest {
                    single,
                    inner: Box::new(inner),
                },
                span: start..self.prev_end(),
            });
        }

        let mut elements = vec![PatternElement::Node(self.parse_node_pattern()?)];
        while self.at(TokenKind::Minus) || self.at(TokenKind::Lt) {
            elements.push(PatternElement::Relationship(self.parse_rel_pattern()?));
            elements.push(PatternElement::Node(self.parse_node_pattern()?));
        }

        Ok(PatternPath {
            variable,
            body: PathBody::Elements(elements),
            span: start..self.prev_end(),
        })
    }

    /// Returns `Some(single)` when the cursor sits on a
    /// `shortestPath(`/`allShortestPaths(` form.
    pub(crate) fn peek_shortest_path(&self) -> Option<bool> {
        if !self.at(TokenKind::Identifier) || self.peek_kind(1) != TokenKind::LParen {
            return None;
        }
        let text = &self.peek().text;
        if text.eq_ignore_ascii_case("shortestPath") {
            Some(true)
        } else if text.eq_ignore_ascii_case("allShortestPaths") {
            Some(false)
        } else {
            None
        }
    }

    /// Parses a node pattern `(n:Label {props})`.
    pub(crate) fn parse_node_pattern(&mut self) -> PResult<NodePattern> {
        let open = self.expect(TokenKind::LParen, "'(' opening a node pattern")?;
        let start = open.span.start;

        let variable = if self.at(TokenKind::Identifier) {
            let token = self.advance();
            Some(Identifier::new(token.text, token.span))
        } else {
            None
        };

        let mut labels = Vec::new();
        while self.eat(TokenKind::Colon) {
            let (label, _) = self.expect_name("a label")?;
            labels.push(label);
        }

        let properties = self.parse_inline_properties()?;
        self.expect(TokenKind::RParen, "')' closing a node pattern")?;

        Ok(NodePattern {
            id: self.fresh_node_id(),
            variable,
            labels,
            properties,
            span: start..self.prev_end(),
        })
    }

    /// Parses a relationship pattern between two node patterns.
    fn parse_rel_pattern(&mut self) -> PResult<RelPattern> {
        let start = self.peek().span.start;

        let left_arrow = self.eat(TokenKind::Lt);
        self.expect(TokenKind::Minus, "'-' in a relationship pattern")?;

        let mut variable = None;
        let mut types: Vec<SmolStr> = Vec::new();
        let mut varlength = None;
        let mut properties = None;

        if self.eat(TokenKind::LBracket) {
            if self.at(TokenKind::Identifier) {
                let token = self.advance();
                variable = Some(Identifier::new(token.text, token.span));
            }

            if self.eat(TokenKind::Colon) {
                let (reltype, _) = self.expect_name("a relationship type")?;
                types.push(reltype);
                while self.eat(TokenKind::Pipe) {
                    self.eat(TokenKind::Colon);
                    let (reltype, _) = self.expect_name("a relationship type")?;
                    types.push(reltype);
                }
            }

            if self.at(TokenKind::Star) {
                let range_start = self.peek().span.start;
                self.advance();
                let mut low = None;
                let mut high = None;
                if self.at(TokenKind::Integer) {
                    low = Some(self.parse_integer_token()?);
                }
                if self.eat(TokenKind::DotDot) {
                    if self.at(TokenKind::Integer) {
                        high = Some(self.parse_integer_token()?);
                    }
                } else {
                    // an exact bound: `*2` traverses exactly two hops
                    high = low;
                }
                varlength = Some(VarLengthRange {
                    start: low,
                    end: high,
                    span: range_start..self.prev_end(),
                });
            }

            properties = self.parse_inline_properties()?;
            self.expect(TokenKind::RBracket, "']' closing a relationship pattern")?;
        }

        self.expect(TokenKind::Minus, "'-' in a relationship pattern")?;
        let right_arrow = self.eat(TokenKind::Gt);

        let direction = match (left_arrow, right_arrow) {
            (true, false) => Direction::Incoming,
            (false, true) => Direction::Outgoing,
            (false, false) => Direction::Bidirectional,
            (true, true) => {
                return Err(self.error_here("a relationship cannot point both ways"));
            }
        };

        Ok(RelPattern {
            id: self.fresh_node_id(),
            variable,
            types,
            direction,
            varlength,
            properties,
            span: start..self.prev_end(),
        })
    }

    /// Parses inline properties: a map literal or a parameter.
    fn parse_inline_properties(&mut self) -> PResult<Option<Expression>> {
        if self.at(TokenKind::LBrace) {
            return Ok(Some(self.parse_map_literal()?));
        }
        if self.at(TokenKind::Parameter) {
            let token = self.advance();
            return Ok(Some(Expression::Parameter(token.text, token.span)));
        }
        Ok(None)
    }

    /// Parses an integer token into its value.
    pub(crate) fn parse_integer_token(&mut self) -> PResult<i64> {
        let token = self.expect(TokenKind::Integer, "an integer")?;
        let text = token.text.as_str();
        let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
        {
            i64::from_str_radix(hex, 16)
        } else {
            text.parse::<i64>()
        };
        match parsed {
            Ok(value) => Ok(value),
            Err(_) => Err(self.error_here("integer literal out of range")),
        }
    }
}
