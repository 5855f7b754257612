//! Expression grammar (precedence-climbing).

use super::{PResult, Parser};
use crate::ast::expression::{
    ApplyAll, BinaryOperator, CaseExpression, Expression, FunctionCall, Identifier,
    ListComprehension, Literal, PatternComprehension, Quantifier, QuantifierKind, Reduce,
    UnaryOperator,
};
use crate::ast::query::{PathBody, PatternElement};
use crate::lexer::token::TokenKind;
use smol_str::SmolStr;

impl Parser {
    /// Parses a full expression.
    pub(crate) fn parse_expression(&mut self) -> PResult<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expression> {
        let mut left = self.parse_xor()?;
        while self.at(TokenKind::Or) {
            self.advance();
            let right = self.parse_xor()?;
            left = binary(BinaryOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_xor(&mut self) -> PResult<Expression> {
        let mut left = self.parse_and()?;
        while self.at(TokenKind::Xor) {
            self.advance();
            let right = self.parse_and()?;
            left = binary(BinaryOperator::Xor, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PResult<Expression> {
        let mut left = self.parse_not()?;
        while self.at(TokenKind::And) {
            self.advance();
            let right = self.parse_not()?;
            left = binary(BinaryOperator::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> PResult<Expression> {
        if self.at(TokenKind::Not) {
            let start = self.peek().span.start;
            self.advance();
            let operand = self.parse_not()?;
            let span = start..operand.span().end;
            return Ok(Expression::Unary {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
                span,
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expression> {
        let mut left = self.parse_string_op()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinaryOperator::Equals,
                TokenKind::NotEq => BinaryOperator::NotEquals,
                TokenKind::Lt => BinaryOperator::LessThan,
                TokenKind::LtEq => BinaryOperator::LessThanOrEqual,
                TokenKind::Gt => BinaryOperator::GreaterThan,
                TokenKind::GtEq => BinaryOperator::GreaterThanOrEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_string_op()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_string_op(&mut self) -> PResult<Expression> {
        let mut left = self.parse_additive()?;
        loop {
            match self.peek().kind {
                TokenKind::In => {
                    self.advance();
                    let right = self.parse_additive()?;
                    left = binary(BinaryOperator::In, left, right);
                }
                TokenKind::Starts => {
                    self.advance();
                    self.expect(TokenKind::With, "WITH after STARTS")?;
                    let right = self.parse_additive()?;
                    left = binary(BinaryOperator::StartsWith, left, right);
                }
                TokenKind::Ends => {
                    self.advance();
                    self.expect(TokenKind::With, "WITH after ENDS")?;
                    let right = self.parse_additive()?;
                    left = binary(BinaryOperator::EndsWith, left, right);
                }
                TokenKind::Contains => {
                    self.advance();
                    let right = self.parse_additive()?;
                    left = binary(BinaryOperator::Contains, left, right);
                }
                TokenKind::RegexMatch => {
                    self.advance();
                    let right = self.parse_additive()?;
                    left = binary(BinaryOperator::Regex, left, right);
                }
                TokenKind::Is => {
                    let start = left.span().start;
                    self.advance();
                    let op = if self.eat(TokenKind::Not) {
                        UnaryOperator::IsNotNull
                    } else {
                        UnaryOperator::IsNull
                    };
                    self.expect(TokenKind::Null, "NULL after IS")?;
                    let span = start..self.prev_end();
                    left = Expression::Unary {
                        op,
                        operand: Box::new(left),
                        span,
                    };
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> PResult<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expression> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_power()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> PResult<Expression> {
        let left = self.parse_unary()?;
        if self.at(TokenKind::Caret) {
            self.advance();
            let right = self.parse_power()?;
            return Ok(binary(BinaryOperator::Power, left, right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expression> {
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOperator::Minus),
            TokenKind::Plus => Some(UnaryOperator::Plus),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.peek().span.start;
            self.advance();
            let operand = self.parse_unary()?;
            let span = start..operand.span().end;
            return Ok(Expression::Unary {
                op,
                operand: Box::new(operand),
                span,
            });
        }
        self.parse_postfix_expression()
    }

    /// Parses a primary expression plus property/subscript/slice postfixes.
    /// Also used directly for SET/REMOVE targets, where binary operators
    /// must not be consumed.
    pub(crate) fn parse_postfix_expression(&mut self) -> PResult<Expression> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                    let (key, key_span) = self.expect_name("a property name")?;
                    let span = expr.span().start..key_span.end;
                    expr = Expression::Property {
                        subject: Box::new(expr),
                        key,
                        span,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    expr = self.parse_subscript_or_slice(expr)?;
                }
                TokenKind::LBrace if matches!(expr, Expression::Identifier(_)) => {
                    // map projection `n {.key, ...}`
                    let start = expr.span().start;
                    self.consume_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
                    expr = Expression::MapProjection(start..self.prev_end());
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_subscript_or_slice(&mut self, subject: Expression) -> PResult<Expression> {
        let start = subject.span().start;

        if self.eat(TokenKind::DotDot) {
            let to = if self.at(TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            self.expect(TokenKind::RBracket, "']' closing a slice")?;
            return Ok(Expression::Slice {
                subject: Box::new(subject),
                from: None,
                to,
                span: start..self.prev_end(),
            });
        }

        let first = self.parse_expression()?;
        if self.eat(TokenKind::DotDot) {
            let to = if self.at(TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            self.expect(TokenKind::RBracket, "']' closing a slice")?;
            return Ok(Expression::Slice {
                subject: Box::new(subject),
                from: Some(Box::new(first)),
                to,
                span: start..self.prev_end(),
            });
        }

        self.expect(TokenKind::RBracket, "']' closing a subscript")?;
        Ok(Expression::Subscript {
            subject: Box::new(subject),
            index: Box::new(first),
            span: start..self.prev_end(),
        })
    }

    fn parse_primary(&mut self) -> PResult<Expression> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Integer => {
                let value = self.parse_integer_token()?;
                Ok(Expression::Literal(Literal::Integer(value), token.span))
            }
            TokenKind::Float => {
                self.advance();
                let value = token.text.parse::<f64>().unwrap_or(f64::NAN);
                Ok(Expression::Literal(Literal::Float(value), token.span))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expression::Literal(
                    Literal::String(token.text),
                    token.span,
                ))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(true), token.span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(false), token.span))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Literal(Literal::Null, token.span))
            }
            TokenKind::Parameter => {
                self.advance();
                Ok(Expression::Parameter(token.text, token.span))
            }
            TokenKind::Case => self.parse_case(),
            TokenKind::LBrace => self.parse_map_literal(),
            TokenKind::LBracket => self.parse_bracketed(),
            TokenKind::LParen => self.parse_parenthesized(),
            TokenKind::Identifier => self.parse_name_form(),
            _ => Err(self.error_here("expected an expression")),
        }
    }

    fn parse_case(&mut self) -> PResult<Expression> {
        let start = self.peek().span.start;
        self.advance(); // CASE

        let subject = if self.at(TokenKind::When) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        let mut alternatives = Vec::new();
        while self.eat(TokenKind::When) {
            let condition = self.parse_expression()?;
            self.expect(TokenKind::Then, "THEN in CASE")?;
            let result = self.parse_expression()?;
            alternatives.push((condition, result));
        }
        if alternatives.is_empty() {
            return Err(self.error_here("expected WHEN in CASE"));
        }

        let default = if self.eat(TokenKind::Else) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.expect(TokenKind::End, "END closing CASE")?;

        Ok(Expression::Case(CaseExpression {
            subject,
            alternatives,
            default,
            span: start..self.prev_end(),
        }))
    }

    /// Parses a map literal `{key: value, ...}`.
    pub(crate) fn parse_map_literal(&mut self) -> PResult<Expression> {
        let start = self.peek().span.start;
        self.expect(TokenKind::LBrace, "'{' opening a map")?;
        let mut entries = Vec::new();
        if !self.at(TokenKind::RBrace) {
            loop {
                let (key, _) = self.expect_name("a map key")?;
                self.expect(TokenKind::Colon, "':' after a map key")?;
                let value = self.parse_expression()?;
                entries.push((key, value));
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace, "'}' closing a map")?;
        Ok(Expression::Map(entries, start..self.prev_end()))
    }

    /// `[`: a list literal, list comprehension, or pattern comprehension.
    fn parse_bracketed(&mut self) -> PResult<Expression> {
        let start = self.peek().span.start;
        self.advance(); // '['

        // list comprehension: [x IN list ...]
        if self.at(TokenKind::Identifier) && self.peek_kind(1) == TokenKind::In {
            let token = self.advance();
            let variable = Identifier::new(token.text, token.span);
            self.advance(); // IN
            let list = self.parse_expression()?;
            let predicate = if self.eat(TokenKind::Where) {
                Some(Box::new(self.parse_expression()?))
            } else {
                None
            };
            let eval = if self.eat(TokenKind::Pipe) {
                Some(Box::new(self.parse_expression()?))
            } else {
                None
            };
            self.expect(TokenKind::RBracket, "']' closing a comprehension")?;
            return Ok(Expression::ListComprehension(ListComprehension {
                variable,
                list: Box::new(list),
                predicate,
                eval,
                span: start..self.prev_end(),
            }));
        }

        // pattern comprehension: [p = (a)-->(b) | e] or [(a)-->(b) | e]
        if let Some(expr) = self.try_parse_pattern_comprehension(start)? {
            return Ok(expr);
        }

        // list literal
        let mut items = Vec::new();
        if !self.at(TokenKind::RBracket) {
            items.push(self.parse_expression()?);
            while self.eat(TokenKind::Comma) {
                items.push(self.parse_expression()?);
            }
        }
        self.expect(TokenKind::RBracket, "']' closing a list")?;
        Ok(Expression::List(items, start..self.prev_end()))
    }

    fn try_parse_pattern_comprehension(&mut self, start: usize) -> PResult<Option<Expression>> {
        let named = self.at(TokenKind::Identifier) && self.peek_kind(1) == TokenKind::Eq;
        if !named && !self.at(TokenKind::LParen) {
            return Ok(None);
        }

        let saved = self.save();
        let path = match self.parse_pattern_path() {
            Ok(path) => path,
            Err(_) => {
                self.restore(saved);
                return Ok(None);
            }
        };

        // a bare parenthesized expression also parses as a single-node path;
        // only a path with a relationship (or an explicit name) is a pattern
        let has_relationship = path
            .elements()
            .iter()
            .any(|e| matches!(e, PatternElement::Relationship(_)));
        if !named && !has_relationship && !matches!(path.body, PathBody::Shortest { .. }) {
            self.restore(saved);
            return Ok(None);
        }

        let variable = path.variable.clone();
        let predicate = if self.eat(TokenKind::Where) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.expect(TokenKind::Pipe, "'|' in a pattern comprehension")?;
        let eval = self.parse_expression()?;
        self.expect(TokenKind::RBracket, "']' closing a comprehension")?;

        Ok(Some(Expression::PatternComprehension(PatternComprehension {
            variable,
            pattern: path,
            predicate,
            eval: Box::new(eval),
            span: start..self.prev_end(),
        })))
    }

    /// `(`: a parenthesized expression or a pattern predicate.
    fn parse_parenthesized(&mut self) -> PResult<Expression> {
        let saved = self.save();
        if let Ok(path) = self.parse_pattern_path() {
            let has_relationship = path
                .elements()
                .iter()
                .any(|e| matches!(e, PatternElement::Relationship(_)));
            if has_relationship {
                return Ok(Expression::PatternPredicate(path));
            }
        }
        self.restore(saved);

        self.advance(); // '('
        let expr = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')' closing a parenthesized expression")?;
        Ok(expr)
    }

    /// An identifier-led form: plain reference, dotted function call,
    /// quantifier, reduce, shortest path or legacy construct.
    fn parse_name_form(&mut self) -> PResult<Expression> {
        let token = self.peek().clone();
        let text = token.text.as_str();

        if self.peek_kind(1) == TokenKind::LParen {
            if let Some(single) = self.peek_shortest_path() {
                let start = token.span.start;
                self.advance();
                self.expect(TokenKind::LParen, "'(' after shortestPath")?;
                let inner = self.parse_pattern_path()?;
                self.expect(TokenKind::RParen, "')' closing shortestPath")?;
                return Ok(Expression::PatternPredicate(
                    crate::ast::query::PatternPath {
                        variable: None,
                        body: PathBody::Shortest {
                            single,
                            inner: Box::new(inner),
                        },
                        span: start..self.prev_end(),
                    },
                ));
            }

            if let Some(kind) = quantifier_kind(text) {
                if let Some(expr) = self.try_parse_quantifier(kind)? {
                    return Ok(expr);
                }
            }

            if text.eq_ignore_ascii_case("reduce") {
                return self.parse_reduce();
            }

            if text.eq_ignore_ascii_case("filter") || text.eq_ignore_ascii_case("extract") {
                if let Some(expr) = self.try_parse_legacy_comprehension(text)? {
                    return Ok(expr);
                }
            }
        }

        // dotted name chain; a trailing '(' makes it a function call,
        // otherwise it folds into property accesses
        let start = token.span.start;
        self.advance();
        let mut segments: Vec<(SmolStr, crate::ast::Span)> = vec![(token.text, token.span)];
        while self.at(TokenKind::Dot) && name_like(self.peek_kind(1)) {
            self.advance(); // '.'
            let (name, span) = self.expect_name("a name")?;
            segments.push((name, span));
        }

        if self.at(TokenKind::LParen) {
            let name = segments
                .iter()
                .map(|(s, _)| s.as_str())
                .collect::<Vec<_>>()
                .join(".");
            return self.parse_call_arguments(SmolStr::new(name), start);
        }

        let (first, first_span) = segments.remove(0);
        let mut expr = Expression::Identifier(Identifier::new(first, first_span));
        for (key, span) in segments {
            let full = expr.span().start..span.end;
            expr = Expression::Property {
                subject: Box::new(expr),
                key,
                span: full,
            };
        }
        Ok(expr)
    }

    /// Parses the parenthesized argument list of a function application.
    fn parse_call_arguments(&mut self, name: SmolStr, start: usize) -> PResult<Expression> {
        self.expect(TokenKind::LParen, "'(' opening an argument list")?;

        let distinct = self.eat(TokenKind::Distinct);

        // fn(*): the apply-all form
        if self.at(TokenKind::Star) && self.peek_kind(1) == TokenKind::RParen {
            self.advance();
            self.advance();
            return Ok(Expression::ApplyAll(ApplyAll {
                name,
                distinct,
                span: start..self.prev_end(),
            }));
        }

        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            args.push(self.parse_expression()?);
            while self.eat(TokenKind::Comma) {
                args.push(self.parse_expression()?);
            }
        }
        self.expect(TokenKind::RParen, "')' closing an argument list")?;

        Ok(Expression::FunctionCall(FunctionCall {
            name,
            distinct,
            args,
            span: start..self.prev_end(),
        }))
    }

    fn try_parse_quantifier(&mut self, kind: QuantifierKind) -> PResult<Option<Expression>> {
        let saved = self.save();
        let start = self.peek().span.start;
        self.advance(); // the quantifier keyword
        self.advance(); // '('

        if !(self.at(TokenKind::Identifier) && self.peek_kind(1) == TokenKind::In) {
            self.restore(saved);
            return Ok(None);
        }

        let token = self.advance();
        let variable = Identifier::new(token.text, token.span);
        self.advance(); // IN
        let list = self.parse_expression()?;
        let predicate = if self.eat(TokenKind::Where) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.expect(TokenKind::RParen, "')' closing a quantifier")?;

        Ok(Some(Expression::Quantifier(Quantifier {
            kind,
            variable,
            list: Box::new(list),
            predicate,
            span: start..self.prev_end(),
        })))
    }

    fn parse_reduce(&mut self) -> PResult<Expression> {
        let start = self.peek().span.start;
        self.advance(); // reduce
        self.expect(TokenKind::LParen, "'(' after reduce")?;
        let (acc, acc_span) = self.expect_name("the reduce accumulator")?;
        self.expect(TokenKind::Eq, "'=' after the accumulator")?;
        let init = self.parse_expression()?;
        self.expect(TokenKind::Comma, "',' in reduce")?;
        let (var, var_span) = self.expect_name("the reduce loop variable")?;
        self.expect(TokenKind::In, "IN in reduce")?;
        let list = self.parse_expression()?;
        let eval = if self.eat(TokenKind::Pipe) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.expect(TokenKind::RParen, "')' closing reduce")?;

        Ok(Expression::Reduce(Reduce {
            accumulator: Identifier::new(acc, acc_span),
            init: Box::new(init),
            variable: Identifier::new(var, var_span),
            list: Box::new(list),
            eval,
            span: start..self.prev_end(),
        }))
    }

    /// Legacy `filter(x IN list WHERE ...)` / `extract(x IN list | ...)`.
    fn try_parse_legacy_comprehension(&mut self, text: &str) -> PResult<Option<Expression>> {
        let saved = self.save();
        let start = self.peek().span.start;
        let kind = if text.eq_ignore_ascii_case("filter") {
            "FILTER"
        } else {
            "EXTRACT"
        };
        self.advance(); // the keyword
        self.advance(); // '('

        if !(self.at(TokenKind::Identifier) && self.peek_kind(1) == TokenKind::In) {
            self.restore(saved);
            return Ok(None);
        }

        // recognized only to be rejected; skip to the closing paren
        let mut depth = 1usize;
        while depth > 0 && !self.at(TokenKind::Eof) {
            match self.peek().kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        Ok(Some(Expression::Legacy(kind, start..self.prev_end())))
    }

    /// Consumes a balanced token run from `open` to its matching `close`.
    fn consume_balanced(&mut self, open: TokenKind, close: TokenKind) -> PResult<()> {
        self.expect(open, "an opening delimiter")?;
        let mut depth = 1usize;
        while depth > 0 {
            if self.at(TokenKind::Eof) {
                return Err(self.error_here("unbalanced delimiters"));
            }
            let kind = self.peek().kind;
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth -= 1;
            }
            self.advance();
        }
        Ok(())
    }
}

fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Expression {
    let span = left.span().start..right.span().end;
    Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
        span,
    }
}

fn quantifier_kind(text: &str) -> Option<QuantifierKind> {
    if text.eq_ignore_ascii_case("any") {
        Some(QuantifierKind::Any)
    } else if text.eq_ignore_ascii_case("all") {
        Some(QuantifierKind::All)
    } else if text.eq_ignore_ascii_case("none") {
        Some(QuantifierKind::None)
    } else if text.eq_ignore_ascii_case("single") {
        Some(QuantifierKind::Single)
    } else {
        None
    }
}

fn name_like(kind: TokenKind) -> bool {
    kind == TokenKind::Identifier || kind.is_keyword()
}
