//! Clause-level grammar.

use super::{PResult, Parser};
use crate::ast::expression::Expression;
use crate::ast::query::{
    CallClause, CallSubqueryClause, Clause, CreateClause, DeleteClause, ForeachClause,
    LoadCsvClause, MatchClause, MergeAction, MergeActionKind, MergeClause, Projection,
    ProjectionClause, Query, RemoveClause, RemoveItem, SetClause, SetItem, SortItem, UnionClause,
    UnwindClause,
};
use crate::ast::Identifier;
use crate::lexer::token::TokenKind;
use smol_str::SmolStr;

impl Parser {
    /// Parses a clause list terminated by `terminator` (subqueries) or by
    /// end of statement.
    pub(crate) fn parse_query_body(&mut self, terminator: Option<TokenKind>) -> PResult<Query> {
        let start = self.peek().span.start;
        let mut clauses = Vec::new();

        loop {
            if self.at(TokenKind::Eof) || self.at(TokenKind::Semicolon) {
                break;
            }
            if let Some(end) = terminator {
                if self.at(end) {
                    break;
                }
            }
            clauses.push(self.parse_clause()?);
        }

        if clauses.is_empty() {
            return Err(self.error_here("expected a clause"));
        }

        Ok(Query {
            clauses,
            span: start..self.prev_end(),
        })
    }

    pub(crate) fn parse_clause(&mut self) -> PResult<Clause> {
        match self.peek().kind {
            TokenKind::Match => {
                let start = self.peek().span.start;
                self.advance();
                self.parse_match_tail(false, start)
            }
            TokenKind::Optional => {
                let start = self.peek().span.start;
                self.advance();
                self.expect(TokenKind::Match, "MATCH after OPTIONAL")?;
                self.parse_match_tail(true, start)
            }
            TokenKind::Create => self.parse_create(),
            TokenKind::Merge => self.parse_merge(),
            TokenKind::Delete => {
                let start = self.peek().span.start;
                self.advance();
                self.parse_delete_tail(false, start)
            }
            TokenKind::Detach => {
                let start = self.peek().span.start;
                self.advance();
                self.expect(TokenKind::Delete, "DELETE after DETACH")?;
                self.parse_delete_tail(true, start)
            }
            TokenKind::Set => self.parse_set(),
            TokenKind::Remove => self.parse_remove(),
            TokenKind::With => self.parse_projection_clause(true),
            TokenKind::Return => self.parse_projection_clause(false),
            TokenKind::Unwind => self.parse_unwind(),
            TokenKind::Foreach => self.parse_foreach(),
            TokenKind::Call => self.parse_call(),
            TokenKind::Union => self.parse_union(),
            TokenKind::Load => self.parse_load_csv(),
            TokenKind::Start => self.parse_unsupported("START"),
            TokenKind::Using => self.parse_using(),
            _ => Err(self.error_here("expected a clause")),
        }
    }

    fn parse_match_tail(&mut self, optional: bool, start: usize) -> PResult<Clause> {
        let pattern = self.parse_pattern()?;

        // USING hints are recognized only to be rejected downstream
        let mut hints = Vec::new();
        while self.at(TokenKind::Using) {
            let hint_start = self.peek().span.start;
            self.advance();
            while !self.at_clause_boundary() && !self.at(TokenKind::Where) {
                self.advance();
            }
            hints.push(hint_start..self.prev_end());
        }

        let predicate = if self.eat(TokenKind::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Clause::Match(MatchClause {
            optional,
            pattern,
            predicate,
            hints,
            span: start..self.prev_end(),
        }))
    }

    fn parse_create(&mut self) -> PResult<Clause> {
        let start = self.peek().span.start;
        self.advance(); // CREATE
        let pattern = self.parse_pattern()?;
        Ok(Clause::Create(CreateClause {
            pattern,
            span: start..self.prev_end(),
        }))
    }

    fn parse_merge(&mut self) -> PResult<Clause> {
        let start = self.peek().span.start;
        self.advance(); // MERGE
        let path = self.parse_pattern_path()?;

        let mut actions = Vec::new();
        while self.at(TokenKind::On) {
            let action_start = self.peek().span.start;
            self.advance();
            let kind = if self.eat(TokenKind::Create) {
                MergeActionKind::OnCreate
            } else if self.eat(TokenKind::Match) {
                MergeActionKind::OnMatch
            } else {
                return Err(self.error_here("expected CREATE or MATCH after ON"));
            };
            self.expect(TokenKind::Set, "SET in MERGE action")?;
            let items = self.parse_set_items()?;
            actions.push(MergeAction {
                kind,
                items,
                span: action_start..self.prev_end(),
            });
        }

        Ok(Clause::Merge(MergeClause {
            path,
            actions,
            span: start..self.prev_end(),
        }))
    }

    fn parse_delete_tail(&mut self, detach: bool, start: usize) -> PResult<Clause> {
        let mut expressions = vec![self.parse_expression()?];
        while self.eat(TokenKind::Comma) {
            expressions.push(self.parse_expression()?);
        }
        Ok(Clause::Delete(DeleteClause {
            detach,
            expressions,
            span: start..self.prev_end(),
        }))
    }

    fn parse_set(&mut self) -> PResult<Clause> {
        let start = self.peek().span.start;
        self.advance(); // SET
        let items = self.parse_set_items()?;
        Ok(Clause::Set(SetClause {
            items,
            span: start..self.prev_end(),
        }))
    }

    pub(crate) fn parse_set_items(&mut self) -> PResult<Vec<SetItem>> {
        let mut items = vec![self.parse_set_item()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.parse_set_item()?);
        }
        Ok(items)
    }

    fn parse_set_item(&mut self) -> PResult<SetItem> {
        let start = self.peek().span.start;
        let target = self.parse_postfix_expression()?;

        match self.peek().kind {
            TokenKind::Colon => {
                let Expression::Identifier(ident) = target else {
                    return Err(self.error_here("expected an identifier before ':'"));
                };
                let mut labels = Vec::new();
                while self.eat(TokenKind::Colon) {
                    let (label, _) = self.expect_name("a label name")?;
                    labels.push(label);
                }
                Ok(SetItem::Labels {
                    target: ident,
                    labels,
                    span: start..self.prev_end(),
                })
            }
            TokenKind::PlusEq => {
                self.advance();
                let value = self.parse_expression()?;
                let Expression::Identifier(ident) = target else {
                    return Err(self.error_here("expected an identifier before '+='"));
                };
                Ok(SetItem::AllProperties {
                    target: ident,
                    value,
                    merge: true,
                    span: start..self.prev_end(),
                })
            }
            TokenKind::Eq => {
                self.advance();
                let value = self.parse_expression()?;
                match target {
                    Expression::Property { subject, key, .. } => Ok(SetItem::Property {
                        subject: *subject,
                        key,
                        value,
                        span: start..self.prev_end(),
                    }),
                    Expression::Identifier(ident) => Ok(SetItem::AllProperties {
                        target: ident,
                        value,
                        merge: false,
                        span: start..self.prev_end(),
                    }),
                    Expression::Subscript { .. } => Ok(SetItem::SubscriptAssign {
                        span: start..self.prev_end(),
                    }),
                    _ => Err(self.error_here("invalid SET target")),
                }
            }
            _ => Err(self.error_here("expected '=', '+=' or ':' in SET item")),
        }
    }

    fn parse_remove(&mut self) -> PResult<Clause> {
        let start = self.peek().span.start;
        self.advance(); // REMOVE
        let mut items = vec![self.parse_remove_item()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.parse_remove_item()?);
        }
        Ok(Clause::Remove(RemoveClause {
            items,
            span: start..self.prev_end(),
        }))
    }

    fn parse_remove_item(&mut self) -> PResult<RemoveItem> {
        let start = self.peek().span.start;
        let target = self.parse_postfix_expression()?;

        if self.at(TokenKind::Colon) {
            let Expression::Identifier(ident) = target else {
                return Err(self.error_here("expected an identifier before ':'"));
            };
            let mut labels = Vec::new();
            while self.eat(TokenKind::Colon) {
                let (label, _) = self.expect_name("a label name")?;
                labels.push(label);
            }
            return Ok(RemoveItem::Labels {
                target: ident,
                labels,
                span: start..self.prev_end(),
            });
        }

        match target {
            Expression::Property { subject, key, .. } => Ok(RemoveItem::Property {
                subject: *subject,
                key,
                span: start..self.prev_end(),
            }),
            _ => Err(self.error_here("expected identifier.property in REMOVE")),
        }
    }

    fn parse_projection_clause(&mut self, is_with: bool) -> PResult<Clause> {
        let start = self.peek().span.start;
        self.advance(); // WITH | RETURN

        let distinct = self.eat(TokenKind::Distinct);

        let mut star = false;
        let mut projections = Vec::new();
        if self.at(TokenKind::Star) {
            self.advance();
            star = true;
            while self.eat(TokenKind::Comma) {
                projections.push(self.parse_projection()?);
            }
        } else {
            projections.push(self.parse_projection()?);
            while self.eat(TokenKind::Comma) {
                projections.push(self.parse_projection()?);
            }
        }

        let mut order_by = Vec::new();
        if self.at(TokenKind::Order) {
            self.advance();
            self.expect(TokenKind::By, "BY after ORDER")?;
            loop {
                let expression = self.parse_expression()?;
                let ascending = if self.eat(TokenKind::Desc) {
                    false
                } else {
                    self.eat(TokenKind::Asc);
                    true
                };
                order_by.push(SortItem {
                    expression,
                    ascending,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        let skip = if self.eat(TokenKind::Skip) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let limit = if self.eat(TokenKind::Limit) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let predicate = if is_with && self.eat(TokenKind::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let clause = ProjectionClause {
            distinct,
            star,
            projections,
            order_by,
            skip,
            limit,
            predicate,
            span: start..self.prev_end(),
        };
        Ok(if is_with {
            Clause::With(clause)
        } else {
            Clause::Return(clause)
        })
    }

    pub(crate) fn parse_projection(&mut self) -> PResult<Projection> {
        let start = self.peek().span.start;
        let expression = self.parse_expression()?;
        let alias = if self.eat(TokenKind::As) {
            let (name, span) = self.expect_name("an alias")?;
            Some(Identifier::new(name, span))
        } else {
            None
        };
        Ok(Projection {
            expression,
            alias,
            span: start..self.prev_end(),
        })
    }

    fn parse_unwind(&mut self) -> PResult<Clause> {
        let start = self.peek().span.start;
        self.advance(); // UNWIND
        let expression = self.parse_expression()?;
        self.expect(TokenKind::As, "AS in UNWIND")?;
        let (name, span) = self.expect_name("the UNWIND loop variable")?;
        Ok(Clause::Unwind(UnwindClause {
            expression,
            alias: Identifier::new(name, span),
            span: start..self.prev_end(),
        }))
    }

    fn parse_foreach(&mut self) -> PResult<Clause> {
        let start = self.peek().span.start;
        self.advance(); // FOREACH
        self.expect(TokenKind::LParen, "'(' after FOREACH")?;
        let (name, name_span) = self.expect_name("the FOREACH loop variable")?;
        self.expect(TokenKind::In, "IN in FOREACH")?;
        let list = self.parse_expression()?;
        self.expect(TokenKind::Pipe, "'|' before the FOREACH body")?;

        let mut clauses = Vec::new();
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            clauses.push(self.parse_clause()?);
        }
        self.expect(TokenKind::RParen, "')' closing FOREACH")?;

        Ok(Clause::Foreach(ForeachClause {
            variable: Identifier::new(name, name_span),
            list,
            clauses,
            span: start..self.prev_end(),
        }))
    }

    fn parse_call(&mut self) -> PResult<Clause> {
        let start = self.peek().span.start;
        self.advance(); // CALL

        if self.eat(TokenKind::LBrace) {
            let query = self.parse_query_body(Some(TokenKind::RBrace))?;
            self.expect(TokenKind::RBrace, "'}' closing the subquery")?;
            return Ok(Clause::CallSubquery(CallSubqueryClause {
                query,
                span: start..self.prev_end(),
            }));
        }

        // dotted procedure name
        let (first, first_span) = self.expect_name("a procedure name")?;
        let mut name = first.to_string();
        let name_start = first_span.start;
        while self.eat(TokenKind::Dot) {
            let (part, _) = self.expect_name("a procedure name segment")?;
            name.push('.');
            name.push_str(&part);
        }
        let name_span = name_start..self.prev_end();

        let mut args = Vec::new();
        if self.eat(TokenKind::LParen) {
            if !self.at(TokenKind::RParen) {
                args.push(self.parse_expression()?);
                while self.eat(TokenKind::Comma) {
                    args.push(self.parse_expression()?);
                }
            }
            self.expect(TokenKind::RParen, "')' closing the argument list")?;
        }

        let mut yield_items = Vec::new();
        if self.eat(TokenKind::Yield) {
            loop {
                let item_start = self.peek().span.start;
                let (output, output_span) = self.expect_name("a YIELD output")?;
                let alias = if self.eat(TokenKind::As) {
                    let (alias, alias_span) = self.expect_name("an alias")?;
                    Some(Identifier::new(alias, alias_span))
                } else {
                    None
                };
                yield_items.push(Projection {
                    expression: Expression::Identifier(Identifier::new(output, output_span)),
                    alias,
                    span: item_start..self.prev_end(),
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        Ok(Clause::Call(CallClause {
            name: SmolStr::new(name),
            name_span,
            args,
            yield_items,
            span: start..self.prev_end(),
        }))
    }

    fn parse_union(&mut self) -> PResult<Clause> {
        let start = self.peek().span.start;
        self.advance(); // UNION
        let all = if self.at(TokenKind::Identifier)
            && self.peek().text.eq_ignore_ascii_case("all")
        {
            self.advance();
            true
        } else {
            false
        };
        Ok(Clause::Union(UnionClause {
            all,
            span: start..self.prev_end(),
        }))
    }

    fn parse_load_csv(&mut self) -> PResult<Clause> {
        let start = self.peek().span.start;
        self.advance(); // LOAD
        self.expect(TokenKind::Csv, "CSV after LOAD")?;
        let with_headers = if self.at(TokenKind::With) {
            self.advance();
            self.expect(TokenKind::Headers, "HEADERS after WITH")?;
            true
        } else {
            false
        };
        self.expect(TokenKind::From, "FROM in LOAD CSV")?;
        let source = self.parse_expression()?;
        self.expect(TokenKind::As, "AS in LOAD CSV")?;
        let (name, name_span) = self.expect_name("the LOAD CSV row variable")?;
        Ok(Clause::LoadCsv(LoadCsvClause {
            with_headers,
            source,
            alias: Identifier::new(name, name_span),
            span: start..self.prev_end(),
        }))
    }

    /// Consumes an unsupported clause up to the next clause boundary.
    fn parse_unsupported(&mut self, kind: &'static str) -> PResult<Clause> {
        let start = self.peek().span.start;
        self.advance();
        while !self.at_clause_boundary() {
            self.advance();
        }
        Ok(Clause::Unsupported {
            kind,
            span: start..self.prev_end(),
        })
    }

    /// A `USING` token in clause position: `USING PERIODIC COMMIT` or a
    /// stray hint. Both are recognized only to be rejected.
    fn parse_using(&mut self) -> PResult<Clause> {
        let start = self.peek().span.start;
        self.advance(); // USING
        let kind = if self.eat(TokenKind::Periodic) {
            self.expect(TokenKind::Commit, "COMMIT after PERIODIC")?;
            self.eat(TokenKind::Integer);
            "USING PERIODIC COMMIT"
        } else {
            while !self.at_clause_boundary() {
                self.advance();
            }
            "USING"
        };
        Ok(Clause::Unsupported {
            kind,
            span: start..self.prev_end(),
        })
    }
}
