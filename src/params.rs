//! Query-parameter prefix parsing.
//!
//! A query may carry a `CYPHER name=value ...` prefix. [`strip_parameters`]
//! parses that prefix into a parameter map and returns the remaining query
//! body; the rest of the pipeline never sees the prefix.

use crate::diag::SourceFile;
use crate::error::QueryError;
use crate::lexer::token::{Token, TokenKind};
use crate::lexer::Lexer;
use indexmap::IndexMap;
use smol_str::SmolStr;

/// A parsed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    String(SmolStr),
    Boolean(bool),
    Null,
    /// A list or map value, kept as source text for the evaluator.
    Raw(String),
}

/// The parameter map of a query.
pub type Params = IndexMap<SmolStr, ParamValue>;

/// Strips a leading `CYPHER name=value ...` prefix off `query`, returning
/// the parameter map and the remaining query body.
pub fn strip_parameters(query: &str) -> Result<(Params, &str), QueryError> {
    let lexed = Lexer::new(query).tokenize();
    if !lexed.diagnostics.is_empty() {
        // a malformed body is reported by the parse stage with full context
        return Ok((Params::new(), query));
    }

    let tokens = &lexed.tokens;
    let first = match tokens.first() {
        Some(token) if token.kind == TokenKind::Identifier => token,
        _ => return Ok((Params::new(), query)),
    };
    if !first.text.eq_ignore_ascii_case("cypher") {
        return Ok((Params::new(), query));
    }

    let mut params = Params::new();
    let mut i = 1;
    loop {
        // a parameter entry is `name = value`
        let is_entry = name_like(tokens[i].kind) && tokens.get(i + 1).map(|t| t.kind) == Some(TokenKind::Eq);
        if !is_entry {
            break;
        }
        let name = tokens[i].text.clone();
        i += 2;
        let (value, next) = parse_value(query, tokens, i)?;
        params.insert(name, value);
        i = next;
    }

    if params.is_empty() {
        // `CYPHER` with no entries is not a parameter prefix
        return Ok((Params::new(), query));
    }

    let body_start = tokens[i].span.start;
    Ok((params, &query[body_start..]))
}

fn name_like(kind: TokenKind) -> bool {
    kind == TokenKind::Identifier || kind.is_keyword()
}

fn parse_value(
    query: &str,
    tokens: &[Token],
    i: usize,
) -> Result<(ParamValue, usize), QueryError> {
    let token = &tokens[i];
    let value = match token.kind {
        TokenKind::Integer => {
            let text = token.text.as_str();
            let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                i64::from_str_radix(hex, 16).ok()
            } else {
                text.parse::<i64>().ok()
            };
            match parsed {
                Some(v) => ParamValue::Integer(v),
                None => return Err(param_error(query, token, "integer parameter out of range")),
            }
        }
        TokenKind::Float => ParamValue::Float(token.text.parse::<f64>().unwrap_or(f64::NAN)),
        TokenKind::String => ParamValue::String(token.text.clone()),
        TokenKind::True => ParamValue::Boolean(true),
        TokenKind::False => ParamValue::Boolean(false),
        TokenKind::Null => ParamValue::Null,
        TokenKind::Minus => {
            let (inner, next) = parse_value(query, tokens, i + 1)?;
            let negated = match inner {
                ParamValue::Integer(v) => ParamValue::Integer(-v),
                ParamValue::Float(v) => ParamValue::Float(-v),
                _ => return Err(param_error(query, token, "invalid parameter value")),
            };
            return Ok((negated, next));
        }
        TokenKind::LBracket => return parse_raw_group(query, tokens, i, TokenKind::LBracket, TokenKind::RBracket),
        TokenKind::LBrace => return parse_raw_group(query, tokens, i, TokenKind::LBrace, TokenKind::RBrace),
        _ => return Err(param_error(query, token, "invalid parameter value")),
    };
    Ok((value, i + 1))
}

fn parse_raw_group(
    query: &str,
    tokens: &[Token],
    i: usize,
    open: TokenKind,
    close: TokenKind,
) -> Result<(ParamValue, usize), QueryError> {
    let start = tokens[i].span.start;
    let mut depth = 0usize;
    let mut j = i;
    loop {
        let token = &tokens[j];
        if token.kind == TokenKind::Eof {
            return Err(param_error(query, token, "unbalanced parameter value"));
        }
        if token.kind == open {
            depth += 1;
        } else if token.kind == close {
            depth -= 1;
            if depth == 0 {
                let end = token.span.end;
                return Ok((ParamValue::Raw(query[start..end].to_string()), j + 1));
            }
        }
        j += 1;
    }
}

fn param_error(query: &str, token: &Token, message: &str) -> QueryError {
    let source = SourceFile::new(query);
    let (line, column) = source.line_column(token.span.start);
    let (context, context_offset) = source.context(token.span.start);
    QueryError::Parser {
        message: message.to_string(),
        line,
        column,
        offset: token.span.start,
        context: context.to_string(),
        context_offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_prefix_passes_through() {
        let (params, body) = strip_parameters("MATCH (n) RETURN n").unwrap();
        assert!(params.is_empty());
        assert_eq!(body, "MATCH (n) RETURN n");
    }

    #[test]
    fn scalar_parameters() {
        let (params, body) =
            strip_parameters("CYPHER a=1 b=2.5 c='str' d=true e=null MATCH (n) RETURN n").unwrap();
        assert_eq!(params.len(), 5);
        assert_eq!(params["a"], ParamValue::Integer(1));
        assert_eq!(params["b"], ParamValue::Float(2.5));
        assert_eq!(params["c"], ParamValue::String("str".into()));
        assert_eq!(params["d"], ParamValue::Boolean(true));
        assert_eq!(params["e"], ParamValue::Null);
        assert_eq!(body, "MATCH (n) RETURN n");
    }

    #[test]
    fn negative_and_composite_values() {
        let (params, body) =
            strip_parameters("CYPHER n=-3 list=[1, 2, 3] map={k: 1} RETURN $n").unwrap();
        assert_eq!(params["n"], ParamValue::Integer(-3));
        assert_eq!(params["list"], ParamValue::Raw("[1, 2, 3]".to_string()));
        assert_eq!(params["map"], ParamValue::Raw("{k: 1}".to_string()));
        assert_eq!(body, "RETURN $n");
    }

    #[test]
    fn cypher_as_plain_identifier_is_not_a_prefix() {
        let (params, body) = strip_parameters("CYPHER").unwrap();
        assert!(params.is_empty());
        assert_eq!(body, "CYPHER");
    }

    #[test]
    fn invalid_value_is_rejected() {
        let err = strip_parameters("CYPHER a=( RETURN 1").unwrap_err();
        assert_eq!(err.code(), "ParserError");
    }
}
