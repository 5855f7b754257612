//! Keyword recognition for Cypher.
//!
//! Cypher keywords are case-insensitive. Lookup is over the uppercased word;
//! anything not found here lexes as a plain identifier.

use super::token::TokenKind;

/// Returns the keyword token kind for a word, if it is a keyword.
pub fn keyword_kind(word: &str) -> Option<TokenKind> {
    // keywords are short, uppercase without allocation where possible
    let mut buf = [0u8; 16];
    if word.len() > buf.len() {
        return None;
    }
    for (i, b) in word.bytes().enumerate() {
        buf[i] = b.to_ascii_uppercase();
    }
    let upper = &buf[..word.len()];

    let kind = match upper {
        b"MATCH" => TokenKind::Match,
        b"OPTIONAL" => TokenKind::Optional,
        b"CREATE" => TokenKind::Create,
        b"MERGE" => TokenKind::Merge,
        b"DELETE" => TokenKind::Delete,
        b"DETACH" => TokenKind::Detach,
        b"SET" => TokenKind::Set,
        b"REMOVE" => TokenKind::Remove,
        b"WITH" => TokenKind::With,
        b"RETURN" => TokenKind::Return,
        b"UNWIND" => TokenKind::Unwind,
        b"FOREACH" => TokenKind::Foreach,
        b"CALL" => TokenKind::Call,
        b"YIELD" => TokenKind::Yield,
        b"UNION" => TokenKind::Union,
        b"WHERE" => TokenKind::Where,
        b"ORDER" => TokenKind::Order,
        b"BY" => TokenKind::By,
        b"ASC" | b"ASCENDING" => TokenKind::Asc,
        b"DESC" | b"DESCENDING" => TokenKind::Desc,
        b"SKIP" => TokenKind::Skip,
        b"LIMIT" => TokenKind::Limit,
        b"AS" => TokenKind::As,
        b"DISTINCT" => TokenKind::Distinct,
        b"ON" => TokenKind::On,
        b"LOAD" => TokenKind::Load,
        b"CSV" => TokenKind::Csv,
        b"FROM" => TokenKind::From,
        b"HEADERS" => TokenKind::Headers,
        b"START" => TokenKind::Start,
        b"USING" => TokenKind::Using,
        b"INDEX" => TokenKind::Index,
        b"SCAN" => TokenKind::Scan,
        b"JOIN" => TokenKind::Join,
        b"PERIODIC" => TokenKind::Periodic,
        b"COMMIT" => TokenKind::Commit,
        b"CONSTRAINT" => TokenKind::Constraint,
        b"DROP" => TokenKind::Drop,
        b"AND" => TokenKind::And,
        b"OR" => TokenKind::Or,
        b"XOR" => TokenKind::Xor,
        b"NOT" => TokenKind::Not,
        b"IN" => TokenKind::In,
        b"IS" => TokenKind::Is,
        b"STARTS" => TokenKind::Starts,
        b"ENDS" => TokenKind::Ends,
        b"CONTAINS" => TokenKind::Contains,
        b"NULL" => TokenKind::Null,
        b"TRUE" => TokenKind::True,
        b"FALSE" => TokenKind::False,
        b"CASE" => TokenKind::Case,
        b"WHEN" => TokenKind::When,
        b"THEN" => TokenKind::Then,
        b"ELSE" => TokenKind::Else,
        b"END" => TokenKind::End,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        assert_eq!(keyword_kind("match"), Some(TokenKind::Match));
        assert_eq!(keyword_kind("MATCH"), Some(TokenKind::Match));
        assert_eq!(keyword_kind("MaTcH"), Some(TokenKind::Match));
    }

    #[test]
    fn aliases_collapse() {
        assert_eq!(keyword_kind("ASCENDING"), Some(TokenKind::Asc));
        assert_eq!(keyword_kind("descending"), Some(TokenKind::Desc));
    }

    #[test]
    fn non_keywords_pass_through() {
        assert_eq!(keyword_kind("person"), None);
        assert_eq!(keyword_kind("shortestPath"), None);
        assert_eq!(keyword_kind("a_very_long_identifier_name"), None);
    }
}
