use docstore_index::{Condition, FieldFilter};

use crate::error::QueryError;
use crate::structured::{Direction, OrderField, StructuredQuery, MAX_RESULTS_CAP};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    String(String),
    Star,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LParen,
    RParen,
    Eof,
}

fn tokenize(sql: &str) -> Result<Vec<Token>, QueryError> {
    let chars: Vec<char> = sql.chars().collect();
    let mut i = 0;
    let mut tokens = Vec::new();

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '*' {
            tokens.push(Token::Star);
            i += 1;
            continue;
        }
        if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
            continue;
        }
        if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
            continue;
        }
        if c == '=' {
            tokens.push(Token::Eq);
            i += 1;
            continue;
        }
        if c == '!' && chars.get(i + 1) == Some(&'=') {
            tokens.push(Token::NotEq);
            i += 2;
            continue;
        }
        if c == '<' {
            if chars.get(i + 1) == Some(&'=') {
                tokens.push(Token::LtEq);
                i += 2;
            } else {
                tokens.push(Token::Lt);
                i += 1;
            }
            continue;
        }
        if c == '>' {
            if chars.get(i + 1) == Some(&'=') {
                tokens.push(Token::GtEq);
                i += 2;
            } else {
                tokens.push(Token::Gt);
                i += 1;
            }
            continue;
        }
        if c == '\'' {
            let mut s = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                        s.push('\'');
                        i += 2;
                    }
                    Some('\'') => {
                        i += 1;
                        break;
                    }
                    Some(ch) => {
                        s.push(*ch);
                        i += 1;
                    }
                    None => return Err(QueryError::InvalidInput("unterminated string literal".into())),
                }
            }
            tokens.push(Token::String(s));
            continue;
        }
        if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            let start = i;
            i += 1;
            while chars.get(i).is_some_and(|n| n.is_ascii_digit() || *n == '.') {
                i += 1;
            }
            tokens.push(Token::Number(chars[start..i].iter().collect()));
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            i += 1;
            while chars.get(i).is_some_and(|n| n.is_ascii_alphanumeric() || *n == '_' || *n == '.') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }
        return Err(QueryError::InvalidInput(format!("unexpected character '{c}'")));
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(), QueryError> {
        match self.advance() {
            Token::Ident(s) if s.eq_ignore_ascii_case(expected) => Ok(()),
            other => Err(QueryError::InvalidInput(format!("expected '{expected}', found {other:?}"))),
        }
    }

    fn ident_is(&self, expected: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s.eq_ignore_ascii_case(expected))
    }
}

/// Parses `SELECT * FROM documents [WHERE ...] [ORDER BY ...] [LIMIT n]
/// [OFFSET n]` (§4.7). `OR` and parenthesized groups are rejected as
/// `InvalidInput` rather than silently flattened or ignored, per the
/// design decision on the source's AND-only grammar.
pub fn parse_sql(sql: &str, collection_id: &str) -> Result<StructuredQuery, QueryError> {
    let tokens = tokenize(sql)?;
    let mut parser = Parser { tokens, pos: 0 };

    parser.expect_ident("SELECT")?;
    match parser.advance() {
        Token::Star => {}
        other => return Err(QueryError::InvalidInput(format!("expected '*', found {other:?}"))),
    }
    parser.expect_ident("FROM")?;
    parser.expect_ident("documents")?;

    let mut query = StructuredQuery::new(collection_id);

    if parser.ident_is("WHERE") {
        parser.advance();
        query.filters = parse_where(&mut parser)?;
    }

    if parser.ident_is("ORDER") {
        parser.advance();
        parser.expect_ident("BY")?;
        let field = match parser.advance() {
            Token::Ident(s) => parse_order_field(&s)?,
            other => return Err(QueryError::InvalidInput(format!("expected order field, found {other:?}"))),
        };
        let direction = if parser.ident_is("ASC") {
            parser.advance();
            Direction::Asc
        } else if parser.ident_is("DESC") {
            parser.advance();
            Direction::Desc
        } else {
            Direction::Asc
        };
        query.ordering = Some(crate::structured::Ordering { field, direction });
    }

    if parser.ident_is("LIMIT") {
        parser.advance();
        let n = parse_usize(&mut parser)?;
        query.max_results = n.min(MAX_RESULTS_CAP);
    }

    if parser.ident_is("OFFSET") {
        parser.advance();
        query.skip = parse_usize(&mut parser)?;
    }

    match parser.peek() {
        Token::Eof => Ok(query),
        other => Err(QueryError::InvalidInput(format!("unexpected trailing token {other:?}"))),
    }
}

fn parse_order_field(s: &str) -> Result<OrderField, QueryError> {
    match s {
        "created_utc" => Ok(OrderField::CreatedUtc),
        "last_update_utc" => Ok(OrderField::LastUpdateUtc),
        "name" => Ok(OrderField::Name),
        other => Err(QueryError::InvalidInput(format!("unsupported order field '{other}'"))),
    }
}

fn parse_usize(parser: &mut Parser) -> Result<usize, QueryError> {
    match parser.advance() {
        Token::Number(n) => n
            .parse::<usize>()
            .map_err(|_| QueryError::InvalidInput(format!("expected non-negative integer, found '{n}'"))),
        other => Err(QueryError::InvalidInput(format!("expected a number, found {other:?}"))),
    }
}

fn parse_where(parser: &mut Parser) -> Result<Vec<FieldFilter>, QueryError> {
    let mut filters = Vec::new();
    loop {
        if matches!(parser.peek(), Token::LParen | Token::RParen) {
            return Err(QueryError::InvalidInput(
                "parenthesized groups are not supported".into(),
            ));
        }

        filters.push(parse_condition(parser)?);

        if parser.ident_is("AND") {
            parser.advance();
            continue;
        }
        if parser.ident_is("OR") {
            return Err(QueryError::InvalidInput("OR is not supported".into()));
        }
        break;
    }
    Ok(filters)
}

fn parse_condition(parser: &mut Parser) -> Result<FieldFilter, QueryError> {
    let field_path = match parser.advance() {
        Token::Ident(s) => s,
        other => return Err(QueryError::InvalidInput(format!("expected field name, found {other:?}"))),
    };

    if parser.ident_is("IS") {
        parser.advance();
        if parser.ident_is("NOT") {
            parser.advance();
            parser.expect_ident("NULL")?;
            return Ok(FieldFilter { field_path, condition: Condition::IsNotNull, value: None });
        }
        parser.expect_ident("NULL")?;
        return Ok(FieldFilter { field_path, condition: Condition::IsNull, value: None });
    }

    if parser.ident_is("LIKE") {
        parser.advance();
        let value = parse_literal(parser)?;
        return Ok(FieldFilter { field_path, condition: Condition::Like, value: Some(value) });
    }

    let condition = match parser.advance() {
        Token::Eq => Condition::Equals,
        Token::NotEq => Condition::NotEquals,
        Token::Lt => Condition::LessThan,
        Token::LtEq => Condition::LessOrEqual,
        Token::Gt => Condition::GreaterThan,
        Token::GtEq => Condition::GreaterOrEqual,
        other => return Err(QueryError::InvalidInput(format!("expected an operator, found {other:?}"))),
    };
    let value = parse_literal(parser)?;
    Ok(FieldFilter { field_path, condition, value: Some(value) })
}

fn parse_literal(parser: &mut Parser) -> Result<String, QueryError> {
    match parser.advance() {
        Token::String(s) => Ok(s),
        Token::Number(n) => Ok(n),
        Token::Ident(s) if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") => {
            Ok(s.to_ascii_lowercase())
        }
        other => Err(QueryError::InvalidInput(format!("expected a literal value, found {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_select() {
        let q = parse_sql("SELECT * FROM documents", "c1").unwrap();
        assert!(q.filters.is_empty());
        assert_eq!(q.max_results, MAX_RESULTS_CAP);
    }

    #[test]
    fn parses_where_and_order_and_limit() {
        let q = parse_sql(
            "SELECT * FROM documents WHERE age > 30 AND first LIKE 'J%' ORDER BY name ASC LIMIT 10",
            "c1",
        )
        .unwrap();
        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.filters[0].field_path, "age");
        assert_eq!(q.filters[0].condition, Condition::GreaterThan);
        assert_eq!(q.filters[1].condition, Condition::Like);
        assert_eq!(q.max_results, 10);
        let ordering = q.ordering.unwrap();
        assert_eq!(ordering.field, OrderField::Name);
        assert_eq!(ordering.direction, Direction::Asc);
    }

    #[test]
    fn rejects_or() {
        let err = parse_sql("SELECT * FROM documents WHERE a = 1 OR b = 2", "c1").unwrap_err();
        assert!(matches!(err, QueryError::InvalidInput(_)));
    }

    #[test]
    fn rejects_parentheses() {
        let err = parse_sql("SELECT * FROM documents WHERE (a = 1)", "c1").unwrap_err();
        assert!(matches!(err, QueryError::InvalidInput(_)));
    }

    #[test]
    fn limit_is_capped() {
        let q = parse_sql("SELECT * FROM documents LIMIT 999999", "c1").unwrap();
        assert_eq!(q.max_results, MAX_RESULTS_CAP);
    }

    #[test]
    fn is_null_and_is_not_null() {
        let q = parse_sql("SELECT * FROM documents WHERE a IS NULL AND b IS NOT NULL", "c1").unwrap();
        assert_eq!(q.filters[0].condition, Condition::IsNull);
        assert_eq!(q.filters[1].condition, Condition::IsNotNull);
    }
}
