//! Legacy positional model grammar
//!
//! Older definition files spell model selectors positionally:
//!
//! ```text
//! model("progs/armor.mdl" 1)                          static, skin 1
//! model("progs/a.mdl" spawnflags = 1, "progs/b.mdl")  conditional static
//! model(pathKey = "model" skinKey = "skin")           dynamic, read from attributes
//! ```
//!
//! Each entry is translated into the expression language so the result can be
//! evaluated like any other selector and printed in its modern spelling.

use super::expression::{BinaryOp, Expression};
use crate::parser::lexer::{Lexer, Scanner, Token, TokenKind};
use crate::parser::parse::{expect, ParseError};

pub struct LegacyModelParser<'s, 'a> {
    scanner: &'s mut Scanner<'a>,
}

impl<'s, 'a> LegacyModelParser<'s, 'a> {
    pub fn new(scanner: &'s mut Scanner<'a>) -> Self {
        Self { scanner }
    }

    /// Parse a comma separated list of entries. The closing `)` is left for
    /// the caller.
    pub fn parse(&mut self) -> Result<Expression, ParseError> {
        let mut lexer = Lexer::from_scanner(*self.scanner);
        let result = parse_entries(&mut lexer);
        *self.scanner = lexer.into_scanner();
        result
    }
}

fn peek_ignoring_newlines<'a>(lexer: &mut Lexer<'a>) -> Result<Token<'a>, ParseError> {
    while lexer.peek()?.kind == TokenKind::Newline {
        lexer.next()?;
    }
    Ok(lexer.peek()?)
}

fn next_ignoring_newlines<'a>(lexer: &mut Lexer<'a>) -> Result<Token<'a>, ParseError> {
    peek_ignoring_newlines(lexer)?;
    Ok(lexer.next()?)
}

fn parse_entries(lexer: &mut Lexer<'_>) -> Result<Expression, ParseError> {
    let mut entries = vec![parse_entry(lexer)?];
    while peek_ignoring_newlines(lexer)?.kind == TokenKind::Comma {
        lexer.next()?;
        entries.push(parse_entry(lexer)?);
    }

    // a lone unconditional entry needs no switch around it
    if entries.len() == 1 && !matches!(entries[0], Expression::Case(_, _)) {
        return Ok(entries.remove(0));
    }
    Ok(Expression::Switch(entries))
}

fn parse_entry(lexer: &mut Lexer<'_>) -> Result<Expression, ParseError> {
    let token = peek_ignoring_newlines(lexer)?;
    match token.kind {
        TokenKind::QuotedString => parse_static(lexer),
        TokenKind::Word => parse_dynamic(lexer),
        _ => Err(ParseError::expected(&[TokenKind::QuotedString, TokenKind::Word], &token)),
    }
}

/// `"path" [skin [frame]] [key = value]`
fn parse_static(lexer: &mut Lexer<'_>) -> Result<Expression, ParseError> {
    let path = expect(&[TokenKind::QuotedString], next_ignoring_newlines(lexer)?)?;
    let mut entries = vec![("path".to_string(), Expression::string(path.string_value()))];

    for key in ["skin", "frame"] {
        if peek_ignoring_newlines(lexer)?.kind != TokenKind::Integer {
            break;
        }
        let token = lexer.next()?;
        entries.push((key.to_string(), Expression::number(parse_integer(&token)?)));
    }

    let model = Expression::Map(entries);
    if peek_ignoring_newlines(lexer)?.kind != TokenKind::Word {
        return Ok(model);
    }

    let key = lexer.next()?;
    expect(&[TokenKind::Equals], next_ignoring_newlines(lexer)?)?;
    let value = expect(
        &[TokenKind::QuotedString, TokenKind::Integer],
        next_ignoring_newlines(lexer)?,
    )?;
    let value = match value.kind {
        TokenKind::Integer => Expression::number(parse_integer(&value)?),
        _ => Expression::string(value.string_value()),
    };

    let condition = Expression::binary(BinaryOp::Equal, Expression::variable(key.text), value);
    Ok(Expression::case(condition, model))
}

/// `pathKey = "attr" [skinKey = "attr"] [frameKey = "attr"]`
fn parse_dynamic(lexer: &mut Lexer<'_>) -> Result<Expression, ParseError> {
    let mut path = None;
    let mut skin = None;
    let mut frame = None;

    while peek_ignoring_newlines(lexer)?.kind == TokenKind::Word {
        let key = lexer.next()?;
        expect(&[TokenKind::Equals], next_ignoring_newlines(lexer)?)?;
        let attribute = expect(&[TokenKind::QuotedString], next_ignoring_newlines(lexer)?)?;
        let variable = Some(Expression::variable(attribute.string_value()));

        match key.text {
            "pathKey" => path = variable,
            "skinKey" => skin = variable,
            "frameKey" => frame = variable,
            other => {
                return Err(ParseError::invalid(
                    format!("unknown model key '{other}'"),
                    key.location,
                ))
            }
        }
    }

    let location = lexer.location();
    let path = path.ok_or_else(|| ParseError::invalid("missing pathKey", location))?;
    let mut entries = vec![("path".to_string(), path)];
    entries.extend(skin.map(|skin| ("skin".to_string(), skin)));
    entries.extend(frame.map(|frame| ("frame".to_string(), frame)));
    Ok(Expression::Map(entries))
}

fn parse_integer(token: &Token<'_>) -> Result<f64, ParseError> {
    token
        .text
        .parse::<i64>()
        .map(|n| n as f64)
        .map_err(|_| ParseError::invalid(format!("invalid integer '{}'", token.text), token.location))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Expression, ParseError> {
        let mut scanner = Scanner::new(source);
        LegacyModelParser::new(&mut scanner).parse()
    }

    #[test]
    fn test_static_with_skin_and_frame() {
        assert_eq!(
            parse(r#""progs/armor.mdl" 1 2"#).unwrap(),
            Expression::Map(vec![
                ("path".into(), Expression::string("progs/armor.mdl")),
                ("skin".into(), Expression::number(1.0)),
                ("frame".into(), Expression::number(2.0)),
            ])
        );
    }

    #[test]
    fn test_conditional_entries_become_switch() {
        let expr = parse(r#""progs/a.mdl" spawnflags = 1, "progs/b.mdl""#).unwrap();
        assert_eq!(
            expr.to_string(),
            r#"{{ spawnflags == 1 -> { "path": "progs/a.mdl" }, { "path": "progs/b.mdl" } }}"#
        );
    }

    #[test]
    fn test_dynamic() {
        let expr = parse(r#"pathKey = "model" skinKey = "skin""#).unwrap();
        assert_eq!(expr.to_string(), r#"{ "path": model, "skin": skin }"#);
    }

    #[test]
    fn test_dynamic_requires_path_key() {
        assert!(parse(r#"skinKey = "skin""#).is_err());
    }

    #[test]
    fn test_stops_before_close_paren() {
        let mut scanner = Scanner::new(r#""a.mdl" 3)"#);
        LegacyModelParser::new(&mut scanner).parse().unwrap();
        assert_eq!(scanner.current(), Some(')'));
    }
}
