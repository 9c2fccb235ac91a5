//! Recursive descent parser for the model expression language
//!
//! # Grammar
//!
//! ```text
//! expression  ::= or
//! or          ::= and ("||" and)*
//! and         ::= comparison ("&&" comparison)*
//! comparison  ::= bitwise (("==" | "!=" | "<" | "<=" | ">" | ">=") bitwise)?
//! bitwise     ::= unary (("&" | "|") unary)*
//! unary       ::= ("!" | "-") unary | primary
//! primary     ::= literal | name | "(" expression ")" | array | map | switch
//! array       ::= "[" (expression ("," expression)*)? "]"
//! map         ::= "{" (string ":" expression ("," string ":" expression)*)? "}"
//! switch      ::= "{" "{" (case ("," case)*)? "}" "}"
//! case        ::= expression ("->" expression)?
//! ```
//!
//! A map key is always a string, so `{` followed by `{` can only open a switch.

use super::expression::{BinaryOp, Expression, UnaryOp, Value};
use super::lexer::{ElLexer, ElToken, ElTokenKind};
use crate::parser::lexer::{unescape, Scanner};
use crate::parser::parse::ParseError;

pub struct ExpressionParser<'s, 'a> {
    lexer: ElLexer<'s, 'a>,
}

impl<'s, 'a> ExpressionParser<'s, 'a> {
    pub fn new(scanner: &'s mut Scanner<'a>) -> Self {
        Self {
            lexer: ElLexer::new(scanner),
        }
    }

    /// Parse one expression. Trailing input is left for the caller.
    pub fn parse(&mut self) -> Result<Expression, ParseError> {
        self.parse_expression()
    }

    fn peek(&mut self) -> Result<ElToken<'a>, ParseError> {
        Ok(self.lexer.peek()?)
    }

    fn advance(&mut self) -> Result<ElToken<'a>, ParseError> {
        Ok(self.lexer.next()?)
    }

    fn match_token(&mut self, kind: ElTokenKind) -> Result<bool, ParseError> {
        if self.peek()?.kind == kind {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: ElTokenKind) -> Result<ElToken<'a>, ParseError> {
        let token = self.advance()?;
        if token.kind == kind {
            Ok(token)
        } else {
            Err(ParseError::syntax(kind.name(), token.to_string(), token.location))
        }
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_and()?;
        while self.match_token(ElTokenKind::Or)? {
            let right = self.parse_and()?;
            left = Expression::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_comparison()?;
        while self.match_token(ElTokenKind::And)? {
            let right = self.parse_comparison()?;
            left = Expression::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_bitwise()?;
        let op = match self.peek()?.kind {
            ElTokenKind::Equal => BinaryOp::Equal,
            ElTokenKind::NotEqual => BinaryOp::NotEqual,
            ElTokenKind::Less => BinaryOp::Less,
            ElTokenKind::LessOrEqual => BinaryOp::LessOrEqual,
            ElTokenKind::Greater => BinaryOp::Greater,
            ElTokenKind::GreaterOrEqual => BinaryOp::GreaterOrEqual,
            _ => return Ok(left),
        };
        self.advance()?;
        let right = self.parse_bitwise()?;
        Ok(Expression::binary(op, left, right))
    }

    fn parse_bitwise(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek()?.kind {
                ElTokenKind::BitAnd => BinaryOp::BitwiseAnd,
                ElTokenKind::BitOr => BinaryOp::BitwiseOr,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = Expression::binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let op = match self.peek()?.kind {
            ElTokenKind::Not => UnaryOp::Not,
            ElTokenKind::Minus => UnaryOp::Negate,
            _ => return self.parse_primary(),
        };
        self.advance()?;
        let operand = self.parse_unary()?;
        Ok(Expression::Unary(op, Box::new(operand)))
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let token = self.advance()?;
        match token.kind {
            ElTokenKind::String => Ok(Expression::string(unescape(token.text))),
            ElTokenKind::Number => token
                .text
                .parse()
                .map(Expression::number)
                .map_err(|_| ParseError::invalid(format!("invalid number '{}'", token.text), token.location)),
            ElTokenKind::Boolean => Ok(Expression::Literal(Value::Boolean(token.text == "true"))),
            ElTokenKind::Null => Ok(Expression::Literal(Value::Null)),
            ElTokenKind::Name => Ok(Expression::variable(token.text)),
            ElTokenKind::OpenParen => {
                let expression = self.parse_expression()?;
                self.expect(ElTokenKind::CloseParen)?;
                Ok(expression)
            }
            ElTokenKind::OpenBracket => self.parse_array(),
            ElTokenKind::OpenBrace => {
                if self.match_token(ElTokenKind::OpenBrace)? {
                    self.parse_switch()
                } else {
                    self.parse_map()
                }
            }
            _ => Err(ParseError::syntax("expression", token.to_string(), token.location)),
        }
    }

    /// After `[`
    fn parse_array(&mut self) -> Result<Expression, ParseError> {
        let mut items = Vec::new();
        if !self.match_token(ElTokenKind::CloseBracket)? {
            loop {
                items.push(self.parse_expression()?);
                if !self.match_token(ElTokenKind::Comma)? {
                    break;
                }
            }
            self.expect(ElTokenKind::CloseBracket)?;
        }
        Ok(Expression::Array(items))
    }

    /// After `{`
    fn parse_map(&mut self) -> Result<Expression, ParseError> {
        let mut entries = Vec::new();
        if !self.match_token(ElTokenKind::CloseBrace)? {
            loop {
                let key = self.expect(ElTokenKind::String)?;
                self.expect(ElTokenKind::Colon)?;
                let value = self.parse_expression()?;
                entries.push((unescape(key.text).into_owned(), value));
                if !self.match_token(ElTokenKind::Comma)? {
                    break;
                }
            }
            self.expect(ElTokenKind::CloseBrace)?;
        }
        Ok(Expression::Map(entries))
    }

    /// After `{{`
    fn parse_switch(&mut self) -> Result<Expression, ParseError> {
        let mut cases = Vec::new();
        if self.peek()?.kind != ElTokenKind::CloseBrace {
            loop {
                cases.push(self.parse_case()?);
                if !self.match_token(ElTokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(ElTokenKind::CloseBrace)?;
        self.expect(ElTokenKind::CloseBrace)?;
        Ok(Expression::Switch(cases))
    }

    fn parse_case(&mut self) -> Result<Expression, ParseError> {
        let condition = self.parse_expression()?;
        if self.match_token(ElTokenKind::Arrow)? {
            let value = self.parse_expression()?;
            Ok(Expression::case(condition, value))
        } else {
            Ok(condition)
        }
    }
}

/// Parse a complete expression; trailing input is an error.
pub fn parse_expression(source: &str) -> Result<Expression, ParseError> {
    let mut scanner = Scanner::new(source);
    let mut parser = ExpressionParser::new(&mut scanner);
    let expression = parser.parse()?;
    parser.expect(ElTokenKind::Eof)?;
    Ok(expression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_map() {
        let expr = parse_expression(r#"{ "path": "progs/armor.mdl", "skin": 1 }"#).unwrap();
        assert_eq!(
            expr,
            Expression::Map(vec![
                ("path".into(), Expression::string("progs/armor.mdl")),
                ("skin".into(), Expression::number(1.0)),
            ])
        );
    }

    #[test]
    fn test_parse_switch_with_cases() {
        let expr = parse_expression(r#"{{ spawnflags & 1 -> "a.mdl", "b.mdl" }}"#).unwrap();
        assert_eq!(
            expr,
            Expression::Switch(vec![
                Expression::case(
                    Expression::binary(BinaryOp::BitwiseAnd, Expression::variable("spawnflags"), Expression::number(1.0)),
                    Expression::string("a.mdl"),
                ),
                Expression::string("b.mdl"),
            ])
        );
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("a || b && c == 1").unwrap();
        assert_eq!(
            expr,
            Expression::binary(
                BinaryOp::Or,
                Expression::variable("a"),
                Expression::binary(
                    BinaryOp::And,
                    Expression::variable("b"),
                    Expression::binary(BinaryOp::Equal, Expression::variable("c"), Expression::number(1.0)),
                ),
            )
        );
    }

    #[test]
    fn test_nested_map_closing_braces() {
        let expr = parse_expression(r#"{ "a": { "b": 1 }}"#).unwrap();
        assert!(matches!(expr, Expression::Map(ref entries) if entries.len() == 1));
    }

    #[rstest]
    #[case(r#""progs/player.mdl""#)]
    #[case(r#"{ "path": "progs/armor.mdl", "skin": 2, "frame": 0 }"#)]
    #[case(r#"{{ spawnflags == 1 -> { "path": "a.mdl" }, { "path": "b.mdl" } }}"#)]
    #[case("!(a || b) && -(1) < [1, 2, null]")]
    #[case(r#"{ "path": "progs\\weird \"name\".mdl" }"#)]
    fn test_display_round_trip(#[case] source: &str) {
        let expr = parse_expression(source).unwrap();
        let reparsed = parse_expression(&expr.to_string()).unwrap();
        assert_eq!(expr, reparsed);
    }

    #[rstest]
    #[case("{ path: 1 }")]
    #[case("[1, 2")]
    #[case("a = 1")]
    #[case("{{ a -> }}")]
    #[case("\"x\" 1")]
    fn test_rejects_malformed(#[case] source: &str) {
        assert!(parse_expression(source).is_err());
    }

    #[test]
    fn test_error_location() {
        let err = parse_expression("{ \"path\" 1 }").unwrap_err();
        assert_eq!(err.location().line, 1);
        assert_eq!(err.location().column, 10);
    }
}
