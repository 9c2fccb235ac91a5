//! Tokenizer for the model expression language
//!
//! Runs on a borrowed [`Scanner`] so that it starts where the definition lexer
//! stopped and leaves the cursor right after the last token it consumed.
//! Lookahead is undone before the cursor is handed back.

use crate::parser::ast::SourceLocation;
use crate::parser::lexer::{LexError, Scanner, Snapshot};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElTokenKind {
    String,
    Number,
    Boolean,
    Null,
    Name,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Comma,
    Colon,
    Arrow,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    And,
    Or,
    Not,
    BitAnd,
    BitOr,
    Minus,
    Eof,
}

impl ElTokenKind {
    pub fn name(self) -> &'static str {
        match self {
            ElTokenKind::String => "string",
            ElTokenKind::Number => "number",
            ElTokenKind::Boolean => "boolean",
            ElTokenKind::Null => "'null'",
            ElTokenKind::Name => "name",
            ElTokenKind::OpenParen => "'('",
            ElTokenKind::CloseParen => "')'",
            ElTokenKind::OpenBracket => "'['",
            ElTokenKind::CloseBracket => "']'",
            ElTokenKind::OpenBrace => "'{'",
            ElTokenKind::CloseBrace => "'}'",
            ElTokenKind::Comma => "','",
            ElTokenKind::Colon => "':'",
            ElTokenKind::Arrow => "'->'",
            ElTokenKind::Equal => "'=='",
            ElTokenKind::NotEqual => "'!='",
            ElTokenKind::Less => "'<'",
            ElTokenKind::LessOrEqual => "'<='",
            ElTokenKind::Greater => "'>'",
            ElTokenKind::GreaterOrEqual => "'>='",
            ElTokenKind::And => "'&&'",
            ElTokenKind::Or => "'||'",
            ElTokenKind::Not => "'!'",
            ElTokenKind::BitAnd => "'&'",
            ElTokenKind::BitOr => "'|'",
            ElTokenKind::Minus => "'-'",
            ElTokenKind::Eof => "end of input",
        }
    }
}

impl fmt::Display for ElTokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElToken<'a> {
    pub kind: ElTokenKind,
    /// Raw source text; the interior for strings
    pub text: &'a str,
    pub location: SourceLocation,
}

impl fmt::Display for ElToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ElTokenKind::Number | ElTokenKind::Name | ElTokenKind::Boolean => {
                write!(f, "{} '{}'", self.kind, self.text)
            }
            ElTokenKind::String => write!(f, "string \"{}\"", self.text),
            _ => write!(f, "{}", self.kind),
        }
    }
}

pub struct ElLexer<'s, 'a> {
    scanner: &'s mut Scanner<'a>,
    peeked: Option<(ElToken<'a>, Snapshot)>,
}

impl<'s, 'a> ElLexer<'s, 'a> {
    pub fn new(scanner: &'s mut Scanner<'a>) -> Self {
        Self {
            scanner,
            peeked: None,
        }
    }

    pub fn next(&mut self) -> Result<ElToken<'a>, LexError> {
        if let Some((token, after)) = self.peeked.take() {
            self.scanner.restore(after);
            return Ok(token);
        }
        self.scan()
    }

    pub fn peek(&mut self) -> Result<ElToken<'a>, LexError> {
        if let Some((token, _)) = self.peeked {
            return Ok(token);
        }

        let before = self.scanner.snapshot();
        let token = self.scan()?;
        let after = self.scanner.snapshot();
        self.scanner.restore(before);
        self.peeked = Some((token, after));
        Ok(token)
    }

    fn scan(&mut self) -> Result<ElToken<'a>, LexError> {
        self.scanner.discard_while(char::is_whitespace);

        let start = self.scanner.offset();
        let location = self.scanner.location();
        let Some(c) = self.scanner.current() else {
            return Ok(self.token(ElTokenKind::Eof, start, location));
        };
        let next = self.scanner.look_ahead();

        let kind = match c {
            '"' => {
                self.scanner.advance();
                let text = self
                    .scanner
                    .read_quoted_string()
                    .ok_or(LexError::UnterminatedString { location })?;
                return Ok(ElToken {
                    kind: ElTokenKind::String,
                    text,
                    location,
                });
            }
            '0'..='9' => return Ok(self.scan_number(start, location)),
            '-' if next.is_some_and(|n| n.is_ascii_digit()) => {
                self.scanner.advance();
                return Ok(self.scan_number(start, location));
            }
            c if c.is_alphabetic() || c == '_' => {
                self.scanner
                    .discard_while(|c| c.is_alphanumeric() || c == '_');
                let kind = match self.scanner.slice(start, self.scanner.offset()) {
                    "true" | "false" => ElTokenKind::Boolean,
                    "null" => ElTokenKind::Null,
                    _ => ElTokenKind::Name,
                };
                return Ok(self.token(kind, start, location));
            }
            '-' if next == Some('>') => self.double(ElTokenKind::Arrow),
            '=' if next == Some('=') => self.double(ElTokenKind::Equal),
            '!' if next == Some('=') => self.double(ElTokenKind::NotEqual),
            '<' if next == Some('=') => self.double(ElTokenKind::LessOrEqual),
            '>' if next == Some('=') => self.double(ElTokenKind::GreaterOrEqual),
            '&' if next == Some('&') => self.double(ElTokenKind::And),
            '|' if next == Some('|') => self.double(ElTokenKind::Or),
            '(' => self.single(ElTokenKind::OpenParen),
            ')' => self.single(ElTokenKind::CloseParen),
            '[' => self.single(ElTokenKind::OpenBracket),
            ']' => self.single(ElTokenKind::CloseBracket),
            '{' => self.single(ElTokenKind::OpenBrace),
            '}' => self.single(ElTokenKind::CloseBrace),
            ',' => self.single(ElTokenKind::Comma),
            ':' => self.single(ElTokenKind::Colon),
            '<' => self.single(ElTokenKind::Less),
            '>' => self.single(ElTokenKind::Greater),
            '!' => self.single(ElTokenKind::Not),
            '&' => self.single(ElTokenKind::BitAnd),
            '|' => self.single(ElTokenKind::BitOr),
            '-' => self.single(ElTokenKind::Minus),
            _ => {
                return Err(LexError::UnexpectedCharacter {
                    character: c,
                    location,
                })
            }
        };

        Ok(self.token(kind, start, location))
    }

    fn single(&mut self, kind: ElTokenKind) -> ElTokenKind {
        self.scanner.advance();
        kind
    }

    fn double(&mut self, kind: ElTokenKind) -> ElTokenKind {
        self.scanner.advance();
        self.scanner.advance();
        kind
    }

    /// Digits with an optional fraction; a leading '-' is already consumed.
    fn scan_number(&mut self, start: usize, location: SourceLocation) -> ElToken<'a> {
        self.scanner.discard_while(|c| c.is_ascii_digit());
        let fraction_follows = self.scanner.current() == Some('.')
            && self.scanner.look_ahead().is_some_and(|c| c.is_ascii_digit());
        if fraction_follows {
            self.scanner.advance();
            self.scanner.discard_while(|c| c.is_ascii_digit());
        }
        self.token(ElTokenKind::Number, start, location)
    }

    fn token(&self, kind: ElTokenKind, start: usize, location: SourceLocation) -> ElToken<'a> {
        ElToken {
            kind,
            text: self.scanner.slice(start, self.scanner.offset()),
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<ElTokenKind> {
        let mut scanner = Scanner::new(source);
        let mut lexer = ElLexer::new(&mut scanner);
        let mut kinds = Vec::new();
        loop {
            let token = lexer.next().unwrap();
            kinds.push(token.kind);
            if token.kind == ElTokenKind::Eof {
                return kinds;
            }
        }
    }

    #[test]
    fn test_operators() {
        use ElTokenKind::*;
        assert_eq!(
            kinds("== != < <= > >= && || ! & | -> -"),
            vec![
                Equal, NotEqual, Less, LessOrEqual, Greater, GreaterOrEqual, And, Or, Not, BitAnd,
                BitOr, Arrow, Minus, Eof
            ]
        );
    }

    #[test]
    fn test_literals() {
        use ElTokenKind::*;
        assert_eq!(
            kinds(r#"{ "path": -1.5, "x": true } [null, name_2]"#),
            vec![
                OpenBrace, String, Colon, Number, Comma, String, Colon, Boolean, CloseBrace,
                OpenBracket, Null, Comma, Name, CloseBracket, Eof
            ]
        );
    }

    #[test]
    fn test_single_equals_is_an_error() {
        let mut scanner = Scanner::new("a = 1");
        let mut lexer = ElLexer::new(&mut scanner);
        lexer.next().unwrap();
        assert!(matches!(
            lexer.next(),
            Err(LexError::UnexpectedCharacter { character: '=', .. })
        ));
    }

    #[test]
    fn test_peek_leaves_cursor_after_consumed_token() {
        let mut scanner = Scanner::new("\"a.mdl\" )");
        {
            let mut lexer = ElLexer::new(&mut scanner);
            assert_eq!(lexer.next().unwrap().text, "a.mdl");
            assert_eq!(lexer.peek().unwrap().kind, ElTokenKind::CloseParen);
        }
        assert_eq!(scanner.offset(), "\"a.mdl\"".len());
    }
}
