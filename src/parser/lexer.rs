//! Lexer (tokenizer) for entity definition files
//!
//! Two layers live here:
//! - [`Scanner`]: a copyable character cursor over the borrowed source. It
//!   owns the position (byte offset, line, column) and the primitive reads
//!   every tokenizer in the crate is built from. Sub-parsers for model
//!   expressions borrow the same scanner, so they resume exactly where the
//!   definition lexer stopped.
//! - [`Lexer`]: the definition-file tokenizer with one token of lookahead.
//!
//! Tokens are produced on demand; the lexer never materializes the full stream.

use super::ast::SourceLocation;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Characters that terminate a bare word or number.
pub const WORD_DELIMS: &str = " \t\n\r()[]{};,=";

/// Whitespace as the definition format understands it.
pub(crate) fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Resolve `\"` and `\\` escapes in a quoted string's interior.
///
/// Any other backslash is kept verbatim since model paths frequently use them.
pub(crate) fn unescape(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }

    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '"' || next == '\\' {
                    result.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        result.push(c);
    }
    Cow::Owned(result)
}

/// Lexer error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error(
        "Lexer error at line {}, column {}: unexpected character '{character}'",
        .location.line, .location.column
    )]
    UnexpectedCharacter {
        character: char,
        location: SourceLocation,
    },

    #[error(
        "Lexer error at line {}, column {}: unterminated quoted string",
        .location.line, .location.column
    )]
    UnterminatedString { location: SourceLocation },
}

impl LexError {
    pub fn location(&self) -> SourceLocation {
        match self {
            LexError::UnexpectedCharacter { location, .. }
            | LexError::UnterminatedString { location } => *location,
        }
    }
}

/// Saved scanner position, restorable with [`Scanner::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    offset: usize,
    line: usize,
    column: usize,
}

/// Character cursor shared by all tokenizers.
#[derive(Debug, Clone, Copy)]
pub struct Scanner<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.source.len()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.offset = snapshot.offset;
        self.line = snapshot.line;
        self.column = snapshot.column;
    }

    /// Fraction of the source consumed so far, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.source.is_empty() {
            1.0
        } else {
            self.offset as f64 / self.source.len() as f64
        }
    }

    /// Character under the cursor
    pub fn current(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    /// Character immediately after the one under the cursor
    pub fn look_ahead(&self) -> Option<char> {
        let mut chars = self.source[self.offset..].chars();
        chars.next();
        chars.next()
    }

    /// Consume one character, tracking line and column.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.current()?;
        self.offset += c.len_utf8();

        // CRLF counts as a single line break, on the '\n'
        let line_break = c == '\n' || (c == '\r' && self.current() != Some('\n'));
        if line_break {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(c)
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.source[start..end]
    }

    pub fn discard_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.current().is_some_and(&predicate) {
            self.advance();
        }
    }

    pub fn discard_until(&mut self, predicate: impl Fn(char) -> bool) {
        while self.current().is_some_and(|c| !predicate(c)) {
            self.advance();
        }
    }

    fn at_delimiter(&self, delims: &str) -> bool {
        self.current().map_or(true, |c| delims.contains(c))
    }

    fn skip_sign(&mut self) {
        if matches!(self.current(), Some('+') | Some('-')) {
            self.advance();
        }
    }

    fn skip_digits(&mut self) -> usize {
        let mut count = 0;
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            count += 1;
        }
        count
    }

    /// Read a signed integer that ends at a delimiter. Restores on failure.
    pub fn read_integer(&mut self, delims: &str) -> Option<&'a str> {
        let start = self.snapshot();
        self.skip_sign();
        if self.skip_digits() > 0 && self.at_delimiter(delims) {
            return Some(self.slice(start.offset, self.offset));
        }
        self.restore(start);
        None
    }

    /// Read a signed decimal (`1.5`, `-.5`, `2.`, `1e-3`) that ends at a
    /// delimiter. Restores on failure.
    pub fn read_decimal(&mut self, delims: &str) -> Option<&'a str> {
        let start = self.snapshot();
        self.skip_sign();
        let mut digits = self.skip_digits();
        if self.current() == Some('.') {
            self.advance();
            digits += self.skip_digits();
        }

        if digits > 0 && matches!(self.current(), Some('e') | Some('E')) {
            self.advance();
            self.skip_sign();
            if self.skip_digits() == 0 {
                self.restore(start);
                return None;
            }
        }

        if digits > 0 && self.at_delimiter(delims) {
            return Some(self.slice(start.offset, self.offset));
        }
        self.restore(start);
        None
    }

    /// Read up to the next delimiter; `None` if that would be empty.
    pub fn read_until(&mut self, delims: &str) -> Option<&'a str> {
        let start = self.offset;
        self.discard_until(|c| delims.contains(c));
        if self.offset == start {
            None
        } else {
            Some(self.slice(start, self.offset))
        }
    }

    /// Read a quoted string's raw interior. The cursor must be just past the
    /// opening quote; on success it ends up just past the closing one.
    /// Returns `None` when the input ends first.
    pub fn read_quoted_string(&mut self) -> Option<&'a str> {
        let start = self.offset;
        loop {
            match self.current()? {
                '"' => {
                    let end = self.offset;
                    self.advance();
                    return Some(self.slice(start, end));
                }
                '\\' => {
                    self.advance();
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Read raw text up to (not including) `marker`, or to the end of input.
    pub fn read_until_marker(&mut self, marker: &str) -> &'a str {
        let start = self.offset;
        let end = match self.source[start..].find(marker) {
            Some(index) => start + index,
            None => self.source.len(),
        };
        while self.offset < end {
            self.advance();
        }
        self.slice(start, end)
    }
}

/// Token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Integer,
    Decimal,
    QuotedString,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    Word,
    CommentOpen,
    CommentClose,
    Semicolon,
    Newline,
    Comma,
    Equals,
    Minus,
    Eof,
}

impl TokenKind {
    /// Human-readable name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Integer => "integer",
            TokenKind::Decimal => "decimal",
            TokenKind::QuotedString => "quoted string",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::OpenBrace => "'{'",
            TokenKind::CloseBrace => "'}'",
            TokenKind::Word => "word",
            TokenKind::CommentOpen => "'/*'",
            TokenKind::CommentClose => "'*/'",
            TokenKind::Semicolon => "';'",
            TokenKind::Newline => "newline",
            TokenKind::Comma => "','",
            TokenKind::Equals => "'='",
            TokenKind::Minus => "'-'",
            TokenKind::Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A token borrowed from the source buffer.
///
/// For [`TokenKind::QuotedString`] the text is the raw interior between the
/// quotes; use [`Token::string_value`] for the unescaped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub location: SourceLocation,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, text: &'a str, location: SourceLocation) -> Self {
        Self {
            kind,
            text,
            location,
        }
    }

    /// Check whether this token is one of `kinds`.
    pub fn is(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind)
    }

    pub fn string_value(&self) -> Cow<'a, str> {
        unescape(self.text)
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Integer | TokenKind::Decimal | TokenKind::Word => {
                write!(f, "{} '{}'", self.kind, self.text)
            }
            TokenKind::QuotedString => write!(f, "quoted string \"{}\"", self.text),
            _ => write!(f, "{}", self.kind),
        }
    }
}

/// Lexer for entity definition files
pub struct Lexer<'a> {
    scanner: Scanner<'a>,
    /// Cached lookahead and the scanner position just past it
    peeked: Option<(Token<'a>, Snapshot)>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source string.
    pub fn new(source: &'a str) -> Self {
        Self::from_scanner(Scanner::new(source))
    }

    /// Continue lexing from an existing cursor position.
    pub fn from_scanner(scanner: Scanner<'a>) -> Self {
        Self {
            scanner,
            peeked: None,
        }
    }

    /// Give the cursor back, positioned after the last consumed token.
    pub fn into_scanner(self) -> Scanner<'a> {
        self.scanner
    }

    /// Consume and return the next token.
    pub fn next(&mut self) -> Result<Token<'a>, LexError> {
        if let Some((token, after)) = self.peeked.take() {
            self.scanner.restore(after);
            return Ok(token);
        }
        self.scan()
    }

    /// Return the next token without consuming it.
    pub fn peek(&mut self) -> Result<Token<'a>, LexError> {
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

    pub fn snapshot(&self) -> Snapshot {
        self.scanner.snapshot()
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.peeked = None;
        self.scanner.restore(snapshot);
    }

    /// Position after the last consumed token
    pub fn location(&self) -> SourceLocation {
        self.scanner.location()
    }

    pub fn progress(&self) -> f64 {
        self.scanner.progress()
    }

    /// Slurp free-form text up to (not including) `marker`.
    pub fn read_until_marker(&mut self, marker: &str) -> &'a str {
        self.peeked = None;
        self.scanner.read_until_marker(marker)
    }

    /// Hand the shared cursor to a sub-parser. Pending lookahead is dropped,
    /// so the cursor sits right after the last consumed token.
    pub fn scanner_mut(&mut self) -> &mut Scanner<'a> {
        self.peeked = None;
        &mut self.scanner
    }

    fn token(&self, kind: TokenKind, start: usize, location: SourceLocation) -> Token<'a> {
        Token::new(kind, self.scanner.slice(start, self.scanner.offset()), location)
    }

    fn single(&mut self, kind: TokenKind, start: usize, location: SourceLocation) -> Token<'a> {
        self.scanner.advance();
        self.token(kind, start, location)
    }

    fn scan(&mut self) -> Result<Token<'a>, LexError> {
        loop {
            let start = self.scanner.offset();
            let location = self.scanner.location();
            let Some(c) = self.scanner.current() else {
                return Ok(Token::new(TokenKind::Eof, "", location));
            };
            let next = self.scanner.look_ahead();

            match c {
                '/' if next == Some('*') => {
                    // Swallow whatever is glued to the marker, usually QUAKED
                    self.scanner.discard_while(|c| !is_blank(c));
                    return Ok(self.token(TokenKind::CommentOpen, start, location));
                }
                '/' if next == Some('/') => {
                    self.scanner.discard_until(|c| c == '\n' || c == '\r');
                }
                '*' if next == Some('/') => {
                    self.scanner.advance();
                    self.scanner.advance();
                    return Ok(self.token(TokenKind::CommentClose, start, location));
                }
                '(' => return Ok(self.single(TokenKind::OpenParen, start, location)),
                ')' => return Ok(self.single(TokenKind::CloseParen, start, location)),
                '{' => return Ok(self.single(TokenKind::OpenBrace, start, location)),
                '}' => return Ok(self.single(TokenKind::CloseBrace, start, location)),
                '=' => return Ok(self.single(TokenKind::Equals, start, location)),
                ';' => return Ok(self.single(TokenKind::Semicolon, start, location)),
                ',' => return Ok(self.single(TokenKind::Comma, start, location)),
                '\r' | '\n' => {
                    self.scanner.advance();
                    if c == '\r' && self.scanner.current() == Some('\n') {
                        self.scanner.advance();
                    }
                    return Ok(self.token(TokenKind::Newline, start, location));
                }
                ' ' | '\t' => self.scanner.discard_while(|c| c == ' ' || c == '\t'),
                '"' => {
                    self.scanner.advance();
                    let text = self
                        .scanner
                        .read_quoted_string()
                        .ok_or(LexError::UnterminatedString { location })?;
                    return Ok(Token::new(TokenKind::QuotedString, text, location));
                }
                '-' if next.is_some_and(is_blank) => {
                    return Ok(self.single(TokenKind::Minus, start, location));
                }
                _ => return self.scan_word(c, location),
            }
        }
    }

    /// Integer, decimal or word, in that order of preference
    fn scan_word(&mut self, c: char, location: SourceLocation) -> Result<Token<'a>, LexError> {
        if let Some(text) = self.scanner.read_integer(WORD_DELIMS) {
            return Ok(Token::new(TokenKind::Integer, text, location));
        }
        if let Some(text) = self.scanner.read_decimal(WORD_DELIMS) {
            return Ok(Token::new(TokenKind::Decimal, text, location));
        }
        match self.scanner.read_until(WORD_DELIMS) {
            Some(text) => Ok(Token::new(TokenKind::Word, text, location)),
            None => Err(LexError::UnexpectedCharacter {
                character: c,
                location,
            }),
        }
    }
}
