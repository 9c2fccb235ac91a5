//! Main parser coordinator
//!
//! This module provides the [`DefParser`] struct and core parsing
//! infrastructure: the error type, token helpers and the top-level loop.
//!
//! # Parser Architecture
//!
//! - This module: DefParser struct, helper methods, and coordination
//! - `declarations`: one class definition, its header and attribute block
//! - `models`: the `model(...)` selector and its grammar fallback
//!
//! Parser methods are split across multiple files using `impl DefParser`
//! blocks, each extending the parser with related functionality while sharing
//! the lexer and the base-class table.

use crate::diagnostics::ParserStatus;
use crate::el::{ExpressionGrammar, LegacyGrammar, ModelGrammar};
use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lexical(#[from] LexError),

    #[error(
        "Parse error at line {}, column {}: expected {expected}, found {found}",
        .location.line, .location.column
    )]
    Syntax {
        expected: String,
        found: String,
        location: SourceLocation,
    },

    #[error("Parse error at line {}, column {}: {message}", .location.line, .location.column)]
    Invalid {
        message: String,
        location: SourceLocation,
    },
}

impl ParseError {
    pub fn syntax(
        expected: impl Into<String>,
        found: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        ParseError::Syntax {
            expected: expected.into(),
            found: found.into(),
            location,
        }
    }

    /// `token` is none of `kinds`
    pub fn expected(kinds: &[TokenKind], token: &Token<'_>) -> Self {
        let expected = kinds
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(" or ");
        Self::syntax(expected, token.to_string(), token.location)
    }

    pub fn invalid(message: impl Into<String>, location: SourceLocation) -> Self {
        ParseError::Invalid {
            message: message.into(),
            location,
        }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            ParseError::Lexical(err) => err.location(),
            ParseError::Syntax { location, .. } | ParseError::Invalid { location, .. } => *location,
        }
    }
}

/// Pass `token` through if it is one of `kinds`.
pub fn expect<'a>(kinds: &[TokenKind], token: Token<'a>) -> Result<Token<'a>, ParseError> {
    if token.is(kinds) {
        Ok(token)
    } else {
        Err(ParseError::expected(kinds, &token))
    }
}

/// Outcome of parsing one class definition
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// No further definitions in the input
    End,
    /// A base class was stored for later inheritance
    Base(String),
    Entity(EntityDefinition),
}

/// Recursive descent parser for entity definition files
pub struct DefParser<'a> {
    pub(crate) lexer: Lexer<'a>,
    pub(crate) default_color: Color,
    pub(crate) base_classes: FxHashMap<String, ClassInfo>,
    pub(crate) primary_grammar: Box<dyn ModelGrammar>,
    pub(crate) legacy_grammar: Box<dyn ModelGrammar>,
}

impl<'a> DefParser<'a> {
    pub fn new(source: &'a str, default_color: Color) -> Self {
        Self {
            lexer: Lexer::new(source),
            default_color,
            base_classes: FxHashMap::default(),
            primary_grammar: Box::new(ExpressionGrammar),
            legacy_grammar: Box::new(LegacyGrammar),
        }
    }

    /// Replace the sub-parsers used for `model(...)` selectors.
    pub fn with_model_grammars(
        mut self,
        primary: Box<dyn ModelGrammar>,
        legacy: Box<dyn ModelGrammar>,
    ) -> Self {
        self.primary_grammar = primary;
        self.legacy_grammar = legacy;
        self
    }

    /// Parse every definition in the input.
    ///
    /// Base classes are kept internally and never returned. On error nothing
    /// parsed so far is returned.
    pub fn parse_definitions(
        &mut self,
        status: &mut dyn ParserStatus,
    ) -> Result<Vec<EntityDefinition>, ParseError> {
        let mut definitions = Vec::new();
        loop {
            let parsed = self.parse_definition(status)?;
            status.progress(self.lexer.progress());
            match parsed {
                Parsed::End => break,
                Parsed::Base(_) => {}
                Parsed::Entity(definition) => definitions.push(definition),
            }
        }
        Ok(definitions)
    }

    /// Names of the base classes collected so far
    pub fn base_class_names(&self) -> impl Iterator<Item = &str> {
        self.base_classes.keys().map(String::as_str)
    }

    // ===== Helper methods =====

    pub(crate) fn next_token(&mut self) -> Result<Token<'a>, ParseError> {
        Ok(self.lexer.next()?)
    }

    pub(crate) fn peek_token(&mut self) -> Result<Token<'a>, ParseError> {
        Ok(self.lexer.peek()?)
    }

    pub(crate) fn expect_next(&mut self, kinds: &[TokenKind]) -> Result<Token<'a>, ParseError> {
        let token = self.next_token()?;
        expect(kinds, token)
    }

    pub(crate) fn peek_token_ignoring_newlines(&mut self) -> Result<Token<'a>, ParseError> {
        while self.peek_token()?.kind == TokenKind::Newline {
            self.next_token()?;
        }
        self.peek_token()
    }

    pub(crate) fn next_token_ignoring_newlines(&mut self) -> Result<Token<'a>, ParseError> {
        self.peek_token_ignoring_newlines()?;
        self.next_token()
    }

    pub(crate) fn expect_next_ignoring_newlines(
        &mut self,
        kinds: &[TokenKind],
    ) -> Result<Token<'a>, ParseError> {
        let token = self.next_token_ignoring_newlines()?;
        expect(kinds, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingStatus;
    use crate::parser::constants::DEFAULT_ENTITY_COLOR;

    fn parse(source: &str) -> Result<Vec<EntityDefinition>, ParseError> {
        let mut status = CollectingStatus::default();
        DefParser::new(source, DEFAULT_ENTITY_COLOR).parse_definitions(&mut status)
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("// nothing but a comment\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_brush_and_point() {
        let source = "/*QUAKED func_wall (0 .5 .8) ?\nA wall.\n*/\n\
                      /*QUAKED light (1 1 0) (-8 -8 -8) (8 8 8)\n*/\n";
        let definitions = parse(source).unwrap();

        assert_eq!(definitions.len(), 2);
        assert!(!definitions[0].is_point());
        assert_eq!(definitions[0].name(), "func_wall");
        assert_eq!(definitions[0].description(), "A wall.");
        assert!(definitions[1].is_point());
    }

    #[test]
    fn test_base_classes_are_not_emitted() {
        let source = "/*QUAKED Base\n*/\n/*QUAKED Other\n*/\n";
        let mut parser = DefParser::new(source, DEFAULT_ENTITY_COLOR);
        let definitions = parser
            .parse_definitions(&mut CollectingStatus::default())
            .unwrap();

        assert!(definitions.is_empty());
        let mut names: Vec<_> = parser.base_class_names().collect();
        names.sort_unstable();
        assert_eq!(names, ["Base", "Other"]);
    }

    #[test]
    fn test_progress_reaches_end() {
        let mut status = CollectingStatus::default();
        DefParser::new("/*QUAKED a (1 0 0) ?\n*/", DEFAULT_ENTITY_COLOR)
            .parse_definitions(&mut status)
            .unwrap();
        assert_eq!(status.progress, 1.0);
    }

    #[test]
    fn test_error_display() {
        let err = parse("/*QUAKED light (1 0 0) (0 0 0) (8 8 8) */").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parse error at line 1, column 40: expected newline, found '*/'"
        );
    }
}
