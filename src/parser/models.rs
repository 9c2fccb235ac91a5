//! `model(...)` selector parsing
//!
//! The selector is handed to the primary expression grammar first. If that
//! fails, the input is rewound and the legacy positional grammar gets a try;
//! a legacy selector parses fine but earns a deprecation warning pointing at
//! its modern spelling.

use crate::diagnostics::ParserStatus;
use crate::el::Expression;
use crate::parser::ast::ModelDefinition;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{DefParser, ParseError};
use tracing::trace;

impl<'a> DefParser<'a> {
    pub(crate) fn parse_model(&mut self, status: &mut dyn ParserStatus) -> Result<ModelDefinition, ParseError> {
        self.expect_next(&[TokenKind::OpenParen])?;

        let snapshot = self.lexer.snapshot();
        let location = self.lexer.location();

        let primary_error = match self.parse_model_clause(false) {
            Ok(expression) => return Ok(ModelDefinition::new(expression)),
            Err(err) => err,
        };
        trace!(%primary_error, "model expression rejected, trying legacy grammar");

        self.lexer.restore(snapshot);
        match self.parse_model_clause(true) {
            Ok(expression) => {
                status.warn(
                    location,
                    &format!("Legacy model expressions are deprecated, replace with '{expression}'"),
                );
                Ok(ModelDefinition::new(expression))
            }
            Err(_) => {
                self.lexer.restore(snapshot);
                Err(primary_error)
            }
        }
    }

    /// Run one grammar over the shared cursor, then require the closing `)`.
    fn parse_model_clause(&mut self, legacy: bool) -> Result<Expression, ParseError> {
        let grammar = if legacy { &self.legacy_grammar } else { &self.primary_grammar };
        let expression = grammar.parse(self.lexer.scanner_mut())?;
        self.expect_next(&[TokenKind::CloseParen])?;
        Ok(expression)
    }
}
