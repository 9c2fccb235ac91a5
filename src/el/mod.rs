//! Model expression language
//!
//! Point entities pick their editor model with a small expression evaluated
//! against the entity's attributes:
//!
//! ```text
//! model({{ spawnflags & 1 -> "progs/a.mdl", { "path": "progs/b.mdl", "skin": skin } }})
//! ```
//!
//! - [`expression`]: AST, values, evaluation and the canonical spelling
//! - [`lexer`] / [`parser`]: the primary grammar
//! - [`legacy`]: the older positional grammar, translated into expressions
//!
//! Both grammars implement [`ModelGrammar`] and run on the definition
//! parser's [`Scanner`], so they resume exactly where it stopped.

pub mod expression;
pub mod legacy;
pub mod lexer;
pub mod parser;

pub use expression::{BinaryOp, EvaluationError, Expression, UnaryOp, Value, VariableStore};
pub use parser::parse_expression;

use crate::parser::lexer::Scanner;
use crate::parser::parse::ParseError;

/// A sub-parser for the contents of `model(...)`.
///
/// Implementations consume one selector from `scanner` and leave the cursor
/// just after it; the closing `)` is checked by the caller.
pub trait ModelGrammar: Send + Sync {
    fn parse(&self, scanner: &mut Scanner<'_>) -> Result<Expression, ParseError>;
}

/// The expression language grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionGrammar;

impl ModelGrammar for ExpressionGrammar {
    fn parse(&self, scanner: &mut Scanner<'_>) -> Result<Expression, ParseError> {
        parser::ExpressionParser::new(scanner).parse()
    }
}

/// The deprecated positional grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyGrammar;

impl ModelGrammar for LegacyGrammar {
    fn parse(&self, scanner: &mut Scanner<'_>) -> Result<Expression, ParseError> {
        legacy::LegacyModelParser::new(scanner).parse()
    }
}
