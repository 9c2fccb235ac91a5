//! Entity definition (`.def`) parser
//!
//! This module turns definition file text into entity class descriptors:
//! - [`lexer`]: the shared [`lexer::Scanner`] cursor and the definition tokenizer
//! - [`parse`]: the [`parse::DefParser`] coordinator and [`parse::ParseError`]
//! - [`ast`]: colors, bounds, attributes and entity definitions
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser over a lazily tokenized stream with
//! one token of lookahead. No external parser generator dependencies.

pub mod ast;
pub mod constants;
mod declarations;
pub mod lexer;
mod models;
pub mod parse;
