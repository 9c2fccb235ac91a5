//! # Introduction
//!
//! entdef reads the entity definition (`.def`) files used by Quake-family
//! level editors. Each definition is a comment block declaring one spawnable
//! entity class:
//!
//! ```text
//! /*QUAKED item_armor1 (0 .5 .8) (-16 -16 0) (16 16 32) SUSPENDED
//! {
//!   model({ "path": "progs/armor.mdl", "skin": 0 });
//! }
//! Green armor, +100 protection.
//! */
//! ```
//!
//! ## Parsing pipeline
//!
//! ```text
//! Source → Scanner → Lexer → DefParser → EntityDefinitions
//!                       ↘ model(...) → el grammars → Expression
//! ```
//!
//! 1. [`parser`]: tokenizes the source and builds [`EntityDefinition`]s,
//!    resolving `base("...")` inheritance along the way.
//! 2. [`el`]: the model selector language, with its primary and legacy
//!    grammars plugged into the definition parser.
//! 3. [`diagnostics`]: sinks for progress and non-fatal warnings.
//!
//! ```
//! use entdef::{CollectingStatus, DefParser, DEFAULT_ENTITY_COLOR};
//!
//! let source = "/*QUAKED light (1 1 0) (-8 -8 -8) (8 8 8)\nA light.\n*/";
//! let mut status = CollectingStatus::default();
//! let definitions = DefParser::new(source, DEFAULT_ENTITY_COLOR)
//!     .parse_definitions(&mut status)
//!     .unwrap();
//! assert_eq!(definitions[0].name(), "light");
//! ```

pub mod diagnostics;
pub mod el;
pub mod parser;

pub use diagnostics::{CollectingStatus, ParserStatus, TracingStatus, Warning};
pub use parser::ast::{
    AttributeDefinition, BoundingBox, Color, EntityDefinition, ModelDefinition, ModelSpecification,
    SourceLocation, Vec3,
};
pub use parser::constants::{DEFAULT_ENTITY_COLOR, SPAWNFLAGS};
pub use parser::parse::{DefParser, ParseError, Parsed};
