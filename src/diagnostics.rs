//! Progress and warning sinks for the parser
//!
//! Nothing reported here changes how parsing proceeds.

use crate::parser::ast::SourceLocation;
use tracing::{trace, warn};

pub trait ParserStatus {
    /// Fraction of the input consumed, in `0.0..=1.0`
    fn progress(&mut self, fraction: f64);

    fn warn(&mut self, location: SourceLocation, message: &str);
}

/// Forwards warnings to `tracing`.
#[derive(Debug, Default)]
pub struct TracingStatus {
    warnings: usize,
}

impl TracingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of warnings reported so far
    pub fn warning_count(&self) -> usize {
        self.warnings
    }
}

impl ParserStatus for TracingStatus {
    fn progress(&mut self, fraction: f64) {
        trace!(progress = fraction, "parsing");
    }

    fn warn(&mut self, location: SourceLocation, message: &str) {
        self.warnings += 1;
        warn!(line = location.line, column = location.column, "{message}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub location: SourceLocation,
    pub message: String,
}

/// Keeps every warning and the last progress value.
#[derive(Debug, Clone, Default)]
pub struct CollectingStatus {
    pub warnings: Vec<Warning>,
    pub progress: f64,
}

impl ParserStatus for CollectingStatus {
    fn progress(&mut self, fraction: f64) {
        self.progress = fraction;
    }

    fn warn(&mut self, location: SourceLocation, message: &str) {
        self.warnings.push(Warning {
            location,
            message: message.to_string(),
        });
    }
}
