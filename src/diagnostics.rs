//! Diagnostic reporting with source locations.
//!
//! The analyzer reports user-visible faults through an injected [`Reporter`]
//! rather than a process-global sink, so tests can capture diagnostics
//! deterministically. Reporting is a side effect only: nothing here unwinds.

use crate::common::Pos;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Warning,
}

/// A single user-visible diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub pos: Pos,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    /// `<line>:<col> ***ERROR*** <message>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Fatal => "***ERROR***",
            Severity::Warning => "***WARNING***",
        };
        write!(f, "{} {} {}", self.pos, tag, self.message)
    }
}

/// Collects diagnostics in emission order.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
    had_fatal: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fatal (compilation-failing) diagnostic.
    pub fn fatal(&mut self, pos: Pos, message: impl Into<String>) {
        self.had_fatal = true;
        self.diagnostics.push(Diagnostic {
            pos,
            severity: Severity::Fatal,
            message: message.into(),
        });
    }

    pub fn warn(&mut self, pos: Pos, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            pos,
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    /// Whether any fatal diagnostic has been recorded.
    pub fn has_errors(&self) -> bool {
        self.had_fatal
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Fatal)
            .count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Print all diagnostics to stderr in emission order.
    pub fn emit_all(&self) {
        for diagnostic in &self.diagnostics {
            eprintln!("{diagnostic}");
        }
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
