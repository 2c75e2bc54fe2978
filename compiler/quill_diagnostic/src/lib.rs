//! Diagnostics for the Quill analyzer.
//!
//! All three error classes render to one shape:
//! - lexical errors (surfaced as token items, never fatal)
//! - syntax errors (absorbed by recovery, reported on placeholders)
//! - semantic errors (caught per declaration, never abort later ones)
//!
//! Rendering and wire serialization belong to the driver layer; this crate
//! only defines the in-memory shape that `errors()` surfaces.

use quill_ir::Span;
use std::fmt;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Which analysis phase produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Lexical,
    Syntax,
    Semantic,
}

/// A single diagnostic with its primary span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub phase: Phase,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    /// A lexical error diagnostic.
    pub fn lexical(span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            phase: Phase::Lexical,
            span,
            message: message.into(),
        }
    }

    /// A syntax-recovery diagnostic.
    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            phase: Phase::Syntax,
            span,
            message: message.into(),
        }
    }

    /// A semantic error diagnostic.
    pub fn semantic(span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            phase: Phase::Semantic,
            span,
            message: message.into(),
        }
    }

    /// A semantic warning diagnostic.
    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            phase: Phase::Semantic,
            span,
            message: message.into(),
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.severity, self.span, self.message)
    }
}
