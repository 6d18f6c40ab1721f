//! Public error types for the Opal API.
//!
//! This module defines the stable error types exposed to library users.
//! Internal errors are converted to these public types at API boundaries.

use core::fmt;

use thiserror::Error;

use crate::parser::Span;

/// Public error type for all Opal operations.
///
/// This is the stable error type exposed to library users. Internal error
/// representations may change, but this public API remains stable.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid API usage (e.g., invalid UTF-8, wrong arena).
    #[error("API error: {0}")]
    Api(String),

    /// Compilation errors (syntax errors, type errors, recursion errors).
    ///
    /// Contains the source text and one or more diagnostics with locations
    /// and context, so callers can render them however they like.
    #[error("compilation failed with {} error(s)", diagnostics.iter().filter(|d| d.severity == Severity::Error).count())]
    Compilation {
        /// The compiled source, kept for rendering. Not named `source`:
        /// thiserror reserves that name for the error-source chain.
        source_text: String,
        diagnostics: Vec<Diagnostic>,
    },
}

/// A diagnostic message (error, warning, or info) with source location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Which phase produced the diagnostic.
    pub kind: DiagnosticKind,

    /// Severity level (error, warning, info).
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Source location of the primary issue.
    pub span: Span,

    /// Related locations that provide additional context.
    pub related: Vec<RelatedInfo>,

    /// Optional help text suggesting how to fix the issue.
    pub help: Option<String>,

    /// Optional error code (e.g., "E001") for documentation lookup.
    pub code: Option<String>,
}

/// The taxonomy of compilation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The source does not parse.
    Syntax,
    /// The source parses but breaks a typing rule.
    Type,
    /// A definition irreducibly depends on itself.
    Recursion,
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - compilation cannot succeed.
    Error,
    /// Warning - suspicious code that might be wrong.
    Warning,
    /// Info - informational message.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Related information for a diagnostic (e.g., "declared here").
#[derive(Debug, Clone)]
pub struct RelatedInfo {
    /// Source location of the related information.
    pub span: Span,

    /// Message explaining the relevance.
    pub message: String,
}
