use crate::api::{Diagnostic, DiagnosticKind, Severity};

use super::syntax::Span;

/// Syntax error produced by the lexer or parser.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone)]
pub enum ParseErrorKind {
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    UnexpectedChar {
        found: char,
        span: Span,
    },
    UnterminatedString {
        span: Span,
    },
    InvalidEscape {
        span: Span,
    },
    InvalidNumber {
        text: String,
        span: Span,
    },
    InvalidAssignmentTarget {
        span: Span,
    },
    OptionalBeforeRequired {
        name: String,
        span: Span,
    },
}

impl ParseErrorKind {
    pub fn span(&self) -> Span {
        match self {
            ParseErrorKind::UnexpectedToken { span, .. } => span.clone(),
            ParseErrorKind::UnexpectedChar { span, .. } => span.clone(),
            ParseErrorKind::UnterminatedString { span } => span.clone(),
            ParseErrorKind::InvalidEscape { span } => span.clone(),
            ParseErrorKind::InvalidNumber { span, .. } => span.clone(),
            ParseErrorKind::InvalidAssignmentTarget { span } => span.clone(),
            ParseErrorKind::OptionalBeforeRequired { span, .. } => span.clone(),
        }
    }
}

impl ParseError {
    pub fn new(kind: ParseErrorKind) -> Self {
        Self { kind }
    }

    /// Convert to a Diagnostic for the API boundary.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (message, code, help) = match &self.kind {
            ParseErrorKind::UnexpectedToken {
                expected, found, ..
            } => (
                format!("Expected {}, found {}", expected, found),
                Some("P001"),
                None,
            ),
            ParseErrorKind::UnexpectedChar { found, .. } => (
                format!("Unexpected character '{}'", found),
                Some("P002"),
                None,
            ),
            ParseErrorKind::UnterminatedString { .. } => (
                "Unterminated string literal".to_string(),
                Some("P003"),
                Some("Add a closing '\"' before the end of the line"),
            ),
            ParseErrorKind::InvalidEscape { .. } => (
                "Invalid escape sequence".to_string(),
                Some("P004"),
                Some("Supported escapes are \\n, \\t, \\\" and \\\\"),
            ),
            ParseErrorKind::InvalidNumber { text, .. } => (
                format!("Invalid number literal '{}'", text),
                Some("P005"),
                None,
            ),
            ParseErrorKind::InvalidAssignmentTarget { .. } => (
                "Invalid assignment target".to_string(),
                Some("P006"),
                Some("Only variables and member accesses can be assigned to"),
            ),
            ParseErrorKind::OptionalBeforeRequired { name, .. } => (
                format!(
                    "Optional parameter '{}' precedes a required parameter",
                    name
                ),
                Some("P007"),
                Some("Optional parameters must come after all required ones"),
            ),
        };

        Diagnostic {
            kind: DiagnosticKind::Syntax,
            severity: Severity::Error,
            message,
            span: self.kind.span(),
            related: Vec::new(),
            help: help.map(|s| s.to_string()),
            code: code.map(|s| s.to_string()),
        }
    }
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let diagnostic = self.to_diagnostic();
        write!(f, "{}: {}", diagnostic.severity, diagnostic.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_diagnostic_carries_code_and_span() {
        let err = ParseError::new(ParseErrorKind::UnterminatedString {
            span: Span::new(3, 7),
        });
        let diag = err.to_diagnostic();
        assert_eq!(diag.kind, DiagnosticKind::Syntax);
        assert_eq!(diag.span, Span::new(3, 7));
        assert_eq!(diag.code.as_deref(), Some("P003"));
    }
}
