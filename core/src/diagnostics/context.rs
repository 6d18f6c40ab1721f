use crate::api::RelatedInfo;
use crate::parser::Span;

/// Context information for error messages.
///
/// Provides additional information about where an error occurred, such as
/// "in call to f" or "declared here". Each context entry can be converted
/// to a RelatedInfo for diagnostic display.
#[derive(Debug, Clone)]
pub enum Context {
    /// In a function or constructor call
    InCall { name: Option<String>, span: Span },
    /// In an expression
    InExpression { kind: String, span: Span },
}

impl Context {
    /// Convert to a RelatedInfo for diagnostic display
    pub fn to_related_info(&self) -> RelatedInfo {
        match self {
            Context::InCall { name, span } => RelatedInfo {
                span: span.clone(),
                message: match name {
                    Some(n) => format!("in call to '{}'", n),
                    None => "in call".to_string(),
                },
            },
            Context::InExpression { kind, span } => RelatedInfo {
                span: span.clone(),
                message: format!("in {}", kind),
            },
        }
    }
}
