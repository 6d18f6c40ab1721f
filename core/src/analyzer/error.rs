use crate::api::{Diagnostic, DiagnosticKind, Severity};
use crate::diagnostics::context::Context;
use crate::parser::Span;

/// Type error with context breadcrumbs.
#[derive(Debug, Clone)]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub context: Vec<Context>,
}

impl core::fmt::Display for TypeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let diagnostic = self.to_diagnostic();
        write!(f, "{}: {}", diagnostic.severity, diagnostic.message)?;

        if let Some(ref code) = diagnostic.code {
            write!(f, " [{}]", code)?;
        }

        if let Some(ref help) = diagnostic.help {
            write!(f, "\nhelp: {}", help)?;
        }

        Ok(())
    }
}

/// Specific kinds of type errors.
#[derive(Debug, Clone)]
pub enum TypeErrorKind {
    /// A definition whose type depends on itself.
    RecursiveDefinition { span: Span },
    /// Undefined variable.
    UnboundVariable { name: String, span: Span },
    /// Duplicate declaration in the same scope.
    AlreadyDefined { name: String, span: Span },
    /// Attempt to redefine or shadow a builtin.
    BuiltinRedefined { name: String, span: Span },
    /// Assignment to a `let` binding or a method.
    AssignToConstant { name: String, span: Span },
    /// Assignment to a builtin binding.
    AssignToBuiltin { name: String, span: Span },
    /// Value not assignable to the expected type.
    TypeMismatch {
        expected: String,
        found: String,
        span: Span,
    },
    /// Member access that the type does not expose.
    UnknownMember {
        ty: String,
        member: String,
        span: Span,
    },
    /// Operator not available on the operand type.
    UnknownOperator {
        ty: String,
        operator: String,
        span: Span,
    },
    /// Call of a value with no call signatures.
    NotCallable { ty: String, span: Span },
    /// Arguments match none of the callee's signatures.
    NoMatchingSignature {
        callee: String,
        found: Vec<String>,
        expected: String,
        span: Span,
    },
    /// `new` on something without construction signatures.
    NotConstructible { ty: String, span: Span },
    /// A value used where a type was expected.
    NotAType { name: String, span: Span },
    /// Type arguments applied to a non-generic type.
    NotGeneric { ty: String, span: Span },
    /// Wrong number of type arguments.
    GenericsArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    /// Type argument outside its parameter's upper bound.
    ConstraintViolation {
        name: String,
        argument: String,
        constraint: String,
        span: Span,
    },
    /// Two members with the same name in one declaration.
    DuplicateMember {
        name: String,
        ty: String,
        span: Span,
    },
    /// Override incompatible with the inherited member.
    IncompatibleOverride {
        name: String,
        own: String,
        inherited: String,
        span: Span,
    },
    /// Mutable member with conflicting types across intersection operands.
    VariableMemberConflict {
        name: String,
        left: String,
        right: String,
        span: Span,
    },
}

impl TypeErrorKind {
    /// Get the span of the error.
    pub fn span(&self) -> Span {
        match self {
            TypeErrorKind::RecursiveDefinition { span } => span.clone(),
            TypeErrorKind::UnboundVariable { span, .. } => span.clone(),
            TypeErrorKind::AlreadyDefined { span, .. } => span.clone(),
            TypeErrorKind::BuiltinRedefined { span, .. } => span.clone(),
            TypeErrorKind::AssignToConstant { span, .. } => span.clone(),
            TypeErrorKind::AssignToBuiltin { span, .. } => span.clone(),
            TypeErrorKind::TypeMismatch { span, .. } => span.clone(),
            TypeErrorKind::UnknownMember { span, .. } => span.clone(),
            TypeErrorKind::UnknownOperator { span, .. } => span.clone(),
            TypeErrorKind::NotCallable { span, .. } => span.clone(),
            TypeErrorKind::NoMatchingSignature { span, .. } => span.clone(),
            TypeErrorKind::NotConstructible { span, .. } => span.clone(),
            TypeErrorKind::NotAType { span, .. } => span.clone(),
            TypeErrorKind::NotGeneric { span, .. } => span.clone(),
            TypeErrorKind::GenericsArityMismatch { span, .. } => span.clone(),
            TypeErrorKind::ConstraintViolation { span, .. } => span.clone(),
            TypeErrorKind::DuplicateMember { span, .. } => span.clone(),
            TypeErrorKind::IncompatibleOverride { span, .. } => span.clone(),
            TypeErrorKind::VariableMemberConflict { span, .. } => span.clone(),
        }
    }
}

impl TypeError {
    /// Create a new TypeError with no context.
    pub fn new(kind: TypeErrorKind) -> Self {
        Self {
            kind,
            context: Vec::new(),
        }
    }

    /// Attach a context breadcrumb.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context.push(context);
        self
    }

    /// Convert to a Diagnostic for the API boundary.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (message, code, help) = match &self.kind {
            TypeErrorKind::RecursiveDefinition { .. } => (
                "Definition depends on itself".to_string(),
                Some("E001"),
                Some("Break the cycle with an explicit type annotation".to_string()),
            ),
            TypeErrorKind::UnboundVariable { name, .. } => (
                format!("Undefined variable '{}'", name),
                Some("E002"),
                Some("Make sure the variable is declared before use".to_string()),
            ),
            TypeErrorKind::AlreadyDefined { name, .. } => (
                format!("'{}' is already defined in this scope", name),
                Some("E003"),
                Some("Shadow it in an inner scope instead".to_string()),
            ),
            TypeErrorKind::BuiltinRedefined { name, .. } => (
                format!("'{}' is a builtin and cannot be redefined", name),
                Some("E004"),
                None,
            ),
            TypeErrorKind::AssignToConstant { name, .. } => (
                format!("Cannot assign to constant '{}'", name),
                Some("E005"),
                Some("Declare it with 'var' to make it assignable".to_string()),
            ),
            TypeErrorKind::AssignToBuiltin { name, .. } => (
                format!("Cannot assign to builtin '{}'", name),
                Some("E006"),
                None,
            ),
            TypeErrorKind::TypeMismatch {
                expected, found, ..
            } => (
                format!("Type mismatch: expected {}, found {}", expected, found),
                Some("E007"),
                None,
            ),
            TypeErrorKind::UnknownMember { ty, member, .. } => (
                format!("Type '{}' has no member '{}'", ty, member),
                Some("E008"),
                Some("Check the member name for typos".to_string()),
            ),
            TypeErrorKind::UnknownOperator { ty, operator, .. } => (
                format!("Operator '{}' is not defined for type '{}'", operator, ty),
                Some("E009"),
                None,
            ),
            TypeErrorKind::NotCallable { ty, .. } => (
                format!("Type '{}' is not callable", ty),
                Some("E010"),
                None,
            ),
            TypeErrorKind::NoMatchingSignature {
                callee,
                found,
                expected,
                ..
            } => (
                format!(
                    "No signature of '{}' accepts ({}); expected {}",
                    callee,
                    found.join(", "),
                    expected
                ),
                Some("E011"),
                Some("Check the number and types of the arguments".to_string()),
            ),
            TypeErrorKind::NotConstructible { ty, .. } => (
                format!("Type '{}' cannot be constructed with 'new'", ty),
                Some("E012"),
                None,
            ),
            TypeErrorKind::NotAType { name, .. } => (
                format!("'{}' does not name a type", name),
                Some("E013"),
                None,
            ),
            TypeErrorKind::NotGeneric { ty, .. } => (
                format!("Type '{}' takes no type arguments", ty),
                Some("E014"),
                None,
            ),
            TypeErrorKind::GenericsArityMismatch {
                name,
                expected,
                found,
                ..
            } => (
                format!(
                    "'{}' expects {} type argument(s), found {}",
                    name, expected, found
                ),
                Some("E015"),
                None,
            ),
            TypeErrorKind::ConstraintViolation {
                name,
                argument,
                constraint,
                ..
            } => (
                format!(
                    "Type argument '{}' for '{}' is not assignable to its bound '{}'",
                    argument, name, constraint
                ),
                Some("E016"),
                None,
            ),
            TypeErrorKind::DuplicateMember { name, ty, .. } => (
                format!("Duplicate member '{}' in '{}'", name, ty),
                Some("E017"),
                None,
            ),
            TypeErrorKind::IncompatibleOverride {
                name,
                own,
                inherited,
                ..
            } => (
                format!(
                    "Override of '{}' has type {}, which is not assignable to the inherited {}",
                    name, own, inherited
                ),
                Some("E018"),
                None,
            ),
            TypeErrorKind::VariableMemberConflict {
                name, left, right, ..
            } => (
                format!(
                    "Mutable member '{}' has conflicting types {} and {} in intersection",
                    name, left, right
                ),
                Some("E019"),
                Some("Mutable members must have exactly the same type".to_string()),
            ),
        };

        let kind = match self.kind {
            TypeErrorKind::RecursiveDefinition { .. } => DiagnosticKind::Recursion,
            _ => DiagnosticKind::Type,
        };

        Diagnostic {
            kind,
            severity: Severity::Error,
            message,
            span: self.kind.span(),
            related: self
                .context
                .iter()
                .map(|ctx| ctx.to_related_info())
                .collect(),
            help,
            code: code.map(|s| s.to_string()),
        }
    }
}
