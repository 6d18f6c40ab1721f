pub mod analyzer;
pub mod error;
pub mod typed_expr;

pub use analyzer::analyze;
pub use error::{TypeError, TypeErrorKind};
pub use typed_expr::{BodyThunk, Expr, ExprInner, ExprThunk, TypedProgram};
