pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod syntax;

pub use error::{ParseError, ParseErrorKind};
pub use parser::parse;
pub use syntax::{AnnotatedSource, BinaryOp, Span, UnaryOp};
