//! Opal - an expression-oriented language front end
//!
//! # Overview
//!
//! Opal is a small expression-oriented language with classes, interfaces,
//! structural unions and intersections, and generics. This crate compiles
//! Opal source into a fully typed expression tree; a host application
//! decides what to do with it from there. Common use cases include:
//!
//! - Typed configuration and rules that are validated before deployment
//! - Embedded scripting surfaces that need real type errors, not runtime
//!   surprises
//! - Experimentation with structural typing and lazy type resolution
//!
//! # Quick Start
//!
//! ```ignore
//! use bumpalo::Bump;
//! use opal::{Engine, render_error};
//!
//! // Create an arena for the compilation session
//! let arena = Bump::new();
//! let engine = Engine::new(&arena);
//!
//! // Compile a program
//! match engine.compile("let x = 1 + 2  x * 3") {
//!     Ok(program) => {
//!         assert_eq!(program.result_type().unwrap().to_string(), "number");
//!     }
//!     Err(e) => render_error(&e),
//! }
//! ```
//!
//! # Diagnostics
//!
//! Compilation failures carry structured [`Diagnostic`]s with spans, error
//! codes, related locations and help text. Use [`render_error`] (or the
//! `_to_string` variants) for rich terminal output, or walk the diagnostics
//! yourself.

// Re-export public API from opal_core
pub use opal_core::api::{
    CompiledProgram, Diagnostic, DiagnosticKind, Engine, Error, RelatedInfo, Severity,
};

// Re-export commonly used types
pub use opal_core::parser::Span;
pub use opal_core::types::{self, Type, TypeKind, manager::TypeManager};

mod error_renderer;
pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};
