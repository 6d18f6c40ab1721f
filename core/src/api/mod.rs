//! Public API for the Opal language front end.
//!
//! This module provides the stable public API for compiling Opal programs:
//! an [`Engine`] is created once per arena, compiles any number of programs,
//! and reports failures as [`Error::Compilation`] with structured
//! [`Diagnostic`]s callers can render however they like.

pub mod engine;
pub mod error;
pub mod program;

pub use engine::Engine;
pub use error::{Diagnostic, DiagnosticKind, Error, RelatedInfo, Severity};
pub use program::CompiledProgram;
