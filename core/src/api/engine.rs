//! The Opal compilation engine.

use bumpalo::Bump;
use tracing::debug;

use crate::scope::Scope;
use crate::types::TypeManager;
use crate::{analyzer, parser, stdlib};

use super::{CompiledProgram, Diagnostic, Error};

/// The Opal compilation engine.
///
/// The engine owns a compilation session: the type manager, the standard
/// environment, and the arena everything borrows from. Programs compiled by
/// the same engine share types, so compiled results can be compared and
/// combined.
///
/// # Lifetimes
///
/// - `'arena`: Lifetime of the arena holding types, scopes and compiled
///   programs. All compiled programs borrow from this arena.
///
/// # Example
///
/// ```ignore
/// use bumpalo::Bump;
/// use opal_core::api::Engine;
///
/// let arena = Bump::new();
/// let engine = Engine::new(&arena);
/// let program = engine.compile("let x = 1 + 2  x * 3")?;
/// assert_eq!(program.result_type().unwrap().to_string(), "number");
/// ```
pub struct Engine<'arena> {
    arena: &'arena Bump,
    type_manager: &'arena TypeManager<'arena>,
    globals: &'arena Scope<'arena>,
}

impl<'arena> Engine<'arena> {
    /// Create a new engine with the standard environment.
    pub fn new(arena: &'arena Bump) -> Self {
        let type_manager = TypeManager::new(arena);
        let globals = stdlib::root_scope(arena, type_manager);
        Self {
            arena,
            type_manager,
            globals,
        }
    }

    /// Access the type manager.
    ///
    /// Useful for inspecting the types of compiled programs.
    pub fn type_manager(&self) -> &'arena TypeManager<'arena> {
        self.type_manager
    }

    /// The global scope programs are analyzed against.
    pub fn globals(&self) -> &'arena Scope<'arena> {
        self.globals
    }

    /// Compile an Opal program.
    ///
    /// Parses and analyzes `source`. On failure returns
    /// [`Error::Compilation`] carrying every independent diagnostic found.
    pub fn compile(&self, source: &str) -> Result<CompiledProgram<'arena>, Error> {
        debug!(len = source.len(), "compiling program");
        let source = &*self.arena.alloc_str(source);

        let parsed = parser::parse(self.arena, source).map_err(|err| Error::Compilation {
            source_text: source.to_string(),
            diagnostics: vec![err.to_diagnostic()],
        })?;

        let typed = analyzer::analyze(self.type_manager, self.globals, &parsed).map_err(
            |errors| {
                // A failed declaration surfaces its memoized error once per
                // dependent item; report each diagnostic once.
                let mut diagnostics: Vec<Diagnostic> = Vec::with_capacity(errors.len());
                for err in errors {
                    let d = err.to_diagnostic();
                    let duplicate = diagnostics.iter().any(|seen| {
                        seen.code == d.code && seen.span == d.span && seen.message == d.message
                    });
                    if !duplicate {
                        diagnostics.push(d);
                    }
                }
                Error::Compilation {
                    source_text: source.to_string(),
                    diagnostics,
                }
            },
        )?;

        Ok(CompiledProgram::new(typed, self.type_manager, source))
    }
}
