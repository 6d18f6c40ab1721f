//! Compiled Opal programs.

use core::fmt;

use crate::analyzer::typed_expr::{Expr, TypedProgram};
use crate::types::{Type, TypeManager};

/// A compiled Opal program: the typed expression tree plus the source it
/// came from.
///
/// By the time a program is handed out every type in the tree has been
/// resolved, so the accessors here never fail.
///
/// # Lifetimes
///
/// - `'arena`: Lifetime of the engine's arena holding the tree and types.
pub struct CompiledProgram<'arena> {
    typed: TypedProgram<'arena>,
    type_manager: &'arena TypeManager<'arena>,
    source: &'arena str,
}

impl<'arena> CompiledProgram<'arena> {
    pub(crate) fn new(
        typed: TypedProgram<'arena>,
        type_manager: &'arena TypeManager<'arena>,
        source: &'arena str,
    ) -> Self {
        Self {
            typed,
            type_manager,
            source,
        }
    }

    /// The program's top-level typed expressions, in source order.
    pub fn items(&self) -> &'arena [&'arena Expr<'arena>] {
        self.typed.items
    }

    /// The type of the final top-level expression; `None` for an empty
    /// program.
    pub fn result_type(&self) -> Option<&'arena Type<'arena>> {
        // Analysis resolved every node type, so peeking never loses a value.
        self.typed.items.last().and_then(|item| item.0.peek())
    }

    pub fn type_manager(&self) -> &'arena TypeManager<'arena> {
        self.type_manager
    }

    pub fn source(&self) -> &'arena str {
        self.source
    }
}

impl fmt::Debug for CompiledProgram<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("items", &self.typed.items.len())
            .field("result_type", &self.result_type().map(|t| t.to_string()))
            .finish()
    }
}
