//! Lazy, memoized computation cells.
//!
//! Declarations, member types and function return types are registered as
//! thunks so that later declarations can be referenced before their types
//! have been computed. A thunk runs its computation at most once; re-entrant
//! forcing means the definition genuinely depends on itself and yields a
//! recursion error. Errors are memoized like values, so forcing a failed
//! thunk twice reports the same single diagnostic.

use core::cell::{Cell, RefCell};

use bumpalo::Bump;

use crate::analyzer::error::{TypeError, TypeErrorKind};
use crate::parser::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    InProgress,
    Done,
}

pub struct Thunk<'a, T> {
    span: Span,
    state: Cell<State>,
    compute: Cell<Option<&'a dyn Fn() -> Result<T, TypeError>>>,
    result: RefCell<Option<Result<T, TypeError>>>,
}

impl<'a, T: Copy> Thunk<'a, T> {
    /// Register a computation. `span` is the source location blamed if the
    /// thunk turns out to be self-referential.
    pub fn new(
        arena: &'a Bump,
        span: Span,
        compute: impl Fn() -> Result<T, TypeError> + 'a,
    ) -> &'a Self {
        let compute: &'a dyn Fn() -> Result<T, TypeError> = arena.alloc(compute);
        arena.alloc(Self {
            span,
            state: Cell::new(State::Pending),
            compute: Cell::new(Some(compute)),
            result: RefCell::new(None),
        })
    }

    /// A thunk that is already resolved to `value`.
    pub fn resolved(arena: &'a Bump, span: Span, value: T) -> &'a Self {
        arena.alloc(Self {
            span,
            state: Cell::new(State::Done),
            compute: Cell::new(None),
            result: RefCell::new(Some(Ok(value))),
        })
    }

    /// Force the thunk. The first call runs the computation; later calls
    /// return the memoized result. Forcing a thunk that is already being
    /// forced is a recursive definition.
    pub fn get(&self) -> Result<T, TypeError> {
        match self.state.get() {
            State::Done => match &*self.result.borrow() {
                Some(result) => result.clone(),
                None => unreachable!("resolved thunk without a result"),
            },
            State::InProgress => Err(TypeError::new(TypeErrorKind::RecursiveDefinition {
                span: self.span.clone(),
            })),
            State::Pending => {
                self.state.set(State::InProgress);
                let compute = match self.compute.take() {
                    Some(compute) => compute,
                    None => unreachable!("pending thunk without a computation"),
                };
                let result = compute();
                *self.result.borrow_mut() = Some(result.clone());
                self.state.set(State::Done);
                result
            }
        }
    }

    pub fn span(&self) -> Span {
        self.span.clone()
    }

    /// True once `get` has completed, successfully or not.
    pub fn is_resolved(&self) -> bool {
        self.state.get() == State::Done
    }

    /// The resolved value, if `get` has already succeeded. Never forces.
    pub fn peek(&self) -> Option<T> {
        if self.state.get() != State::Done {
            return None;
        }
        match &*self.result.borrow() {
            Some(Ok(value)) => Some(*value),
            _ => None,
        }
    }
}

impl<T> core::fmt::Debug for Thunk<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Thunk")
            .field("span", &self.span)
            .field("state", &self.state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn computes_once_and_memoizes() {
        let arena = Bump::new();
        let runs = Cell::new(0);
        let thunk = Thunk::new(&arena, Span::new(0, 1), || {
            runs.set(runs.get() + 1);
            Ok(42)
        });
        assert!(!thunk.is_resolved());
        assert_eq!(thunk.get().unwrap(), 42);
        assert_eq!(thunk.get().unwrap(), 42);
        assert_eq!(runs.get(), 1);
        assert!(thunk.is_resolved());
    }

    #[test]
    fn reentrant_get_is_a_recursion_error() {
        let arena = Bump::new();
        let slot: &Cell<Option<&Thunk<i32>>> = arena.alloc(Cell::new(None));
        let thunk = Thunk::new(&arena, Span::new(3, 8), || match slot.get() {
            Some(t) => t.get(),
            None => Ok(0),
        });
        slot.set(Some(thunk));
        let err = thunk.get().unwrap_err();
        assert!(matches!(
            err.kind,
            TypeErrorKind::RecursiveDefinition { ref span } if *span == Span::new(3, 8)
        ));
        // The failure is memoized.
        assert!(thunk.get().is_err());
    }

    #[test]
    fn errors_are_memoized() {
        let arena = Bump::new();
        let runs = Cell::new(0);
        let thunk: &Thunk<i32> = Thunk::new(&arena, Span::new(0, 1), || {
            runs.set(runs.get() + 1);
            Err(TypeError::new(TypeErrorKind::UnboundVariable {
                name: "x".to_string(),
                span: Span::new(0, 1),
            }))
        });
        assert!(thunk.get().is_err());
        assert!(thunk.get().is_err());
        assert_eq!(runs.get(), 1);
    }
}
