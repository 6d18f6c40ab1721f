//! Lexical scopes.
//!
//! Scopes form a parent chain in the arena. Lookup walks innermost-out; a
//! scope may carry an implicit receiver type, whose members resolve like
//! bindings so that method bodies can name fields without `this.`.

use core::cell::RefCell;

use bumpalo::Bump;
use hashbrown::{DefaultHashBuilder, HashMap};
use tracing::trace;

use crate::analyzer::error::{TypeError, TypeErrorKind};
use crate::parser::Span;
use crate::types::{Constness, Member, Type, TypeManager, TypeThunk, is_assignable};

#[derive(Debug, Clone, Copy)]
pub struct Binding<'a> {
    pub constness: Constness,
    pub ty: &'a TypeThunk<'a>,
}

/// What an identifier resolved to.
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    /// A binding in some enclosing scope.
    Local(Binding<'a>),
    /// A member of an enclosing implicit receiver; reads and writes go
    /// through `this`.
    Receiver {
        owner: &'a Type<'a>,
        member: Member<'a>,
    },
}

pub struct Scope<'a> {
    parent: Option<&'a Scope<'a>>,
    receiver: Option<&'a Type<'a>>,
    table: RefCell<HashMap<&'a str, Binding<'a>, DefaultHashBuilder, &'a Bump>>,
}

impl<'a> Scope<'a> {
    pub fn root(arena: &'a Bump) -> &'a Self {
        arena.alloc(Self {
            parent: None,
            receiver: None,
            table: RefCell::new(HashMap::new_in(arena)),
        })
    }

    pub fn child(&'a self, arena: &'a Bump) -> &'a Self {
        arena.alloc(Self {
            parent: Some(self),
            receiver: None,
            table: RefCell::new(HashMap::new_in(arena)),
        })
    }

    pub fn child_with_receiver(&'a self, arena: &'a Bump, receiver: &'a Type<'a>) -> &'a Self {
        arena.alloc(Self {
            parent: Some(self),
            receiver: Some(receiver),
            table: RefCell::new(HashMap::new_in(arena)),
        })
    }

    /// Register a binding. Duplicate names in the same scope are rejected;
    /// shadowing in an inner scope is allowed except for builtins, which can
    /// never be redefined.
    pub fn declare(
        &self,
        name: &'a str,
        constness: Constness,
        ty: &'a TypeThunk<'a>,
        span: Span,
    ) -> Result<(), TypeError> {
        if self.table.borrow().contains_key(name) {
            return Err(TypeError::new(TypeErrorKind::AlreadyDefined {
                name: name.to_string(),
                span,
            }));
        }
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some(existing) = s.table.borrow().get(name) {
                if existing.constness == Constness::Builtin {
                    return Err(TypeError::new(TypeErrorKind::BuiltinRedefined {
                        name: name.to_string(),
                        span,
                    }));
                }
            }
            scope = s.parent;
        }
        trace!(name, ?constness, "declaring binding");
        self.table
            .borrow_mut()
            .insert(name, Binding { constness, ty });
        Ok(())
    }

    /// Resolve a name, innermost scope first. A scope's own bindings win
    /// over its receiver's members; the receiver wins over outer scopes.
    pub fn resolve(&self, name: &str) -> Option<Resolution<'a>> {
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some(binding) = s.table.borrow().get(name) {
                return Some(Resolution::Local(*binding));
            }
            if let Some(receiver) = s.receiver {
                if let Some(member) = receiver.member(name) {
                    return Some(Resolution::Receiver {
                        owner: receiver,
                        member,
                    });
                }
            }
            scope = s.parent;
        }
        None
    }

    /// The innermost implicit receiver, if any (`this`).
    pub fn receiver_type(&self) -> Option<&'a Type<'a>> {
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some(receiver) = s.receiver {
                return Some(receiver);
            }
            scope = s.parent;
        }
        None
    }

    /// Resolve an assignment target and check it is writable with a value
    /// of type `value_ty`. Returns the resolution so the caller can build
    /// the right typed node (receiver members become `this.x` writes).
    pub fn assign(
        &self,
        tm: &'a TypeManager<'a>,
        name: &str,
        value_ty: &'a Type<'a>,
        span: Span,
    ) -> Result<Resolution<'a>, TypeError> {
        let resolution = self.resolve(name).ok_or_else(|| {
            TypeError::new(TypeErrorKind::UnboundVariable {
                name: name.to_string(),
                span: span.clone(),
            })
        })?;
        let (constness, declared) = match resolution {
            Resolution::Local(binding) => (binding.constness, binding.ty.get()?),
            Resolution::Receiver { member, .. } => (member.constness, member.ty.get()?),
        };
        match constness {
            Constness::Variable => {}
            Constness::Constant => {
                return Err(TypeError::new(TypeErrorKind::AssignToConstant {
                    name: name.to_string(),
                    span,
                }));
            }
            Constness::Builtin => {
                return Err(TypeError::new(TypeErrorKind::AssignToBuiltin {
                    name: name.to_string(),
                    span,
                }));
            }
        }
        if !is_assignable(tm, value_ty, declared)? {
            return Err(TypeError::new(TypeErrorKind::TypeMismatch {
                expected: declared.to_string(),
                found: value_ty.to_string(),
                span,
            }));
        }
        Ok(resolution)
    }

    /// Mint a name unused in any visible scope, probing `base0`, `base1`, …
    pub fn fresh_name(&self, arena: &'a Bump, base: &str) -> &'a str {
        let mut i = 0usize;
        loop {
            let candidate = format!("{}{}", base, i);
            if self.resolve(&candidate).is_none() {
                return arena.alloc_str(&candidate);
            }
            i += 1;
        }
    }
}

impl core::fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scope")
            .field("receiver", &self.receiver.map(|r| r.to_string()))
            .field("bindings", &self.table.borrow().len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
