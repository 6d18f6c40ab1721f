//! The structural type model.
//!
//! Every type is an arena-allocated [`Type`] with a closed [`TypeKind`] tag
//! and interior-mutable member, operator and call-signature tables. Types
//! have identity semantics: two types are the same type iff they are the
//! same allocation. Member types and signature return types are
//! [`TypeThunk`]s so that declarations can reference types that have not
//! been computed yet.

use core::cell::{Cell, RefCell};
use core::fmt;

use allocator_api2::vec::Vec as ArenaVec;
use bumpalo::Bump;

use crate::analyzer::error::TypeError;
use crate::thunk::Thunk;

use super::manager::TypeManager;

pub type TypeThunk<'a> = Thunk<'a, &'a Type<'a>>;

/// Mutability of a scope binding or type member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constness {
    /// Reassignable (`var` bindings, fields).
    Variable,
    /// Not reassignable (`let` bindings, methods, declaration names).
    Constant,
    /// Installed by the standard library; cannot be redefined or shadowed.
    Builtin,
}

#[derive(Debug, Clone, Copy)]
pub struct Member<'a> {
    pub name: &'a str,
    pub constness: Constness,
    pub ty: &'a TypeThunk<'a>,
}

/// One way a value can be called (or constructed).
#[derive(Debug, Clone, Copy)]
pub struct CallSignature<'a> {
    /// Declared receiver for methods; `None` for free functions.
    pub receiver: Option<&'a Type<'a>>,
    pub required: &'a [&'a Type<'a>],
    pub optional: &'a [&'a Type<'a>],
    pub ret: &'a TypeThunk<'a>,
}

impl<'a> CallSignature<'a> {
    /// Parameter type at argument position `i`, across required then
    /// optional parameters.
    pub fn param(&self, i: usize) -> Option<&'a Type<'a>> {
        if i < self.required.len() {
            Some(self.required[i])
        } else {
            self.optional.get(i - self.required.len()).copied()
        }
    }

    pub fn max_arity(&self) -> usize {
        self.required.len() + self.optional.len()
    }
}

/// An operator available on a type, e.g. `+` on `number`. `native` names the
/// runtime primitive a later backend would dispatch to.
#[derive(Debug, Clone, Copy)]
pub struct Operator<'a> {
    pub symbol: &'a str,
    pub native: &'a str,
    pub sig: CallSignature<'a>,
}

#[derive(Debug, Clone, Copy)]
pub enum TypeKind<'a> {
    /// Assignable to and from everything.
    Any,
    /// `number`, `string`, `boolean`, `void`. Identity-compatible only.
    Primitive,
    /// Class instance types, interface types and structural record types.
    /// `class` marks types created by `class` declarations, which are
    /// constructible even without a `constructor` member.
    Interface { class: bool },
    /// A function type; its single signature lives in the call table.
    Function,
    Union(&'a [&'a Type<'a>]),
    Intersection(&'a [&'a Type<'a>]),
    /// An uninstantiated generic declaration wrapping its template.
    Generics {
        params: &'a [&'a Type<'a>],
        template: &'a Type<'a>,
    },
    /// A generic placeholder with an upper-bound constraint.
    GenericsParam { constraint: &'a Type<'a> },
    /// The type of a type-valued binding, e.g. a class name in expression
    /// position.
    Meta(&'a Type<'a>),
    /// A literal refinement of `boolean`.
    ConstValue { base: &'a Type<'a>, value: bool },
}

pub struct Type<'a> {
    pub kind: TypeKind<'a>,
    name: Cell<Option<&'a str>>,
    supers: RefCell<ArenaVec<&'a Type<'a>, &'a Bump>>,
    members: RefCell<ArenaVec<Member<'a>, &'a Bump>>,
    operators: RefCell<ArenaVec<Operator<'a>, &'a Bump>>,
    call_sigs: RefCell<ArenaVec<CallSignature<'a>, &'a Bump>>,
}

impl<'a> Type<'a> {
    pub(crate) fn new_in(arena: &'a Bump, kind: TypeKind<'a>) -> &'a Self {
        arena.alloc(Self {
            kind,
            name: Cell::new(None),
            supers: RefCell::new(ArenaVec::new_in(arena)),
            members: RefCell::new(ArenaVec::new_in(arena)),
            operators: RefCell::new(ArenaVec::new_in(arena)),
            call_sigs: RefCell::new(ArenaVec::new_in(arena)),
        })
    }

    pub fn name(&self) -> Option<&'a str> {
        self.name.get()
    }

    pub fn set_name(&self, name: &'a str) {
        self.name.set(Some(name));
    }

    /// Identity: same allocation, same type.
    pub fn same(a: &'a Type<'a>, b: &'a Type<'a>) -> bool {
        core::ptr::eq(a, b)
    }

    pub fn add_super(&self, sup: &'a Type<'a>) {
        self.supers.borrow_mut().push(sup);
    }

    pub fn add_member(&self, member: Member<'a>) {
        self.members.borrow_mut().push(member);
    }

    pub fn add_operator(&self, operator: Operator<'a>) {
        self.operators.borrow_mut().push(operator);
    }

    pub fn add_call_signature(&self, sig: CallSignature<'a>) {
        self.call_sigs.borrow_mut().push(sig);
    }

    pub fn supers(&self) -> Vec<&'a Type<'a>> {
        self.supers.borrow().iter().copied().collect()
    }

    /// Members declared directly on this type, without inheritance.
    pub fn own_members(&self) -> Vec<Member<'a>> {
        self.members.borrow().iter().copied().collect()
    }

    pub fn own_operators(&self) -> Vec<Operator<'a>> {
        self.operators.borrow().iter().copied().collect()
    }

    pub fn own_call_signatures(&self) -> Vec<CallSignature<'a>> {
        self.call_sigs.borrow().iter().copied().collect()
    }

    /// Look up a member, own declarations shadowing inherited ones.
    pub fn member(&self, name: &str) -> Option<Member<'a>> {
        if let Some(m) = self.members.borrow().iter().rev().find(|m| m.name == name) {
            return Some(*m);
        }
        for sup in self.supers.borrow().iter() {
            if let Some(m) = sup.member(name) {
                return Some(m);
            }
        }
        None
    }

    /// All visible members: the supertype walk first, then own members
    /// overriding by name.
    pub fn members(&self) -> Vec<Member<'a>> {
        let mut out: Vec<Member<'a>> = Vec::new();
        for sup in self.supers.borrow().iter() {
            for m in sup.members() {
                upsert(&mut out, m);
            }
        }
        for m in self.members.borrow().iter() {
            upsert(&mut out, *m);
        }
        out
    }

    /// Look up an operator by symbol and arity (0 for unary, 1 for binary).
    pub fn operator(&self, symbol: &str, arity: usize) -> Option<Operator<'a>> {
        if let Some(op) = self
            .operators
            .borrow()
            .iter()
            .find(|op| op.symbol == symbol && op.sig.required.len() == arity)
        {
            return Some(*op);
        }
        for sup in self.supers.borrow().iter() {
            if let Some(op) = sup.operator(symbol, arity) {
                return Some(op);
            }
        }
        None
    }

    pub fn operators(&self) -> Vec<Operator<'a>> {
        let mut out = self.own_operators();
        for sup in self.supers.borrow().iter() {
            out.extend(sup.operators());
        }
        out
    }

    /// Ways this type's values can be called. Unions and intersections
    /// precompute their merged tables at construction.
    pub fn call_signatures(&self) -> Vec<CallSignature<'a>> {
        let mut out = self.own_call_signatures();
        for sup in self.supers.borrow().iter() {
            out.extend(sup.call_signatures());
        }
        out
    }

    /// Ways this type can be constructed with `new`. A class's `constructor`
    /// member supplies the signature with the instance type as return type;
    /// a class without one gets a single zero-parameter signature.
    /// Interfaces and records are not constructible.
    pub fn construct_signatures(
        &'a self,
        tm: &'a TypeManager<'a>,
    ) -> Result<Vec<CallSignature<'a>>, TypeError> {
        match self.kind {
            TypeKind::Interface { class } => {
                if let Some(ctor) = self.member("constructor") {
                    let ctor_ty = ctor.ty.get()?;
                    let sigs = ctor_ty
                        .call_signatures()
                        .into_iter()
                        .map(|sig| CallSignature {
                            receiver: None,
                            required: sig.required,
                            optional: sig.optional,
                            ret: tm.resolved_thunk(self),
                        })
                        .collect();
                    Ok(sigs)
                } else if class {
                    Ok(vec![CallSignature {
                        receiver: None,
                        required: &[],
                        optional: &[],
                        ret: tm.resolved_thunk(self),
                    }])
                } else {
                    Ok(Vec::new())
                }
            }
            TypeKind::Union(operands) => {
                let mut tables = Vec::with_capacity(operands.len());
                for op in operands {
                    tables.push(op.construct_signatures(tm)?);
                }
                Ok(tm.merge_signature_tables(&tables))
            }
            TypeKind::Intersection(operands) => {
                let mut out = Vec::new();
                for op in operands {
                    out.extend(op.construct_signatures(tm)?);
                }
                Ok(out)
            }
            _ => Ok(Vec::new()),
        }
    }
}

fn upsert<'a>(out: &mut Vec<Member<'a>>, m: Member<'a>) {
    match out.iter_mut().find(|existing| existing.name == m.name) {
        Some(existing) => *existing = m,
        None => out.push(m),
    }
}

impl fmt::Debug for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("kind", &self.kind)
            .field("name", &self.name.get())
            .finish()
    }
}

impl fmt::Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name.get() {
            return write!(f, "{}", name);
        }
        match self.kind {
            TypeKind::Any => write!(f, "any"),
            TypeKind::Primitive => write!(f, "<primitive>"),
            TypeKind::Interface { .. } => {
                write!(f, "{{")?;
                let members = self.own_members();
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}", m.name)?;
                }
                if members.is_empty() {
                    write!(f, "}}")
                } else {
                    write!(f, " }}")
                }
            }
            TypeKind::Function => match self.own_call_signatures().first() {
                Some(sig) => write_signature(f, sig),
                None => write!(f, "(?) => ?"),
            },
            TypeKind::Union(operands) => write_operands(f, operands, " | "),
            TypeKind::Intersection(operands) => write_operands(f, operands, " & "),
            TypeKind::Generics { template, .. } => write!(f, "{}", template),
            TypeKind::GenericsParam { .. } => write!(f, "<param>"),
            TypeKind::Meta(instance) => write!(f, "type<{}>", instance),
            TypeKind::ConstValue { value, .. } => write!(f, "{}", value),
        }
    }
}

fn write_signature(f: &mut fmt::Formatter<'_>, sig: &CallSignature<'_>) -> fmt::Result {
    write!(f, "(")?;
    let mut first = true;
    for p in sig.required {
        if !first {
            write!(f, ", ")?;
        }
        first = false;
        write!(f, "{}", p)?;
    }
    for p in sig.optional {
        if !first {
            write!(f, ", ")?;
        }
        first = false;
        write!(f, "{}?", p)?;
    }
    write!(f, ") => ")?;
    // Displaying must not force inference.
    match sig.ret.peek() {
        Some(ret) => write!(f, "{}", ret),
        None => write!(f, "_"),
    }
}

fn write_operands(
    f: &mut fmt::Formatter<'_>,
    operands: &[&Type<'_>],
    sep: &str,
) -> fmt::Result {
    for (i, op) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", op)?;
    }
    Ok(())
}
