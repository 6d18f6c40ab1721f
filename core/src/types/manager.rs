//! Type construction and ownership.
//!
//! The `TypeManager` owns the arena every type lives in and is the only way
//! to create types. It is created per compilation session and passed down
//! explicitly; there are no global type singletons.

use core::cell::RefCell;

use bumpalo::Bump;
use hashbrown::{DefaultHashBuilder, HashMap};
use tracing::trace;

use crate::parser::Span;
use crate::thunk::Thunk;

use super::types::{CallSignature, Constness, Member, Operator, Type, TypeKind, TypeThunk};

pub struct TypeManager<'a> {
    arena: &'a Bump,
    strings: RefCell<HashMap<&'a str, &'a str, DefaultHashBuilder, &'a Bump>>,
    // Combinators interned by their operand identity set, so the same set
    // of operands always yields the same allocation.
    unions: RefCell<HashMap<&'a [usize], &'a Type<'a>, DefaultHashBuilder, &'a Bump>>,
    intersections: RefCell<HashMap<&'a [usize], &'a Type<'a>, DefaultHashBuilder, &'a Bump>>,
    any: &'a Type<'a>,
    number: &'a Type<'a>,
    string: &'a Type<'a>,
    boolean: &'a Type<'a>,
    void: &'a Type<'a>,
    true_ty: &'a Type<'a>,
    false_ty: &'a Type<'a>,
}

impl<'a> TypeManager<'a> {
    pub fn new(arena: &'a Bump) -> &'a Self {
        let any = Type::new_in(arena, TypeKind::Any);
        any.set_name("any");
        let number = Type::new_in(arena, TypeKind::Primitive);
        number.set_name("number");
        let string = Type::new_in(arena, TypeKind::Primitive);
        string.set_name("string");
        let boolean = Type::new_in(arena, TypeKind::Primitive);
        boolean.set_name("boolean");
        let void = Type::new_in(arena, TypeKind::Primitive);
        void.set_name("void");
        let true_ty = Type::new_in(
            arena,
            TypeKind::ConstValue {
                base: boolean,
                value: true,
            },
        );
        true_ty.set_name("true");
        let false_ty = Type::new_in(
            arena,
            TypeKind::ConstValue {
                base: boolean,
                value: false,
            },
        );
        false_ty.set_name("false");
        // Literal refinements resolve members and operators through their
        // base, so `!true` finds boolean's operator table.
        true_ty.add_super(boolean);
        false_ty.add_super(boolean);

        arena.alloc(Self {
            arena,
            strings: RefCell::new(HashMap::new_in(arena)),
            unions: RefCell::new(HashMap::new_in(arena)),
            intersections: RefCell::new(HashMap::new_in(arena)),
            any,
            number,
            string,
            boolean,
            void,
            true_ty,
            false_ty,
        })
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    pub fn any(&self) -> &'a Type<'a> {
        self.any
    }
    pub fn number(&self) -> &'a Type<'a> {
        self.number
    }
    pub fn string(&self) -> &'a Type<'a> {
        self.string
    }
    pub fn boolean(&self) -> &'a Type<'a> {
        self.boolean
    }
    pub fn void(&self) -> &'a Type<'a> {
        self.void
    }

    /// The const-value refinement a boolean literal types as.
    pub fn bool_literal(&self, value: bool) -> &'a Type<'a> {
        if value { self.true_ty } else { self.false_ty }
    }

    /// Copy a string into the arena, reusing earlier copies.
    pub fn intern_str(&self, s: &str) -> &'a str {
        if let Some(interned) = self.strings.borrow().get(s) {
            return interned;
        }
        let interned = &*self.arena.alloc_str(s);
        self.strings.borrow_mut().insert(interned, interned);
        interned
    }

    pub fn resolved_thunk(&'a self, ty: &'a Type<'a>) -> &'a TypeThunk<'a> {
        Thunk::resolved(self.arena, Span::default(), ty)
    }

    /// A thunk that resolves to the union of the forced `thunks`.
    pub fn union_thunk(
        &'a self,
        thunks: &'a [&'a TypeThunk<'a>],
        span: Span,
    ) -> &'a TypeThunk<'a> {
        Thunk::new(self.arena, span.clone(), move || {
            let mut types = Vec::with_capacity(thunks.len());
            for t in thunks {
                types.push(t.get()?);
            }
            Ok(self.union(&types, span.clone()))
        })
    }

    /// A new interface (or class instance, or structural record) type.
    /// Members are added by the caller.
    pub fn interface(
        &self,
        name: Option<&str>,
        class: bool,
        supers: &[&'a Type<'a>],
    ) -> &'a Type<'a> {
        let ty = Type::new_in(self.arena, TypeKind::Interface { class });
        if let Some(name) = name {
            ty.set_name(self.intern_str(name));
        }
        for sup in supers {
            ty.add_super(sup);
        }
        ty
    }

    /// A function type with a single call signature.
    pub fn function(
        &self,
        receiver: Option<&'a Type<'a>>,
        required: &[&'a Type<'a>],
        optional: &[&'a Type<'a>],
        ret: &'a TypeThunk<'a>,
    ) -> &'a Type<'a> {
        let ty = Type::new_in(self.arena, TypeKind::Function);
        ty.add_call_signature(CallSignature {
            receiver,
            required: self.arena.alloc_slice_copy(required),
            optional: self.arena.alloc_slice_copy(optional),
            ret,
        });
        ty
    }

    /// Union of `operands`: flattens nested unions, de-duplicates by
    /// identity, and collapses a single remaining operand to itself.
    /// The merged member/operator/signature tables are built here; member
    /// types stay lazy.
    pub fn union(&'a self, operands: &[&'a Type<'a>], span: Span) -> &'a Type<'a> {
        let flat = flatten(operands, |ty| match ty.kind {
            TypeKind::Union(inner) => Some(inner),
            _ => None,
        });
        if flat.len() == 1 {
            return flat[0];
        }
        let key = operand_key(&flat);
        if let Some(existing) = self.unions.borrow().get(key.as_slice()).copied() {
            return existing;
        }
        trace!(operands = flat.len(), "building union type");
        let ty = Type::new_in(
            self.arena,
            TypeKind::Union(self.arena.alloc_slice_copy(&flat)),
        );
        // Registered before the tables are filled: the merged parameter
        // types below can name this same union.
        self.unions
            .borrow_mut()
            .insert(self.arena.alloc_slice_copy(&key), ty);

        // A member is visible only if every operand has it; its type is the
        // union of the operand member types.
        let first = flat[0].members();
        'members: for m in first {
            let mut thunks = Vec::with_capacity(flat.len());
            let mut constness = m.constness;
            for op in &flat {
                match op.member(m.name) {
                    Some(found) => {
                        if found.constness != Constness::Variable {
                            constness = Constness::Constant;
                        }
                        thunks.push(found.ty);
                    }
                    None => continue 'members,
                }
            }
            let thunks = self.arena.alloc_slice_copy(&thunks);
            ty.add_member(Member {
                name: m.name,
                constness,
                ty: self.union_thunk(thunks, span.clone()),
            });
        }

        // Operators and call signatures merge when every operand exposes
        // the same shape (symbol, native name, parameter counts); the
        // merged parameter and return types are positionwise unions.
        for op in flat[0].operators() {
            let mut matched = vec![op.sig];
            let mut all = true;
            for other in &flat[1..] {
                match other.operators().into_iter().find(|o| {
                    o.symbol == op.symbol
                        && o.native == op.native
                        && same_shape(&o.sig, &op.sig)
                }) {
                    Some(found) => matched.push(found.sig),
                    None => {
                        all = false;
                        break;
                    }
                }
            }
            if all {
                let (required, optional) = self.union_params(&matched, &span);
                let rets: Vec<_> = matched.iter().map(|s| s.ret).collect();
                let rets = self.arena.alloc_slice_copy(&rets);
                ty.add_operator(Operator {
                    symbol: op.symbol,
                    native: op.native,
                    sig: CallSignature {
                        receiver: Some(ty),
                        required,
                        optional,
                        ret: self.union_thunk(rets, span.clone()),
                    },
                });
            }
        }

        let tables: Vec<Vec<CallSignature<'a>>> =
            flat.iter().map(|op| op.call_signatures()).collect();
        for sig in self.merge_signature_tables(&tables) {
            ty.add_call_signature(sig);
        }

        ty
    }

    /// Intersection of `operands`: flattens, de-duplicates, collapses a
    /// single operand. Members merge across operands; a `Variable` member
    /// occurring in several operands must resolve to exactly the same type.
    pub fn intersection(&'a self, operands: &[&'a Type<'a>], span: Span) -> &'a Type<'a> {
        let flat = flatten(operands, |ty| match ty.kind {
            TypeKind::Intersection(inner) => Some(inner),
            _ => None,
        });
        if flat.len() == 1 {
            return flat[0];
        }
        let key = operand_key(&flat);
        if let Some(existing) = self.intersections.borrow().get(key.as_slice()).copied() {
            return existing;
        }
        trace!(operands = flat.len(), "building intersection type");
        let ty = Type::new_in(
            self.arena,
            TypeKind::Intersection(self.arena.alloc_slice_copy(&flat)),
        );
        self.intersections
            .borrow_mut()
            .insert(self.arena.alloc_slice_copy(&key), ty);

        let mut seen: Vec<&'a str> = Vec::new();
        for op in &flat {
            for m in op.members() {
                if seen.contains(&m.name) {
                    continue;
                }
                seen.push(m.name);
                let mut thunks = Vec::new();
                let mut variable = false;
                for other in &flat {
                    if let Some(found) = other.member(m.name) {
                        variable |= found.constness == Constness::Variable;
                        thunks.push(found.ty);
                    }
                }
                if thunks.len() == 1 {
                    ty.add_member(Member {
                        name: m.name,
                        constness: m.constness,
                        ty: thunks[0],
                    });
                    continue;
                }
                let name = m.name;
                let thunks = &*self.arena.alloc_slice_copy(&thunks);
                let member_span = span.clone();
                let merged = Thunk::new(self.arena, span.clone(), move || {
                    let mut types = Vec::with_capacity(thunks.len());
                    for t in thunks {
                        types.push(t.get()?);
                    }
                    if variable {
                        // Mutable members are read and written, so their
                        // types must agree exactly.
                        for t in &types[1..] {
                            if !Type::same(types[0], t) {
                                return Err(crate::analyzer::error::TypeError::new(
                                    crate::analyzer::error::TypeErrorKind::VariableMemberConflict {
                                        name: name.to_string(),
                                        left: types[0].to_string(),
                                        right: t.to_string(),
                                        span: member_span.clone(),
                                    },
                                ));
                            }
                        }
                        return Ok(types[0]);
                    }
                    Ok(self.intersection(&types, member_span.clone()))
                });
                ty.add_member(Member {
                    name: m.name,
                    constness: if variable {
                        Constness::Variable
                    } else {
                        Constness::Constant
                    },
                    ty: merged,
                });
            }
        }

        // Operator and call-signature tables concatenate, operands in order.
        for op in &flat {
            for operator in op.operators() {
                ty.add_operator(operator);
            }
            for sig in op.call_signatures() {
                ty.add_call_signature(sig);
            }
        }

        ty
    }

    /// An uninstantiated generic declaration.
    pub fn generics(&self, params: &[&'a Type<'a>], template: &'a Type<'a>) -> &'a Type<'a> {
        let ty = Type::new_in(
            self.arena,
            TypeKind::Generics {
                params: self.arena.alloc_slice_copy(params),
                template,
            },
        );
        if let Some(name) = template.name() {
            ty.set_name(name);
        }
        ty
    }

    /// A generic placeholder with an upper-bound constraint.
    pub fn generics_param(&self, name: &str, constraint: &'a Type<'a>) -> &'a Type<'a> {
        let ty = Type::new_in(self.arena, TypeKind::GenericsParam { constraint });
        ty.set_name(self.intern_str(name));
        ty
    }

    /// The type of a type-valued binding.
    pub fn meta(&self, instance: &'a Type<'a>) -> &'a Type<'a> {
        Type::new_in(self.arena, TypeKind::Meta(instance))
    }

    /// Merge signature tables from the operands of a union: a signature
    /// survives if every table has one with the same shape; the merged
    /// parameter and return types are positionwise unions.
    pub(crate) fn merge_signature_tables(
        &'a self,
        tables: &[Vec<CallSignature<'a>>],
    ) -> Vec<CallSignature<'a>> {
        let Some((first, rest)) = tables.split_first() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        'sigs: for sig in first {
            let mut matched = vec![*sig];
            for table in rest {
                match table
                    .iter()
                    .find(|other| same_receiver(other, sig) && same_shape(other, sig))
                {
                    Some(other) => matched.push(*other),
                    None => continue 'sigs,
                }
            }
            let (required, optional) = if matched.len() == 1 {
                (sig.required, sig.optional)
            } else {
                self.union_params(&matched, &sig.ret.span())
            };
            let rets: Vec<_> = matched.iter().map(|s| s.ret).collect();
            let ret = if rets.iter().all(|r| core::ptr::eq(*r, rets[0])) {
                rets[0]
            } else {
                let rets = self.arena.alloc_slice_copy(&rets);
                self.union_thunk(rets, sig.ret.span())
            };
            out.push(CallSignature {
                receiver: sig.receiver,
                required,
                optional,
                ret,
            });
        }
        out
    }

    /// Positionwise union of the matched signatures' parameter lists.
    fn union_params(
        &'a self,
        sigs: &[CallSignature<'a>],
        span: &Span,
    ) -> (&'a [&'a Type<'a>], &'a [&'a Type<'a>]) {
        let mut required = Vec::with_capacity(sigs[0].required.len());
        for i in 0..sigs[0].required.len() {
            let tys: Vec<&'a Type<'a>> = sigs.iter().map(|s| s.required[i]).collect();
            required.push(self.union(&tys, span.clone()));
        }
        let mut optional = Vec::with_capacity(sigs[0].optional.len());
        for i in 0..sigs[0].optional.len() {
            let tys: Vec<&'a Type<'a>> = sigs.iter().map(|s| s.optional[i]).collect();
            optional.push(self.union(&tys, span.clone()));
        }
        (
            self.arena.alloc_slice_copy(&required),
            self.arena.alloc_slice_copy(&optional),
        )
    }
}

/// Key a combinator by the addresses of its flattened operand set,
/// order-insensitively.
fn operand_key(flat: &[&Type<'_>]) -> Vec<usize> {
    let mut key: Vec<usize> = flat
        .iter()
        .map(|op| *op as *const Type<'_> as usize)
        .collect();
    key.sort_unstable();
    key
}

fn same_receiver<'a>(a: &CallSignature<'a>, b: &CallSignature<'a>) -> bool {
    match (a.receiver, b.receiver) {
        (None, None) => true,
        (Some(ra), Some(rb)) => Type::same(ra, rb),
        _ => false,
    }
}

fn same_shape<'a>(a: &CallSignature<'a>, b: &CallSignature<'a>) -> bool {
    a.required.len() == b.required.len() && a.optional.len() == b.optional.len()
}

/// Flatten nested combinators of the same kind and de-duplicate by identity.
fn flatten<'a>(
    operands: &[&'a Type<'a>],
    inner: impl Fn(&'a Type<'a>) -> Option<&'a [&'a Type<'a>]> + Copy,
) -> Vec<&'a Type<'a>> {
    let mut out: Vec<&'a Type<'a>> = Vec::new();
    fn walk<'a>(
        out: &mut Vec<&'a Type<'a>>,
        operands: &[&'a Type<'a>],
        inner: impl Fn(&'a Type<'a>) -> Option<&'a [&'a Type<'a>]> + Copy,
    ) {
        for op in operands {
            match inner(op) {
                Some(nested) => walk(out, nested, inner),
                None => {
                    if !out.iter().any(|seen| Type::same(seen, op)) {
                        out.push(op);
                    }
                }
            }
        }
    }
    walk(&mut out, operands, inner);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn primitives_are_singletons() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        assert!(Type::same(tm.number(), tm.number()));
        assert!(!Type::same(tm.number(), tm.string()));
        assert_eq!(tm.number().to_string(), "number");
    }

    #[test]
    fn union_flattens_and_dedups() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let inner = tm.union(&[tm.string(), tm.number()], Span::default());
        let outer = tm.union(&[tm.number(), inner], Span::default());
        let TypeKind::Union(operands) = outer.kind else {
            panic!("expected a union, got {:?}", outer.kind);
        };
        assert_eq!(operands.len(), 2);
    }

    #[test]
    fn single_operand_union_collapses() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let u = tm.union(&[tm.number(), tm.number()], Span::default());
        assert!(Type::same(u, tm.number()));
    }

    #[test]
    fn equal_operand_sets_share_one_union() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let a = tm.union(&[tm.number(), tm.string()], Span::default());
        let b = tm.union(&[tm.string(), tm.number()], Span::default());
        assert!(Type::same(a, b));
    }

    #[test]
    fn union_merges_operators_by_shape() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let a = tm.interface(Some("A"), false, &[]);
        let b = tm.interface(Some("B"), false, &[]);
        a.add_operator(Operator {
            symbol: "==",
            native: "eq",
            sig: CallSignature {
                receiver: Some(a),
                required: arena.alloc_slice_copy(&[tm.number()]),
                optional: &[],
                ret: tm.resolved_thunk(tm.boolean()),
            },
        });
        b.add_operator(Operator {
            symbol: "==",
            native: "eq",
            sig: CallSignature {
                receiver: Some(b),
                required: arena.alloc_slice_copy(&[tm.string()]),
                optional: &[],
                ret: tm.resolved_thunk(tm.boolean()),
            },
        });

        let u = tm.union(&[a, b], Span::default());
        let eq = u.operator("==", 1).unwrap();
        let param = eq.sig.required[0];
        let TypeKind::Union(operands) = param.kind else {
            panic!("expected a union parameter, got {:?}", param.kind);
        };
        assert_eq!(operands.len(), 2);
        assert!(Type::same(eq.sig.ret.get().unwrap(), tm.boolean()));
    }

    #[test]
    fn union_exposes_common_members_only() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let a = tm.interface(Some("A"), false, &[]);
        a.add_member(Member {
            name: "shared",
            constness: Constness::Constant,
            ty: tm.resolved_thunk(tm.number()),
        });
        a.add_member(Member {
            name: "only_a",
            constness: Constness::Constant,
            ty: tm.resolved_thunk(tm.string()),
        });
        let b = tm.interface(Some("B"), false, &[]);
        b.add_member(Member {
            name: "shared",
            constness: Constness::Constant,
            ty: tm.resolved_thunk(tm.string()),
        });

        let u = tm.union(&[a, b], Span::default());
        assert!(u.member("only_a").is_none());
        let shared = u.member("shared").unwrap();
        let shared_ty = shared.ty.get().unwrap();
        let TypeKind::Union(operands) = shared_ty.kind else {
            panic!("expected union member type, got {:?}", shared_ty.kind);
        };
        assert_eq!(operands.len(), 2);
    }

    #[test]
    fn intersection_exposes_all_members() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let a = tm.interface(Some("A"), false, &[]);
        a.add_member(Member {
            name: "x",
            constness: Constness::Constant,
            ty: tm.resolved_thunk(tm.number()),
        });
        let b = tm.interface(Some("B"), false, &[]);
        b.add_member(Member {
            name: "y",
            constness: Constness::Constant,
            ty: tm.resolved_thunk(tm.string()),
        });

        let i = tm.intersection(&[a, b], Span::default());
        assert!(i.member("x").is_some());
        assert!(i.member("y").is_some());
    }

    #[test]
    fn intersection_variable_member_conflict_errors_on_force() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let a = tm.interface(Some("A"), false, &[]);
        a.add_member(Member {
            name: "x",
            constness: Constness::Variable,
            ty: tm.resolved_thunk(tm.number()),
        });
        let b = tm.interface(Some("B"), false, &[]);
        b.add_member(Member {
            name: "x",
            constness: Constness::Variable,
            ty: tm.resolved_thunk(tm.string()),
        });

        let i = tm.intersection(&[a, b], Span::default());
        let m = i.member("x").unwrap();
        assert!(m.ty.get().is_err());
    }

    #[test]
    fn class_without_constructor_has_default_signature() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let c = tm.interface(Some("C"), true, &[]);
        let sigs = c.construct_signatures(tm).unwrap();
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].max_arity(), 0);
        assert!(Type::same(sigs[0].ret.get().unwrap(), c));
    }

    #[test]
    fn interface_is_not_constructible() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let i = tm.interface(Some("I"), false, &[]);
        assert!(i.construct_signatures(tm).unwrap().is_empty());
    }

    #[test]
    fn interned_strings_are_shared() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let a = tm.intern_str("hello");
        let b = tm.intern_str("hello");
        assert!(core::ptr::eq(a, b));
    }
}
