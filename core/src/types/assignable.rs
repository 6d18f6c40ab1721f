//! Structural assignability.
//!
//! `is_assignable(tm, source, target)` answers whether a value of type
//! `source` may flow into a slot of type `target`. Checks on recursive
//! types terminate coinductively: a pair already under examination is
//! assumed compatible.

use super::manager::TypeManager;
use super::types::{CallSignature, Type, TypeKind};
use crate::analyzer::error::TypeError;

type Seen<'a> = Vec<(*const Type<'a>, *const Type<'a>)>;

pub fn is_assignable<'a>(
    tm: &'a TypeManager<'a>,
    source: &'a Type<'a>,
    target: &'a Type<'a>,
) -> Result<bool, TypeError> {
    check(tm, source, target, &mut Vec::new())
}

/// Whether a value of signature `source` can stand in for `target`:
/// parameters are contravariant, returns covariant.
pub fn is_signature_castable<'a>(
    tm: &'a TypeManager<'a>,
    source: &CallSignature<'a>,
    target: &CallSignature<'a>,
) -> Result<bool, TypeError> {
    signature_castable(tm, source, target, &mut Vec::new())
}

fn check<'a>(
    tm: &'a TypeManager<'a>,
    source: &'a Type<'a>,
    target: &'a Type<'a>,
    seen: &mut Seen<'a>,
) -> Result<bool, TypeError> {
    if Type::same(source, target) {
        return Ok(true);
    }
    if matches!(source.kind, TypeKind::Any) || matches!(target.kind, TypeKind::Any) {
        return Ok(true);
    }

    let pair = (source as *const _, target as *const _);
    if seen.contains(&pair) {
        return Ok(true);
    }
    seen.push(pair);
    let result = check_inner(tm, source, target, seen);
    seen.pop();
    result
}

fn check_inner<'a>(
    tm: &'a TypeManager<'a>,
    source: &'a Type<'a>,
    target: &'a Type<'a>,
    seen: &mut Seen<'a>,
) -> Result<bool, TypeError> {
    // A literal refinement flows wherever its base does.
    if let TypeKind::ConstValue { base, .. } = source.kind {
        return check(tm, base, target, seen);
    }

    // A union source must be assignable operand by operand.
    if let TypeKind::Union(operands) = source.kind {
        for op in operands {
            if !check(tm, op, target, seen)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    // A generic placeholder is known only up to its constraint.
    if let TypeKind::GenericsParam { constraint } = source.kind {
        return check(tm, constraint, target, seen);
    }

    match target.kind {
        TypeKind::Union(operands) => {
            for op in operands {
                if check(tm, source, op, seen)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        TypeKind::Intersection(operands) => {
            for op in operands {
                if !check(tm, source, op, seen)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        // Primitives, literal refinements, placeholders and uninstantiated
        // generics are compatible by identity only, which was ruled out
        // above.
        TypeKind::Primitive
        | TypeKind::ConstValue { .. }
        | TypeKind::GenericsParam { .. }
        | TypeKind::Generics { .. } => {
            // An intersection source still qualifies through any operand.
            if let TypeKind::Intersection(operands) = source.kind {
                for op in operands {
                    if check(tm, op, target, seen)? {
                        return Ok(true);
                    }
                }
            }
            Ok(false)
        }
        TypeKind::Meta(target_instance) => match source.kind {
            TypeKind::Meta(source_instance) => {
                Ok(Type::same(source_instance, target_instance))
            }
            _ => Ok(false),
        },
        TypeKind::Interface { .. } | TypeKind::Function => {
            if let TypeKind::Intersection(operands) = source.kind {
                for op in operands {
                    if check(tm, op, target, seen)? {
                        return Ok(true);
                    }
                }
            }
            structural(tm, source, target, seen)
        }
        TypeKind::Any => Ok(true),
    }
}

/// Member-wise and signature-wise compatibility: every member and signature
/// the target declares must be satisfied by the source.
fn structural<'a>(
    tm: &'a TypeManager<'a>,
    source: &'a Type<'a>,
    target: &'a Type<'a>,
    seen: &mut Seen<'a>,
) -> Result<bool, TypeError> {
    for m in target.members() {
        let Some(found) = source.member(m.name) else {
            return Ok(false);
        };
        if !check(tm, found.ty.get()?, m.ty.get()?, seen)? {
            return Ok(false);
        }
    }

    for target_sig in target.call_signatures() {
        let source_sigs = source.call_signatures();
        let mut satisfied = false;
        for source_sig in &source_sigs {
            if signature_castable(tm, source_sig, &target_sig, seen)? {
                satisfied = true;
                break;
            }
        }
        if !satisfied {
            return Ok(false);
        }
    }

    for target_sig in target.construct_signatures(tm)? {
        let source_sigs = source.construct_signatures(tm)?;
        let mut satisfied = false;
        for source_sig in &source_sigs {
            if signature_castable(tm, source_sig, &target_sig, seen)? {
                satisfied = true;
                break;
            }
        }
        if !satisfied {
            return Ok(false);
        }
    }

    Ok(true)
}

fn signature_castable<'a>(
    tm: &'a TypeManager<'a>,
    source: &CallSignature<'a>,
    target: &CallSignature<'a>,
    seen: &mut Seen<'a>,
) -> Result<bool, TypeError> {
    // Declared receivers are bound at member lookup, never at the call, so
    // they play no part in castability. Methods satisfy free-function
    // signatures and vice versa.
    if source.required.len() != target.required.len()
        || source.optional.len() < target.optional.len()
    {
        return Ok(false);
    }

    for i in 0..target.max_arity() {
        let (Some(sp), Some(tp)) = (source.param(i), target.param(i)) else {
            return Ok(false);
        };
        if !check(tm, tp, sp, seen)? {
            return Ok(false);
        }
    }

    check(tm, source.ret.get()?, target.ret.get()?, seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Span;
    use crate::types::types::{Constness, Member};
    use bumpalo::Bump;

    #[test]
    fn any_is_assignable_both_ways() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        assert!(is_assignable(tm, tm.number(), tm.any()).unwrap());
        assert!(is_assignable(tm, tm.any(), tm.number()).unwrap());
    }

    #[test]
    fn primitives_require_identity() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        assert!(is_assignable(tm, tm.number(), tm.number()).unwrap());
        assert!(!is_assignable(tm, tm.number(), tm.string()).unwrap());
    }

    #[test]
    fn const_value_widens_to_base_but_not_back() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        assert!(is_assignable(tm, tm.bool_literal(true), tm.boolean()).unwrap());
        assert!(!is_assignable(tm, tm.boolean(), tm.bool_literal(true)).unwrap());
    }

    #[test]
    fn union_directions() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let ns = tm.union(&[tm.number(), tm.string()], Span::default());
        let nsb = tm.union(
            &[tm.number(), tm.string(), tm.boolean()],
            Span::default(),
        );
        assert!(is_assignable(tm, tm.number(), ns).unwrap());
        assert!(is_assignable(tm, ns, nsb).unwrap());
        assert!(!is_assignable(tm, nsb, ns).unwrap());
        assert!(!is_assignable(tm, ns, tm.number()).unwrap());
    }

    #[test]
    fn intersection_directions() {
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
        let ab = tm.intersection(&[a, b], Span::default());
        assert!(is_assignable(tm, ab, a).unwrap());
        assert!(is_assignable(tm, ab, b).unwrap());
        assert!(!is_assignable(tm, a, ab).unwrap());
    }

    #[test]
    fn structural_member_subsumption() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let wide = tm.interface(Some("Wide"), false, &[]);
        wide.add_member(Member {
            name: "x",
            constness: Constness::Constant,
            ty: tm.resolved_thunk(tm.number()),
        });
        wide.add_member(Member {
            name: "y",
            constness: Constness::Constant,
            ty: tm.resolved_thunk(tm.string()),
        });
        let narrow = tm.interface(Some("Narrow"), false, &[]);
        narrow.add_member(Member {
            name: "x",
            constness: Constness::Constant,
            ty: tm.resolved_thunk(tm.number()),
        });
        assert!(is_assignable(tm, wide, narrow).unwrap());
        assert!(!is_assignable(tm, narrow, wide).unwrap());
    }

    #[test]
    fn function_params_contravariant_returns_covariant() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let animal = tm.interface(Some("Animal"), false, &[]);
        animal.add_member(Member {
            name: "name",
            constness: Constness::Constant,
            ty: tm.resolved_thunk(tm.string()),
        });
        let cat = tm.interface(Some("Cat"), false, &[animal]);
        cat.add_member(Member {
            name: "purrs",
            constness: Constness::Constant,
            ty: tm.resolved_thunk(tm.boolean()),
        });

        let animal_to_cat =
            tm.function(None, &[animal], &[], tm.resolved_thunk(cat));
        let cat_to_animal =
            tm.function(None, &[cat], &[], tm.resolved_thunk(animal));

        // (Animal) => Cat may stand in for (Cat) => Animal, not vice versa.
        assert!(is_assignable(tm, animal_to_cat, cat_to_animal).unwrap());
        assert!(!is_assignable(tm, cat_to_animal, animal_to_cat).unwrap());
    }

    #[test]
    fn optional_parameters_widen_callability() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let with_opt = tm.function(
            None,
            &[tm.number()],
            &[tm.number()],
            tm.resolved_thunk(tm.number()),
        );
        let without = tm.function(None, &[tm.number()], &[], tm.resolved_thunk(tm.number()));
        assert!(is_assignable(tm, with_opt, without).unwrap());
        assert!(!is_assignable(tm, without, with_opt).unwrap());
    }

    #[test]
    fn recursive_structural_types_terminate() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let a = tm.interface(Some("A"), false, &[]);
        a.add_member(Member {
            name: "next",
            constness: Constness::Constant,
            ty: tm.resolved_thunk(a),
        });
        let b = tm.interface(Some("B"), false, &[]);
        b.add_member(Member {
            name: "next",
            constness: Constness::Constant,
            ty: tm.resolved_thunk(b),
        });
        assert!(is_assignable(tm, a, b).unwrap());
    }

    #[test]
    fn generics_param_goes_through_constraint() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let t = tm.generics_param("T", tm.number());
        assert!(is_assignable(tm, t, tm.number()).unwrap());
        assert!(!is_assignable(tm, tm.number(), t).unwrap());
    }

    #[test]
    fn signature_castability_ignores_declared_receivers() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let owner = tm.interface(Some("Owner"), false, &[]);
        let method = CallSignature {
            receiver: Some(owner),
            required: arena.alloc_slice_copy(&[tm.number()]),
            optional: &[],
            ret: tm.resolved_thunk(tm.string()),
        };
        let free = CallSignature {
            receiver: None,
            required: arena.alloc_slice_copy(&[tm.number()]),
            optional: &[],
            ret: tm.resolved_thunk(tm.string()),
        };
        assert!(is_signature_castable(tm, &method, &free).unwrap());
        assert!(is_signature_castable(tm, &free, &method).unwrap());
    }
}
