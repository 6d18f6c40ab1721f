//! Generic instantiation.
//!
//! Instantiating `Box<number>` checks arity and constraints, then clones the
//! template with every placeholder replaced. The substitution map is
//! arena-allocated so member types can keep substituting lazily; the clone
//! is inserted into the map before its members are built, which keeps
//! self-referential templates from recursing.

use core::cell::RefCell;

use hashbrown::{DefaultHashBuilder, HashMap};
use tracing::debug;

use crate::analyzer::error::{TypeError, TypeErrorKind};
use crate::parser::Span;
use crate::thunk::Thunk;

use super::assignable::is_assignable;
use super::manager::TypeManager;
use super::types::{CallSignature, Member, Operator, Type, TypeKind};

type SubstMap<'a> =
    RefCell<HashMap<*const Type<'a>, &'a Type<'a>, DefaultHashBuilder, &'a bumpalo::Bump>>;

pub fn instantiate<'a>(
    tm: &'a TypeManager<'a>,
    generic: &'a Type<'a>,
    args: &[&'a Type<'a>],
    span: Span,
) -> Result<&'a Type<'a>, TypeError> {
    let TypeKind::Generics { params, template } = generic.kind else {
        return Err(TypeError::new(TypeErrorKind::NotGeneric {
            ty: generic.to_string(),
            span,
        }));
    };
    let name = generic.name().unwrap_or("<generic>");
    if args.len() != params.len() {
        return Err(TypeError::new(TypeErrorKind::GenericsArityMismatch {
            name: name.to_string(),
            expected: params.len(),
            found: args.len(),
            span,
        }));
    }
    for (param, arg) in params.iter().zip(args) {
        let TypeKind::GenericsParam { constraint } = param.kind else {
            unreachable!("generics params are always placeholder types");
        };
        if !is_assignable(tm, arg, constraint)? {
            return Err(TypeError::new(TypeErrorKind::ConstraintViolation {
                name: param.name().unwrap_or("<param>").to_string(),
                argument: arg.to_string(),
                constraint: constraint.to_string(),
                span,
            }));
        }
    }
    debug!(name, args = args.len(), "instantiating generic type");

    let map: &'a SubstMap<'a> = tm.arena().alloc(RefCell::new(HashMap::new_in(tm.arena())));
    for (param, arg) in params.iter().zip(args) {
        map.borrow_mut().insert(*param as *const _, *arg);
    }
    let result = substitute(tm, template, map, span);
    if !Type::same(result, template) {
        let mut pretty = String::new();
        pretty.push_str(name);
        pretty.push('<');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                pretty.push_str(", ");
            }
            pretty.push_str(&arg.to_string());
        }
        pretty.push('>');
        result.set_name(tm.intern_str(&pretty));
    }
    Ok(result)
}

fn substitute<'a>(
    tm: &'a TypeManager<'a>,
    ty: &'a Type<'a>,
    map: &'a SubstMap<'a>,
    span: Span,
) -> &'a Type<'a> {
    let hit = map.borrow().get(&(ty as *const _)).copied();
    if let Some(mapped) = hit {
        return mapped;
    }
    match ty.kind {
        TypeKind::Any
        | TypeKind::Primitive
        | TypeKind::ConstValue { .. }
        | TypeKind::GenericsParam { .. }
        | TypeKind::Generics { .. }
        | TypeKind::Meta(_) => ty,
        TypeKind::Union(operands) => {
            let substituted: Vec<_> = operands
                .iter()
                .map(|op| substitute(tm, op, map, span.clone()))
                .collect();
            if substituted
                .iter()
                .zip(operands)
                .all(|(a, b)| Type::same(a, b))
            {
                ty
            } else {
                tm.union(&substituted, span)
            }
        }
        TypeKind::Intersection(operands) => {
            let substituted: Vec<_> = operands
                .iter()
                .map(|op| substitute(tm, op, map, span.clone()))
                .collect();
            if substituted
                .iter()
                .zip(operands)
                .all(|(a, b)| Type::same(a, b))
            {
                ty
            } else {
                tm.intersection(&substituted, span)
            }
        }
        TypeKind::Function => {
            let clone = Type::new_in(tm.arena(), TypeKind::Function);
            map.borrow_mut().insert(ty as *const _, clone);
            for sig in ty.own_call_signatures() {
                clone.add_call_signature(substitute_signature(tm, sig, map, span.clone()));
            }
            clone
        }
        TypeKind::Interface { class } => {
            let clone = tm.interface(ty.name(), class, &[]);
            map.borrow_mut().insert(ty as *const _, clone);
            for sup in ty.supers() {
                clone.add_super(substitute(tm, sup, map, span.clone()));
            }
            for m in ty.own_members() {
                clone.add_member(Member {
                    name: m.name,
                    constness: m.constness,
                    ty: substitute_thunk(tm, m.ty, map, span.clone()),
                });
            }
            for op in ty.own_operators() {
                clone.add_operator(Operator {
                    symbol: op.symbol,
                    native: op.native,
                    sig: substitute_signature(tm, op.sig, map, span.clone()),
                });
            }
            for sig in ty.own_call_signatures() {
                clone.add_call_signature(substitute_signature(tm, sig, map, span.clone()));
            }
            clone
        }
    }
}

fn substitute_signature<'a>(
    tm: &'a TypeManager<'a>,
    sig: CallSignature<'a>,
    map: &'a SubstMap<'a>,
    span: Span,
) -> CallSignature<'a> {
    let required: Vec<_> = sig
        .required
        .iter()
        .map(|p| substitute(tm, p, map, span.clone()))
        .collect();
    let optional: Vec<_> = sig
        .optional
        .iter()
        .map(|p| substitute(tm, p, map, span.clone()))
        .collect();
    CallSignature {
        receiver: sig.receiver.map(|r| substitute(tm, r, map, span.clone())),
        required: tm.arena().alloc_slice_copy(&required),
        optional: tm.arena().alloc_slice_copy(&optional),
        ret: substitute_thunk(tm, sig.ret, map, span),
    }
}

/// Wrap a type thunk so the substitution applies when it is forced.
fn substitute_thunk<'a>(
    tm: &'a TypeManager<'a>,
    thunk: &'a super::types::TypeThunk<'a>,
    map: &'a SubstMap<'a>,
    span: Span,
) -> &'a super::types::TypeThunk<'a> {
    Thunk::new(tm.arena(), thunk.span(), move || {
        let ty = thunk.get()?;
        Ok(substitute(tm, ty, map, span.clone()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::types::Constness;
    use bumpalo::Bump;
    use pretty_assertions::assert_eq;

    fn boxed<'a>(tm: &'a TypeManager<'a>) -> &'a Type<'a> {
        let param = tm.generics_param("T", tm.any());
        let template = tm.interface(Some("Box"), true, &[]);
        template.add_member(Member {
            name: "value",
            constness: Constness::Variable,
            ty: tm.resolved_thunk(param),
        });
        tm.generics(&[param], template)
    }

    #[test]
    fn instantiation_substitutes_members() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let generic = boxed(tm);
        let inst = instantiate(tm, generic, &[tm.number()], Span::default()).unwrap();
        let value = inst.member("value").unwrap();
        assert!(Type::same(value.ty.get().unwrap(), tm.number()));
        assert_eq!(inst.name(), Some("Box<number>"));
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let generic = boxed(tm);
        let err =
            instantiate(tm, generic, &[tm.number(), tm.string()], Span::default()).unwrap_err();
        assert!(matches!(
            err.kind,
            TypeErrorKind::GenericsArityMismatch {
                expected: 1,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn constraint_violation_is_an_error() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let param = tm.generics_param("T", tm.number());
        let template = tm.interface(Some("Num"), true, &[]);
        template.add_member(Member {
            name: "value",
            constness: Constness::Constant,
            ty: tm.resolved_thunk(param),
        });
        let generic = tm.generics(&[param], template);
        assert!(instantiate(tm, generic, &[tm.number()], Span::default()).is_ok());
        let err = instantiate(tm, generic, &[tm.string()], Span::default()).unwrap_err();
        assert!(matches!(err.kind, TypeErrorKind::ConstraintViolation { .. }));
    }

    #[test]
    fn self_referential_template_instantiates() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let param = tm.generics_param("T", tm.any());
        let template = tm.interface(Some("Node"), true, &[]);
        template.add_member(Member {
            name: "value",
            constness: Constness::Variable,
            ty: tm.resolved_thunk(param),
        });
        template.add_member(Member {
            name: "next",
            constness: Constness::Variable,
            ty: tm.resolved_thunk(template),
        });
        let generic = tm.generics(&[param], template);
        let inst = instantiate(tm, generic, &[tm.string()], Span::default()).unwrap();
        let next = inst.member("next").unwrap().ty.get().unwrap();
        // The self reference points at the instantiated clone, not the
        // template.
        assert!(Type::same(next, inst));
        assert!(Type::same(
            next.member("value").unwrap().ty.get().unwrap(),
            tm.string()
        ));
    }

    #[test]
    fn unrelated_types_pass_through() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let param = tm.generics_param("T", tm.any());
        let map: &SubstMap = tm.arena().alloc(RefCell::new(HashMap::new_in(tm.arena())));
        map.borrow_mut().insert(param as *const _, tm.number());
        assert!(Type::same(
            substitute(tm, tm.string(), map, Span::default()),
            tm.string()
        ));
    }
}
