//! The standard environment.
//!
//! Installs the builtin type names and the operator tables of the primitive
//! types. Operator entries carry the name of the runtime primitive a backend
//! would dispatch to.

use bumpalo::Bump;
use tracing::debug;

use crate::scope::Scope;
use crate::types::{CallSignature, Constness, Operator, Type, TypeManager};

/// Build the global scope every compilation starts from.
pub fn root_scope<'a>(arena: &'a Bump, tm: &'a TypeManager<'a>) -> &'a Scope<'a> {
    install_operators(tm);

    let scope = Scope::root(arena);
    for ty in [tm.any(), tm.number(), tm.string(), tm.boolean(), tm.void()] {
        let name = match ty.name() {
            Some(name) => name,
            None => unreachable!("primitive types are always named"),
        };
        let declared = scope.declare(
            name,
            Constness::Builtin,
            tm.resolved_thunk(tm.meta(ty)),
            Default::default(),
        );
        if declared.is_err() {
            unreachable!("builtin names never collide in a fresh scope");
        }
    }
    debug!("standard environment installed");
    scope
}

fn install_operators<'a>(tm: &'a TypeManager<'a>) {
    let number = tm.number();
    let string = tm.string();
    let boolean = tm.boolean();

    // Arithmetic on numbers.
    for (symbol, native) in [("+", "add"), ("-", "sub"), ("*", "mul"), ("/", "div")] {
        add_binary(tm, number, symbol, native, number, number);
    }
    // Comparisons on numbers.
    for (symbol, native) in [
        ("==", "eq"),
        ("!=", "ne"),
        ("<", "lt"),
        ("<=", "le"),
        (">", "gt"),
        (">=", "ge"),
    ] {
        add_binary(tm, number, symbol, native, number, boolean);
    }
    add_unary(tm, number, "-", "neg", number);

    add_binary(tm, string, "+", "concat", string, string);
    add_binary(tm, string, "==", "eq", string, boolean);
    add_binary(tm, string, "!=", "ne", string, boolean);

    add_binary(tm, boolean, "==", "eq", boolean, boolean);
    add_binary(tm, boolean, "!=", "ne", boolean, boolean);
    add_unary(tm, boolean, "!", "not", boolean);
}

fn add_binary<'a>(
    tm: &'a TypeManager<'a>,
    receiver: &'a Type<'a>,
    symbol: &'a str,
    native: &'a str,
    rhs: &'a Type<'a>,
    ret: &'a Type<'a>,
) {
    receiver.add_operator(Operator {
        symbol,
        native,
        sig: CallSignature {
            receiver: Some(receiver),
            required: tm.arena().alloc_slice_copy(&[rhs]),
            optional: &[],
            ret: tm.resolved_thunk(ret),
        },
    });
}

fn add_unary<'a>(
    tm: &'a TypeManager<'a>,
    receiver: &'a Type<'a>,
    symbol: &'a str,
    native: &'a str,
    ret: &'a Type<'a>,
) {
    receiver.add_operator(Operator {
        symbol,
        native,
        sig: CallSignature {
            receiver: Some(receiver),
            required: &[],
            optional: &[],
            ret: tm.resolved_thunk(ret),
        },
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Span;
    use crate::scope::Resolution;
    use crate::types::TypeKind;

    #[test]
    fn primitive_names_are_builtin_bindings() {
        crate::test_utils::init_test_logging();
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        let scope = root_scope(&arena, tm);
        let Some(Resolution::Local(binding)) = scope.resolve("number") else {
            panic!("expected 'number' in the root scope");
        };
        assert_eq!(binding.constness, Constness::Builtin);
        let bound = binding.ty.get().unwrap();
        let TypeKind::Meta(instance) = bound.kind else {
            panic!("expected a meta type, got {:?}", bound.kind);
        };
        assert!(Type::same(instance, tm.number()));
    }

    #[test]
    fn number_operators_resolve() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        root_scope(&arena, tm);

        let add = tm.number().operator("+", 1).unwrap();
        assert_eq!(add.native, "add");
        assert!(Type::same(add.sig.ret.get().unwrap(), tm.number()));

        let lt = tm.number().operator("<", 1).unwrap();
        assert!(Type::same(lt.sig.ret.get().unwrap(), tm.boolean()));

        let neg = tm.number().operator("-", 0).unwrap();
        assert_eq!(neg.native, "neg");
    }

    #[test]
    fn string_concat_is_distinct_from_number_add() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        root_scope(&arena, tm);
        let concat = tm.string().operator("+", 1).unwrap();
        assert_eq!(concat.native, "concat");
        assert!(Type::same(concat.sig.ret.get().unwrap(), tm.string()));
        assert!(tm.string().operator("*", 1).is_none());
    }

    #[test]
    fn boolean_not_resolves() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        root_scope(&arena, tm);
        let not = tm.boolean().operator("!", 0).unwrap();
        assert_eq!(not.native, "not");
    }

    #[test]
    fn bool_literals_resolve_boolean_operators() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        root_scope(&arena, tm);
        let not = tm.bool_literal(true).operator("!", 0).unwrap();
        assert_eq!(not.native, "not");
        let eq = tm.bool_literal(false).operator("==", 1).unwrap();
        assert!(Type::same(eq.sig.ret.get().unwrap(), tm.boolean()));
    }

    #[test]
    fn union_of_primitives_merges_shared_operators() {
        let arena = Bump::new();
        let tm = TypeManager::new(&arena);
        root_scope(&arena, tm);
        let ns = tm.union(&[tm.number(), tm.string()], Span::default());
        let eq = ns.operator("==", 1).unwrap();
        assert_eq!(eq.native, "eq");
        assert!(Type::same(eq.sig.required[0], ns));
        assert!(Type::same(eq.sig.ret.get().unwrap(), tm.boolean()));
        // '+' maps to different native primitives and does not merge.
        assert!(ns.operator("+", 1).is_none());
    }
}
