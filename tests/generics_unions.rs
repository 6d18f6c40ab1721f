mod common;

use common::{error_codes, result_type, sole_error};
use indoc::indoc;
use pretty_assertions::assert_eq;

#[test]
fn union_exposes_common_members() {
    let source = indoc! {"
        class Dog {
            name string
            bark() string { \"woof\" }
        }
        class Cat {
            name string
            meow() string { \"meow\" }
        }
        fn name_of(a Dog | Cat) string { a.name }
        name_of(new Dog())
    "};
    assert_eq!(result_type(source), "string");
}

#[test]
fn union_hides_uncommon_members() {
    let source = indoc! {"
        class Dog {
            name string
            bark() string { \"woof\" }
        }
        class Cat {
            name string
        }
        fn noise(a Dog | Cat) string { a.bark() }
    "};
    assert_eq!(error_codes(source), vec!["E008"]);
}

#[test]
fn union_annotation_display() {
    assert_eq!(result_type("let u number | string = 1  u"), "number | string");
}

#[test]
fn union_keeps_operators_shared_by_all_operands() {
    let source = indoc! {"
        fn same(u number | string) boolean { u == u }
        same(1)
    "};
    assert_eq!(result_type(source), "boolean");

    // '+' means different natives on number and string, so the union
    // drops it.
    let source = "fn cat(u number | string) number { u + u }";
    assert_eq!(error_codes(source), vec!["E009"]);
}

#[test]
fn union_accepts_any_operand_and_nothing_else() {
    let source = "fn f(u number | string) number { 1 }  f(true)";
    assert_eq!(error_codes(source), vec!["E011"]);
    assert_eq!(
        result_type("fn f(u number | string) number { 1 }  f(\"s\")"),
        "number"
    );
}

#[test]
fn intersection_exposes_all_members() {
    let source = indoc! {"
        class Dog {
            bark() string { \"woof\" }
        }
        class Cat {
            meow() string { \"meow\" }
        }
        fn chimera(b Dog & Cat) string { b.bark() + b.meow() }
        1
    "};
    assert_eq!(result_type(source), "number");
}

#[test]
fn conflicting_mutable_members_in_intersection() {
    let source = indoc! {"
        class A {
            x number
        }
        class B {
            x string
        }
        fn g(v A & B) number { v.x }
    "};
    assert_eq!(error_codes(source), vec!["E019"]);
}

#[test]
fn type_aliases_name_their_types() {
    let source = indoc! {"
        class Dog {
            name string
        }
        class Cat {
            name string
        }
        type Pet = Dog | Cat
        let u Pet = new Dog()
        u
    "};
    assert_eq!(result_type(source), "Pet");
}

#[test]
fn generic_class_instantiates() {
    let source = indoc! {"
        class Box<T> {
            value T
            constructor(v T) { value = v }
            get() T { value }
        }
        new Box<number>(1).get()
    "};
    assert_eq!(result_type(source), "number");
}

#[test]
fn instantiations_are_named_after_their_arguments() {
    let source = indoc! {"
        class Box<T> {
            value T
        }
        new Box<string>()
    "};
    assert_eq!(result_type(source), "Box<string>");
}

#[test]
fn substitution_reaches_members() {
    let source = indoc! {"
        class Box<T> {
            value T
            constructor(v T) { value = v }
        }
        let b = new Box<string>(\"s\")
        b.value
    "};
    assert_eq!(result_type(source), "string");
}

#[test]
fn generic_arity_is_checked() {
    let source = indoc! {"
        class Box<T> {
            value T
        }
        type B2 = Box<number, string>
    "};
    assert_eq!(error_codes(source), vec!["E015"]);
}

#[test]
fn constraints_bound_type_arguments() {
    let source = indoc! {"
        class NumBox<T number> {
            value T
        }
        type Bad = NumBox<string>
    "};
    assert_eq!(error_codes(source), vec!["E016"]);

    let source = indoc! {"
        class NumBox<T number> {
            value T
        }
        new NumBox<number>()
    "};
    assert_eq!(result_type(source), "NumBox<number>");
}

#[test]
fn type_arguments_on_non_generic() {
    let diag = sole_error("class Plain { }  type P = Plain<number>");
    assert_eq!(diag.code.as_deref(), Some("E014"));
}
