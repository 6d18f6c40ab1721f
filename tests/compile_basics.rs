mod common;

use common::{error_codes, result_type, sole_error};
use indoc::indoc;
use pretty_assertions::assert_eq;

#[test]
fn literals_and_arithmetic() {
    assert_eq!(result_type("1 + 2"), "number");
    assert_eq!(result_type("\"a\" + \"b\""), "string");
    assert_eq!(result_type("1 < 2"), "boolean");
    assert_eq!(result_type("-(1 * 3)"), "number");
    assert_eq!(result_type("!true"), "boolean");
}

#[test]
fn boolean_literals_keep_their_refinement() {
    assert_eq!(result_type("true"), "true");
    assert_eq!(result_type("false"), "false");
    // The refinement still flows into a boolean slot and still carries
    // boolean's operators.
    assert_eq!(result_type("let b boolean = true  b"), "boolean");
    assert_eq!(result_type("true == false"), "boolean");
    assert_eq!(result_type("!false"), "boolean");
}

#[test]
fn let_bindings_chain() {
    assert_eq!(result_type("let x = 1 + 2  x * 3"), "number");
    assert_eq!(result_type("let x = \"s\"  let y = x  y"), "string");
}

#[test]
fn precedence_types_through_calls() {
    let source = indoc! {"
        fn f(a number, b number) number { a + b }
        1 + 2 * 1 * f(1, 2)
    "};
    assert_eq!(result_type(source), "number");
}

#[test]
fn functions_and_lambdas() {
    assert_eq!(
        result_type("fn double(n number) number { n * 2 }  double(21)"),
        "number"
    );
    assert_eq!(result_type("let f = (a number) => a + 1  f(2)"), "number");
    // Inferred return type comes from the body's final expression.
    assert_eq!(
        result_type("fn greet(name string) { name + \"!\" }  greet(\"hi\")"),
        "string"
    );
}

#[test]
fn optional_parameters_widen_arity() {
    let source = indoc! {"
        fn greet(name string, punct string?) string { name }
        greet(\"hi\")
    "};
    assert_eq!(result_type(source), "string");

    let source = indoc! {"
        fn greet(name string, punct string?) string { name }
        greet(\"hi\", \"!\")
    "};
    assert_eq!(result_type(source), "string");

    let source = indoc! {"
        fn greet(name string, punct string?) string { name }
        greet()
    "};
    assert_eq!(error_codes(source), vec!["E011"]);
}

#[test]
fn if_expressions() {
    assert_eq!(result_type("if 1 < 2 { 1 } else { 2 }"), "number");
    assert_eq!(
        result_type("if 1 < 2 { 1 } else { \"one\" }"),
        "number | string"
    );
    // A missing branch can produce anything.
    assert_eq!(result_type("if true { 1 }"), "number | any");
    assert_eq!(
        result_type("if false { 1 } else if true { 2 } else { 3 }"),
        "number"
    );
}

#[test]
fn if_condition_must_be_boolean() {
    let diag = sole_error("if 1 { 2 } else { 3 }");
    assert_eq!(diag.code.as_deref(), Some("E007"));
    assert!(diag.message.contains("boolean"), "{}", diag.message);
}

#[test]
fn undefined_variable() {
    let diag = sole_error("y + 1");
    assert_eq!(diag.code.as_deref(), Some("E002"));
    assert_eq!(diag.span.0, 0..1);
}

#[test]
fn duplicate_declaration_in_scope() {
    assert_eq!(error_codes("let a = 1  let a = 2"), vec!["E003"]);
}

#[test]
fn shadowing_is_scoped() {
    // Inner scopes may shadow outer bindings but never builtins.
    assert_eq!(
        result_type("let a = 1  fn f() string { let a = \"x\"  a }  f()"),
        "string"
    );
    assert_eq!(error_codes("let number = 3"), vec!["E004"]);
}

#[test]
fn assignment_rules() {
    assert_eq!(result_type("var a = 1  a = 2  a"), "number");
    assert_eq!(error_codes("let a = 1  a = 2"), vec!["E005"]);
    assert_eq!(error_codes("var a = 1  a = \"s\""), vec!["E007"]);
    assert_eq!(error_codes("number = 3"), vec!["E006"]);
}

#[test]
fn annotations_are_checked() {
    assert_eq!(result_type("let a number = 1  a"), "number");
    let diag = sole_error("let a number = \"s\"");
    assert_eq!(diag.code.as_deref(), Some("E007"));
}

#[test]
fn operators_are_per_type() {
    assert_eq!(error_codes("\"a\" - \"b\""), vec!["E009"]);
    assert_eq!(error_codes("1 + \"a\""), vec!["E007"]);
    assert_eq!(error_codes("!1"), vec!["E009"]);
}

#[test]
fn only_functions_are_callable() {
    assert_eq!(error_codes("let n = 1  n(2)"), vec!["E010"]);
}

#[test]
fn this_requires_a_receiver() {
    assert_eq!(error_codes("this"), vec!["E002"]);
}

#[test]
fn annotation_must_name_a_type() {
    assert_eq!(error_codes("let q = 1  let w q = 2"), vec!["E013"]);
}

#[test]
fn independent_top_level_errors_accumulate() {
    let codes = error_codes("let a = missing1  let b = missing2");
    assert_eq!(codes, vec!["E002", "E002"]);
}

#[test]
fn syntax_errors_have_their_own_codes() {
    let diag = sole_error("let = 3");
    assert_eq!(diag.code.as_deref(), Some("P001"));
    let diag = sole_error("fn f(a number?, b number) { a }");
    assert_eq!(diag.code.as_deref(), Some("P007"));
    let diag = sole_error("1 + 2 = 3");
    assert_eq!(diag.code.as_deref(), Some("P006"));
}
