#![allow(dead_code)]

use bumpalo::Bump;
use opal::{Engine, Error};

/// Compile `source` and return the display form of the program's result
/// type. Panics with rendered diagnostics if compilation fails.
pub fn result_type(source: &str) -> String {
    let arena = Bump::new();
    let engine = Engine::new(&arena);
    match engine.compile(source) {
        Ok(program) => program
            .result_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "void".to_string()),
        Err(e) => panic!(
            "compilation failed:\n{}",
            opal::render_error_to_string_no_color(&e)
        ),
    }
}

/// Compile `source`, expecting failure, and return the diagnostic codes in
/// order.
pub fn error_codes(source: &str) -> Vec<String> {
    let arena = Bump::new();
    let engine = Engine::new(&arena);
    match engine.compile(source) {
        Ok(program) => panic!(
            "expected compilation to fail, got result type {:?}\nsource: {source}",
            program.result_type().map(|t| t.to_string())
        ),
        Err(Error::Compilation { diagnostics, .. }) => diagnostics
            .iter()
            .map(|d| d.code.clone().unwrap_or_default())
            .collect(),
        Err(other) => panic!("unexpected error: {other}"),
    }
}

/// The single diagnostic `source` fails with.
pub fn sole_error(source: &str) -> opal::Diagnostic {
    let arena = Bump::new();
    let engine = Engine::new(&arena);
    match engine.compile(source) {
        Ok(_) => panic!("expected compilation to fail\nsource: {source}"),
        Err(Error::Compilation { mut diagnostics, .. }) => {
            assert_eq!(
                diagnostics.len(),
                1,
                "expected one diagnostic, got {diagnostics:#?}"
            );
            diagnostics.remove(0)
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
}
