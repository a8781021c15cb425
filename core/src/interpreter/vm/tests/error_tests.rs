//! Tests for runtime errors and their reported locations

use super::helpers::{parse_and_build_vm, run_source};
use crate::interpreter::compiler;
use crate::interpreter::errors::{Error, RuntimeError};
use crate::interpreter::parser;
use crate::interpreter::types::Value;
use crate::interpreter::vm::run_until_done;

fn runtime_error(source: &str) -> (RuntimeError, String) {
    let (result, _) = run_source(source);
    let Err(Error::Runtime { source, location }) = result else {
        unreachable!("Expected a runtime error, got {:?}", result);
    };
    (source, location)
}

#[test]
fn test_undefined_variable() {
    let (err, location) = runtime_error("x = 1; print(y);");

    assert!(matches!(err, RuntimeError::UndefinedVariable { ref name } if name == "y"));
    assert_eq!(err.to_string(), "Variable \"y\" is not defined");
    assert!(location.starts_with("<main> #"), "location: {}", location);
    assert!(location.ends_with("LOAD_VAR 2"), "location: {}", location);
}

#[test]
fn test_error_location_names_function() {
    let (_, location) = runtime_error("function f() { return missing; } f();");
    assert_eq!(location, "f #0 LOAD_VAR 0");
}

#[test]
fn test_call_non_function() {
    let (err, _) = runtime_error("x = 1; x();");

    assert!(matches!(err, RuntimeError::NotCallable { type_name: "number" }));
    assert_eq!(err.to_string(), "number is not a function");
}

#[test]
fn test_stack_overflow() {
    let program = parser::parse("function f(n) { return f(n + 1); } f(0);").unwrap();
    let code = compiler::compile(&program).unwrap();
    let mut vm = crate::interpreter::vm::VM::new(Vec::new()).with_max_call_depth(50);
    vm.load(code);

    let Err(Error::Runtime { source, .. }) = run_until_done(&mut vm) else {
        unreachable!("Expected stack overflow");
    };
    assert!(matches!(source, RuntimeError::StackOverflow { max_depth: 50 }));
    assert!(vm.frames.is_empty());
}

#[test]
fn test_deep_recursion_within_limit() {
    let source = r#"
        function depth(n) {
            if (n == 0) {
                return 0;
            }
            return 1 + depth(n - 1);
        }
        print(depth(900));
    "#;
    let (result, output) = run_source(source);
    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(output, "900\n");
}

#[test]
fn test_assertion_failure() {
    let (err, _) = runtime_error("assert(1 == 1); assert(1 == 2);");
    assert!(matches!(err, RuntimeError::AssertionFailed));
}

#[test]
fn test_output_before_error_is_kept() {
    let (result, output) = run_source("print(1); print(nope); print(2);");
    assert!(result.is_err());
    assert_eq!(output, "1\n");
}

#[test]
fn test_vm_usable_after_error() {
    let mut vm = parse_and_build_vm("x = 1; y = x + z;");
    assert!(run_until_done(&mut vm).is_err());
    assert_eq!(vm.global("x"), Some(Value::Num(1.0)));

    let program = parser::parse("z = 2; y = x + z;").unwrap();
    let code = compiler::compile_with_names(&program, &vm.global_names()).unwrap();
    vm.load(code);
    run_until_done(&mut vm).unwrap();

    assert_eq!(vm.global("y"), Some(Value::Num(3.0)));
}
