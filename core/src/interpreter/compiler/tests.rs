//! Compiler tests - check the emitted instruction streams

use crate::interpreter::compiler::{
    compile, compile_function, compile_with_names, dis, CompileError, Instruction, Opcode,
    MAIN_NAME,
};
use crate::interpreter::parser;
use crate::interpreter::types::ast::{Expr, Program, Stmt};

use crate::interpreter::compiler::Opcode::*;

fn ops(code: &[Instruction]) -> Vec<(Opcode, u32)> {
    code.iter().map(|i| (i.op, i.arg)).collect()
}

fn compile_source(source: &str) -> crate::interpreter::compiler::CodeObject {
    let program = parser::parse(source).expect("Should parse");
    compile(&program).expect("Should compile")
}

#[test]
fn test_const_num() {
    let program = Program {
        body: vec![Stmt::Expr {
            expr: Expr::num(10.0),
        }],
    };
    let code = compile(&program).unwrap();

    assert_eq!(
        ops(&code.code),
        vec![(LoadConstantFloat, 0), (DiscardTop, 0), (Return, 0)]
    );
    assert_eq!(code.constants_float, vec![10.0]);
    assert!(code.names.is_empty());
    assert_eq!(code.name, MAIN_NAME);
}

#[test]
fn test_assignment_and_load() {
    let code = compile_source("x = 1; y = x + 1;");
    assert_eq!(
        ops(&code.code),
        vec![
            (LoadConstantFloat, 0),
            (Assign, 0),
            (LoadVar, 0),
            (LoadConstantFloat, 0),
            (BinaryAdd, 0),
            (Assign, 1),
            (Return, 0),
        ]
    );
    assert_eq!(*code.names, vec!["x".to_string(), "y".to_string()]);
    // 1 is interned once
    assert_eq!(code.constants_float, vec![1.0]);
}

#[test]
fn test_if_jumps_past_body() {
    let code = compile_source("if (x) { y = 2; }");
    assert_eq!(
        ops(&code.code),
        vec![
            (LoadVar, 0),
            (JumpIfFalse, 4),
            (LoadConstantFloat, 0),
            (Assign, 1),
            (Return, 0),
        ]
    );
}

#[test]
fn test_while_loops_back_to_condition() {
    let code = compile_source("i = 0; while (i < 3) { i = i + 1; }");
    assert_eq!(
        ops(&code.code),
        vec![
            (LoadConstantFloat, 0), // 0
            (Assign, 0),            // i = 0
            (LoadVar, 0),           // 2: cond
            (LoadConstantFloat, 1),
            (BinaryLt, 0),
            (JumpIfFalse, 11),
            (LoadVar, 0),
            (LoadConstantFloat, 2),
            (BinaryAdd, 0),
            (Assign, 0),
            (JumpAbsolute, 2),
            (Return, 0), // 11
        ]
    );
}

#[test]
fn test_return_with_and_without_value() {
    let code = compile_source("return; return 5;");
    assert_eq!(
        ops(&code.code),
        vec![(Return, 0), (LoadConstantFloat, 0), (Return, 1), (Return, 0)]
    );
}

#[test]
fn test_literals() {
    let code = compile_source(r#"true; "hi"; "hi";"#);
    assert_eq!(
        ops(&code.code),
        vec![
            (LoadConstantBool, 1),
            (DiscardTop, 0),
            (LoadConstantStr, 0),
            (DiscardTop, 0),
            (LoadConstantStr, 0),
            (DiscardTop, 0),
            (Return, 0),
        ]
    );
    assert_eq!(code.constants_str.len(), 1);
}

#[test]
fn test_function_definition_binds_and_yields() {
    let code = compile_source("function add(a, b) { return a + b; };");
    assert_eq!(
        ops(&code.code),
        vec![
            (LoadConstantFn, 0),
            (Assign, 0),
            (LoadConstantFn, 0),
            (DiscardTop, 0),
            (Return, 0),
        ]
    );

    let add = &code.constants_fn[0];
    assert_eq!(add.name, "add");
    assert_eq!(add.arg_count, 2);
    assert_eq!(*add.names, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(
        ops(&add.code),
        vec![
            (LoadVar, 0),
            (LoadVar, 1),
            (BinaryAdd, 0),
            (Return, 1),
            (Return, 0),
        ]
    );
}

#[test]
fn test_call_pushes_callee_then_args() {
    let code = compile_source("print(1, x);");
    assert_eq!(
        ops(&code.code),
        vec![
            (LoadVar, 0),
            (LoadConstantFloat, 0),
            (LoadVar, 1),
            (Call, 2),
            (DiscardTop, 0),
            (Return, 0),
        ]
    );
}

#[test]
fn test_duplicate_parameter() {
    let err = compile_function("f", &["a".to_string(), "a".to_string()], &[]).unwrap_err();
    assert_eq!(
        err,
        CompileError::DuplicateParameter {
            function: "f".to_string(),
            param: "a".to_string()
        }
    );
}

#[test]
fn test_compile_with_existing_names_keeps_slots() {
    let program = parser::parse("y = x;").unwrap();
    let code = compile_with_names(&program, &["x".to_string()]).unwrap();
    assert_eq!(*code.names, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(ops(&code.code), vec![(LoadVar, 0), (Assign, 1), (Return, 0)]);
}

#[test]
fn test_location_and_dis() {
    let code = compile_source("function f(n) { return n * 2; }; x = f(3);");
    assert_eq!(code.location(0), "<main> #0 LOAD_CONSTANT_FN 0");

    let listing = dis(&code);
    assert!(listing.contains("== <main> (0 args) =="));
    assert!(listing.contains("== f (1 args) =="));
    assert!(listing.contains("BINARY_MUL"));
    assert!(listing.contains("(<f>)"));
}
