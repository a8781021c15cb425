//! Test helpers for VM tests
//!
//! Common utilities for compiling source and building VMs

use std::rc::Rc;

use crate::interpreter::compiler::{self, CodeObject, Instruction, Opcode};
use crate::interpreter::errors::Error;
use crate::interpreter::parser;
use crate::interpreter::types::Value;
use crate::interpreter::vm::{run_until_done, VM};

/// Parse, compile and load source into a VM writing to a buffer
///
/// The AST goes through a JSON round-trip first so every test also checks
/// that the serialized form compiles to the same program.
pub fn parse_and_build_vm(source: &str) -> VM<Vec<u8>> {
    let program = parser::parse(source).expect("Parse failed");
    let json = serde_json::to_string(&program).expect("Program serialization failed");
    let program = serde_json::from_str(&json).expect("Program deserialization failed");
    let code = compiler::compile(&program).expect("Compile failed");

    let mut vm = VM::new(Vec::new());
    vm.load(code);
    vm
}

/// Run source to completion, returning the result and everything printed
pub fn run_source(source: &str) -> (Result<Value, Error>, String) {
    let mut vm = parse_and_build_vm(source);
    let result = run_until_done(&mut vm);
    let output = String::from_utf8(vm.output().clone()).expect("Output is not UTF-8");
    (result, output)
}

/// Run source that must succeed and return what it printed
pub fn run_output(source: &str) -> String {
    let (result, output) = run_source(source);
    if let Err(e) = result {
        panic!("Run failed: {}\nOutput so far:\n{}", e, output);
    }
    output
}

/// Hand-assembled top-level code object
pub fn code_object(code: &[(Opcode, u32)], floats: &[f64], names: &[&str]) -> CodeObject {
    CodeObject {
        name: compiler::MAIN_NAME.to_string(),
        code: code
            .iter()
            .map(|(op, arg)| Instruction::new(*op, *arg))
            .collect(),
        constants_float: floats.to_vec(),
        constants_str: Vec::new(),
        constants_fn: Vec::new(),
        names: Rc::new(names.iter().map(|s| s.to_string()).collect()),
        arg_count: 0,
    }
}

/// Load a hand-assembled code object and run it
pub fn run_code(code: CodeObject) -> (VM<Vec<u8>>, Result<Value, Error>) {
    let mut vm = VM::new(Vec::new());
    vm.load(code);
    let result = run_until_done(&mut vm);
    (vm, result)
}
