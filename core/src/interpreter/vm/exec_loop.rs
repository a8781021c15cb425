//! Core execution loop
//!
//! This module contains the step() function - the heart of the interpreter.
//! It executes one instruction of the top frame and manages the frame stack
//! for calls and returns.
//!
//! ## Function Organization
//! Functions are ordered by importance/call hierarchy:
//! 1. run_until_done() - Top-level driver (calls step repeatedly)
//! 2. step() - Instruction dispatch
//! 3. call() / do_return() - Frame management

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use super::operators;
use super::scope::Scope;
use super::stdlib::{self, Builtin};
use super::{Frame, Step, VM};
use crate::interpreter::compiler::Opcode;
use crate::interpreter::errors::{Error, RuntimeError};
use crate::interpreter::types::{Closure, Value};

/* ===================== Public API ===================== */

/// Run the VM until the outermost frame returns
///
/// On failure the frame stack is discarded and the error carries the
/// location of the instruction that failed.
pub fn run_until_done<W: Write>(vm: &mut VM<W>) -> Result<Value, Error> {
    loop {
        match step(vm) {
            Ok(Step::Continue) => continue,
            Ok(Step::Done(value)) => return Ok(value),
            Err(source) => {
                let location = vm
                    .frames
                    .last()
                    .map(Frame::location)
                    .unwrap_or_else(|| "<no frame>".to_string());
                vm.discard_frames();
                tracing::debug!(%location, error = %source, "runtime error");
                return Err(Error::Runtime { source, location });
            }
        }
    }
}

/// Execute one instruction
///
/// Returns `Step::Done` once the outermost frame has returned. Stepping a
/// VM with no frames is also `Done`, with `undefined`.
pub fn step<W: Write>(vm: &mut VM<W>) -> Result<Step, RuntimeError> {
    let Some(frame) = vm.frames.last_mut() else {
        return Ok(Step::Done(Value::Undefined));
    };

    let instr = *frame.code.code.get(frame.pc).ok_or_else(|| {
        RuntimeError::InvalidBytecode(format!("pc {} out of range in {}", frame.pc, frame.code.name))
    })?;
    frame.pc += 1;
    let arg = instr.arg as usize;

    match instr.op {
        Opcode::LoadConstantFloat => {
            let v = *frame
                .code
                .constants_float
                .get(arg)
                .ok_or_else(|| bad_constant("float", arg))?;
            frame.push(Value::Num(v));
        }

        Opcode::LoadConstantStr => {
            let s = frame
                .code
                .constants_str
                .get(arg)
                .cloned()
                .ok_or_else(|| bad_constant("string", arg))?;
            frame.push(Value::Str(s));
        }

        Opcode::LoadConstantBool => frame.push(Value::Bool(arg != 0)),

        Opcode::LoadConstantFn => {
            let code = frame
                .code
                .constants_fn
                .get(arg)
                .cloned()
                .ok_or_else(|| bad_constant("function", arg))?;
            let closure = Closure {
                code,
                scope: Rc::clone(&frame.scope),
            };
            frame.push(Value::Function(Rc::new(closure)));
        }

        Opcode::LoadVar => {
            let found = frame.scope.borrow().lookup(arg);
            let value = match found {
                Some(value) => value,
                None => {
                    let name = frame.code.names.get(arg).ok_or_else(|| {
                        RuntimeError::InvalidBytecode(format!("variable slot {} out of range", arg))
                    })?;
                    match Builtin::lookup(name) {
                        Some(builtin) => Value::Builtin(builtin),
                        None => {
                            return Err(RuntimeError::UndefinedVariable { name: name.clone() })
                        }
                    }
                }
            };
            frame.push(value);
        }

        Opcode::Assign => {
            let value = frame.pop()?;
            frame.scope.borrow_mut().set(arg, value)?;
        }

        Opcode::DiscardTop => {
            frame.pop()?;
        }

        Opcode::JumpIfFalse => {
            if !frame.pop()?.is_truthy() {
                frame.pc = arg;
            }
        }

        Opcode::JumpAbsolute => frame.pc = arg,

        Opcode::Call => return call(vm, arg),

        Opcode::Return => return do_return(vm, arg != 0),

        op => {
            let binop = op.binop().ok_or_else(|| {
                RuntimeError::InvalidBytecode(format!("unhandled opcode {}", op))
            })?;
            let right = frame.pop()?;
            let left = frame.pop()?;
            frame.push(operators::binary(binop, &left, &right)?);
        }
    }

    Ok(Step::Continue)
}

fn bad_constant(kind: &str, idx: usize) -> RuntimeError {
    RuntimeError::InvalidBytecode(format!("{} constant {} out of range", kind, idx))
}

/* ===================== Frame Management ===================== */

/// CALL argc: stack holds the callee followed by `argc` arguments
fn call<W: Write>(vm: &mut VM<W>, argc: usize) -> Result<Step, RuntimeError> {
    let frame = vm.current_frame_mut()?;
    let args = frame.pop_args(argc)?;
    let callee = frame.pop()?;

    match callee {
        Value::Builtin(builtin) => {
            let result = stdlib::call_builtin(builtin, &args, &mut vm.out)?;
            vm.current_frame_mut()?.push(result);
        }

        Value::Function(closure) => {
            // frames includes the top level, so this is the new call depth
            if vm.frames.len() > vm.max_call_depth {
                return Err(RuntimeError::StackOverflow {
                    max_depth: vm.max_call_depth,
                });
            }

            let code = Rc::clone(&closure.code);
            let mut scope = Scope::new(Rc::clone(&code.names), Some(Rc::clone(&closure.scope)));
            let mut args = args.into_iter();
            for slot in 0..code.arg_count {
                scope.set(slot, args.next().unwrap_or(Value::Undefined))?;
            }

            tracing::trace!(function = %code.name, depth = vm.frames.len(), "call");
            vm.frames.push(Frame::new(code, Rc::new(RefCell::new(scope))));
        }

        other => {
            return Err(RuntimeError::NotCallable {
                type_name: other.type_name(),
            })
        }
    }

    Ok(Step::Continue)
}

/// RETURN: pop the frame and hand the value to the caller
fn do_return<W: Write>(vm: &mut VM<W>, has_value: bool) -> Result<Step, RuntimeError> {
    let value = {
        let frame = vm.current_frame_mut()?;
        if has_value {
            frame.pop()?
        } else {
            Value::Undefined
        }
    };
    if let Some(frame) = vm.frames.pop() {
        tracing::trace!(function = %frame.code.name, "return");
        vm.release_frame(frame);
    }

    match vm.frames.last_mut() {
        Some(caller) => {
            caller.push(value);
            Ok(Step::Continue)
        }
        None => {
            vm.sweep_retained();
            Ok(Step::Done(value))
        }
    }
}
