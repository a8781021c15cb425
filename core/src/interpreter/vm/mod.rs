//! # Bytecode VM - Stack-Driven Interpreter
//!
//! ## Core Principles
//!
//! 1. **Stack-driven execution**: script calls push a `Frame` onto
//!    `frames`, no host recursion
//! 2. **One instruction per step**: `step()` executes exactly one
//!    instruction of the top frame
//! 3. **Closures by scope**: function values capture the scope they were
//!    created in; unassigned locals resolve through it by name
//! 4. **Pure executor**: the only side effect is writing to `out`

pub mod exec_loop;
pub mod operators;
pub mod scope;
pub mod stdlib;

#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::io::Write;
use std::rc::{Rc, Weak};

use super::compiler::CodeObject;
use super::errors::RuntimeError;
use super::types::Value;
pub use exec_loop::{run_until_done, step};
pub use scope::Scope;
pub use stdlib::Builtin;

/// Default limit on nested script calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

/// Retained scopes kept before the first sweep
const SWEEP_THRESHOLD: usize = 64;

/* ===================== Frames ===================== */

/// Execution frame - one per active code object
#[derive(Debug)]
pub struct Frame {
    pub code: Rc<CodeObject>,
    /// Index of the next instruction
    pub pc: usize,
    /// Operand stack
    pub stack: Vec<Value>,
    pub scope: Rc<RefCell<Scope>>,
}

impl Frame {
    pub fn new(code: Rc<CodeObject>, scope: Rc<RefCell<Scope>>) -> Self {
        Self {
            code,
            pc: 0,
            stack: Vec::with_capacity(8),
            scope,
        }
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::InvalidBytecode("value stack underflow".to_string()))
    }

    /// Pop the top `n` values, returned in push order
    pub fn pop_args(&mut self, n: usize) -> Result<Vec<Value>, RuntimeError> {
        let split = self.stack.len().checked_sub(n).ok_or_else(|| {
            RuntimeError::InvalidBytecode(format!("call expects {} arguments on the stack", n))
        })?;
        Ok(self.stack.split_off(split))
    }

    /// Location of the instruction executed last
    pub fn location(&self) -> String {
        self.code.location(self.pc.saturating_sub(1))
    }
}

/* ===================== VM ===================== */

/// Virtual Machine state
///
/// Holds the frame stack, the persistent top-level scope and the output
/// sink used by `print`.
pub struct VM<W: Write> {
    /// Stack of execution frames
    pub frames: Vec<Frame>,
    globals: Rc<RefCell<Scope>>,
    /// Scopes of finished calls that escaped functions still point to
    retained: Vec<Weak<RefCell<Scope>>>,
    sweep_at: usize,
    out: W,
    max_call_depth: usize,
}

impl<W: Write> VM<W> {
    pub fn new(out: W) -> Self {
        Self {
            frames: Vec::new(),
            globals: Rc::new(RefCell::new(Scope::new(Rc::new(Vec::new()), None))),
            retained: Vec::new(),
            sweep_at: SWEEP_THRESHOLD,
            out,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// Names of the top-level slots, in slot order
    pub fn global_names(&self) -> Rc<Vec<String>> {
        self.globals.borrow().names().clone()
    }

    /// Install a top-level code object as the only frame
    ///
    /// Compile against `global_names()` so earlier globals keep their slots.
    pub fn load(&mut self, code: CodeObject) {
        self.discard_frames();
        self.globals.borrow_mut().adopt_layout(code.names.clone());
        self.frames
            .push(Frame::new(Rc::new(code), Rc::clone(&self.globals)));
    }

    /// Current value of a top-level variable
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().lookup_by_name(name)
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    fn current_frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        self.frames
            .last_mut()
            .ok_or_else(|| RuntimeError::InvalidBytecode("no active frame".to_string()))
    }

    /// Pop every frame, releasing their scopes innermost first
    pub fn discard_frames(&mut self) {
        while let Some(frame) = self.frames.pop() {
            self.release_frame(frame);
        }
    }

    /// Let go of a finished frame
    ///
    /// A scope only its own functions refer to is cleared to free the
    /// cycle. One that escaped functions still reach is retained and swept
    /// later.
    fn release_frame(&mut self, frame: Frame) {
        let Frame { stack, scope, .. } = frame;
        drop(stack);
        if Rc::strong_count(&scope) == 1 || Rc::ptr_eq(&scope, &self.globals) {
            return;
        }
        if Scope::only_self_referenced(&scope) {
            scope.borrow_mut().clear();
            return;
        }

        self.retained.push(Rc::downgrade(&scope));
        if self.retained.len() >= self.sweep_at {
            self.sweep_retained();
            self.sweep_at = (self.retained.len() * 2).max(SWEEP_THRESHOLD);
        }
    }

    /// Clear retained scopes that are no longer reachable from outside
    fn sweep_retained(&mut self) {
        self.retained.retain(|weak| match weak.upgrade() {
            Some(scope) if Scope::only_self_referenced(&scope) => {
                scope.borrow_mut().clear();
                false
            }
            Some(_) => true,
            None => false,
        });
        tracing::trace!(retained = self.retained.len(), "swept scopes");
    }
}

// Functions hold the scope they were created in, and scopes hold functions.
impl<W: Write> Drop for VM<W> {
    fn drop(&mut self) {
        self.discard_frames();
        for scope in self.retained.drain(..).filter_map(|weak| weak.upgrade()) {
            scope.borrow_mut().clear();
        }
        self.globals.borrow_mut().clear();
    }
}

/* ===================== Step Result ===================== */

/// Result of executing one step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Continue to next step
    Continue,
    /// The outermost frame returned this value
    Done(Value),
}
