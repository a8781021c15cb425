//! Bytecode compiler
//!
//! Walks the AST and emits a flat instruction list per function. Each
//! function body gets its own `CompilerContext` with its own constant
//! pools and variable slots.

pub mod bytecode;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use super::types::ast::{Expr, Program, Stmt};
pub use bytecode::{dis, CodeObject, Instruction, Opcode};

/// Name given to the top-level code object
pub const MAIN_NAME: &str = "<main>";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("Duplicate parameter \"{param}\" in function \"{function}\"")]
    DuplicateParameter { function: String, param: String },
}

pub type CompileResult<T> = Result<T, CompileError>;

/* ===================== Compiler Context ===================== */

/// Per-function compilation state
#[derive(Debug, Default)]
pub struct CompilerContext {
    code: Vec<Instruction>,
    constants_float: Vec<f64>,
    float_index: HashMap<u64, u32>,
    constants_str: Vec<Rc<str>>,
    constants_fn: Vec<Rc<CodeObject>>,
    names: Vec<String>,
    names_to_numbers: HashMap<String, u32>,
}

impl CompilerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing slot layout, so a persistent scope can be
    /// extended by later compilations without renumbering its variables.
    pub fn with_names(names: &[String]) -> Self {
        let mut ctx = Self::new();
        for name in names {
            ctx.register_var(name);
        }
        ctx
    }

    /// Current position in the instruction stream
    pub fn position(&self) -> u32 {
        self.code.len() as u32
    }

    pub fn emit(&mut self, op: Opcode, arg: u32) {
        self.code.push(Instruction::new(op, arg));
    }

    /// Emit a jump whose target is filled in later by `patch_jump`
    pub fn emit_jump(&mut self, op: Opcode) -> usize {
        self.emit(op, 0);
        self.code.len() - 1
    }

    pub fn patch_jump(&mut self, at: usize, target: u32) {
        self.code[at].arg = target;
    }

    pub fn register_constant_float(&mut self, v: f64) -> u32 {
        if let Some(idx) = self.float_index.get(&v.to_bits()) {
            return *idx;
        }
        let idx = self.constants_float.len() as u32;
        self.constants_float.push(v);
        self.float_index.insert(v.to_bits(), idx);
        idx
    }

    pub fn register_constant_str(&mut self, s: &str) -> u32 {
        if let Some(idx) = self.constants_str.iter().position(|c| &**c == s) {
            return idx as u32;
        }
        self.constants_str.push(Rc::from(s));
        (self.constants_str.len() - 1) as u32
    }

    pub fn register_constant_fn(&mut self, code: CodeObject) -> u32 {
        self.constants_fn.push(Rc::new(code));
        (self.constants_fn.len() - 1) as u32
    }

    /// Slot number for a variable, allocating one on first use
    pub fn register_var(&mut self, name: &str) -> u32 {
        if let Some(idx) = self.names_to_numbers.get(name) {
            return *idx;
        }
        let idx = self.names.len() as u32;
        self.names.push(name.to_string());
        self.names_to_numbers.insert(name.to_string(), idx);
        idx
    }

    pub fn create_bytecode(self, name: &str, arg_count: usize) -> CodeObject {
        CodeObject {
            name: name.to_string(),
            code: self.code,
            constants_float: self.constants_float,
            constants_str: self.constants_str,
            constants_fn: self.constants_fn,
            names: Rc::new(self.names),
            arg_count,
        }
    }

    /* ===================== Statements ===================== */

    pub fn compile_block(&mut self, stmts: &[Stmt]) -> CompileResult<()> {
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Expr { expr } => {
                self.compile_expr(expr)?;
                self.emit(Opcode::DiscardTop, 0);
            }

            Stmt::Assign { name, expr } => {
                self.compile_expr(expr)?;
                let slot = self.register_var(name);
                self.emit(Opcode::Assign, slot);
            }

            Stmt::If { test, body } => {
                self.compile_expr(test)?;
                let jump = self.emit_jump(Opcode::JumpIfFalse);
                self.compile_block(body)?;
                let end = self.position();
                self.patch_jump(jump, end);
            }

            Stmt::While { test, body } => {
                let cond_pos = self.position();
                self.compile_expr(test)?;
                let jump = self.emit_jump(Opcode::JumpIfFalse);
                self.compile_block(body)?;
                self.emit(Opcode::JumpAbsolute, cond_pos);
                let end = self.position();
                self.patch_jump(jump, end);
            }

            Stmt::Return { value } => match value {
                Some(expr) => {
                    self.compile_expr(expr)?;
                    self.emit(Opcode::Return, 1);
                }
                None => self.emit(Opcode::Return, 0),
            },
        }
        Ok(())
    }

    /* ===================== Expressions ===================== */

    fn compile_expr(&mut self, expr: &Expr) -> CompileResult<()> {
        match expr {
            Expr::LitNum { v } => {
                let idx = self.register_constant_float(*v);
                self.emit(Opcode::LoadConstantFloat, idx);
            }

            Expr::LitBool { v } => self.emit(Opcode::LoadConstantBool, u32::from(*v)),

            Expr::LitStr { v } => {
                let idx = self.register_constant_str(v);
                self.emit(Opcode::LoadConstantStr, idx);
            }

            Expr::Ident { name } => {
                let slot = self.register_var(name);
                self.emit(Opcode::LoadVar, slot);
            }

            Expr::BinOp { op, left, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.emit(Opcode::for_binop(*op), 0);
            }

            Expr::Call { callee, args } => {
                self.compile_expr(callee)?;
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.emit(Opcode::Call, args.len() as u32);
            }

            Expr::Function { name, params, body } => {
                let code = compile_function(name, params, body)?;
                let idx = self.register_constant_fn(code);
                let slot = self.register_var(name);
                // bind the name, then leave the function as the expression's value
                self.emit(Opcode::LoadConstantFn, idx);
                self.emit(Opcode::Assign, slot);
                self.emit(Opcode::LoadConstantFn, idx);
            }
        }
        Ok(())
    }
}

/* ===================== Public API ===================== */

/// Compile a whole program into the top-level code object
pub fn compile(program: &Program) -> CompileResult<CodeObject> {
    compile_with_names(program, &[])
}

/// Compile a program against an existing global slot layout
pub fn compile_with_names(program: &Program, names: &[String]) -> CompileResult<CodeObject> {
    let mut ctx = CompilerContext::with_names(names);
    ctx.compile_block(&program.body)?;
    ctx.emit(Opcode::Return, 0);

    let code = ctx.create_bytecode(MAIN_NAME, 0);
    tracing::debug!(
        instructions = code.code.len(),
        names = code.names.len(),
        functions = code.constants_fn.len(),
        "compiled program"
    );
    Ok(code)
}

/// Compile a function body. Parameters take the first variable slots.
pub fn compile_function(name: &str, params: &[String], body: &[Stmt]) -> CompileResult<CodeObject> {
    let mut ctx = CompilerContext::new();
    for param in params {
        if ctx.names_to_numbers.contains_key(param) {
            return Err(CompileError::DuplicateParameter {
                function: name.to_string(),
                param: param.clone(),
            });
        }
        ctx.register_var(param);
    }

    ctx.compile_block(body)?;
    ctx.emit(Opcode::Return, 0);
    Ok(ctx.create_bytecode(name, params.len()))
}
