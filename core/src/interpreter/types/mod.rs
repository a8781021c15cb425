//! Type definitions for the interpreter
//!
//! - AST nodes (Program, Stmt, Expr, BinOp)
//! - Runtime values (Value, Closure)

pub mod ast;
pub mod values;

pub use ast::{BinOp, Expr, Program, Stmt};
pub use values::{format_number, Closure, Value};
