//! Error types shared by the interpreter pipeline

use thiserror::Error;

use super::compiler::CompileError;
use super::parser::ParseError;

/// Errors raised while executing bytecode
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Variable \"{name}\" is not defined")]
    UndefinedVariable { name: String },

    #[error("{message}")]
    TypeError { message: String },

    #[error("{type_name} is not a function")]
    NotCallable { type_name: &'static str },

    #[error("Maximum call depth of {max_depth} exceeded")]
    StackOverflow { max_depth: usize },

    #[error("Assertion failed")]
    AssertionFailed,

    /// Malformed bytecode: stack underflow, bad constant index, pc out of range
    #[error("Invalid bytecode: {0}")]
    InvalidBytecode(String),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for running a piece of source
#[derive(Debug, Error)]
pub enum Error {
    #[error("ParseError: {0}")]
    Parse(#[from] ParseError),

    #[error("CompileError: {0}")]
    Compile(#[from] CompileError),

    #[error("{source} (at {location})")]
    Runtime {
        #[source]
        source: RuntimeError,
        location: String,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
