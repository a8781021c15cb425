pub mod benchmark;
pub mod cli;
pub mod config;
pub mod interpreter;
pub mod repl;

// Re-export the embedding API
pub use crate::config::{Config, ReplConfig, VmConfig};
pub use crate::interpreter::{run, Error, Interpreter, Value};
