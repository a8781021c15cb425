//! Interpreter for a small JavaScript subset
//!
//! Source goes through three stages:
//! 1. `parser` turns text into the AST in `types::ast`
//! 2. `compiler` lowers the AST to one `CodeObject` per function
//! 3. `vm` executes the bytecode on an explicit frame stack
//!
//! `Interpreter` ties the stages together and keeps top-level variables
//! alive between runs, which is what the REPL relies on.

pub mod compiler;
pub mod errors;
pub mod parser;
pub mod types;
pub mod vm;

use std::io::Write;
use std::path::Path;

use crate::config::VmConfig;
pub use compiler::{dis, CodeObject};
pub use errors::{Error, Result, RuntimeError};
pub use parser::{parse, ParseError};
pub use types::{Program, Value};
use vm::{run_until_done, VM};

/// A persistent interpreter session writing script output to `out`
pub struct Interpreter<W: Write> {
    vm: VM<W>,
    debug: bool,
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W, config: &VmConfig) -> Self {
        Self {
            vm: VM::new(out).with_max_call_depth(config.max_call_depth),
            debug: config.debug,
        }
    }

    /// Compile a program against the globals defined so far
    pub fn compile(&self, program: &Program) -> Result<CodeObject> {
        let names = self.vm.global_names();
        Ok(compiler::compile_with_names(program, &names)?)
    }

    pub fn run_program(&mut self, program: &Program) -> Result<Value> {
        let code = self.compile(program)?;
        if self.debug {
            let listing = dis(&code);
            self.vm
                .output_mut()
                .write_all(listing.as_bytes())
                .map_err(RuntimeError::from)
                .map_err(|source| Error::Runtime {
                    source,
                    location: code.name.clone(),
                })?;
        }

        self.vm.load(code);
        run_until_done(&mut self.vm)
    }

    /// Parse, compile and run a piece of source
    ///
    /// Returns the value of a top-level `return`, `undefined` otherwise.
    pub fn run_source(&mut self, source: &str) -> Result<Value> {
        let program = parse(source)?;
        self.run_program(&program)
    }

    pub fn run_file(&mut self, path: &Path) -> Result<Value> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), bytes = source.len(), "running script");
        self.run_source(&source)
    }

    /// Current value of a top-level variable
    pub fn global(&self, name: &str) -> Option<Value> {
        self.vm.global(name)
    }

    pub fn output(&self) -> &W {
        self.vm.output()
    }

    pub fn output_mut(&mut self) -> &mut W {
        self.vm.output_mut()
    }
}

/// Run source once with default settings, printing to stdout
pub fn run(source: &str) -> Result<Value> {
    let stdout = std::io::stdout();
    let mut interpreter = Interpreter::new(stdout.lock(), &VmConfig::default());
    interpreter.run_source(source)
}
