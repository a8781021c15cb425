//! Interactive read-eval-print loop
//!
//! Lines are collected until every bracket opened on them is closed, then
//! run as one entry against a persistent `Interpreter`, so globals and
//! functions survive between entries.

use std::io::Write;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::config::Config;
use crate::interpreter::{Interpreter, Value};

pub fn banner() -> String {
    format!("jss {}", env!("CARGO_PKG_VERSION"))
}

/* ===================== Session ===================== */

/// Outcome of feeding one line to a session
#[derive(Debug, PartialEq)]
pub enum Feed {
    /// The entry is still open; prompt with ps2
    Incomplete,
    /// The entry ran (or failed, with the error already printed)
    Done,
}

/// Line-buffering interpreter session, independent of the terminal
pub struct ReplSession<W: Write> {
    interpreter: Interpreter<W>,
    buffer: String,
}

impl<W: Write> ReplSession<W> {
    pub fn new(out: W, config: &Config) -> Self {
        Self {
            interpreter: Interpreter::new(out, &config.vm),
            buffer: String::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Add a line and run the entry once its brackets balance
    ///
    /// Errors are written to the session output and do not end the session.
    pub fn feed(&mut self, line: &str) -> Result<Feed> {
        self.buffer.push_str(line);
        self.buffer.push('\n');
        if bracket_depth(&self.buffer) > 0 {
            return Ok(Feed::Incomplete);
        }

        let entry = std::mem::take(&mut self.buffer);
        if entry.trim().is_empty() {
            return Ok(Feed::Done);
        }

        match self.interpreter.run_source(&entry) {
            Ok(Value::Undefined) => {}
            Ok(value) => writeln!(self.interpreter.output_mut(), "{}", value)?,
            Err(e) => writeln!(self.interpreter.output_mut(), "{}", e)?,
        }
        self.interpreter
            .output_mut()
            .flush()
            .context("Failed to flush output")?;
        Ok(Feed::Done)
    }

    /// Drop a partially entered statement
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn interpreter(&self) -> &Interpreter<W> {
        &self.interpreter
    }
}

/// Open `(` and `{` minus closed ones, ignoring strings and comments
///
/// Negative depth counts as complete so the parser can report the error.
pub fn bracket_depth(source: &str) -> i64 {
    let mut depth = 0;
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '(' | '{' => depth += 1,
            ')' | '}' => depth -= 1,
            '"' => {
                // an unterminated string runs to the end of the entry
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => {}
        }
    }
    depth
}

/* ===================== Terminal Loop ===================== */

/// Run the REPL on the terminal until EOF
pub fn run_repl(config: &Config) -> Result<()> {
    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;
    if let Some(path) = &config.repl.history_file {
        if path.exists() {
            if let Err(e) = editor.load_history(path) {
                tracing::warn!(path = %path.display(), error = %e, "could not load history");
            }
        }
    }

    let stdout = std::io::stdout();
    let mut session = ReplSession::new(stdout.lock(), config);
    println!("{}", banner());

    loop {
        let prompt = if session.is_pending() {
            &config.repl.ps2
        } else {
            &config.repl.ps1
        };

        match editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                session.feed(&line)?;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C abandons the current entry only
                session.reset();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err).context("Failed to read input"),
        }
    }

    if let Some(path) = &config.repl.history_file {
        if let Err(e) = editor.save_history(path) {
            tracing::warn!(path = %path.display(), error = %e, "could not save history");
        }
    }
    Ok(())
}
