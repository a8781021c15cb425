//! Standard library function implementations

use std::io::Write;

use crate::interpreter::errors::RuntimeError;
use crate::interpreter::types::Value;

/* ===================== Builtin Identifiers ===================== */

/// Native functions visible to every script
///
/// Builtins are resolved only after a name misses every script scope, so
/// a script may shadow them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    TypeOf,
    Assert,
}

impl Builtin {
    pub const ALL: [Builtin; 3] = [Builtin::Print, Builtin::TypeOf, Builtin::Assert];

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::TypeOf => "typeof",
            Builtin::Assert => "assert",
        }
    }
}

/* ===================== Dispatcher ===================== */

/// Call a builtin with already evaluated arguments
pub fn call_builtin<W: Write>(
    builtin: Builtin,
    args: &[Value],
    out: &mut W,
) -> Result<Value, RuntimeError> {
    match builtin {
        Builtin::Print => print(args, out),
        Builtin::TypeOf => {
            let arg = args.first().unwrap_or(&Value::Undefined);
            Ok(Value::str(arg.type_name()))
        }
        Builtin::Assert => match args.first() {
            Some(cond) if cond.is_truthy() => Ok(Value::Undefined),
            _ => Err(RuntimeError::AssertionFailed),
        },
    }
}

fn print<W: Write>(args: &[Value], out: &mut W) -> Result<Value, RuntimeError> {
    let line = args
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "{}", line)?;
    Ok(Value::Undefined)
}
