//! Runtime value types

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::interpreter::compiler::CodeObject;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::vm::scope::Scope;
use crate::interpreter::vm::stdlib::Builtin;

/// Runtime value type
#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Bool(bool),
    Num(f64),
    Str(Rc<str>),
    /// Script function together with the scope it was created in
    Function(Rc<Closure>),
    /// Native function from the standard library
    Builtin(Builtin),
}

/// A compiled function plus the scope it closes over
pub struct Closure {
    pub code: Rc<CodeObject>,
    pub scope: Rc<RefCell<Scope>>,
}

// Closures can reach themselves through their captured scope, so Debug
// must not descend into it.
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.code.name)
            .field("arg_count", &self.code.arg_count)
            .finish_non_exhaustive()
    }
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    /// The `typeof` name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) | Value::Builtin(_) => "function",
        }
    }

    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Function(_) | Value::Builtin(_) => true,
        }
    }

    /// Numeric view of the value. Booleans count as 0 and 1.
    pub fn to_number(&self) -> Result<f64, RuntimeError> {
        match self {
            Value::Num(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => Err(RuntimeError::TypeError {
                message: format!("Expected a number, got {}", other.type_name()),
            }),
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Value::Num(_) | Value::Bool(_))
    }
}

impl PartialEq for Value {
    /// Language-level `==`. Numbers and booleans compare numerically,
    /// functions by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => {
                match (a.to_number(), b.to_number()) {
                    (Ok(x), Ok(y)) => x == y,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Num(n) => f.write_str(&format_number(*n)),
            Value::Str(s) => f.write_str(s),
            Value::Function(closure) => write!(f, "[Function: {}]", closure.code.name),
            Value::Builtin(builtin) => write!(f, "[Function: {}]", builtin.name()),
        }
    }
}

/// Format a number the way scripts expect to see it printed
///
/// Magnitudes of at least 1e21 or below 1e-6 use exponent notation
/// (`1e+21`, `1e-7`). Everything else uses the shortest digits that
/// round-trip, with no fractional part for integral values.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        // covers -0
        return "0".to_string();
    }
    let abs = n.abs();
    if !(1e-6..1e21).contains(&abs) {
        let exp = format!("{:e}", n);
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => {
                format!("{}e+{}", mantissa, power)
            }
            _ => exp,
        };
    }
    // shortest round-trip digits, integral values without a fraction
    format!("{}", n)
}
