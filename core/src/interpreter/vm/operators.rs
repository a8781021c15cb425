//! Binary operator semantics

use crate::interpreter::errors::RuntimeError;
use crate::interpreter::types::{BinOp, Value};

/// Apply a binary operator to two values
pub fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let value = match op {
        BinOp::Add => add(left, right)?,
        BinOp::Sub => Value::Num(left.to_number()? - right.to_number()?),
        BinOp::Mul => Value::Num(left.to_number()? * right.to_number()?),
        BinOp::Div => Value::Num(left.to_number()? / right.to_number()?),
        BinOp::Mod => Value::Num(modulo(left.to_number()?, right.to_number()?)),
        BinOp::Eq => Value::Bool(left == right),
        BinOp::Ne => Value::Bool(left != right),
        BinOp::Lt => Value::Bool(left.to_number()? < right.to_number()?),
        BinOp::Le => Value::Bool(left.to_number()? <= right.to_number()?),
        BinOp::Gt => Value::Bool(left.to_number()? > right.to_number()?),
        BinOp::Ge => Value::Bool(left.to_number()? >= right.to_number()?),
    };
    Ok(value)
}

fn add(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
        let joined = format!("{}{}", left, right);
        return Ok(Value::str(&joined));
    }
    Ok(Value::Num(left.to_number()? + right.to_number()?))
}

/// Integer modulo: both operands are truncated and the result takes the
/// sign of the divisor. A zero or non-finite operand gives NaN.
pub fn modulo(a: f64, b: f64) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return f64::NAN;
    }
    let (a, b) = (a.trunc(), b.trunc());
    if b == 0.0 {
        return f64::NAN;
    }
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modulo() {
        assert_eq!(modulo(7.0, 3.0), 1.0);
        assert_eq!(modulo(9.0, 3.0), 0.0);
        assert_eq!(modulo(7.5, 2.0), 1.0);
        assert_eq!(modulo(-7.0, 3.0), 2.0);
        assert_eq!(modulo(7.0, -3.0), -2.0);
        assert!(modulo(1.0, 0.0).is_nan());
        assert!(modulo(1.0, 0.5).is_nan());
        assert!(modulo(f64::INFINITY, 2.0).is_nan());
    }

    #[test]
    fn test_arithmetic_coerces_booleans() {
        assert_eq!(
            binary(BinOp::Add, &Value::Bool(true), &Value::Num(2.5)).unwrap(),
            Value::Num(3.5)
        );
        assert_eq!(
            binary(BinOp::Lt, &Value::Bool(false), &Value::Bool(true)).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_string_concatenation() {
        let value = binary(BinOp::Add, &Value::str("n = "), &Value::Num(3.0)).unwrap();
        assert_eq!(value, Value::str("n = 3"));
    }

    #[test]
    fn test_comparison_rejects_non_numbers() {
        let err = binary(BinOp::Lt, &Value::Num(1.0), &Value::Undefined).unwrap_err();
        assert_eq!(err.to_string(), "Expected a number, got undefined");
    }
}
