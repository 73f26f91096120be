//! Coercions, guards and the default operator semantics.
//!
//! Every operator in the default tables is built from these helpers, and
//! custom [`crate::Runtime`] implementations are free to reuse them.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{Pow, Signed, ToPrimitive, Zero};

use crate::error::{EvalError, EvalResult, Fault};
use crate::runtime::PipeStage;
use crate::value::Value;

/// A value accepted by the arithmetic operators.
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric {
    Float(f64),
    Big(BigInt),
}

impl From<Numeric> for Value {
    fn from(n: Numeric) -> Self {
        match n {
            Numeric::Float(f) => Value::Number(f),
            Numeric::Big(b) => Value::BigInt(b),
        }
    }
}

// ── Casts ─────────────────────────────────────────────────────────────────────

/// Truthiness: `0`, `NaN`, `""`, `false`, `null` and `undefined` are false.
pub fn cast_to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::BigInt(b) => !b.is_zero(),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
    }
}

/// Text form used by `&`. Never fails.
pub fn cast_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Guards ────────────────────────────────────────────────────────────────────

pub fn ensure_number(value: &Value) -> EvalResult<Numeric> {
    match value {
        Value::Number(n) if n.is_finite() => Ok(Numeric::Float(*n)),
        Value::BigInt(b) => Ok(Numeric::Big(b.clone())),
        other => Err(EvalError::unexpected_type(["number", "bigint"], other.clone())),
    }
}

pub fn ensure_relational_comparable(value: &Value) -> EvalResult<&Value> {
    match value {
        Value::Number(n) if n.is_finite() => Ok(value),
        Value::String(_) | Value::BigInt(_) => Ok(value),
        other => Err(EvalError::unexpected_type(
            ["number", "bigint", "string"],
            other.clone(),
        )),
    }
}

pub fn ensure_function(value: &Value) -> EvalResult<&crate::value::Function> {
    value
        .as_function()
        .ok_or_else(|| EvalError::unexpected_type(["function"], value.clone()))
}

// ── Property access, calls, pipes ─────────────────────────────────────────────

/// Own-property read. `null` and `undefined` propagate unchanged.
pub fn get_property(object: &Value, key: &Value) -> EvalResult<Value> {
    if object.is_nullish() {
        return Ok(object.clone());
    }
    if !object.is_object() {
        return Err(EvalError::unexpected_type(["object"], object.clone()));
    }
    let key = key
        .property_key()
        .ok_or_else(|| EvalError::unexpected_type(["simple type object key"], key.clone()))?;
    Ok(object.own_property(&key).unwrap_or_default())
}

/// Invoke `callee`. `None` marks a call written with no arguments.
pub fn call_function(callee: &Value, args: Option<Vec<Value>>) -> Result<Value, Fault> {
    let function = ensure_function(callee)?;
    match args {
        None => function.call(&[]),
        Some(args) => function.call(&args),
    }
}

/// Thread `head` through `stages`; an optional stage stops on `null`/`undefined`.
pub fn pipe(head: Value, stages: &[PipeStage<'_>]) -> Result<Value, Fault> {
    let mut result = head;
    for stage in stages {
        if stage.optional && result.is_nullish() {
            return Ok(result);
        }
        result = (stage.next)(result)?;
    }
    Ok(result)
}

// ── Equality and ordering ─────────────────────────────────────────────────────

/// Identity comparison without coercion. Arrays, objects and functions
/// compare by reference.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::BigInt(x), Value::BigInt(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => std::sync::Arc::ptr_eq(x, y),
        (Value::Object(x), Value::Object(y)) => std::sync::Arc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => x.ptr_eq(y),
        _ => false,
    }
}

/// Order two comparable values. `None` means the pair is unordered.
pub fn compare(a: &Value, b: &Value) -> EvalResult<Option<Ordering>> {
    let a = ensure_relational_comparable(a)?;
    let b = ensure_relational_comparable(b)?;
    Ok(match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.encode_utf16().cmp(y.encode_utf16())),
        (Value::BigInt(x), Value::BigInt(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::BigInt(y)) => x.partial_cmp(&y.to_f64().unwrap_or(f64::NAN)),
        (Value::BigInt(x), Value::Number(y)) => x.to_f64().unwrap_or(f64::NAN).partial_cmp(y),
        (Value::Number(x), Value::String(y)) => x.partial_cmp(&string_to_number(y)),
        (Value::String(x), Value::Number(y)) => string_to_number(x).partial_cmp(y),
        (Value::BigInt(x), Value::String(y)) => parse_bigint(y).map(|y| x.cmp(&y)),
        (Value::String(x), Value::BigInt(y)) => parse_bigint(x).map(|x| x.cmp(y)),
        _ => None,
    })
}

/// Numeric value of a string operand, `NaN` when it is not a number.
fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    let radix = match s.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return radix_to_number(&s[2..], radix);
    }
    match s {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf" and "nan" spellings that are not numbers here.
        _ if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => s.parse().unwrap_or(f64::NAN),
    }
}

/// Unsigned digits in `radix`, accumulated as a float so long inputs stay finite.
fn radix_to_number(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0f64, |value, c| {
            c.to_digit(radix)
                .map(|d| value * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN)
}

fn parse_bigint(s: &str) -> Option<BigInt> {
    let s = s.trim();
    if s.is_empty() {
        return Some(BigInt::zero());
    }
    s.parse().ok()
}

// ── Arithmetic ────────────────────────────────────────────────────────────────

fn arithmetic(
    a: &Value,
    b: &Value,
    float: impl FnOnce(f64, f64) -> f64,
    big: impl FnOnce(BigInt, BigInt) -> EvalResult<BigInt>,
) -> EvalResult<Value> {
    match (ensure_number(a)?, ensure_number(b)?) {
        (Numeric::Float(x), Numeric::Float(y)) => Ok(Value::Number(float(x, y))),
        (Numeric::Big(x), Numeric::Big(y)) => big(x, y).map(Value::BigInt),
        _ => Err(EvalError::MixedNumeric),
    }
}

/// Upper bound on the bit length of a big-integer power.
const MAX_BIGINT_BITS: u64 = 1 << 30;

fn division_by_zero() -> EvalError {
    EvalError::Range("Division by zero".into())
}

pub fn add(a: &Value, b: &Value) -> EvalResult<Value> {
    arithmetic(a, b, |x, y| x + y, |x, y| Ok(x + y))
}

pub fn subtract(a: &Value, b: &Value) -> EvalResult<Value> {
    arithmetic(a, b, |x, y| x - y, |x, y| Ok(x - y))
}

pub fn multiply(a: &Value, b: &Value) -> EvalResult<Value> {
    arithmetic(a, b, |x, y| x * y, |x, y| Ok(x * y))
}

pub fn divide(a: &Value, b: &Value) -> EvalResult<Value> {
    arithmetic(a, b, |x, y| x / y, |x, y| {
        if y.is_zero() {
            Err(division_by_zero())
        } else {
            Ok(x / y)
        }
    })
}

/// Remainder with the sign of the dividend.
pub fn remainder(a: &Value, b: &Value) -> EvalResult<Value> {
    arithmetic(a, b, |x, y| x % y, |x, y| {
        if y.is_zero() {
            Err(division_by_zero())
        } else {
            Ok(x % y)
        }
    })
}

pub fn power(a: &Value, b: &Value) -> EvalResult<Value> {
    arithmetic(a, b, f64::powf, |x, y| {
        if y.is_negative() {
            return Err(EvalError::Range("Exponent must be non-negative".into()));
        }
        // 0, 1 and -1 stay bounded for any exponent; only its parity matters.
        if x.bits() <= 1 {
            let exponent: u32 = if y.is_zero() {
                0
            } else if (&y % 2u32).is_zero() {
                2
            } else {
                1
            };
            return Ok(Pow::pow(x, exponent));
        }
        let exponent = y
            .to_u64()
            .filter(|e| x.bits().saturating_mul(*e) <= MAX_BIGINT_BITS)
            .and_then(|e| u32::try_from(e).ok())
            .ok_or_else(|| EvalError::Range("Maximum BigInt size exceeded".into()))?;
        Ok(Pow::pow(x, exponent))
    })
}

pub fn negate(value: &Value) -> EvalResult<Value> {
    Ok(match ensure_number(value)? {
        Numeric::Float(x) => Value::Number(-x),
        Numeric::Big(x) => Value::BigInt(-x),
    })
}

pub fn concat(a: &Value, b: &Value) -> EvalResult<Value> {
    let mut out = cast_to_string(a);
    out.push_str(&cast_to_string(b));
    Ok(Value::String(out))
}

/// Own-key test behind the `in` operator.
pub fn has_key(key: &Value, target: &Value) -> EvalResult<Value> {
    match key.property_key() {
        Some(k) if target.is_object() => Ok(Value::Bool(target.has_own_property(&k))),
        _ => Err(EvalError::InvalidInOperands {
            key: key.type_of().into(),
            target: target.type_of().into(),
        }),
    }
}
