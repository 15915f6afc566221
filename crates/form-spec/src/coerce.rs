//! Loose value semantics shared by the expression evaluator.
//!
//! Schemas compare answers the way a dynamically typed host would: `"1"`
//! equals `1`, `true` equals `1`, a missing answer equals `null`, and ordering
//! comparisons go through numeric coercion where anything non-numeric is `NaN`.

use serde_json::Value;

/// Result of evaluating an expression.
///
/// `Undefined` stands for a missing answer or an absent operand; it is kept
/// apart from `null` because the two coerce differently to numbers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Evaluated {
    #[default]
    Undefined,
    Value(Value),
}

impl Evaluated {
    pub fn bool(value: bool) -> Self {
        Evaluated::Value(Value::Bool(value))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Evaluated::Undefined)
    }

    /// Borrow the underlying JSON value, if any.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Evaluated::Undefined => None,
            Evaluated::Value(value) => Some(value),
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Evaluated::Undefined => None,
            Evaluated::Value(value) => Some(value),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Evaluated::Undefined => false,
            Evaluated::Value(value) => value_is_truthy(value),
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Evaluated::Undefined => f64::NAN,
            Evaluated::Value(value) => value_to_number(value),
        }
    }

    /// Type-coercing equality (`==` in weakly typed hosts).
    pub fn loose_eq(&self, other: &Evaluated) -> bool {
        match (self, other) {
            (Evaluated::Undefined, Evaluated::Undefined) => true,
            (Evaluated::Undefined, Evaluated::Value(value))
            | (Evaluated::Value(value), Evaluated::Undefined) => value.is_null(),
            (Evaluated::Value(left), Evaluated::Value(right)) => loose_eq(left, right),
        }
    }
}

impl From<Value> for Evaluated {
    fn from(value: Value) -> Self {
        Evaluated::Value(value)
    }
}

impl From<Option<Value>> for Evaluated {
    fn from(value: Option<Value>) -> Self {
        value.map(Evaluated::Value).unwrap_or_default()
    }
}

pub fn value_is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number
            .as_f64()
            .map(|n| n != 0.0 && !n.is_nan())
            .unwrap_or(false),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn value_to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(flag) => f64::from(u8::from(*flag)),
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => string_to_number(text),
        Value::Array(_) => string_to_number(&to_primitive_string(value)),
        Value::Object(_) => f64::NAN,
    }
}

/// Numeric reading of a string: surrounding whitespace is ignored, the empty
/// string is zero, and `0x`/`0o`/`0b` prefixes and `Infinity` are accepted.
pub fn string_to_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix)
                .map(|n| n as f64)
                .unwrap_or(f64::NAN);
        }
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    // Rust accepts "inf"/"nan" spellings that a host would reject.
    if trimmed
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')))
    {
        return f64::NAN;
    }

    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// String form of an array or object when it meets a primitive in `==`.
fn to_primitive_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number_to_string(number.as_f64().unwrap_or(f64::NAN)),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(to_primitive_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let label = if n > 0.0 { "Infinity" } else { "-Infinity" };
        label.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if (1e-6..1e21).contains(&n.abs()) {
        n.to_string()
    } else {
        // Exponent form outside the plain range, with an explicit `+`.
        let formatted = format!("{:e}", n);
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        }
    }
}

pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_eq(
            a.as_f64().unwrap_or(f64::NAN),
            b.as_f64().unwrap_or(f64::NAN),
        ),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => left == right,
        (Value::Array(_), Value::Object(_)) | (Value::Object(_), Value::Array(_)) => false,
        (Value::Bool(_), _) | (_, Value::Bool(_)) => {
            numbers_eq(value_to_number(left), value_to_number(right))
        }
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            numbers_eq(value_to_number(left), value_to_number(right))
        }
        (Value::Array(_) | Value::Object(_), _) => {
            loose_eq(&Value::String(to_primitive_string(left)), right)
        }
        (_, Value::Array(_) | Value::Object(_)) => {
            loose_eq(left, &Value::String(to_primitive_string(right)))
        }
    }
}

fn numbers_eq(a: f64, b: f64) -> bool {
    // NaN never equals anything, itself included.
    a == b
}
