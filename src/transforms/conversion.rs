//! Explicit type conversions and the string coercion used by every text
//! operation.

use serde_json::{Number, Value};

use crate::transform_registry::{Params, TransformError};

/// Render a value as display text.
///
/// Strings are used verbatim, `null` becomes the empty string, numbers and
/// booleans use their JSON spelling and sequences or mappings are rendered
/// as compact JSON.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

pub(super) fn to_str(input: &Value, _params: &Params) -> Result<Value, TransformError> {
    Ok(Value::String(to_display_string(input)))
}

/// Integer conversion. Floats truncate toward zero.
pub(super) fn to_int(input: &Value, _params: &Params) -> Result<Value, TransformError> {
    let fail = || TransformError::ExecutionError(format!("cannot convert {} to int", input));

    match input {
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Ok(input.clone())
            } else {
                let f = n.as_f64().ok_or_else(fail)?;
                float_to_int(f.trunc()).ok_or_else(fail)
            }
        }
        Value::Bool(b) => Ok(Value::from(i64::from(*b))),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| trimmed.parse::<u64>().map(Value::from))
                .map_err(|_| fail())
        }
        _ => Err(fail()),
    }
}

fn float_to_int(f: f64) -> Option<Value> {
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(Value::from(f as i64))
    } else {
        None
    }
}

pub(super) fn to_float(input: &Value, _params: &Params) -> Result<Value, TransformError> {
    let fail = || TransformError::ExecutionError(format!("cannot convert {} to float", input));

    let f = match input {
        Value::Number(n) => n.as_f64().ok_or_else(fail)?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| fail())?,
        _ => return Err(fail()),
    };
    Number::from_f64(f).map(Value::Number).ok_or_else(fail)
}
