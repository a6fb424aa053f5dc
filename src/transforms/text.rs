//! Text operations. Non-string input is coerced to its display string first.

use serde_json::Value;

use super::{param_i64, param_str, required_str, to_display_string};
use crate::transform_registry::{Params, TransformError};

const DEFAULT_MAX_LENGTH: i64 = 50;
const DEFAULT_ELLIPSIS: &str = "…";

pub(super) fn upper(input: &Value, _params: &Params) -> Result<Value, TransformError> {
    Ok(Value::String(to_display_string(input).to_uppercase()))
}

pub(super) fn lower(input: &Value, _params: &Params) -> Result<Value, TransformError> {
    Ok(Value::String(to_display_string(input).to_lowercase()))
}

/// First character upper case, the rest lower case.
pub(super) fn capitalize(input: &Value, _params: &Params) -> Result<Value, TransformError> {
    let text = to_display_string(input);
    let mut chars = text.chars();
    let capitalized = match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    };
    Ok(Value::String(capitalized))
}

pub(super) fn strip(input: &Value, _params: &Params) -> Result<Value, TransformError> {
    Ok(Value::String(to_display_string(input).trim().to_string()))
}

/// Cut to `max_length` characters, the suffix included.
pub(super) fn truncate(input: &Value, params: &Params) -> Result<Value, TransformError> {
    let max_length = max_length(params)?;
    let suffix = param_str(params, "suffix", DEFAULT_ELLIPSIS)?;
    let text = to_display_string(input);

    if text.chars().count() <= max_length {
        return Ok(Value::String(text));
    }

    let suffix_len = suffix.chars().count();
    if suffix_len >= max_length {
        return Ok(Value::String(suffix.chars().take(max_length).collect()));
    }

    let mut cut: String = text.chars().take(max_length - suffix_len).collect();
    cut.push_str(suffix);
    Ok(Value::String(cut))
}

pub(super) fn check_truncate(params: &Params) -> Result<(), TransformError> {
    max_length(params)?;
    param_str(params, "suffix", DEFAULT_ELLIPSIS)?;
    Ok(())
}

fn max_length(params: &Params) -> Result<usize, TransformError> {
    let max_length = param_i64(params, "max_length", DEFAULT_MAX_LENGTH)?;
    usize::try_from(max_length).map_err(|_| {
        TransformError::InvalidArgs(format!("'max_length' must not be negative, got {}", max_length))
    })
}

pub(super) fn prefix(input: &Value, params: &Params) -> Result<Value, TransformError> {
    let prefix = required_str(params, "prefix")?;
    Ok(Value::String(format!("{}{}", prefix, to_display_string(input))))
}

pub(super) fn check_prefix(params: &Params) -> Result<(), TransformError> {
    required_str(params, "prefix").map(|_| ())
}

pub(super) fn suffix(input: &Value, params: &Params) -> Result<Value, TransformError> {
    let suffix = required_str(params, "suffix")?;
    Ok(Value::String(format!("{}{}", to_display_string(input), suffix)))
}

pub(super) fn check_suffix(params: &Params) -> Result<(), TransformError> {
    required_str(params, "suffix").map(|_| ())
}
