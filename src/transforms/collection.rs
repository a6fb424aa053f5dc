//! Sequence operations.

use serde_json::Value;

use super::{param_i64, param_str, required_str, to_display_string};
use crate::path::PathExpression;
use crate::transform_registry::{Params, TransformError};

fn sequence<'a>(transform: &str, input: &'a Value) -> Result<&'a [Value], TransformError> {
    input
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| TransformError::mismatch(transform, "array", input))
}

fn parse_path(name: &str, raw: &str) -> Result<PathExpression, TransformError> {
    PathExpression::parse(raw)
        .map_err(|err| TransformError::InvalidArgs(format!("{}: {}", name, err)))
}

/// Every parameter is a `<path>: <literal>` condition; all must hold.
fn filter_conditions(params: &Params) -> Result<Vec<(PathExpression, &Value)>, TransformError> {
    if params.is_empty() {
        return Err(TransformError::InvalidArgs(
            "filter needs at least one '<field>: <value>' condition".to_string(),
        ));
    }
    params
        .iter()
        .map(|(field, expected)| Ok((parse_path("filter", field)?, expected)))
        .collect()
}

pub(super) fn filter(input: &Value, params: &Params) -> Result<Value, TransformError> {
    let items = sequence("filter", input)?;
    let conditions = filter_conditions(params)?;

    let kept = items
        .iter()
        .filter(|item| {
            conditions
                .iter()
                .all(|(path, expected)| path.resolve(item) == Some(*expected))
        })
        .cloned()
        .collect();
    Ok(Value::Array(kept))
}

pub(super) fn check_filter(params: &Params) -> Result<(), TransformError> {
    filter_conditions(params).map(|_| ())
}

/// Map each element to the value at `field`; elements without it are dropped.
pub(super) fn extract(input: &Value, params: &Params) -> Result<Value, TransformError> {
    let items = sequence("extract", input)?;
    let path = parse_path("extract", required_str(params, "field")?)?;

    let extracted = items
        .iter()
        .filter_map(|item| path.resolve(item).cloned())
        .collect();
    Ok(Value::Array(extracted))
}

pub(super) fn check_extract(params: &Params) -> Result<(), TransformError> {
    parse_path("extract", required_str(params, "field")?).map(|_| ())
}

pub(super) fn join(input: &Value, params: &Params) -> Result<Value, TransformError> {
    let items = sequence("join", input)?;
    let separator = param_str(params, "separator", "")?;

    let joined = items
        .iter()
        .map(to_display_string)
        .collect::<Vec<_>>()
        .join(separator);
    Ok(Value::String(joined))
}

pub(super) fn check_join(params: &Params) -> Result<(), TransformError> {
    param_str(params, "separator", "").map(|_| ())
}

pub(super) fn first(input: &Value, _params: &Params) -> Result<Value, TransformError> {
    let items = sequence("first", input)?;
    Ok(items.first().cloned().unwrap_or(Value::Null))
}

pub(super) fn last(input: &Value, _params: &Params) -> Result<Value, TransformError> {
    let items = sequence("last", input)?;
    Ok(items.last().cloned().unwrap_or(Value::Null))
}

pub(super) fn length(input: &Value, _params: &Params) -> Result<Value, TransformError> {
    let count = match input {
        Value::Array(items) => items.len(),
        Value::String(text) => text.chars().count(),
        Value::Object(map) => map.len(),
        other => return Err(TransformError::mismatch("length", "array, string or object", other)),
    };
    Ok(Value::from(count))
}

/// Splice nested sequences into their parent, `depth` levels deep.
///
/// `depth = 1` flattens one level, `-1` flattens completely and `0` returns
/// the input unchanged. Non-sequence elements pass through as they are.
pub(super) fn flatten(input: &Value, params: &Params) -> Result<Value, TransformError> {
    let items = sequence("flatten", input)?;
    let depth = flatten_depth(params)?;

    let mut out = Vec::with_capacity(items.len());
    flatten_into(items, depth, &mut out);
    Ok(Value::Array(out))
}

fn flatten_into(items: &[Value], depth: Option<u64>, out: &mut Vec<Value>) {
    for item in items {
        match (item, depth) {
            (Value::Array(nested), None) => flatten_into(nested, None, out),
            (Value::Array(nested), Some(d)) if d > 0 => flatten_into(nested, Some(d - 1), out),
            _ => out.push(item.clone()),
        }
    }
}

fn flatten_depth(params: &Params) -> Result<Option<u64>, TransformError> {
    match param_i64(params, "depth", 1)? {
        -1 => Ok(None),
        d if d >= 0 => Ok(Some(d as u64)),
        d => Err(TransformError::InvalidArgs(format!(
            "'depth' must be -1 or a non-negative integer, got {}",
            d
        ))),
    }
}

pub(super) fn check_flatten(params: &Params) -> Result<(), TransformError> {
    flatten_depth(params).map(|_| ())
}
