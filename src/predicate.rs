//! Filter predicates over sequence elements.
//!
//! A predicate is written as a mapping and compiled once, when the adapter is
//! loaded:
//!
//! ```yaml
//! filter:
//!   and:
//!     - type: func
//!     - name: { startswith: "get_" }
//!     - not: { visibility: private }
//! ```
//!
//! A field whose condition is a plain value tests equality; a field whose
//! condition is a mapping applies every operator in it. Missing fields are
//! treated as `null`.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::path::PathExpression;
use crate::transform_registry::type_name;
use crate::transforms::to_display_string;

/// A compiled filter predicate.
#[derive(Debug, Clone)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// Every field condition must hold.
    Fields(Vec<FieldCondition>),
}

#[derive(Debug, Clone)]
pub struct FieldCondition {
    pub path: PathExpression,
    pub conditions: Vec<Condition>,
}

/// One operator applied to a field value.
#[derive(Debug, Clone)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    In(Value),
    NotIn(Value),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    Matches(Regex),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    IsNone(bool),
    IsNotNone(bool),
    Type(String),
}

const TYPE_NAMES: [&str; 6] = ["null", "boolean", "number", "string", "array", "object"];

impl Predicate {
    /// Compile a predicate. `field` is the adapter location used in errors.
    pub fn compile(spec: &Value, field: &str) -> Result<Self, ConfigError> {
        let map = spec
            .as_object()
            .ok_or_else(|| ConfigError::invalid(field, format!("filter must be a mapping, got {}", type_name(spec))))?;

        if map.is_empty() {
            return Err(ConfigError::invalid(field, "filter must not be empty"));
        }

        let logical = ["and", "or", "not"]
            .into_iter()
            .find(|key| map.contains_key(*key));
        if let Some(key) = logical {
            if map.len() > 1 {
                return Err(ConfigError::invalid(
                    field,
                    format!("'{}' cannot be combined with other keys", key),
                ));
            }
            let operand = &map[key];
            let nested = format!("{}.{}", field, key);
            return match key {
                "not" => Ok(Predicate::Not(Box::new(Predicate::compile(operand, &nested)?))),
                _ => {
                    let items = operand.as_array().ok_or_else(|| {
                        ConfigError::invalid(&nested, "expected a list of predicates")
                    })?;
                    let compiled = items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| Predicate::compile(item, &format!("{}[{}]", nested, i)))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(if key == "and" {
                        Predicate::And(compiled)
                    } else {
                        Predicate::Or(compiled)
                    })
                }
            };
        }

        map.iter()
            .map(|(path, condition)| compile_field(path, condition, &format!("{}.{}", field, path)))
            .collect::<Result<Vec<_>, _>>()
            .map(Predicate::Fields)
    }

    pub fn matches(&self, item: &Value) -> bool {
        match self {
            Predicate::And(all) => all.iter().all(|p| p.matches(item)),
            Predicate::Or(any) => any.iter().any(|p| p.matches(item)),
            Predicate::Not(inner) => !inner.matches(item),
            Predicate::Fields(fields) => fields.iter().all(|f| {
                let value = f.path.resolve(item).unwrap_or(&Value::Null);
                f.conditions.iter().all(|c| c.holds(value))
            }),
        }
    }

    /// Keep the elements that satisfy this predicate, in order.
    pub fn filter(&self, items: &[Value]) -> Vec<Value> {
        items.iter().filter(|item| self.matches(item)).cloned().collect()
    }
}

fn compile_field(path: &str, condition: &Value, field: &str) -> Result<FieldCondition, ConfigError> {
    let path = PathExpression::parse(path).map_err(|err| ConfigError::path(field, err))?;
    let conditions = match condition {
        Value::Object(operators) => compile_operators(operators, field)?,
        literal => vec![Condition::Eq(literal.clone())],
    };
    Ok(FieldCondition { path, conditions })
}

fn compile_operators(operators: &Map<String, Value>, field: &str) -> Result<Vec<Condition>, ConfigError> {
    if operators.is_empty() {
        return Err(ConfigError::invalid(field, "condition has no operators"));
    }
    operators
        .iter()
        .map(|(op, operand)| compile_operator(op, operand, &format!("{}.{}", field, op)))
        .collect()
}

fn compile_operator(op: &str, operand: &Value, field: &str) -> Result<Condition, ConfigError> {
    let text = || {
        operand
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ConfigError::invalid(field, format!("'{}' expects a string", op)))
    };
    let flag = || {
        operand
            .as_bool()
            .ok_or_else(|| ConfigError::invalid(field, format!("'{}' expects true or false", op)))
    };
    let collection = || match operand {
        Value::Array(_) | Value::String(_) => Ok(operand.clone()),
        _ => Err(ConfigError::invalid(field, format!("'{}' expects a list or a string", op))),
    };

    Ok(match op {
        "eq" => Condition::Eq(operand.clone()),
        "ne" => Condition::Ne(operand.clone()),
        "in" => Condition::In(collection()?),
        "not_in" => Condition::NotIn(collection()?),
        "startswith" => Condition::StartsWith(text()?),
        "endswith" => Condition::EndsWith(text()?),
        "contains" => Condition::Contains(text()?),
        "matches" => {
            let pattern = text()?;
            let regex = Regex::new(&pattern).map_err(|err| ConfigError::Regex {
                field: field.to_string(),
                pattern: pattern.clone(),
                message: err.to_string(),
            })?;
            Condition::Matches(regex)
        }
        "gt" => Condition::Gt(operand.clone()),
        "gte" => Condition::Gte(operand.clone()),
        "lt" => Condition::Lt(operand.clone()),
        "lte" => Condition::Lte(operand.clone()),
        "is_none" => Condition::IsNone(flag()?),
        "is_not_none" => Condition::IsNotNone(flag()?),
        "type" => {
            let name = text()?;
            if !TYPE_NAMES.contains(&name.as_str()) {
                return Err(ConfigError::invalid(
                    field,
                    format!("unknown type '{}' (expected one of {})", name, TYPE_NAMES.join(", ")),
                ));
            }
            Condition::Type(name)
        }
        other => {
            return Err(ConfigError::invalid(field, format!("unknown filter operator '{}'", other)))
        }
    })
}

impl Condition {
    fn holds(&self, value: &Value) -> bool {
        match self {
            Condition::Eq(expected) => loosely_equal(value, expected),
            Condition::Ne(expected) => !loosely_equal(value, expected),
            Condition::In(container) => contains(container, value),
            Condition::NotIn(container) => !contains(container, value),
            Condition::StartsWith(prefix) => to_display_string(value).starts_with(prefix.as_str()),
            Condition::EndsWith(suffix) => to_display_string(value).ends_with(suffix.as_str()),
            Condition::Contains(needle) => to_display_string(value).contains(needle.as_str()),
            Condition::Matches(regex) => regex.is_match(&to_display_string(value)),
            Condition::Gt(bound) => compare(value, bound) == Some(Ordering::Greater),
            Condition::Gte(bound) => matches!(compare(value, bound), Some(Ordering::Greater | Ordering::Equal)),
            Condition::Lt(bound) => compare(value, bound) == Some(Ordering::Less),
            Condition::Lte(bound) => matches!(compare(value, bound), Some(Ordering::Less | Ordering::Equal)),
            Condition::IsNone(expected) => value.is_null() == *expected,
            Condition::IsNotNone(expected) => !value.is_null() == *expected,
            Condition::Type(name) => type_name(value) == name,
        }
    }
}

/// Equality where `1` and `1.0` are the same number.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

fn contains(container: &Value, value: &Value) -> bool {
    match (container, value) {
        (Value::Array(items), _) => items.iter().any(|item| loosely_equal(item, value)),
        (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
        _ => false,
    }
}

/// Ordering between two numbers or two strings; anything else is unordered.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
