//! Collection mapping: synthesize node-shaped values from a raw sequence.
//!
//! A template is an arbitrary value in which any string of the exact form
//! `${<path>}` is a placeholder. The first accessor of the path names the
//! bound variable, so with the default variable `${item.title}` reads
//! `title` from the current item. Placeholders keep the type of what they
//! resolve to; strings that merely contain `${...}` are copied verbatim.

use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::path::{Accessor, PathExpression};

pub const DEFAULT_VARIABLE: &str = "item";

/// A compiled `map` specification.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSpec {
    template: Template,
}

/// A template with its placeholders parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    /// Copied as is; contains no placeholders.
    Literal(Value),
    Placeholder(PathExpression),
    Array(Vec<Template>),
    Object(Vec<(String, Template)>),
}

impl MapSpec {
    /// Compile a `{template: ..., variable: ...}` mapping.
    pub fn compile(spec: &Value, field: &str) -> Result<Self, ConfigError> {
        let map = spec
            .as_object()
            .ok_or_else(|| ConfigError::invalid(field, "map must be a mapping with a 'template'"))?;

        if let Some(unknown) = map.keys().find(|k| !matches!(k.as_str(), "template" | "variable")) {
            return Err(ConfigError::invalid(field, format!("unknown map key '{}'", unknown)));
        }

        let variable = match map.get("variable") {
            None => DEFAULT_VARIABLE,
            Some(Value::String(name)) if !name.is_empty() => name.as_str(),
            Some(_) => {
                return Err(ConfigError::invalid(
                    &format!("{}.variable", field),
                    "variable must be a non-empty string",
                ))
            }
        };

        let template = map
            .get("template")
            .ok_or_else(|| ConfigError::invalid(field, "map requires a 'template'"))?;

        Self::new(template, variable, &format!("{}.template", field))
    }

    pub fn new(template: &Value, variable: &str, field: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            template: Template::compile(template, variable, field)?,
        })
    }

    /// Instantiate the template once per item, preserving order.
    pub fn map(&self, items: &[Value]) -> Vec<Value> {
        items.iter().map(|item| self.template.instantiate(item)).collect()
    }
}

impl Template {
    pub fn compile(value: &Value, variable: &str, field: &str) -> Result<Self, ConfigError> {
        match value {
            Value::String(s) => match placeholder_expression(s) {
                Some(expression) => compile_placeholder(expression, variable, field),
                None => Ok(Template::Literal(value.clone())),
            },
            Value::Array(items) => {
                let compiled = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| Template::compile(item, variable, &format!("{}[{}]", field, i)))
                    .collect::<Result<Vec<_>, _>>()?;
                if compiled.iter().all(Template::is_literal) {
                    Ok(Template::Literal(value.clone()))
                } else {
                    Ok(Template::Array(compiled))
                }
            }
            Value::Object(entries) => {
                let compiled = entries
                    .iter()
                    .map(|(key, item)| {
                        Template::compile(item, variable, &format!("{}.{}", field, key))
                            .map(|t| (key.clone(), t))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if compiled.iter().all(|(_, t)| t.is_literal()) {
                    Ok(Template::Literal(value.clone()))
                } else {
                    Ok(Template::Object(compiled))
                }
            }
            _ => Ok(Template::Literal(value.clone())),
        }
    }

    fn is_literal(&self) -> bool {
        matches!(self, Template::Literal(_))
    }

    /// Build a value with every placeholder resolved against `item`.
    /// Unresolvable placeholders become `null`.
    pub fn instantiate(&self, item: &Value) -> Value {
        match self {
            Template::Literal(value) => value.clone(),
            Template::Placeholder(path) => path.resolve_tail(item).cloned().unwrap_or(Value::Null),
            Template::Array(items) => Value::Array(items.iter().map(|t| t.instantiate(item)).collect()),
            Template::Object(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, template) in entries {
                    map.insert(key.clone(), template.instantiate(item));
                }
                Value::Object(map)
            }
        }
    }
}

fn placeholder_expression(s: &str) -> Option<&str> {
    s.strip_prefix("${")?.strip_suffix('}').map(str::trim)
}

fn compile_placeholder(expression: &str, variable: &str, field: &str) -> Result<Template, ConfigError> {
    let path = PathExpression::parse(expression).map_err(|err| ConfigError::path(field, err))?;
    match path.head() {
        Some(Accessor::Field(name)) if name == variable => Ok(Template::Placeholder(path)),
        _ => Err(ConfigError::UndeclaredVariable {
            field: field.to_string(),
            expression: expression.to_string(),
            variable: variable.to_string(),
        }),
    }
}
