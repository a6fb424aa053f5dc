//! Transform pipeline types and the built-in operation vocabulary.
//!
//! | category   | operations                                                  |
//! |------------|-------------------------------------------------------------|
//! | text       | `upper` `lower` `capitalize` `strip` `truncate` `prefix` `suffix` |
//! | collection | `filter` `extract` `join` `first` `last` `length` `flatten` |
//! | numeric    | `abs` `round` `format`                                      |
//! | conversion | `str` `int` `float`                                         |

mod collection;
mod conversion;
mod numeric;
mod text;

use serde_json::Value;

use crate::transform_registry::{Params, TransformError, TransformFn, TransformRegistry};

pub use conversion::to_display_string;

/// One named, parameterized step of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformStep {
    /// Transform name to call
    pub name: String,

    /// Arguments passed to the transform
    pub params: Params,
}

impl TransformStep {
    pub fn new(name: impl Into<String>, params: Params) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// A step without arguments.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Params::new())
    }

    pub fn with_params<'a>(
        name: impl Into<String>,
        params: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Self {
        Self::new(
            name,
            params.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        )
    }
}

/// An ordered sequence of transform steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformPipeline {
    steps: Vec<TransformStep>,
}

impl TransformPipeline {
    pub fn new(steps: Vec<TransformStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }
}

type RunFn = fn(&Value, &Params) -> Result<Value, TransformError>;
type CheckFn = fn(&Params) -> Result<(), TransformError>;

/// A built-in operation with its argument check.
struct Builtin {
    run: RunFn,
    check: CheckFn,
}

impl TransformFn for Builtin {
    fn execute(&self, input: &Value, params: &Params) -> Result<Value, TransformError> {
        (self.run)(input, params)
    }

    fn validate(&self, params: &Params) -> Result<(), TransformError> {
        (self.check)(params)
    }
}

fn no_params(_params: &Params) -> Result<(), TransformError> {
    Ok(())
}

pub(crate) fn register_builtins(registry: &mut TransformRegistry) {
    let builtins: [(&str, RunFn, CheckFn); 20] = [
        ("upper", text::upper, no_params),
        ("lower", text::lower, no_params),
        ("capitalize", text::capitalize, no_params),
        ("strip", text::strip, no_params),
        ("truncate", text::truncate, text::check_truncate),
        ("prefix", text::prefix, text::check_prefix),
        ("suffix", text::suffix, text::check_suffix),
        ("filter", collection::filter, collection::check_filter),
        ("extract", collection::extract, collection::check_extract),
        ("join", collection::join, collection::check_join),
        ("first", collection::first, no_params),
        ("last", collection::last, no_params),
        ("length", collection::length, no_params),
        ("flatten", collection::flatten, collection::check_flatten),
        ("abs", numeric::abs, no_params),
        ("round", numeric::round, numeric::check_round),
        ("format", numeric::format, numeric::check_format),
        ("str", conversion::to_str, no_params),
        ("int", conversion::to_int, no_params),
        ("float", conversion::to_float, no_params),
    ];

    for (name, run, check) in builtins {
        registry.register(name, Box::new(Builtin { run, check }));
    }
}

// Parameter helpers shared by the operation modules.

pub(crate) fn param_str<'a>(
    params: &'a Params,
    name: &str,
    default: &'a str,
) -> Result<&'a str, TransformError> {
    match params.get(name) {
        None => Ok(default),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(TransformError::InvalidArgs(format!(
            "'{}' must be a string, got {}",
            name,
            crate::transform_registry::type_name(other)
        ))),
    }
}

pub(crate) fn required_str<'a>(params: &'a Params, name: &str) -> Result<&'a str, TransformError> {
    match params.get(name) {
        None => Err(TransformError::InvalidArgs(format!("missing '{}'", name))),
        Some(_) => param_str(params, name, ""),
    }
}

pub(crate) fn param_i64(params: &Params, name: &str, default: i64) -> Result<i64, TransformError> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => value.as_i64().ok_or_else(|| {
            TransformError::InvalidArgs(format!("'{}' must be an integer, got {}", name, value))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_builders() {
        let step = TransformStep::with_params("join", [("separator", json!(", "))]);
        assert_eq!(step.name, "join");
        assert_eq!(step.params.get("separator"), Some(&json!(", ")));

        assert!(TransformStep::named("upper").params.is_empty());
    }

    #[test]
    fn test_param_helpers() {
        let params: Params = [
            ("sep".to_string(), json!(" ")),
            ("n".to_string(), json!(3)),
            ("bad".to_string(), json!(1.5)),
        ]
        .into_iter()
        .collect();

        assert_eq!(param_str(&params, "sep", "").unwrap(), " ");
        assert_eq!(param_str(&params, "absent", "x").unwrap(), "x");
        assert!(param_str(&params, "n", "").is_err());
        assert!(required_str(&params, "absent").is_err());
        assert_eq!(param_i64(&params, "n", 0).unwrap(), 3);
        assert_eq!(param_i64(&params, "absent", 7).unwrap(), 7);
        assert!(param_i64(&params, "bad", 0).is_err());
    }

    #[test]
    fn test_header_label_pipeline() {
        let registry = TransformRegistry::builtin();
        let inlines = json!([
            {"t": "Str", "c": "Hi"},
            {"t": "Space"},
            {"t": "Str", "c": "there"}
        ]);
        let pipeline = TransformPipeline::new(vec![
            TransformStep::with_params("filter", [("t", json!("Str"))]),
            TransformStep::with_params("extract", [("field", json!("c"))]),
            TransformStep::with_params("join", [("separator", json!(" "))]),
        ]);

        assert_eq!(registry.apply(&pipeline, &inlines).unwrap(), json!("Hi there"));
    }

    #[test]
    fn test_pandoc_text_pipeline_with_truncate() {
        let registry = TransformRegistry::builtin();
        let nodes = json!([
            {"t": "Str", "c": "Hello"},
            {"t": "Space"},
            {"t": "Str", "c": "world"},
            {"t": "SoftBreak"},
            {"t": "Str", "c": "test"}
        ]);
        let pipeline = TransformPipeline::new(vec![
            TransformStep::with_params("filter", [("t", json!("Str"))]),
            TransformStep::with_params("extract", [("field", json!("c"))]),
            TransformStep::with_params("join", [("separator", json!(" "))]),
            TransformStep::with_params(
                "truncate",
                [("max_length", json!(10)), ("suffix", json!("..."))],
            ),
        ]);

        assert_eq!(registry.apply(&pipeline, &nodes).unwrap(), json!("Hello w..."));
    }

    #[test]
    fn test_numeric_pipeline() {
        let registry = TransformRegistry::builtin();
        let pipeline = TransformPipeline::new(vec![
            TransformStep::named("abs"),
            TransformStep::with_params("round", [("digits", json!(0))]),
            TransformStep::named("int"),
        ]);

        assert_eq!(registry.apply(&pipeline, &json!(-3.7)).unwrap(), json!(4));
    }

    #[test]
    fn test_flatten_filter_extract_join() {
        let registry = TransformRegistry::builtin();
        let nested = json!([
            [{"type": "text", "value": "hello"}, {"type": "text", "value": "world"}],
            [{"type": "punct", "value": "!"}],
            [{"type": "text", "value": "test"}]
        ]);
        let pipeline = TransformPipeline::new(vec![
            TransformStep::named("flatten"),
            TransformStep::with_params("filter", [("type", json!("text"))]),
            TransformStep::with_params("extract", [("field", json!("value"))]),
            TransformStep::with_params("join", [("separator", json!(" "))]),
        ]);

        assert_eq!(registry.apply(&pipeline, &nested).unwrap(), json!("hello world test"));
    }
}
