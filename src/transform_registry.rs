//! Transform registry for the fixed vocabulary of value operations.
//!
//! Every operation is a pure `Value -> Value` function parameterized by a
//! small mapping of named arguments. Adapter definitions refer to operations
//! by name only, so the set of things a configuration can make the engine do
//! is exactly the set registered here.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::transforms::{self, TransformPipeline, TransformStep};

/// Named arguments passed to a transform step.
pub type Params = HashMap<String, Value>;

/// Error type for transform operations.
///
/// These are data-level failures. The evaluator never propagates them past
/// the attribute being extracted; it falls back to the extraction spec's default.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("Transform not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{transform} requires {expected} input, got {found}")]
    TypeMismatch {
        transform: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Execution error: {0}")]
    ExecutionError(String),
}

impl TransformError {
    pub(crate) fn mismatch(transform: &str, expected: &'static str, found: &Value) -> Self {
        TransformError::TypeMismatch {
            transform: transform.to_string(),
            expected,
            found: type_name(found),
        }
    }
}

/// Trait for transformation functions.
pub trait TransformFn: Send + Sync {
    /// Execute the transformation on `input` with the given arguments.
    fn execute(&self, input: &Value, params: &Params) -> Result<Value, TransformError>;

    /// Check the arguments without running the transformation.
    ///
    /// Called once per step when an adapter is loaded so that bad parameters
    /// are reported early instead of silently degrading every node.
    fn validate(&self, _params: &Params) -> Result<(), TransformError> {
        Ok(())
    }
}

/// Simple function-based implementation of TransformFn
impl<F> TransformFn for F
where
    F: Fn(&Value, &Params) -> Result<Value, TransformError> + Send + Sync,
{
    fn execute(&self, input: &Value, params: &Params) -> Result<Value, TransformError> {
        self(input, params)
    }
}

/// Registry for storing and calling transformation functions
pub struct TransformRegistry {
    transforms: HashMap<String, Box<dyn TransformFn>>,
}

impl TransformRegistry {
    /// Create a new empty transform registry
    pub fn new() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in vocabulary (text, collection,
    /// numeric and conversion operations).
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        transforms::register_builtins(&mut registry);
        registry
    }

    /// Register a transformation function
    pub(crate) fn register(&mut self, name: impl Into<String>, func: Box<dyn TransformFn>) {
        self.transforms.insert(name.into(), func);
    }

    /// Call a registered transformation function
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - Transform succeeded
    /// * `Err(TransformError::NotFound)` - No transform with that name
    /// * `Err(TransformError)` - Transform rejected its input or arguments
    pub fn call(&self, name: &str, input: &Value, params: &Params) -> Result<Value, TransformError> {
        let transform = self
            .transforms
            .get(name)
            .ok_or_else(|| TransformError::NotFound(name.to_string()))?;

        transform.execute(input, params)
    }

    /// Apply a pipeline: the output of step *i* is the input of step *i+1*.
    ///
    /// The first failing step aborts the pipeline.
    pub fn apply(&self, pipeline: &TransformPipeline, input: &Value) -> Result<Value, TransformError> {
        let mut current = input.clone();
        for step in pipeline.steps() {
            current = self.call(&step.name, &current, &step.params).map_err(|err| {
                debug!(transform = %step.name, error = %err, "transform step failed");
                err
            })?;
        }
        Ok(current)
    }

    /// Check that a step names a registered transform and that its
    /// arguments are acceptable.
    pub fn validate_step(&self, step: &TransformStep) -> Result<(), TransformError> {
        let transform = self
            .transforms
            .get(&step.name)
            .ok_or_else(|| TransformError::NotFound(step.name.clone()))?;

        transform.validate(&step.params)
    }

    /// Check if a transform is registered
    pub fn has_transform(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Get list of all registered transform names, sorted
    pub fn list_transforms(&self) -> Vec<String> {
        let mut names: Vec<String> = self.transforms.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.list_transforms())
            .finish()
    }
}

/// Human-readable name of a value's type, used in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_call_transform() {
        let mut registry = TransformRegistry::new();

        registry.register(
            "shout",
            Box::new(|input: &Value, _params: &Params| {
                let text = input
                    .as_str()
                    .ok_or_else(|| TransformError::mismatch("shout", "string", input))?;
                Ok(Value::String(format!("{}!", text.to_uppercase())))
            }) as Box<dyn TransformFn>,
        );

        let result = registry.call("shout", &json!("hello"), &Params::new()).unwrap();
        assert_eq!(result, json!("HELLO!"));

        let err = registry.call("shout", &json!(3), &Params::new()).unwrap_err();
        assert_eq!(err.to_string(), "shout requires string input, got number");
    }

    #[test]
    fn test_transform_not_found() {
        let registry = TransformRegistry::new();

        let result = registry.call("nonexistent", &json!(null), &Params::new());

        assert!(matches!(result, Err(TransformError::NotFound(_))));
    }

    #[test]
    fn test_builtin_vocabulary() {
        let registry = TransformRegistry::builtin();

        for name in [
            "upper", "lower", "capitalize", "strip", "truncate", "prefix", "suffix", "filter",
            "extract", "join", "first", "last", "length", "flatten", "abs", "round", "format",
            "str", "int", "float",
        ] {
            assert!(registry.has_transform(name), "missing builtin {}", name);
        }
        assert!(!registry.has_transform("eval"));

        let names = registry.list_transforms();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_apply_pipeline_in_order() {
        let registry = TransformRegistry::builtin();
        let pipeline = TransformPipeline::new(vec![
            TransformStep::named("strip"),
            TransformStep::named("upper"),
        ]);

        let result = registry.apply(&pipeline, &json!("  hello world  ")).unwrap();
        assert_eq!(result, json!("HELLO WORLD"));
    }

    #[test]
    fn test_apply_empty_pipeline_is_identity() {
        let registry = TransformRegistry::builtin();
        let result = registry.apply(&TransformPipeline::default(), &json!({"a": 1})).unwrap();
        assert_eq!(result, json!({"a": 1}));
    }

    #[test]
    fn test_apply_stops_at_unknown_step() {
        let registry = TransformRegistry::builtin();
        let pipeline = TransformPipeline::new(vec![
            TransformStep::named("strip"),
            TransformStep::named("unknown_transform"),
        ]);

        let err = registry.apply(&pipeline, &json!("test")).unwrap_err();
        assert_eq!(err, TransformError::NotFound("unknown_transform".to_string()));
    }

    #[test]
    fn test_pipeline_composition() {
        let registry = TransformRegistry::builtin();
        let s1 = TransformStep::named("flatten");
        let s2 = TransformStep::with_params("join", [("separator", json!("-"))]);
        let input = json!([["a", "b"], ["c"]]);

        let combined = registry
            .apply(&TransformPipeline::new(vec![s1.clone(), s2.clone()]), &input)
            .unwrap();
        let first = registry.apply(&TransformPipeline::new(vec![s1]), &input).unwrap();
        let chained = registry.apply(&TransformPipeline::new(vec![s2]), &first).unwrap();

        assert_eq!(combined, chained);
        assert_eq!(combined, json!("a-b-c"));
    }

    #[test]
    fn test_validate_step() {
        let registry = TransformRegistry::builtin();

        assert!(registry.validate_step(&TransformStep::named("upper")).is_ok());
        assert!(matches!(
            registry.validate_step(&TransformStep::named("nope")),
            Err(TransformError::NotFound(_))
        ));
        assert!(matches!(
            registry.validate_step(&TransformStep::with_params(
                "truncate",
                [("max_length", json!("ten"))]
            )),
            Err(TransformError::InvalidArgs(_))
        ));
    }
}
