//! Extraction spec evaluator.
//!
//! Resolves one attribute of a node from its spec. Evaluation is total:
//! missing fields, wrong shapes and failed transform steps degrade to the
//! spec's `default` or to `null`. A present-but-`null` value counts as
//! missing. The only thing reported back to the caller is a children spec
//! that produced something other than a sequence.

use serde_json::Value;
use tracing::{debug, warn};

use crate::predicate::Predicate;
use crate::spec::{ChildrenSelector, CollectionSpec, ExtractionSpec, PathSpec};
use crate::transform_registry::TransformRegistry;
use crate::transforms::to_display_string;

/// Evaluates extraction specs against source nodes.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    transforms: &'a TransformRegistry,
}

impl<'a> Evaluator<'a> {
    pub fn new(transforms: &'a TransformRegistry) -> Self {
        Self { transforms }
    }

    /// Evaluate `spec` against `node`; `null` when nothing was found.
    pub fn evaluate(&self, spec: &ExtractionSpec, node: &Value) -> Value {
        self.resolve(spec, node).unwrap_or(Value::Null)
    }

    /// Evaluate `spec` against `node`, `None` standing for "not found".
    pub fn resolve(&self, spec: &ExtractionSpec, node: &Value) -> Option<Value> {
        match spec {
            ExtractionSpec::Literal(value) => present(Some(value)).cloned(),
            ExtractionSpec::FieldShorthand(path) => present(path.resolve(node)).cloned(),
            ExtractionSpec::Path(spec) => self.resolve_path(spec, node),
            ExtractionSpec::Collection(spec) => match self.collect(spec, node) {
                Ok(items) => Some(Value::Array(items)),
                Err(other) => {
                    warn!(path = %spec.path, "collection spec did not produce a sequence; mapping skipped");
                    Some(other)
                }
            },
            ExtractionSpec::Method(method) => method.invoke(node).filter(|v| !v.is_null()),
            ExtractionSpec::Selector(_) => {
                debug!("children selector evaluated outside of a children position");
                None
            }
        }
    }

    /// Evaluate a children spec into the list of child values.
    ///
    /// `type_spec` is the adapter's base type rule, used by selectors to
    /// type candidate children. A result that is neither missing nor a
    /// sequence is returned as `Err` with the offending value.
    pub fn evaluate_children(
        &self,
        spec: &ExtractionSpec,
        node: &Value,
        type_spec: &ExtractionSpec,
    ) -> Result<Vec<Value>, Value> {
        match spec {
            ExtractionSpec::Collection(spec) => self.collect(spec, node),
            ExtractionSpec::Selector(selector) => Ok(self.select(selector, node, type_spec)),
            other => match self.resolve(other, node) {
                None => Ok(Vec::new()),
                Some(Value::Array(items)) => Ok(items),
                Some(value) if is_blank(&value) => Ok(Vec::new()),
                Some(value) => Err(value),
            },
        }
    }

    /// The node type `spec` yields for `node`, as a non-empty string.
    pub fn type_name(&self, spec: &ExtractionSpec, node: &Value) -> Option<String> {
        match self.resolve(spec, node)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s),
            Value::Array(_) | Value::Object(_) => None,
            other => Some(to_display_string(&other)),
        }
    }

    fn resolve_path(&self, spec: &PathSpec, node: &Value) -> Option<Value> {
        let found = present(spec.path.resolve(node)).or_else(|| {
            let fallback = spec.fallback.as_ref()?;
            let value = present(fallback.resolve(node));
            if value.is_some() {
                debug!(path = %spec.path, fallback = %fallback, "primary path missing, used fallback");
            }
            value
        });

        let value = match found {
            Some(value) => self.post_process(spec, value),
            None => None,
        };

        value.or_else(|| {
            if spec.default.is_some() {
                debug!(path = %spec.path, "using default value");
            }
            spec.default.clone()
        })
    }

    /// Transform then filter a found value.
    fn post_process(&self, spec: &PathSpec, value: &Value) -> Option<Value> {
        let transformed = match &spec.transform {
            Some(pipeline) => match self.transforms.apply(pipeline, value) {
                Ok(result) => result,
                Err(err) => {
                    debug!(path = %spec.path, error = %err, "transform failed");
                    return None;
                }
            },
            None => value.clone(),
        };

        let filtered = match &spec.filter {
            Some(predicate) => apply_filter(predicate, transformed),
            None => transformed,
        };
        Some(filtered).filter(|v| !v.is_null())
    }

    /// Resolve, transform, filter and map a collection spec.
    fn collect(&self, spec: &CollectionSpec, node: &Value) -> Result<Vec<Value>, Value> {
        let Some(found) = present(spec.path.resolve(node)) else {
            return Ok(Vec::new());
        };

        let transformed = match &spec.transform {
            Some(pipeline) => match self.transforms.apply(pipeline, found) {
                Ok(result) => result,
                Err(err) => {
                    debug!(path = %spec.path, error = %err, "collection transform failed");
                    return Ok(Vec::new());
                }
            },
            None => found.clone(),
        };

        let items = match transformed {
            Value::Array(items) => items,
            Value::Null => return Ok(Vec::new()),
            other if is_blank(&other) => return Ok(Vec::new()),
            other => return Err(other),
        };

        let items = match &spec.filter {
            Some(predicate) => predicate.filter(&items),
            None => items,
        };

        Ok(match &spec.map {
            Some(map) => map.map(&items),
            None => items,
        })
    }

    /// Direct field values of `node`, in document order, whose type passes
    /// the selector. Sequence fields contribute their matching elements.
    fn select(&self, selector: &ChildrenSelector, node: &Value, type_spec: &ExtractionSpec) -> Vec<Value> {
        let Some(fields) = node.as_object() else {
            return Vec::new();
        };

        let matches = |candidate: &Value| {
            self.type_name(type_spec, candidate)
                .is_some_and(|t| selector.matches(&t))
        };

        let mut selected = Vec::new();
        for value in fields.values() {
            match value {
                Value::Null => {}
                Value::Array(items) => selected.extend(items.iter().filter(|item| matches(item)).cloned()),
                single if matches(single) => selected.push(single.clone()),
                _ => {}
            }
        }
        selected
    }
}

/// An empty string or empty mapping where children are expected means none.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn apply_filter(predicate: &Predicate, value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(predicate.filter(&items)),
        other => {
            warn!(
                found = crate::transform_registry::type_name(&other),
                "filter applies to sequences only; value passed through unchanged"
            );
            other
        }
    }
}
