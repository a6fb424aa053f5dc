//! Engine facade.
//!
//! Owns the transform vocabulary and the method capabilities, loads adapter
//! definitions against them and materializes documents.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::definition::AdapterDefinition;
use crate::error::{EngineError, Result};
use crate::method::{MethodRegistry, NodeMethod};
use crate::node::NormalizedNode;
use crate::runtime::materializer::DEFAULT_MAX_DEPTH;
use crate::runtime::{AdapterLoader, Materializer};
use crate::transform_registry::TransformRegistry;

/// Entry point for loading adapters and normalizing documents.
///
/// # Example
/// ```
/// use serde_json::json;
/// use treenorm::Engine;
///
/// let engine = Engine::new();
/// let adapter = engine
///     .load_adapter_value(&json!({"type": "t", "children": "c", "ignore_types": ["Space"]}))
///     .unwrap();
/// let tree = engine
///     .materialize_root(&adapter, &json!({"t": "Para", "c": [{"t": "Str"}, {"t": "Space"}]}))
///     .unwrap();
/// assert_eq!(tree.children.len(), 1);
/// ```
#[derive(Debug)]
pub struct Engine {
    transforms: TransformRegistry,
    methods: MethodRegistry,
    max_depth: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            transforms: TransformRegistry::builtin(),
            methods: MethodRegistry::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Engine {
    /// An engine with the built-in transforms and no methods.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit how deeply materialized nodes may nest.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn materializer<'a>(&'a self, definition: &'a AdapterDefinition) -> Materializer<'a> {
        Materializer::new(definition, &self.transforms).with_max_depth(self.max_depth)
    }

    /// Register a node method. Adapters loaded afterwards can refer to it
    /// with `{method: <name>}`.
    pub fn register_method(&mut self, name: impl Into<String>, method: impl NodeMethod + 'static) {
        self.methods.register(name, method);
    }

    pub fn methods(&self) -> &MethodRegistry {
        &self.methods
    }

    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    pub fn loader(&self) -> AdapterLoader<'_> {
        AdapterLoader::new(&self.transforms, &self.methods)
    }

    pub fn load_adapter_value(&self, value: &Value) -> Result<AdapterDefinition> {
        Ok(self.loader().decode_value(value)?)
    }

    pub fn load_adapter_json(&self, text: &str) -> Result<AdapterDefinition> {
        self.loader().decode_json(text)
    }

    pub fn load_adapter_yaml(&self, text: &str) -> Result<AdapterDefinition> {
        self.loader().decode_yaml(text)
    }

    pub fn load_adapter_file<P: AsRef<Path>>(&self, path: P) -> Result<AdapterDefinition> {
        self.loader().load_from_file(path)
    }

    /// Normalize `document`. `Ok(None)` when the root's type is ignored.
    pub fn materialize(
        &self,
        definition: &AdapterDefinition,
        document: &Value,
    ) -> Result<Option<NormalizedNode>> {
        let tree = self.materializer(definition).materialize(document)?;
        if let Some(tree) = &tree {
            debug!(nodes = tree.node_count(), "document materialized");
        }
        Ok(tree)
    }

    /// Like [`Engine::materialize`], but an ignored root is an error.
    pub fn materialize_root(
        &self,
        definition: &AdapterDefinition,
        document: &Value,
    ) -> Result<NormalizedNode> {
        let materializer = self.materializer(definition);
        match materializer.materialize(document)? {
            Some(tree) => Ok(tree),
            None => Err(EngineError::RootIgnored {
                node_type: materializer.effective_type(document).unwrap_or_default(),
            }),
        }
    }
}
