//! Named node capabilities supplied by the host.
//!
//! An adapter can refer to `{method: "name"}` wherever an extraction spec is
//! expected. The name is looked up once, when the adapter is loaded, in the
//! registry the host filled beforehand; the engine only knows the calling
//! contract: the current node in, a value out, possibly failing.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// A host-provided extractor.
pub trait NodeMethod: Send + Sync {
    fn call(&self, node: &Value) -> Result<Value, String>;
}

impl<F> NodeMethod for F
where
    F: Fn(&Value) -> Result<Value, String> + Send + Sync,
{
    fn call(&self, node: &Value) -> Result<Value, String> {
        self(node)
    }
}

/// Registry of node methods keyed by name.
#[derive(Clone, Default)]
pub struct MethodRegistry {
    methods: HashMap<String, Arc<dyn NodeMethod>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, method: impl NodeMethod + 'static) {
        self.methods.insert(name.into(), Arc::new(method));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn NodeMethod>> {
        self.methods.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.names())
            .finish()
    }
}

/// A method reference, resolved against a registry at load time.
#[derive(Clone)]
pub struct MethodSpec {
    pub name: String,
    method: Option<Arc<dyn NodeMethod>>,
}

impl MethodSpec {
    pub fn resolve(name: impl Into<String>, registry: &MethodRegistry) -> Self {
        let name = name.into();
        let method = registry.get(&name);
        Self { name, method }
    }

    pub fn is_resolved(&self) -> bool {
        self.method.is_some()
    }

    /// Invoke the method; `None` when it is unregistered or fails.
    pub fn invoke(&self, node: &Value) -> Option<Value> {
        let method = self.method.as_ref()?;
        match method.call(node) {
            Ok(value) => Some(value),
            Err(message) => {
                tracing::debug!(method = %self.name, error = %message, "node method failed");
                None
            }
        }
    }
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec")
            .field("name", &self.name)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl PartialEq for MethodSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.is_resolved() == other.is_resolved()
    }
}
