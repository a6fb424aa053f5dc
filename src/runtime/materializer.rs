//! Node materializer.
//!
//! Walks a source document depth-first and builds the normalized tree. For
//! every node the effective type and rules are resolved first, then the
//! node's attributes, then its children, which are materialized before the
//! parent is assembled.
//!
//! Nodes whose effective type is listed in `ignore_types` are dropped along
//! with their whole subtree. A children rule that produces something other
//! than a sequence aborts the document; an empty string or empty mapping
//! counts as no children.
//!
//! Recursion follows the child lists the adapter produces, which can be
//! deeper than the source document: a `map` template may rebuild its own
//! input indefinitely. Nesting beyond [`DEFAULT_MAX_DEPTH`] levels (or the
//! limit given to [`Materializer::with_max_depth`]) aborts the document with
//! [`EngineError::DepthExceeded`].

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::definition::AdapterDefinition;
use crate::error::{EngineError, Result};
use crate::node::NormalizedNode;
use crate::runtime::evaluator::Evaluator;
use crate::runtime::overrides::{resolve_definition, Resolution};
use crate::transform_registry::{type_name, TransformRegistry};
use crate::transforms::to_display_string;

const UNKNOWN_LABEL: &str = "Unknown";

/// Deepest nesting of materialized nodes; the root is at depth 0.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Builds normalized trees for one adapter definition.
pub struct Materializer<'a> {
    definition: &'a AdapterDefinition,
    evaluator: Evaluator<'a>,
    max_depth: usize,
}

impl<'a> Materializer<'a> {
    pub fn new(definition: &'a AdapterDefinition, transforms: &'a TransformRegistry) -> Self {
        Self {
            definition,
            evaluator: Evaluator::new(transforms),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Materialize `document`. `Ok(None)` when the root itself is ignored.
    pub fn materialize(&self, document: &Value) -> Result<Option<NormalizedNode>> {
        let mut path = NodePath::default();
        self.materialize_node(document, &mut path)
    }

    /// The effective (post-override) type of `node`.
    pub fn effective_type(&self, node: &Value) -> Option<String> {
        resolve_definition(self.definition, &self.evaluator, node).node_type
    }

    fn materialize_node(&self, node: &Value, path: &mut NodePath) -> Result<Option<NormalizedNode>> {
        let Resolution { node_type, rules } = resolve_definition(self.definition, &self.evaluator, node);

        if let Some(ignored) = node_type.as_deref().filter(|t| self.definition.is_ignored(t)) {
            trace!(node = %path, node_type = ignored, "ignored node dropped");
            return Ok(None);
        }

        let label = match self.evaluator.evaluate(rules.label, node) {
            Value::Null => node_type.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            Value::String(s) => s,
            other => to_display_string(&other),
        };

        let icon = match self.evaluator.evaluate(rules.icon, node) {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s),
            other => Some(to_display_string(&other)),
        }
        .or_else(|| {
            node_type
                .as_deref()
                .and_then(|t| self.definition.icon_for(t))
                .map(str::to_string)
        });

        let content_lines = self
            .evaluator
            .evaluate(rules.content_lines, node)
            .as_i64()
            .unwrap_or(1);

        let source_location = Some(self.evaluator.evaluate(rules.source_location, node))
            .filter(|v| !v.is_null());

        let mut extra = IndexMap::with_capacity(rules.extra.len());
        for (name, spec) in rules.extra {
            let value = self.evaluator.evaluate(spec, node);
            if !value.is_null() {
                extra.insert(name.clone(), value);
            }
        }

        let child_values = self
            .evaluator
            .evaluate_children(rules.children, node, &self.definition.node_type)
            .map_err(|found| EngineError::NotASequence {
                field: rules.children_field.clone(),
                node_path: path.to_string(),
                found: type_name(&found).to_string(),
            })?;

        if !child_values.is_empty() && path.depth() >= self.max_depth {
            return Err(EngineError::DepthExceeded {
                field: rules.children_field.clone(),
                node_path: path.to_string(),
                limit: self.max_depth,
            });
        }

        let mut children = Vec::with_capacity(child_values.len());
        for (index, child) in child_values.iter().enumerate() {
            path.push(index);
            let materialized = self.materialize_node(child, path);
            path.pop();
            if let Some(child) = materialized? {
                children.push(child);
            }
        }

        trace!(node = %path, node_type = ?node_type, children = children.len(), "materialized node");

        Ok(Some(NormalizedNode {
            label,
            node_type,
            icon,
            content_lines,
            source_location,
            extra,
            children,
        }))
    }
}

/// Position of a node in the source tree, shown as `$[2][0]`.
#[derive(Debug, Default)]
struct NodePath(Vec<usize>);

impl NodePath {
    fn push(&mut self, index: usize) {
        self.0.push(index);
    }

    fn pop(&mut self) {
        self.0.pop();
    }

    fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for index in &self.0 {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodRegistry;
    use crate::runtime::config_loader::AdapterLoader;
    use serde_json::json;

    fn adapter(value: Value) -> AdapterDefinition {
        let transforms = TransformRegistry::builtin();
        let methods = MethodRegistry::new();
        AdapterLoader::new(&transforms, &methods).decode_value(&value).unwrap()
    }

    fn run(definition: &AdapterDefinition, document: &Value) -> Result<Option<NormalizedNode>> {
        let transforms = TransformRegistry::builtin();
        Materializer::new(definition, &transforms).materialize(document)
    }

    #[test]
    fn test_default_adapter() {
        let definition = adapter(json!({}));
        let document = json!({
            "type": "root",
            "label": "Root",
            "children": [{"type": "leaf"}, {"label": "untyped"}]
        });

        let tree = run(&definition, &document).unwrap().unwrap();

        assert_eq!(tree.label, "Root");
        assert_eq!(tree.node_type.as_deref(), Some("root"));
        assert_eq!(tree.content_lines, 1);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].label, "leaf");
        assert_eq!(tree.children[1].label, "untyped");
        assert_eq!(tree.children[1].node_type, None);
    }

    #[test]
    fn test_label_falls_back_to_type_then_unknown() {
        let definition = adapter(json!({"label": "name"}));

        let typed = run(&definition, &json!({"type": "Para"})).unwrap().unwrap();
        assert_eq!(typed.label, "Para");

        let untyped = run(&definition, &json!({})).unwrap().unwrap();
        assert_eq!(untyped.label, "Unknown");

        let numeric = run(&definition, &json!({"name": 42})).unwrap().unwrap();
        assert_eq!(numeric.label, "42");
    }

    #[test]
    fn test_attributes() {
        let definition = adapter(json!({
            "type": "t",
            "label": {"path": "title", "transform": "upper"},
            "icon": "glyph",
            "content_lines": "lines",
            "source_location": "pos",
            "extra": {"level": "c[0]", "missing": "nothing", "kind": {"literal": "block"}},
            "icons": {"Header": "H", "Para": "P"}
        }));

        let node = run(
            &definition,
            &json!({"t": "Header", "title": "intro", "lines": 3, "pos": {"line": 4}, "c": [2]}),
        )
        .unwrap()
        .unwrap();

        assert_eq!(node.label, "INTRO");
        assert_eq!(node.icon.as_deref(), Some("H"));
        assert_eq!(node.content_lines, 3);
        assert_eq!(node.source_location, Some(json!({"line": 4})));
        assert_eq!(node.extra.len(), 2);
        assert_eq!(node.extra["level"], json!(2));
        assert_eq!(node.extra["kind"], json!("block"));

        let node = run(&definition, &json!({"t": "Para", "glyph": "¶", "lines": 2.5})).unwrap().unwrap();
        assert_eq!(node.icon.as_deref(), Some("¶"));
        assert_eq!(node.content_lines, 1);
        assert_eq!(node.source_location, None);
    }

    #[test]
    fn test_icon_uses_effective_type() {
        let definition = adapter(json!({
            "type": "t",
            "icons": {"Unknown": "?", "Document": "D"},
            "type_overrides": {"Unknown": {"type": "Document"}}
        }));

        let node = run(&definition, &json!({"t": "Unknown"})).unwrap().unwrap();
        assert_eq!(node.node_type.as_deref(), Some("Document"));
        assert_eq!(node.icon.as_deref(), Some("D"));
    }

    #[test]
    fn test_ignored_nodes_drop_their_subtree() {
        let definition = adapter(json!({
            "type": "t",
            "children": "c",
            "ignore_types": ["Space", "Div"]
        }));
        let document = json!({"t": "Para", "c": [
            {"t": "Str"},
            {"t": "Space"},
            {"t": "Div", "c": [{"t": "Str"}]},
            {"t": "Str"}
        ]});

        let tree = run(&definition, &document).unwrap().unwrap();

        assert_eq!(tree.children.len(), 2);
        assert!(tree.children.iter().all(|c| c.node_type.as_deref() == Some("Str")));
        assert_eq!(tree.node_count(), 3);

        assert_eq!(run(&definition, &json!({"t": "Space"})).unwrap(), None);
    }

    #[test]
    fn test_ignore_checks_effective_type() {
        let definition = adapter(json!({
            "type": "t",
            "children": "c",
            "ignore_types": ["Hidden"],
            "type_overrides": {"Note": {"type": "Hidden"}}
        }));

        let tree = run(&definition, &json!({"t": "Root", "c": [{"t": "Note"}, {"t": "Hidden"}, {"t": "Text"}]}))
            .unwrap()
            .unwrap();

        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].node_type.as_deref(), Some("Text"));
    }

    #[test]
    fn test_non_sequence_children_is_an_error() {
        let definition = adapter(json!({
            "type": "t",
            "children": "c",
            "type_overrides": {"Code": {"children": "body"}}
        }));
        let document = json!({"t": "Doc", "c": [
            {"t": "Para", "c": []},
            {"t": "Para", "c": [{"t": "Code", "body": "print()"}]}
        ]});

        let err = run(&definition, &document).unwrap_err();

        match err {
            EngineError::NotASequence { field, node_path, found } => {
                assert_eq!(field, "type_overrides.Code.children");
                assert_eq!(node_path, "$[1][0]");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_collection_children_become_nodes() {
        let definition = adapter(json!({
            "type": "t",
            "label": {"path": "label", "default": ""},
            "children": "c",
            "type_overrides": {
                "BulletList": {"children": {"path": "c", "map": {"template": {"t": "ListItem", "c": "${item}"}}}},
                "ListItem": {"label": {"literal": "•"}}
            }
        }));
        let document = json!({"t": "BulletList", "c": [
            [{"t": "Plain", "c": []}],
            [{"t": "Plain", "c": []}, {"t": "Para", "c": []}]
        ]});

        let tree = run(&definition, &document).unwrap().unwrap();

        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].node_type.as_deref(), Some("ListItem"));
        assert_eq!(tree.children[0].label, "•");
        assert_eq!(tree.children[1].children.len(), 2);
        assert_eq!(tree.children[1].children[1].node_type.as_deref(), Some("Para"));
    }

    #[test]
    fn test_self_rebuilding_template_hits_depth_limit() {
        let definition = adapter(json!({
            "type": "t",
            "children": {"path": "c", "map": {"template": {"t": "Item", "c": ["${item}"]}}}
        }));
        let document = json!({"t": "Doc", "c": [1]});

        let err = run(&definition, &document).unwrap_err();
        match err {
            EngineError::DepthExceeded { field, node_path, limit } => {
                assert_eq!(field, "children");
                assert_eq!(limit, DEFAULT_MAX_DEPTH);
                assert_eq!(node_path.matches("[0]").count(), DEFAULT_MAX_DEPTH);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_depth_limit_counts_nesting() {
        let transforms = TransformRegistry::builtin();
        let definition = adapter(json!({"type": "t", "children": "c"}));
        let document = json!({"t": "A", "c": [{"t": "B", "c": [{"t": "C"}]}]});

        let tree = Materializer::new(&definition, &transforms)
            .with_max_depth(2)
            .materialize(&document)
            .unwrap()
            .unwrap();
        assert_eq!(tree.node_count(), 3);

        let err = Materializer::new(&definition, &transforms)
            .with_max_depth(1)
            .materialize(&document)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::DepthExceeded { ref node_path, limit: 1, .. } if node_path == "$[0]"
        ));
    }

    #[test]
    fn test_node_path_display() {
        let mut path = NodePath::default();
        assert_eq!(path.to_string(), "$");
        path.push(2);
        path.push(0);
        assert_eq!(path.to_string(), "$[2][0]");
    }
}
