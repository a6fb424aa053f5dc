//! The normalized node tree produced by materialization.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One node of the uniform output tree.
///
/// Each node owns its children; the tree has no sharing and no back
/// references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedNode {
    pub label: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default = "default_content_lines")]
    pub content_lines: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<Value>,

    /// Additional adapter-defined fields, in definition order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NormalizedNode>,
}

fn default_content_lines() -> i64 {
    1
}

impl NormalizedNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            node_type: None,
            icon: None,
            content_lines: default_content_lines(),
            source_location: None,
            extra: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_children(mut self, children: Vec<NormalizedNode>) -> Self {
        self.children = children;
        self
    }

    /// This node and all its descendants, pre-order.
    pub fn descendants(&self) -> Vec<&NormalizedNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.descendants());
        }
        out
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NormalizedNode::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialization_skips_empty_fields() {
        let node = NormalizedNode::new("Document")
            .with_type("Doc")
            .with_children(vec![NormalizedNode::new("para")]);

        let value = serde_json::to_value(&node).unwrap();

        assert_eq!(
            value,
            json!({
                "label": "Document",
                "type": "Doc",
                "content_lines": 1,
                "children": [{"label": "para", "content_lines": 1}]
            })
        );
    }

    #[test]
    fn test_deserialize_defaults() {
        let node: NormalizedNode = serde_json::from_value(json!({"label": "x"})).unwrap();
        assert_eq!(node, NormalizedNode::new("x"));
    }

    #[test]
    fn test_traversal() {
        let tree = NormalizedNode::new("root").with_children(vec![
            NormalizedNode::new("a").with_children(vec![NormalizedNode::new("a1")]),
            NormalizedNode::new("b"),
        ]);

        let labels: Vec<&str> = tree.descendants().iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["root", "a", "a1", "b"]);
        assert_eq!(tree.node_count(), 4);
    }
}
