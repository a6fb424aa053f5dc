//! Adapter definitions.
//!
//! An adapter describes how to read a normalized node out of one kind of
//! source AST: where the type, label and children live, which transforms to
//! run, and which per-type overrides apply. Definitions are built by
//! [`crate::runtime::config_loader`] and never change afterwards.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::spec::ExtractionSpec;

/// A complete adapter definition.
#[derive(Debug, Clone)]
pub struct AdapterDefinition {
    pub node_type: ExtractionSpec,
    pub label: ExtractionSpec,
    pub children: ExtractionSpec,
    pub icon: ExtractionSpec,
    pub content_lines: ExtractionSpec,
    pub source_location: ExtractionSpec,
    /// Extra output fields, in definition order
    pub extra: IndexMap<String, ExtractionSpec>,
    /// Icon per effective type, used when the icon rule yields nothing
    pub icons: HashMap<String, String>,
    pub type_overrides: HashMap<String, PartialAdapterDefinition>,
    pub ignore_types: HashSet<String>,
}

impl Default for AdapterDefinition {
    /// `label`, `type` and `children` read the fields of the same name;
    /// everything else is empty.
    fn default() -> Self {
        Self {
            node_type: ExtractionSpec::field("type"),
            label: ExtractionSpec::field("label"),
            children: ExtractionSpec::field("children"),
            icon: ExtractionSpec::null(),
            content_lines: ExtractionSpec::literal(1),
            source_location: ExtractionSpec::null(),
            extra: IndexMap::new(),
            icons: HashMap::new(),
            type_overrides: HashMap::new(),
            ignore_types: HashSet::new(),
        }
    }
}

impl AdapterDefinition {
    pub fn is_ignored(&self, node_type: &str) -> bool {
        self.ignore_types.contains(node_type)
    }

    pub fn icon_for(&self, node_type: &str) -> Option<&str> {
        self.icons.get(node_type).map(String::as_str)
    }

    pub fn override_for(&self, node_type: &str) -> Option<&PartialAdapterDefinition> {
        self.type_overrides.get(node_type)
    }
}

/// A per-type patch over the base definition. Absent fields inherit.
#[derive(Debug, Clone, Default)]
pub struct PartialAdapterDefinition {
    pub node_type: Option<ExtractionSpec>,
    pub label: Option<ExtractionSpec>,
    pub children: Option<ExtractionSpec>,
    pub icon: Option<ExtractionSpec>,
    pub content_lines: Option<ExtractionSpec>,
    pub source_location: Option<ExtractionSpec>,
    /// Replaces the whole `extra` mapping when present
    pub extra: Option<IndexMap<String, ExtractionSpec>>,
}

impl PartialAdapterDefinition {
    pub fn is_empty(&self) -> bool {
        self.node_type.is_none()
            && self.label.is_none()
            && self.children.is_none()
            && self.icon.is_none()
            && self.content_lines.is_none()
            && self.source_location.is_none()
            && self.extra.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_definition() {
        let definition = AdapterDefinition::default();

        assert!(matches!(&definition.label, ExtractionSpec::FieldShorthand(p) if p.as_str() == "label"));
        assert!(matches!(&definition.node_type, ExtractionSpec::FieldShorthand(p) if p.as_str() == "type"));
        assert_eq!(definition.content_lines.as_literal(), Some(&json!(1)));
        assert_eq!(definition.icon.as_literal(), Some(&json!(null)));
        assert!(definition.extra.is_empty());
    }

    #[test]
    fn test_lookups() {
        let mut definition = AdapterDefinition::default();
        definition.ignore_types.insert("Space".to_string());
        definition.icons.insert("Para".to_string(), "¶".to_string());
        definition.type_overrides.insert(
            "Header".to_string(),
            PartialAdapterDefinition {
                label: Some(ExtractionSpec::literal("H")),
                ..Default::default()
            },
        );

        assert!(definition.is_ignored("Space"));
        assert!(!definition.is_ignored("Str"));
        assert_eq!(definition.icon_for("Para"), Some("¶"));
        assert!(definition.override_for("Header").is_some_and(|o| !o.is_empty()));
        assert!(definition.override_for("Para").is_none());
        assert!(PartialAdapterDefinition::default().is_empty());
    }
}
