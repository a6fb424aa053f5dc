//! Type override resolution.
//!
//! A node's type is resolved first, with the base `type` rule. If the
//! adapter has an override for that type, its fields replace the base
//! rules. An override may also rewrite the type; in that case the rewritten
//! type's own override (if any) is merged on top, once. A rewrite found in
//! that second override is not followed.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::definition::{AdapterDefinition, PartialAdapterDefinition};
use crate::runtime::evaluator::Evaluator;
use crate::spec::ExtractionSpec;

/// The rules that apply to one node after overrides are merged.
#[derive(Debug, Clone)]
pub struct EffectiveRules<'a> {
    pub label: &'a ExtractionSpec,
    pub children: &'a ExtractionSpec,
    pub icon: &'a ExtractionSpec,
    pub content_lines: &'a ExtractionSpec,
    pub source_location: &'a ExtractionSpec,
    pub extra: &'a IndexMap<String, ExtractionSpec>,
    /// Adapter field the `children` rule came from
    pub children_field: String,
}

impl<'a> EffectiveRules<'a> {
    pub fn base(definition: &'a AdapterDefinition) -> Self {
        Self {
            label: &definition.label,
            children: &definition.children,
            icon: &definition.icon,
            content_lines: &definition.content_lines,
            source_location: &definition.source_location,
            extra: &definition.extra,
            children_field: "children".to_string(),
        }
    }

    /// Replace every rule the override sets. `type` is not handled here.
    fn merge(&mut self, patch: &'a PartialAdapterDefinition, node_type: &str) {
        if let Some(label) = &patch.label {
            self.label = label;
        }
        if let Some(children) = &patch.children {
            self.children = children;
            self.children_field = format!("type_overrides.{}.children", node_type);
        }
        if let Some(icon) = &patch.icon {
            self.icon = icon;
        }
        if let Some(content_lines) = &patch.content_lines {
            self.content_lines = content_lines;
        }
        if let Some(source_location) = &patch.source_location {
            self.source_location = source_location;
        }
        if let Some(extra) = &patch.extra {
            self.extra = extra;
        }
    }
}

/// A node's effective type and rules.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    pub node_type: Option<String>,
    pub rules: EffectiveRules<'a>,
}

/// Resolve the effective type of `node` and the rules that apply to it.
pub fn resolve_definition<'a>(
    definition: &'a AdapterDefinition,
    evaluator: &Evaluator<'_>,
    node: &Value,
) -> Resolution<'a> {
    let mut rules = EffectiveRules::base(definition);
    let candidate = evaluator.type_name(&definition.node_type, node);

    let Some(candidate) = candidate else {
        return Resolution { node_type: None, rules };
    };
    let Some(patch) = definition.override_for(&candidate) else {
        return Resolution {
            node_type: Some(candidate),
            rules,
        };
    };

    rules.merge(patch, &candidate);

    let rewritten = patch
        .node_type
        .as_ref()
        .and_then(|spec| evaluator.type_name(spec, node));

    let node_type = match rewritten {
        Some(rewritten) if rewritten != candidate => {
            trace!(from = %candidate, to = %rewritten, "type rewritten by override");
            if let Some(second) = definition.override_for(&rewritten) {
                rules.merge(second, &rewritten);
            }
            rewritten
        }
        _ => candidate,
    };

    Resolution {
        node_type: Some(node_type),
        rules,
    }
}
