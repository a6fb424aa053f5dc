//! Adapter definition loader.
//!
//! Decodes an adapter definition from an already-parsed value (or from JSON
//! or YAML text) and validates it completely: every path is parsed, every
//! transform name and its parameters are checked against the registry,
//! predicates and templates are compiled and method names are resolved.
//! Once this succeeds, materialization can only fail on data that does not
//! fit the configuration, never on the configuration itself.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::definition::{AdapterDefinition, PartialAdapterDefinition};
use crate::error::{ConfigError, EngineError, Result};
use crate::method::{MethodRegistry, MethodSpec};
use crate::path::{has_path_punctuation, PathExpression};
use crate::predicate::Predicate;
use crate::spec::{ChildrenSelector, CollectionSpec, ExtractionSpec, PathSpec};
use crate::template::MapSpec;
use crate::transform_registry::{type_name, Params, TransformError, TransformRegistry};
use crate::transforms::{TransformPipeline, TransformStep};

type ConfigResult<T> = std::result::Result<T, ConfigError>;

const ADAPTER_KEYS: [&str; 11] = [
    "label",
    "type",
    "children",
    "icon",
    "content_lines",
    "source_location",
    "extra",
    "metadata",
    "icons",
    "type_overrides",
    "ignore_types",
];

const OVERRIDE_KEYS: [&str; 8] = [
    "label",
    "type",
    "children",
    "icon",
    "content_lines",
    "source_location",
    "extra",
    "metadata",
];

/// Where a spec appears; this changes how mappings and strings decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Attribute,
    Children,
    /// `type_overrides.<T>.type`: bare strings are type names
    TypeRewrite,
}

/// Text formats an adapter or document can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }
}

/// Parse JSON or YAML text into a value.
pub fn parse_str(text: &str, format: Format) -> Result<Value> {
    match format {
        Format::Json => Ok(serde_json::from_str(text)?),
        Format::Yaml => Ok(serde_yaml::from_str(text)?),
    }
}

/// Read a JSON or YAML file into a value.
///
/// The format is chosen by extension; other extensions are tried as JSON
/// first and then as YAML.
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<Value> {
    let path = path.as_ref();

    let contents = fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match Format::from_path(path) {
        Some(format) => parse_str(&contents, format),
        None => parse_str(&contents, Format::Json)
            .or_else(|_| parse_str(&contents, Format::Yaml))
            .map_err(|_| EngineError::UnknownFormat {
                path: path.to_path_buf(),
            }),
    }
}

/// Decodes adapter definitions against a transform vocabulary and a set of
/// node methods.
pub struct AdapterLoader<'a> {
    transforms: &'a TransformRegistry,
    methods: &'a MethodRegistry,
}

impl<'a> AdapterLoader<'a> {
    pub fn new(transforms: &'a TransformRegistry, methods: &'a MethodRegistry) -> Self {
        Self { transforms, methods }
    }

    /// Load an adapter definition from a JSON or YAML file.
    ///
    /// # Example
    /// ```ignore
    /// use treenorm::runtime::AdapterLoader;
    ///
    /// let loader = AdapterLoader::new(&transforms, &methods);
    /// let adapter = loader.load_from_file("adapters/pandoc.yaml")?;
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<AdapterDefinition> {
        let path = path.as_ref();
        let value = load_document(path)?;
        debug!(path = %path.display(), "loaded adapter file");
        Ok(self.decode_value(&value)?)
    }

    pub fn decode_json(&self, text: &str) -> Result<AdapterDefinition> {
        let value = parse_str(text, Format::Json)?;
        Ok(self.decode_value(&value)?)
    }

    pub fn decode_yaml(&self, text: &str) -> Result<AdapterDefinition> {
        let value = parse_str(text, Format::Yaml)?;
        Ok(self.decode_value(&value)?)
    }

    /// Decode and validate an adapter definition. Omitted fields take the
    /// defaults of [`AdapterDefinition::default`].
    pub fn decode_value(&self, value: &Value) -> ConfigResult<AdapterDefinition> {
        let map = expect_object(value, "adapter")?;
        reject_unknown_keys(map, &ADAPTER_KEYS, "adapter")?;

        let mut definition = AdapterDefinition::default();

        if let Some(spec) = map.get("type") {
            definition.node_type = self.decode_spec(spec, "type", Position::Attribute)?;
        }
        if let Some(spec) = map.get("label") {
            definition.label = self.decode_spec(spec, "label", Position::Attribute)?;
        }
        if let Some(spec) = map.get("children") {
            definition.children = self.decode_spec(spec, "children", Position::Children)?;
        }
        if let Some(spec) = map.get("icon") {
            definition.icon = self.decode_spec(spec, "icon", Position::Attribute)?;
        }
        if let Some(spec) = map.get("content_lines") {
            definition.content_lines = self.decode_spec(spec, "content_lines", Position::Attribute)?;
        }
        if let Some(spec) = map.get("source_location") {
            definition.source_location =
                self.decode_spec(spec, "source_location", Position::Attribute)?;
        }
        if let Some((key, extra)) = extra_entry(map, "adapter")? {
            definition.extra = self.decode_extra(extra, key)?;
        }
        if let Some(icons) = map.get("icons") {
            definition.icons = decode_icons(icons)?;
        }
        if let Some(ignore) = map.get("ignore_types") {
            definition.ignore_types = decode_ignore_types(ignore)?;
        }
        if let Some(overrides) = map.get("type_overrides") {
            definition.type_overrides = self.decode_overrides(overrides)?;
            warn_on_rewrite_chains(&definition.type_overrides);
        }

        debug!(
            overrides = definition.type_overrides.len(),
            ignored = definition.ignore_types.len(),
            "adapter definition validated"
        );
        Ok(definition)
    }

    fn decode_overrides(
        &self,
        value: &Value,
    ) -> ConfigResult<HashMap<String, PartialAdapterDefinition>> {
        let map = expect_object(value, "type_overrides")?;
        let mut overrides = HashMap::with_capacity(map.len());
        for (node_type, value) in map {
            let field = format!("type_overrides.{}", node_type);
            let patch = self.decode_override(value, &field)?;
            if patch.is_empty() {
                debug!(field, "override sets no fields; base rules apply");
                continue;
            }
            overrides.insert(node_type.clone(), patch);
        }
        Ok(overrides)
    }

    fn decode_override(
        &self,
        value: &Value,
        field: &str,
    ) -> ConfigResult<PartialAdapterDefinition> {
        let map = expect_object(value, field)?;
        reject_unknown_keys(map, &OVERRIDE_KEYS, field)?;

        let spec = |key: &str, position: Position| {
            map.get(key)
                .map(|v| self.decode_spec(v, &format!("{}.{}", field, key), position))
                .transpose()
        };

        let extra = match extra_entry(map, field)? {
            Some((key, extra)) => Some(self.decode_extra(extra, &format!("{}.{}", field, key))?),
            None => None,
        };

        Ok(PartialAdapterDefinition {
            node_type: spec("type", Position::TypeRewrite)?,
            label: spec("label", Position::Attribute)?,
            children: spec("children", Position::Children)?,
            icon: spec("icon", Position::Attribute)?,
            content_lines: spec("content_lines", Position::Attribute)?,
            source_location: spec("source_location", Position::Attribute)?,
            extra,
        })
    }

    fn decode_extra(
        &self,
        value: &Value,
        field: &str,
    ) -> ConfigResult<IndexMap<String, ExtractionSpec>> {
        let map = expect_object(value, field)?;
        map.iter()
            .map(|(name, spec)| {
                let spec = self.decode_spec(spec, &format!("{}.{}", field, name), Position::Attribute)?;
                Ok((name.clone(), spec))
            })
            .collect()
    }

    fn decode_spec(
        &self,
        value: &Value,
        field: &str,
        position: Position,
    ) -> ConfigResult<ExtractionSpec> {
        match value {
            Value::String(s) => decode_string_spec(s, field, position),
            Value::Object(map) => self.decode_mapping_spec(map, field, position),
            other => Ok(ExtractionSpec::Literal(other.clone())),
        }
    }

    fn decode_mapping_spec(
        &self,
        map: &Map<String, Value>,
        field: &str,
        position: Position,
    ) -> ConfigResult<ExtractionSpec> {
        if let Some(literal) = map.get("literal") {
            reject_unknown_keys(map, &["literal"], field)?;
            return Ok(ExtractionSpec::Literal(literal.clone()));
        }

        if let Some(name) = map.get("method") {
            reject_unknown_keys(map, &["method"], field)?;
            let name = name
                .as_str()
                .ok_or_else(|| ConfigError::invalid(field, "'method' must be a string"))?;
            let method = MethodSpec::resolve(name, self.methods);
            if !method.is_resolved() {
                warn!(field, method = name, "node method is not registered; it will evaluate as missing");
            }
            return Ok(ExtractionSpec::Method(method));
        }

        let is_selector = map.contains_key("include") || map.contains_key("exclude");
        if position == Position::Children && is_selector && !map.contains_key("path") {
            reject_unknown_keys(map, &["include", "exclude"], field)?;
            let include = match map.get("include") {
                Some(value) => string_list(value, &format!("{}.include", field))?,
                None => vec!["*".to_string()],
            };
            let exclude = match map.get("exclude") {
                Some(value) => string_list(value, &format!("{}.exclude", field))?,
                None => Vec::new(),
            };
            return Ok(ExtractionSpec::Selector(ChildrenSelector::new(&include, &exclude, field)?));
        }

        if position == Position::Children || map.contains_key("map") {
            for key in ["fallback", "default"] {
                if map.contains_key(key) {
                    return Err(ConfigError::invalid(
                        field,
                        format!("'{}' is not supported on collection specs", key),
                    ));
                }
            }
            reject_unknown_keys(map, &["path", "transform", "filter", "map"], field)?;

            let mut spec = CollectionSpec::new(self.required_path(map, field)?);
            spec.transform = self.optional_pipeline(map, field)?;
            spec.filter = optional_predicate(map, field)?;
            spec.map = map
                .get("map")
                .map(|m| MapSpec::compile(m, &format!("{}.map", field)))
                .transpose()?;
            return Ok(ExtractionSpec::Collection(spec));
        }

        if map.contains_key("path") {
            reject_unknown_keys(map, &["path", "fallback", "transform", "filter", "default"], field)?;

            let mut spec = PathSpec::new(self.required_path(map, field)?);
            spec.fallback = map
                .get("fallback")
                .map(|v| parse_path_value(v, &format!("{}.fallback", field)))
                .transpose()?;
            spec.transform = self.optional_pipeline(map, field)?;
            spec.filter = optional_predicate(map, field)?;
            spec.default = map.get("default").cloned();
            return Ok(ExtractionSpec::Path(spec));
        }

        Err(ConfigError::invalid(
            field,
            "expected a mapping with 'path', 'literal' or 'method'",
        ))
    }

    fn required_path(
        &self,
        map: &Map<String, Value>,
        field: &str,
    ) -> ConfigResult<PathExpression> {
        let value = map
            .get("path")
            .ok_or_else(|| ConfigError::invalid(field, "missing 'path'"))?;
        parse_path_value(value, &format!("{}.path", field))
    }

    fn optional_pipeline(
        &self,
        map: &Map<String, Value>,
        field: &str,
    ) -> ConfigResult<Option<TransformPipeline>> {
        map.get("transform")
            .map(|v| self.decode_pipeline(v, &format!("{}.transform", field)))
            .transpose()
    }

    /// A pipeline is a single step or a list of steps. A step is a bare
    /// name or `{name: ..., <params>}`; params that clash with `name` can be
    /// nested under `params`.
    fn decode_pipeline(
        &self,
        value: &Value,
        field: &str,
    ) -> ConfigResult<TransformPipeline> {
        let steps = match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.decode_step(item, &format!("{}[{}]", field, i)))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            single => vec![self.decode_step(single, field)?],
        };
        Ok(TransformPipeline::new(steps))
    }

    fn decode_step(&self, value: &Value, field: &str) -> ConfigResult<TransformStep> {
        let step = match value {
            Value::String(name) => TransformStep::named(name.clone()),
            Value::Object(map) => {
                let name = map
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ConfigError::invalid(field, "transform step needs a string 'name'"))?;

                let params: Params = match map.get("params") {
                    Some(Value::Object(nested)) if map.len() == 2 => {
                        nested.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
                    }
                    _ => map
                        .iter()
                        .filter(|(k, _)| k.as_str() != "name")
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                };
                TransformStep::new(name, params)
            }
            other => {
                return Err(ConfigError::invalid(
                    field,
                    format!("transform step must be a name or a mapping, got {}", type_name(other)),
                ))
            }
        };

        self.transforms
            .validate_step(&step)
            .map_err(|err| match err {
                TransformError::NotFound(name) => ConfigError::UnknownTransform {
                    field: field.to_string(),
                    name,
                    available: self.transforms.list_transforms().join(", "),
                },
                other => ConfigError::TransformParams {
                    field: field.to_string(),
                    name: step.name.clone(),
                    message: other.to_string(),
                },
            })?;
        Ok(step)
    }
}

fn decode_string_spec(s: &str, field: &str, position: Position) -> ConfigResult<ExtractionSpec> {
    if position == Position::TypeRewrite || s.is_empty() {
        return Ok(ExtractionSpec::literal(s));
    }
    match PathExpression::parse(s) {
        Ok(path) => Ok(ExtractionSpec::FieldShorthand(path)),
        Err(err) if has_path_punctuation(s) => Err(ConfigError::path(field, err)),
        Err(_) => {
            debug!(field, value = s, "not a path expression; using it as a literal");
            Ok(ExtractionSpec::literal(s))
        }
    }
}

fn parse_path_value(value: &Value, field: &str) -> ConfigResult<PathExpression> {
    let raw = value
        .as_str()
        .ok_or_else(|| ConfigError::invalid(field, format!("expected a path string, got {}", type_name(value))))?;
    PathExpression::parse(raw).map_err(|err| ConfigError::path(field, err))
}

fn optional_predicate(
    map: &Map<String, Value>,
    field: &str,
) -> ConfigResult<Option<Predicate>> {
    map.get("filter")
        .map(|v| Predicate::compile(v, &format!("{}.filter", field)))
        .transpose()
}

/// `extra` and its older spelling `metadata`; at most one may be given.
fn extra_entry<'v>(
    map: &'v Map<String, Value>,
    field: &str,
) -> ConfigResult<Option<(&'static str, &'v Value)>> {
    match (map.get("extra"), map.get("metadata")) {
        (Some(_), Some(_)) => Err(ConfigError::invalid(field, "use either 'extra' or 'metadata', not both")),
        (Some(extra), None) => Ok(Some(("extra", extra))),
        (None, Some(metadata)) => Ok(Some(("metadata", metadata))),
        (None, None) => Ok(None),
    }
}

fn decode_icons(value: &Value) -> ConfigResult<HashMap<String, String>> {
    let map = expect_object(value, "icons")?;
    map.iter()
        .map(|(node_type, icon)| match icon {
            Value::String(glyph) => Ok((node_type.clone(), glyph.clone())),
            other => Err(ConfigError::invalid(
                &format!("icons.{}", node_type),
                format!("icon must be a string, got {}", type_name(other)),
            )),
        })
        .collect()
}

fn decode_ignore_types(value: &Value) -> ConfigResult<HashSet<String>> {
    Ok(string_list(value, "ignore_types")?.into_iter().collect())
}

fn string_list(value: &Value, field: &str) -> ConfigResult<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| ConfigError::invalid(field, format!("expected a list of strings, got {}", type_name(value))))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ConfigError::invalid(&format!("{}[{}]", field, i), "expected a string"))
        })
        .collect()
}

fn expect_object<'v>(value: &'v Value, field: &str) -> ConfigResult<&'v Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ConfigError::invalid(field, format!("expected a mapping, got {}", type_name(value))))
}

fn reject_unknown_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    field: &str,
) -> ConfigResult<()> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(ConfigError::invalid(
            field,
            format!("unexpected key '{}' (expected one of: {})", key, allowed.join(", ")),
        )),
        None => Ok(()),
    }
}

/// Only one level of type rewrite is followed; say so when an adapter
/// relies on more.
fn warn_on_rewrite_chains(overrides: &HashMap<String, PartialAdapterDefinition>) {
    for (from, patch) in overrides {
        let Some(to) = patch
            .node_type
            .as_ref()
            .and_then(ExtractionSpec::as_literal)
            .and_then(Value::as_str)
        else {
            continue;
        };
        if to == from {
            continue;
        }
        if overrides.get(to).is_some_and(|next| next.node_type.is_some()) {
            warn!(
                from = %from,
                to = %to,
                "type rewrite leads to another rewrite; only the first one is followed"
            );
        }
    }
}
