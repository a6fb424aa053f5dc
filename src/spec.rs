//! Extraction specs: how one attribute of a normalized node is obtained.
//!
//! `ExtractionSpec` is a closed union; every shape an adapter can use for
//! `label`, `type`, `children` and the rest is one of its variants, and the
//! evaluator handles them with a single exhaustive match. Specs are built by
//! the config loader, which also validates every path, transform and
//! predicate they contain.

use glob::Pattern;
use serde_json::Value;

use crate::error::ConfigError;
use crate::method::MethodSpec;
use crate::path::PathExpression;
use crate::predicate::Predicate;
use crate::template::MapSpec;
use crate::transforms::TransformPipeline;

#[derive(Debug, Clone)]
pub enum ExtractionSpec {
    /// A fixed value, used verbatim.
    Literal(Value),
    /// A bare path string such as `"label"` or `"c[2]"`.
    FieldShorthand(PathExpression),
    Path(PathSpec),
    Collection(CollectionSpec),
    Method(MethodSpec),
    /// Select a node's direct children by type.
    Selector(ChildrenSelector),
}

impl ExtractionSpec {
    pub fn literal(value: impl Into<Value>) -> Self {
        ExtractionSpec::Literal(value.into())
    }

    pub fn null() -> Self {
        ExtractionSpec::Literal(Value::Null)
    }

    pub fn field(name: impl Into<String>) -> Self {
        ExtractionSpec::FieldShorthand(PathExpression::field(name))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, ExtractionSpec::Literal(_))
    }

    /// The literal value, if this spec is one.
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            ExtractionSpec::Literal(value) => Some(value),
            _ => None,
        }
    }
}

/// `{path, fallback, transform, filter, default}`.
#[derive(Debug, Clone)]
pub struct PathSpec {
    pub path: PathExpression,
    pub fallback: Option<PathExpression>,
    pub transform: Option<TransformPipeline>,
    pub filter: Option<Predicate>,
    pub default: Option<Value>,
}

impl PathSpec {
    pub fn new(path: PathExpression) -> Self {
        Self {
            path,
            fallback: None,
            transform: None,
            filter: None,
            default: None,
        }
    }
}

/// `{path, transform, filter, map}`, used for children.
#[derive(Debug, Clone)]
pub struct CollectionSpec {
    pub path: PathExpression,
    pub transform: Option<TransformPipeline>,
    pub filter: Option<Predicate>,
    pub map: Option<MapSpec>,
}

impl CollectionSpec {
    pub fn new(path: PathExpression) -> Self {
        Self {
            path,
            transform: None,
            filter: None,
            map: None,
        }
    }
}

/// Include/exclude glob patterns matched against a child's type.
#[derive(Debug, Clone)]
pub struct ChildrenSelector {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl ChildrenSelector {
    pub fn new(include: &[String], exclude: &[String], field: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            include: compile_patterns(include, &format!("{}.include", field))?,
            exclude: compile_patterns(exclude, &format!("{}.exclude", field))?,
        })
    }

    /// True when `node_type` matches an include pattern and no exclude
    /// pattern. An empty type never matches.
    pub fn matches(&self, node_type: &str) -> bool {
        !node_type.is_empty()
            && self.include.iter().any(|p| p.matches(node_type))
            && !self.exclude.iter().any(|p| p.matches(node_type))
    }
}

fn compile_patterns(patterns: &[String], field: &str) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .enumerate()
        .map(|(i, pattern)| {
            Pattern::new(pattern).map_err(|err| ConfigError::Glob {
                field: format!("{}[{}]", field, i),
                pattern: pattern.clone(),
                message: err.to_string(),
            })
        })
        .collect()
}
