//! Error types for adapter loading and tree materialization.
//!
//! Two tiers exist. Data-level misses (missing fields, wrong shapes, failed
//! transform steps) never show up here: they degrade to defaults inside the
//! evaluator. Everything in this module is a configuration-level problem or
//! an I/O problem at the edges of the engine.

use std::path::PathBuf;

use thiserror::Error;

/// A path expression that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path expression '{path}' at position {position}: {reason}")]
pub struct PathError {
    pub path: String,
    pub position: usize,
    pub reason: String,
}

impl PathError {
    pub(crate) fn new(path: &str, position: usize, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            position,
            reason: reason.into(),
        }
    }
}

/// A structurally invalid adapter definition.
///
/// `field` is the dotted location of the offending entry inside the adapter,
/// e.g. `type_overrides.Header.label.transform[2]`.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("adapter field '{field}': {source}")]
    Path {
        field: String,
        #[source]
        source: PathError,
    },

    #[error("adapter field '{field}': unknown transform '{name}' (available: {available})")]
    UnknownTransform {
        field: String,
        name: String,
        available: String,
    },

    #[error("adapter field '{field}': invalid parameters for transform '{name}': {message}")]
    TransformParams {
        field: String,
        name: String,
        message: String,
    },

    #[error(
        "adapter field '{field}': placeholder '${{{expression}}}' does not start with the declared variable '{variable}'"
    )]
    UndeclaredVariable {
        field: String,
        expression: String,
        variable: String,
    },

    #[error("adapter field '{field}': invalid regular expression '{pattern}': {message}")]
    Regex {
        field: String,
        pattern: String,
        message: String,
    },

    #[error("adapter field '{field}': invalid glob pattern '{pattern}': {message}")]
    Glob {
        field: String,
        pattern: String,
        message: String,
    },

    #[error("adapter field '{field}': {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn path(field: &str, source: PathError) -> Self {
        ConfigError::Path {
            field: field.to_string(),
            source,
        }
    }

    /// The adapter field this error refers to.
    pub fn field(&self) -> &str {
        match self {
            ConfigError::Path { field, .. }
            | ConfigError::UnknownTransform { field, .. }
            | ConfigError::TransformParams { field, .. }
            | ConfigError::UndeclaredVariable { field, .. }
            | ConfigError::Regex { field, .. }
            | ConfigError::Glob { field, .. }
            | ConfigError::Invalid { field, .. } => field,
        }
    }
}

/// Errors surfaced by the engine's public API.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("adapter field '{field}' at node {node_path}: expected a sequence of children, found {found}")]
    NotASequence {
        field: String,
        node_path: String,
        found: String,
    },

    #[error("adapter field '{field}' at node {node_path}: children nested deeper than {limit} levels")]
    DepthExceeded {
        field: String,
        node_path: String,
        limit: usize,
    },

    #[error("root node was ignored: its type '{node_type}' is listed in ignore_types")]
    RootIgnored { node_type: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{path}: could not be decoded as JSON or YAML")]
    UnknownFormat { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, EngineError>;
