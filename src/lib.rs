//! # Treenorm: Declarative AST Normalization
//!
//! Treenorm turns already-parsed document ASTs (Pandoc JSON, mdast, wiki
//! markup, generic syntax trees) into one uniform tree of
//! [`NormalizedNode`]s. How a given AST is read is described by an adapter
//! definition: where each node keeps its type, label and children, which
//! transforms to run on extracted values, and per-type overrides.
//!
//! ## Features
//!
//! - **Path expressions**: `c[2][0]`, `meta.title`, `['pandoc-api-version']`
//! - **Transform pipelines**: a fixed vocabulary of pure, named operations
//! - **Type overrides**: per-type patches, including rewriting the type itself
//! - **Collection mapping**: synthesize child nodes from raw sequences with templates
//! - **Total evaluation**: missing data degrades to fallbacks and defaults
//!
//! ## Example: Pandoc adapter
//!
//! ```yaml
//! type: t
//! label:
//!   path: c
//!   transform:
//!     - {name: filter, t: Str}
//!     - {name: extract, field: c}
//!     - {name: join, separator: " "}
//! children: c
//! ignore_types: [Space, SoftBreak]
//! type_overrides:
//!   Header:
//!     label:
//!       path: "c[2]"
//!       transform:
//!         - {name: filter, t: Str}
//!         - {name: extract, field: c}
//!         - {name: join, separator: " "}
//!       default: Header
//!     children: "c[2]"
//!     extra:
//!       level: "c[0]"
//! ```
//!
//! Source trees must be acyclic; `serde_json::Value` guarantees this, and
//! materialization recurses once per level of the document.

// Core modules
pub mod error;
pub mod path;
pub mod transform_registry;
pub mod transforms;
pub mod predicate;
pub mod template;
pub mod method;
pub mod spec;
pub mod node;
pub mod definition;

// Loading and materialization
pub mod runtime;
pub mod engine;

// Re-export key types
pub use definition::{AdapterDefinition, PartialAdapterDefinition};
pub use engine::Engine;
pub use error::{ConfigError, EngineError, PathError, Result};
pub use method::{MethodRegistry, NodeMethod};
pub use node::NormalizedNode;
pub use path::PathExpression;
pub use spec::ExtractionSpec;
pub use transform_registry::{TransformError, TransformRegistry};
pub use transforms::{TransformPipeline, TransformStep};

// Re-export runtime types
pub use runtime::{AdapterLoader, Evaluator, Materializer};
