//! Runtime for adapter loading and tree materialization.
//!
//! Loading turns adapter text into a validated [`AdapterDefinition`];
//! materialization walks a source document with it.
//!
//! [`AdapterDefinition`]: crate::definition::AdapterDefinition

pub mod config_loader;
pub mod evaluator;
pub mod overrides;
pub mod materializer;

// Re-export key types
pub use config_loader::{load_document, parse_str, AdapterLoader, Format};
pub use evaluator::Evaluator;
pub use overrides::{resolve_definition, EffectiveRules, Resolution};
pub use materializer::{Materializer, DEFAULT_MAX_DEPTH};
