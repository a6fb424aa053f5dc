//! treenorm CLI - normalize document ASTs with declarative adapters
//!
//! Loads an adapter definition and a source document (JSON or YAML) and
//! prints the normalized node tree as JSON.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use treenorm::Engine;

#[derive(Parser)]
#[command(name = "treenorm")]
#[command(version, about = "Normalize document ASTs into a uniform node tree", long_about = None)]
struct Cli {
    /// Log data-level misses (fallbacks, defaults, failed transforms)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize a document and print the normalized tree as JSON
    Materialize {
        /// Adapter definition (.json, .yaml or .yml)
        #[arg(short, long)]
        adapter: PathBuf,

        /// Source document (.json, .yaml or .yml)
        document: PathBuf,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Deepest allowed nesting of output nodes
        #[arg(long, default_value_t = treenorm::runtime::DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },

    /// Load and validate an adapter definition
    Validate {
        /// Adapter definition (.json, .yaml or .yml)
        #[arg(short, long)]
        adapter: PathBuf,
    },

    /// List the available transforms
    Transforms,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Materialize { adapter, document, pretty, max_depth } => {
            materialize(adapter, document, pretty, max_depth)
        }
        Commands::Validate { adapter } => validate(adapter),
        Commands::Transforms => list_transforms(),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn materialize(adapter: PathBuf, document: PathBuf, pretty: bool, max_depth: usize) -> Result<()> {
    let engine = Engine::new().with_max_depth(max_depth);

    let definition = engine
        .load_adapter_file(&adapter)
        .with_context(|| format!("failed to load adapter {}", adapter.display()))?;
    let source = treenorm::runtime::load_document(&document)
        .with_context(|| format!("failed to load document {}", document.display()))?;

    let tree = engine.materialize_root(&definition, &source)?;

    let output = if pretty {
        serde_json::to_string_pretty(&tree)?
    } else {
        serde_json::to_string(&tree)?
    };
    println!("{}", output);
    Ok(())
}

fn validate(adapter: PathBuf) -> Result<()> {
    let engine = Engine::new();
    let definition = engine
        .load_adapter_file(&adapter)
        .with_context(|| format!("failed to load adapter {}", adapter.display()))?;

    println!("✓ {} is valid", adapter.display());
    println!("  {} type overrides", definition.type_overrides.len());
    println!("  {} ignored types", definition.ignore_types.len());
    Ok(())
}

fn list_transforms() -> Result<()> {
    let engine = Engine::new();
    for name in engine.transforms().list_transforms() {
        println!("{}", name);
    }
    Ok(())
}
