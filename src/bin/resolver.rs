//! Schema Resolver CLI
//!
//! Resolves a leveled AVRO schema tree and prints the load order.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use avroset::{Namespace, NamespacePolicy, ResolverConfig};

#[derive(Parser)]
#[command(name = "avroset-resolver")]
#[command(about = "Resolve a leveled AVRO schema tree into load order")]
struct Cli {
    /// Root directory of the schema tree
    root: PathBuf,

    /// Canonical namespace every file must declare (exact match)
    #[arg(short, long)]
    namespace: Option<String>,

    /// Config file path (default: avroset.toml next to the working directory)
    #[arg(short, long)]
    config: Option<String>,

    /// Also parse the resolved set with the avro library
    #[arg(long)]
    parse: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => ResolverConfig::load_from(path)?,
        None => ResolverConfig::load()?,
    };

    // The command line overrides the configured namespace.
    let policy = match &cli.namespace {
        Some(ns) => NamespacePolicy::Exact(
            Namespace::parse(ns)
                .ok_or_else(|| format!("{:?} is not a dotted namespace", ns))?,
        ),
        None => config.namespace_policy()?,
    };

    let resolved = avroset::resolve_with(&cli.root, policy, &config)?;

    println!("Resolved {} schema file(s):", resolved.len());
    for file in resolved.ordered() {
        let names: Vec<String> = file.defined_full_names().collect();
        println!("  {} -> {}", file.path.display(), names.join(", "));
    }

    if cli.parse {
        let schemas = resolved.parsed()?;
        println!("Parsed {} avro schema(s)", schemas.len());
    }

    Ok(())
}
