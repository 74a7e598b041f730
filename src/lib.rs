//! avroset — dependency-ordered AVRO schema set resolver
//!
//! Resolves and loads a set of AVRO schema definitions that may be split
//! across multiple files with inter-file dependencies, producing a single,
//! dependency-ordered, namespace-validated schema set ready for downstream
//! serialization use.
//!
//! ## Directory convention
//!
//! ```text
//! schemas/
//! ├── level_1.0/          atomic schemas, no project-type dependencies
//! │   ├── attachment.avsc
//! │   └── envelope.avsc
//! ├── level_2.0/          may reference level-1 types
//! │   └── message.avsc
//! └── level_3.0/          may reference levels 1-2
//!     └── container.avsc
//! ```
//!
//! A root without level subdirectories is handled in free-form mode: files
//! are collected recursively, namespaces are optional, and no leveling rules
//! apply.
//!
//! ## Pipeline
//!
//! Scan → Read (per file) → Resolve order → Validate + Register (in order)
//! → finalize. Single-threaded, read-only, one-shot: each call builds a
//! fresh registry or fails with the first-detected problem.
//!
//! ```no_run
//! use avroset::{resolve, NamespacePolicy, Namespace};
//! use std::path::Path;
//!
//! let policy = NamespacePolicy::Exact(
//!     Namespace::parse("com.dynastyse.emerald.schemas").unwrap(),
//! );
//! let schemas = resolve(Path::new("schemas"), policy).unwrap();
//! for file in schemas.ordered() {
//!     println!("{}", file.path.display());
//! }
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod namespace;
pub mod registry;
pub mod resolve;
pub mod scan;
pub mod schema;

pub use checksum::Checksum;
pub use config::ResolverConfig;
pub use error::{ResolveError, Result};
pub use namespace::{FullName, Namespace, NamespacePolicy};
pub use registry::{ResolvedSchemas, SchemaRegistry};
pub use scan::{Level, ScanOutcome};
pub use schema::{SchemaFile, TypeDef, TypeRef, BUILTIN_TYPES};

use std::path::Path;

use tracing::debug;

/// Resolve a schema root with default configuration.
pub fn resolve(root: &Path, policy: NamespacePolicy) -> Result<ResolvedSchemas> {
    resolve_with(root, policy, &ResolverConfig::default())
}

/// Resolve a schema root: scan, read every file, compute the load order,
/// then validate and register each file in that order. Returns the finalized
/// registry contents, or the first-detected structural problem.
pub fn resolve_with(
    root: &Path,
    policy: NamespacePolicy,
    config: &ResolverConfig,
) -> Result<ResolvedSchemas> {
    let extension = &config.scan.extension;

    let ordered = match scan::scan(root, extension)? {
        ScanOutcome::Flat(paths) => {
            debug!(count = paths.len(), "resolving in free-form mode");
            let files = paths
                .iter()
                .map(|p| SchemaFile::read(p, false))
                .collect::<Result<Vec<_>>>()?;
            resolve::order_unleveled(files)?
        }
        ScanOutcome::Leveled(level_dirs) => {
            debug!(levels = level_dirs.len(), "resolving in leveled mode");
            let levels = level_dirs
                .into_iter()
                .map(|ld| {
                    let files = ld
                        .files
                        .iter()
                        .map(|p| SchemaFile::read(p, true))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Level {
                        number: ld.number,
                        dir: ld.dir,
                        files,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            resolve::order(levels)?
        }
    };

    let mut registry = SchemaRegistry::new(policy);
    for file in ordered {
        registry.register(file)?;
    }
    registry.finalize()
}
