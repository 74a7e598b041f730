//! Error types for schema resolution

use std::path::PathBuf;
use thiserror::Error;

/// Result type for resolution operations
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Terminal errors for a resolution run.
///
/// Every failure aborts the whole `resolve` call; there is no partial or
/// degraded success, and no retry (these are deterministic structural
/// problems in the source tree, not transient conditions). Each variant
/// carries the offending path(s) and values so the source files can be fixed
/// without a debug re-run.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Malformed level directory name {dir:?}: {detail}")]
    MalformedLevelName { dir: PathBuf, detail: String },

    #[error("Schema file {path:?} cannot be parsed: {detail}")]
    UnparsableSchema { path: PathBuf, detail: String },

    #[error("Schema file {path:?} declares no namespace (mandatory in leveled mode)")]
    MissingNamespace { path: PathBuf },

    #[error("Schema file {path:?} defines no named types")]
    EmptyTypeSet { path: PathBuf },

    #[error("Namespace mismatch in {path:?}: expected {expected}, declared {actual}")]
    NamespaceMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error(
        "Namespace collision on type {type_name}: already registered under {existing}, \
         {path:?} claims it under {conflicting}"
    )]
    NamespaceCollision {
        type_name: String,
        existing: String,
        conflicting: String,
        path: PathBuf,
    },

    #[error("Duplicate definition of {full_name}: {path:?} redefines it with different content")]
    DuplicateTypeDefinition { full_name: String, path: PathBuf },

    #[error(
        "Forward level reference: level {from_level} file {path:?} references {type_name}, \
         which is defined at level {to_level}"
    )]
    ForwardLevelReference {
        path: PathBuf,
        type_name: String,
        from_level: u32,
        to_level: u32,
    },

    #[error(
        "Atomic level violation: level-1 file {path:?} references {type_name}, \
         which is not a built-in type"
    )]
    AtomicLevelViolation { path: PathBuf, type_name: String },

    #[error("Cyclic dependency among files: {files:?}")]
    CyclicDependency { files: Vec<PathBuf> },

    #[error("Unknown type: {full_name} is not registered")]
    UnknownType { full_name: String },

    #[error("Unresolved references after registration: {references:?}")]
    UnresolvedReferences { references: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("AVRO parse error: {0}")]
    Avro(#[from] apache_avro::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
