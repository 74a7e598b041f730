//! SchemaFile reader
//!
//! Parses one `.avsc` document, extracting the declared namespace, the set of
//! named types it defines (records, enums, fixed, including nested named
//! types with AVRO namespace inheritance), and the set of type names it
//! references but does not define itself. The raw document is kept opaque;
//! the wire grammar belongs to the downstream avro library.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::checksum::Checksum;
use crate::error::{ResolveError, Result};
use crate::namespace::Namespace;

/// AVRO primitive and unnamed complex type keywords. References to these are
/// never project-type dependencies.
pub const BUILTIN_TYPES: &[&str] = &[
    "null", "boolean", "int", "long", "float", "double", "bytes", "string",
    "record", "enum", "fixed", "error", "array", "map", "union",
];

fn is_builtin(name: &str) -> bool {
    BUILTIN_TYPES.contains(&name)
}

/// A named type defined by a schema file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TypeDef {
    /// Local (unqualified) name
    pub name: String,
    /// Namespace in effect at the definition site, if any
    pub namespace: Option<Namespace>,
}

impl TypeDef {
    /// The registry key for this definition.
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) => ns.qualify(&self.name).to_string(),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// A reference to a type the file does not define itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeRef {
    /// Written with dots: already fully qualified
    Qualified(String),
    /// Bare name: resolved against the declared namespace first, then
    /// against already-registered namespaces
    Bare(String),
}

impl TypeRef {
    /// The name as written in the source document.
    pub fn as_written(&self) -> &str {
        match self {
            TypeRef::Qualified(s) | TypeRef::Bare(s) => s,
        }
    }
}

/// One parsed schema file. Immutable once built.
#[derive(Debug, Clone)]
pub struct SchemaFile {
    pub path: PathBuf,
    /// Top-level declared namespace. None only in free-form (non-leveled) mode.
    pub namespace: Option<Namespace>,
    /// Named types defined by this document, in definition order
    pub definitions: Vec<TypeDef>,
    /// Type names referenced but not defined within this document
    pub references: BTreeSet<TypeRef>,
    /// The opaque structured document
    pub raw: Value,
    /// Checksum over the file bytes, for idempotent re-registration
    pub checksum: Checksum,
}

impl SchemaFile {
    /// Read and parse one schema file. `require_namespace` is set in leveled
    /// mode, where multi-file composition makes the namespace mandatory.
    pub fn read(path: &Path, require_namespace: bool) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let checksum = Checksum::from_bytes(content.as_bytes());

        let raw: Value =
            serde_json::from_str(&content).map_err(|e| ResolveError::UnparsableSchema {
                path: path.to_path_buf(),
                detail: format!("not valid JSON: {}", e),
            })?;

        let declared = match raw.get("namespace") {
            Some(Value::String(ns)) => {
                Some(Namespace::parse(ns).ok_or_else(|| ResolveError::UnparsableSchema {
                    path: path.to_path_buf(),
                    detail: format!("namespace {:?} is not a dotted identifier", ns),
                })?)
            }
            Some(other) => {
                return Err(ResolveError::UnparsableSchema {
                    path: path.to_path_buf(),
                    detail: format!("namespace field is not a string: {}", other),
                })
            }
            None => None,
        };

        if require_namespace && declared.is_none() {
            return Err(ResolveError::MissingNamespace {
                path: path.to_path_buf(),
            });
        }

        let mut definitions = Vec::new();
        let mut raw_refs = Vec::new();
        collect_types(&raw, declared.as_ref(), &mut definitions, &mut raw_refs).map_err(
            |detail| ResolveError::UnparsableSchema {
                path: path.to_path_buf(),
                detail,
            },
        )?;

        if definitions.is_empty() {
            return Err(ResolveError::EmptyTypeSet {
                path: path.to_path_buf(),
            });
        }

        let references = external_references(&raw_refs, &definitions, declared.as_ref());

        debug!(
            path = %path.display(),
            defines = definitions.len(),
            references = references.len(),
            "parsed schema file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            namespace: declared,
            definitions,
            references,
            raw,
            checksum,
        })
    }

    /// Fully-qualified names of everything this file defines.
    pub fn defined_full_names(&self) -> impl Iterator<Item = String> + '_ {
        self.definitions.iter().map(|d| d.full_name())
    }
}

/// Walk a schema value in type position, collecting named definitions and
/// every non-builtin type name used.
fn collect_types(
    value: &Value,
    enclosing: Option<&Namespace>,
    defs: &mut Vec<TypeDef>,
    refs: &mut Vec<String>,
) -> std::result::Result<(), String> {
    match value {
        Value::String(name) => {
            if !is_builtin(name) {
                refs.push(name.clone());
            }
            Ok(())
        }
        // A bare array in type position is a union
        Value::Array(members) => {
            for member in members {
                collect_types(member, enclosing, defs, refs)?;
            }
            Ok(())
        }
        Value::Object(obj) => {
            let type_field = obj.get("type");
            match type_field.and_then(|t| t.as_str()) {
                Some("record") | Some("error") => {
                    let ns = definition_namespace(obj, enclosing, defs)?;
                    let fields = obj
                        .get("fields")
                        .and_then(|f| f.as_array())
                        .ok_or_else(|| "record has no fields array".to_string())?;
                    for field in fields {
                        let field_type = field
                            .get("type")
                            .ok_or_else(|| "record field has no type".to_string())?;
                        collect_types(field_type, ns.as_ref(), defs, refs)?;
                    }
                    Ok(())
                }
                Some("enum") | Some("fixed") => {
                    definition_namespace(obj, enclosing, defs)?;
                    Ok(())
                }
                Some("array") => {
                    let items = obj
                        .get("items")
                        .ok_or_else(|| "array has no items".to_string())?;
                    collect_types(items, enclosing, defs, refs)
                }
                Some("map") => {
                    let values = obj
                        .get("values")
                        .ok_or_else(|| "map has no values".to_string())?;
                    collect_types(values, enclosing, defs, refs)
                }
                // e.g. {"type": "string", "logicalType": "uuid"} or a
                // wrapped reference {"type": "SomeName"}
                Some(other) => {
                    if !is_builtin(other) {
                        refs.push(other.to_string());
                    }
                    Ok(())
                }
                None => match type_field {
                    // {"type": [...]} union or {"type": {...}} nested complex
                    Some(inner) => collect_types(inner, enclosing, defs, refs),
                    None => Err("object in type position has no type field".to_string()),
                },
            }
        }
        other => Err(format!("unexpected value in type position: {}", other)),
    }
}

/// Record a named definition, applying AVRO namespace rules: a dotted name
/// wins over everything; an explicit namespace attribute wins over the
/// enclosing one; otherwise the enclosing namespace is inherited. Returns the
/// namespace in effect for nested definitions.
fn definition_namespace(
    obj: &serde_json::Map<String, Value>,
    enclosing: Option<&Namespace>,
    defs: &mut Vec<TypeDef>,
) -> std::result::Result<Option<Namespace>, String> {
    let name = obj
        .get("name")
        .and_then(|n| n.as_str())
        .ok_or_else(|| "named type has no name".to_string())?;

    let (local, ns) = if let Some((ns_part, local)) = name.rsplit_once('.') {
        let ns = Namespace::parse(ns_part)
            .ok_or_else(|| format!("dotted name {:?} has an invalid namespace part", name))?;
        (local.to_string(), Some(ns))
    } else {
        let ns = match obj.get("namespace").and_then(|n| n.as_str()) {
            Some(explicit) => Some(
                Namespace::parse(explicit)
                    .ok_or_else(|| format!("namespace {:?} is not a dotted identifier", explicit))?,
            ),
            None => enclosing.cloned(),
        };
        (name.to_string(), ns)
    };

    defs.push(TypeDef {
        name: local,
        namespace: ns.clone(),
    });
    Ok(ns)
}

/// Filter the collected raw references down to the ones not satisfied by a
/// definition in the same document.
fn external_references(
    raw_refs: &[String],
    defs: &[TypeDef],
    declared: Option<&Namespace>,
) -> BTreeSet<TypeRef> {
    let mut external = BTreeSet::new();
    for r in raw_refs {
        if r.contains('.') {
            if defs.iter().any(|d| d.full_name() == *r) {
                continue;
            }
            external.insert(TypeRef::Qualified(r.clone()));
        } else {
            // A bare name is internal if a local definition carries it under
            // the declared namespace (or under no namespace at all).
            let internal = defs
                .iter()
                .any(|d| d.name == *r && (d.namespace.as_ref() == declared || d.namespace.is_none()));
            if !internal {
                external.insert(TypeRef::Bare(r.clone()));
            }
        }
    }
    external
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_schema(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_simple_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(
            &dir,
            "base.avsc",
            r#"{
                "type": "record",
                "name": "Base",
                "namespace": "com.x.schemas",
                "fields": [
                    {"name": "id", "type": "string"},
                    {"name": "count", "type": ["null", "long"]}
                ]
            }"#,
        );

        let schema = SchemaFile::read(&path, true).unwrap();
        assert_eq!(schema.namespace.as_ref().unwrap().as_str(), "com.x.schemas");
        assert_eq!(schema.definitions.len(), 1);
        assert_eq!(schema.definitions[0].full_name(), "com.x.schemas.Base");
        assert!(schema.references.is_empty());
    }

    #[test]
    fn test_nested_definitions_inherit_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(
            &dir,
            "outer.avsc",
            r#"{
                "type": "record",
                "name": "Outer",
                "namespace": "com.x.schemas",
                "fields": [
                    {"name": "kind", "type": {"type": "enum", "name": "Kind", "symbols": ["A", "B"]}},
                    {"name": "inner", "type": {
                        "type": "record",
                        "name": "Inner",
                        "fields": [{"name": "v", "type": "int"}]
                    }}
                ]
            }"#,
        );

        let schema = SchemaFile::read(&path, true).unwrap();
        let names: Vec<String> = schema.defined_full_names().collect();
        assert_eq!(
            names,
            vec![
                "com.x.schemas.Outer",
                "com.x.schemas.Kind",
                "com.x.schemas.Inner"
            ]
        );
        // Inner and Kind are defined locally, so nothing is external
        assert!(schema.references.is_empty());
    }

    #[test]
    fn test_external_references_bare_and_qualified() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(
            &dir,
            "derived.avsc",
            r#"{
                "type": "record",
                "name": "Derived",
                "namespace": "com.x.schemas",
                "fields": [
                    {"name": "base", "type": "Base"},
                    {"name": "other", "type": "com.y.Other"},
                    {"name": "bases", "type": {"type": "array", "items": "Base"}}
                ]
            }"#,
        );

        let schema = SchemaFile::read(&path, true).unwrap();
        let refs: Vec<&TypeRef> = schema.references.iter().collect();
        assert_eq!(
            refs,
            vec![
                &TypeRef::Qualified("com.y.Other".to_string()),
                &TypeRef::Bare("Base".to_string())
            ]
        );
    }

    #[test]
    fn test_missing_namespace_in_leveled_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(
            &dir,
            "anon.avsc",
            r#"{"type": "record", "name": "Anon", "fields": [{"name": "v", "type": "int"}]}"#,
        );

        match SchemaFile::read(&path, true).unwrap_err() {
            ResolveError::MissingNamespace { .. } => {}
            other => panic!("Expected MissingNamespace, got {:?}", other),
        }
        // Same file is fine when namespace is not required
        assert!(SchemaFile::read(&path, false).is_ok());
    }

    #[test]
    fn test_unparsable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(&dir, "bad.avsc", "{not json");
        match SchemaFile::read(&path, true).unwrap_err() {
            ResolveError::UnparsableSchema { .. } => {}
            other => panic!("Expected UnparsableSchema, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_type_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(
            &dir,
            "empty.avsc",
            r#"{"type": "array", "items": "string", "namespace": "com.x"}"#,
        );
        match SchemaFile::read(&path, true).unwrap_err() {
            ResolveError::EmptyTypeSet { .. } => {}
            other => panic!("Expected EmptyTypeSet, got {:?}", other),
        }
    }

    #[test]
    fn test_dotted_name_overrides_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(
            &dir,
            "dotted.avsc",
            r#"{
                "type": "record",
                "name": "com.z.Explicit",
                "namespace": "com.x.schemas",
                "fields": [{"name": "v", "type": "string"}]
            }"#,
        );
        let schema = SchemaFile::read(&path, true).unwrap();
        assert_eq!(schema.definitions[0].full_name(), "com.z.Explicit");
    }
}
