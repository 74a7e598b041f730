//! Schema registry
//!
//! Accumulates resolved, namespace-validated schemas into one addressable
//! set keyed by fully-qualified type name. Insertion order is resolution
//! order and is significant for re-emission. The lifecycle is one-shot:
//! built fresh per resolution run, consumed by `finalize`, never mutated
//! concurrently. Each `register` call fully commits or fully rejects.

use std::collections::HashMap;
use std::path::PathBuf;

use apache_avro::Schema as AvroSchema;
use tracing::debug;

use crate::checksum::Checksum;
use crate::error::{ResolveError, Result};
use crate::namespace::{Namespace, NamespacePolicy};
use crate::schema::{SchemaFile, TypeRef};

/// A registered type: which accepted file defines it, and under what identity.
#[derive(Debug, Clone)]
struct TypeRecord {
    file: usize,
    namespace: Option<Namespace>,
    checksum: Checksum,
}

/// The terminal aggregate of a resolution run.
pub struct SchemaRegistry {
    policy: NamespacePolicy,
    /// Accepted files, in registration order
    files: Vec<SchemaFile>,
    /// Fully-qualified type name -> defining file
    types: HashMap<String, TypeRecord>,
    /// Local type name -> namespace it was first claimed under (collision
    /// detection across distinct namespaces)
    local_names: HashMap<String, Option<Namespace>>,
    /// Namespaces in first-registration order, for bare-name resolution
    namespaces: Vec<Namespace>,
    /// References not yet matched to a registered type, re-checked at finalize
    pending: Vec<(PathBuf, TypeRef, Option<Namespace>)>,
}

impl SchemaRegistry {
    pub fn new(policy: NamespacePolicy) -> Self {
        Self {
            policy,
            files: Vec::new(),
            types: HashMap::new(),
            local_names: HashMap::new(),
            namespaces: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Register one schema file. Validates the namespace against the run's
    /// policy and enforces the duplicate/collision rules; a byte-identical
    /// redefinition is a no-op. All checks run before any state changes, so
    /// a rejected file leaves the registry untouched.
    pub fn register(&mut self, file: SchemaFile) -> Result<()> {
        match &file.namespace {
            Some(ns) => self.policy.check(ns, &file.path)?,
            None => {
                if let NamespacePolicy::Exact(_) = self.policy {
                    return Err(ResolveError::MissingNamespace {
                        path: file.path.clone(),
                    });
                }
            }
        }

        let mut seen_before = false;
        let mut claimed_in_file: HashMap<&str, &Option<Namespace>> = HashMap::new();
        for def in &file.definitions {
            let full = def.full_name();
            if let Some(existing) = self.types.get(&full) {
                if existing.checksum == file.checksum {
                    // Identical bytes re-registering the same name: no-op.
                    seen_before = true;
                    continue;
                }
                return Err(ResolveError::DuplicateTypeDefinition {
                    full_name: full,
                    path: file.path.clone(),
                });
            }
            // A local name may collide with an earlier file, or with another
            // definition in this same file (nested types carry their own
            // explicit namespaces).
            let claimed_under = self
                .local_names
                .get(&def.name)
                .or_else(|| claimed_in_file.get(def.name.as_str()).copied());
            if let Some(claimed_under) = claimed_under {
                if *claimed_under != def.namespace {
                    return Err(ResolveError::NamespaceCollision {
                        type_name: def.name.clone(),
                        existing: namespace_label(claimed_under),
                        conflicting: namespace_label(&def.namespace),
                        path: file.path.clone(),
                    });
                }
            }
            claimed_in_file.insert(def.name.as_str(), &def.namespace);
        }

        if seen_before {
            debug!(path = %file.path.display(), "byte-identical re-registration, no-op");
            return Ok(());
        }

        // Commit point: nothing below fails.
        let file_index = self.files.len();
        for def in &file.definitions {
            self.types.insert(
                def.full_name(),
                TypeRecord {
                    file: file_index,
                    namespace: def.namespace.clone(),
                    checksum: file.checksum.clone(),
                },
            );
            self.local_names
                .insert(def.name.clone(), def.namespace.clone());
            if let Some(ns) = &def.namespace {
                if !self.namespaces.contains(ns) {
                    self.namespaces.push(ns.clone());
                }
            }
        }
        for r in &file.references {
            if self.resolve_ref(r, file.namespace.as_ref()).is_none() {
                self.pending
                    .push((file.path.clone(), r.clone(), file.namespace.clone()));
            }
        }
        debug!(
            path = %file.path.display(),
            types = file.definitions.len(),
            "registered"
        );
        self.files.push(file);
        Ok(())
    }

    /// Look up a registered type by fully-qualified name.
    pub fn lookup(&self, full_name: &str) -> Result<&SchemaFile> {
        self.types
            .get(full_name)
            .map(|rec| &self.files[rec.file])
            .ok_or_else(|| ResolveError::UnknownType {
                full_name: full_name.to_string(),
            })
    }

    /// Resolve a bare type name: the declaring file's namespace first, then
    /// every registered namespace in registration order.
    pub fn resolve_bare(&self, name: &str, declared: Option<&Namespace>) -> Option<String> {
        if let Some(ns) = declared {
            let qualified = format!("{}.{}", ns, name);
            if self.types.contains_key(&qualified) {
                return Some(qualified);
            }
        }
        for ns in &self.namespaces {
            let qualified = format!("{}.{}", ns, name);
            if self.types.contains_key(&qualified) {
                return Some(qualified);
            }
        }
        // No-namespace types register under their bare name.
        if self.types.contains_key(name) {
            return Some(name.to_string());
        }
        None
    }

    fn resolve_ref(&self, r: &TypeRef, declared: Option<&Namespace>) -> Option<String> {
        match r {
            TypeRef::Qualified(full) => self.types.contains_key(full).then(|| full.clone()),
            TypeRef::Bare(name) => self.resolve_bare(name, declared),
        }
    }

    /// Number of accepted files so far.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Close the run. Every reference recorded as pending is re-checked
    /// against the complete type set; anything still unmatched means the
    /// resolver or the level partition let a reference through, and the run
    /// fails with the full list.
    pub fn finalize(self) -> Result<ResolvedSchemas> {
        let unresolved: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, r, declared)| self.resolve_ref(r, declared.as_ref()).is_none())
            .map(|(path, r, _)| format!("{}: {}", path.display(), r.as_written()))
            .collect();
        if !unresolved.is_empty() {
            return Err(ResolveError::UnresolvedReferences {
                references: unresolved,
            });
        }
        Ok(ResolvedSchemas { files: self.files })
    }
}

fn namespace_label(ns: &Option<Namespace>) -> String {
    match ns {
        Some(ns) => ns.to_string(),
        None => "(none)".to_string(),
    }
}

/// The finalized, dependency-ordered schema set.
#[derive(Debug)]
pub struct ResolvedSchemas {
    files: Vec<SchemaFile>,
}

impl ResolvedSchemas {
    /// Load order: dependencies before dependents. Safe to feed directly
    /// into an external schema-registration API.
    pub fn ordered(&self) -> &[SchemaFile] {
        &self.files
    }

    /// Fully-qualified names of every type, in load order.
    pub fn full_names(&self) -> Vec<String> {
        self.files
            .iter()
            .flat_map(|f| f.defined_full_names())
            .collect()
    }

    /// Parse the whole set into avro schemas, in load order. `parse_list`
    /// resolves cross-file references because dependencies come first.
    pub fn parsed(&self) -> Result<Vec<AvroSchema>> {
        let documents: Vec<String> = self
            .files
            .iter()
            .map(|f| serde_json::to_string(&f.raw))
            .collect::<std::result::Result<_, _>>()?;
        let inputs: Vec<&str> = documents.iter().map(String::as_str).collect();
        Ok(AvroSchema::parse_list(&inputs)?)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
