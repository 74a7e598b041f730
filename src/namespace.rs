//! Namespace identity and validation policy
//!
//! The whole crate has exactly one definition of "same namespace": the
//! derived equality on [`Namespace`], which is exact, case-sensitive,
//! full-string comparison. A namespace that is a strict prefix of another
//! (`a.b` vs `a.b.email`) is a different namespace and is never treated as
//! compatible or merged. Reader, validator, and registry all compare through
//! this type so the rule cannot drift between components.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, Result};

/// A dotted-segment namespace identifier (e.g. `com.dynastyse.emerald.schemas`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Build a namespace from a dotted string. Rejects empty strings and
    /// empty segments (leading, trailing, or doubled dots).
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || s.split('.').any(|seg| seg.is_empty()) {
            return None;
        }
        Some(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Qualify a bare type name against this namespace.
    pub fn qualify(&self, name: &str) -> FullName {
        FullName {
            namespace: self.clone(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fully-qualified type name: namespace plus local name. The registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FullName {
    pub namespace: Namespace,
    pub name: String,
}

impl FullName {
    /// Split a dotted fullname at the last dot. Returns None for strings
    /// without a namespace part or with empty segments.
    pub fn parse(s: &str) -> Option<Self> {
        let (ns, name) = s.rsplit_once('.')?;
        if name.is_empty() {
            return None;
        }
        Some(Self {
            namespace: Namespace::parse(ns)?,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// The namespace the caller expects schema files to declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespacePolicy {
    /// Single-file / free-form mode: any non-empty namespace is accepted.
    Unconstrained,
    /// The declared namespace must equal this one exactly. A prefix or
    /// suffix near-miss is a hard mismatch, never a warning.
    Exact(Namespace),
}

impl NamespacePolicy {
    /// Check a file's declared namespace against this policy.
    pub fn check(&self, declared: &Namespace, path: &Path) -> Result<()> {
        match self {
            NamespacePolicy::Unconstrained => Ok(()),
            NamespacePolicy::Exact(expected) => {
                if expected == declared {
                    Ok(())
                } else {
                    Err(ResolveError::NamespaceMismatch {
                        path: path.to_path_buf(),
                        expected: expected.to_string(),
                        actual: declared.to_string(),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(Namespace::parse("").is_none());
        assert!(Namespace::parse(".com").is_none());
        assert!(Namespace::parse("com.").is_none());
        assert!(Namespace::parse("com..x").is_none());
        assert!(Namespace::parse("com.x").is_some());
    }

    #[test]
    fn test_prefix_is_a_different_namespace() {
        let base = Namespace::parse("com.dynastyse.emerald.schemas").unwrap();
        let sub = Namespace::parse("com.dynastyse.emerald.schemas.email").unwrap();
        assert_ne!(base, sub);
    }

    #[test]
    fn test_exact_policy_rejects_prefix_near_miss() {
        let expected = Namespace::parse("com.dynastyse.emerald.schemas").unwrap();
        let declared = Namespace::parse("com.dynastyse.emerald.schemas.email").unwrap();
        let policy = NamespacePolicy::Exact(expected);
        let err = policy.check(&declared, Path::new("x.avsc")).unwrap_err();
        match err {
            ResolveError::NamespaceMismatch { expected, actual, .. } => {
                assert_eq!(expected, "com.dynastyse.emerald.schemas");
                assert_eq!(actual, "com.dynastyse.emerald.schemas.email");
            }
            other => panic!("Expected NamespaceMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_fullname_parse() {
        let fq = FullName::parse("com.x.schemas.Base").unwrap();
        assert_eq!(fq.namespace.as_str(), "com.x.schemas");
        assert_eq!(fq.name, "Base");
        assert_eq!(fq.to_string(), "com.x.schemas.Base");
        assert!(FullName::parse("Base").is_none());
    }
}
