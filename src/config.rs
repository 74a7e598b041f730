//! Configuration for the resolver
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (avroset.toml)
//! - Environment variables (AVROSET_*)
//!
//! ## Example config file (avroset.toml):
//! ```toml
//! [scan]
//! extension = "avsc"
//!
//! [validation]
//! namespace = "com.dynastyse.emerald.schemas"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::namespace::{Namespace, NamespacePolicy};

/// Main resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Scanner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// File extension matched for schema files (without the dot)
    #[serde(default = "default_extension")]
    pub extension: String,
}

/// Validation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Canonical namespace every file must declare. Unset means no
    /// constraint (single-file / free-form mode).
    #[serde(default)]
    pub namespace: Option<String>,
}

fn default_extension() -> String {
    "avsc".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl ResolverConfig {
    /// Load configuration: defaults, then `avroset.toml` if present, then
    /// `AVROSET_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from("avroset.toml")
    }

    /// Load with an explicit config file path.
    pub fn load_from(path: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("AVROSET").separator("__"))
            .build()?;
        let mut loaded: Self = config.try_deserialize()?;
        if loaded.scan.extension.is_empty() {
            loaded.scan.extension = default_extension();
        }
        Ok(loaded)
    }

    /// The namespace policy implied by this configuration.
    pub fn namespace_policy(&self) -> Result<NamespacePolicy> {
        match &self.validation.namespace {
            Some(ns) => Namespace::parse(ns)
                .map(NamespacePolicy::Exact)
                .ok_or_else(|| {
                    ConfigError::Message(format!(
                        "validation.namespace {:?} is not a dotted identifier",
                        ns
                    ))
                    .into()
                }),
            None => Ok(NamespacePolicy::Unconstrained),
        }
    }
}
