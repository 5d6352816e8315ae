//! Configuration loading from parkmanager.toml.

use capability::{Capabilities, CapabilityRegistry, Configuration};
use policy::Policy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use storage::PlanId;
use uuid::Uuid;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Permission deciders.
    #[serde(flatten)]
    pub policy: Policy,

    /// Plans created or updated at startup.
    #[serde(default)]
    pub plans: Vec<PlanConfig>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DatabaseConfig {
    /// SQLite database file. Without a path the store lives in memory.
    pub path: Option<PathBuf>,
}

/// A plan seeded from configuration.
///
/// ```toml
/// [[plans]]
/// id = "2b3e1d7a-5c36-4f47-9a0e-7f3c2f4b8d11"
///
/// [plans.capabilities.mailbox_count]
/// limit = 10
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PlanConfig {
    pub id: Uuid,

    /// Capability configurations keyed by capability id.
    #[serde(default)]
    pub capabilities: BTreeMap<String, Configuration>,
}

impl PlanConfig {
    pub fn plan_id(&self) -> PlanId {
        PlanId(self.id)
    }

    /// Resolve the configured capabilities through the registry.
    pub fn resolve(&self, registry: &CapabilityRegistry) -> capability::Result<Capabilities> {
        registry.reconstitute_set(
            self.capabilities
                .iter()
                .map(|(id, configuration)| (id, configuration.clone())),
        )
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// In-memory database, no plans, every permission denied.
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig::default(),
            policy: Policy::restrictive(),
            plans: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
