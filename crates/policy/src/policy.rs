//! Policy configuration.

use crate::{Error, HasRole, IsSpaceOwner, Permission, PermissionDeciders, Result, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Policy configuration loaded from TOML.
///
/// ```toml
/// [permissions."webhosting.space.manage"]
/// deciders = ["is_space_owner"]
///
/// [permissions."webhosting.plan.manage"]
/// deciders = [{ has_role = "admin" }]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    /// Deciders per permission name. Permissions not listed are denied.
    #[serde(default)]
    pub permissions: BTreeMap<String, PermissionRules>,
}

/// Deciders voting on one permission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionRules {
    #[serde(default)]
    pub deciders: Vec<DeciderConfig>,
}

/// A built-in decider, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeciderConfig {
    IsSpaceOwner,
    HasRole(Role),
}

impl Policy {
    /// Load policy from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse policy from TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))
    }

    /// A policy without any permission: every check is denied.
    pub fn restrictive() -> Self {
        Self::default()
    }

    /// Build the configured deciders.
    pub fn deciders(&self) -> Result<PermissionDeciders> {
        let mut deciders = PermissionDeciders::new();

        for (name, rules) in &self.permissions {
            if name.trim().is_empty() {
                return Err(Error::Invalid("permission name must not be empty".to_string()));
            }
            if rules.deciders.is_empty() {
                tracing::warn!(permission = %name, "permission has no deciders and is always denied");
            }

            let permission = Permission::new(name.clone());
            for decider in &rules.deciders {
                match decider {
                    DeciderConfig::IsSpaceOwner => deciders.register(permission.clone(), IsSpaceOwner),
                    DeciderConfig::HasRole(role) => deciders.register(permission.clone(), HasRole(*role)),
                };
            }
        }

        Ok(deciders)
    }
}
