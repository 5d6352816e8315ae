//! Capability registry.

use crate::{Capabilities, Capability, CapabilityId, CapabilityType, Configuration, Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Constructor = Box<dyn Fn(Configuration) -> Result<Arc<dyn Capability>> + Send + Sync>;

/// Maps capability ids to constructors.
///
/// The registry is built once at startup and handed to whatever needs to
/// turn persisted payloads back into typed capabilities.
#[derive(Default)]
pub struct CapabilityRegistry {
    constructors: HashMap<CapabilityId, Constructor>,
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in capability kinds.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::builtin::register_kinds(&mut registry);
        registry
    }

    /// Register a typed capability kind under its [`CapabilityType::ID`].
    pub fn register<C: CapabilityType>(&mut self) -> Result<&mut Self> {
        self.register_with(C::ID, |configuration| {
            C::reconstitute(configuration).map(|c| Arc::new(c) as Arc<dyn Capability>)
        })
    }

    /// Register a constructor for an id.
    ///
    /// The constructor must produce capabilities reporting the same id.
    pub fn register_with<F>(&mut self, id: impl Into<CapabilityId>, constructor: F) -> Result<&mut Self>
    where
        F: Fn(Configuration) -> Result<Arc<dyn Capability>> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.constructors.contains_key(&id) {
            return Err(Error::AlreadyRegistered { id });
        }
        tracing::debug!(capability = %id, "registered capability");
        self.constructors.insert(id, Box::new(constructor));
        Ok(self)
    }

    pub(crate) fn insert<C: CapabilityType>(&mut self) {
        self.constructors.insert(
            C::capability_id(),
            Box::new(|configuration| {
                C::reconstitute(configuration).map(|c| Arc::new(c) as Arc<dyn Capability>)
            }),
        );
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.constructors.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&CapabilityId> {
        let mut ids: Vec<_> = self.constructors.keys().collect();
        ids.sort();
        ids
    }

    /// Resolve a configuration payload into a capability.
    pub fn resolve(&self, id: &str, configuration: Configuration) -> Result<Arc<dyn Capability>> {
        let Some(constructor) = self.constructors.get(id) else {
            tracing::warn!(capability = id, "capability id is not registered");
            return Err(Error::NotRegistered { id: id.into() });
        };

        let capability = constructor(configuration)?;
        if capability.id() != id {
            return Err(Error::InvalidConfiguration {
                id: id.into(),
                reason: format!("constructor produced capability '{}'", capability.id()),
            });
        }
        Ok(capability)
    }

    /// Rebuild a capability set from `(id, configuration)` payloads.
    ///
    /// A later payload for the same id replaces an earlier one.
    pub fn reconstitute_set<I, K>(&self, payloads: I) -> Result<Capabilities>
    where
        I: IntoIterator<Item = (K, Configuration)>,
        K: AsRef<str>,
    {
        payloads
            .into_iter()
            .map(|(id, configuration)| self.resolve(id.as_ref(), configuration))
            .collect()
    }

    /// Rebuild a capability set from its persisted JSON object form.
    pub fn reconstitute_value(&self, value: Value) -> Result<Capabilities> {
        let Value::Object(entries) = value else {
            return Err(Error::InvalidConfiguration {
                id: CapabilityId::from("*"),
                reason: "capability set must be a JSON object".to_string(),
            });
        };

        let mut payloads = Vec::with_capacity(entries.len());
        for (id, configuration) in entries {
            match configuration {
                Value::Object(configuration) => payloads.push((id, configuration)),
                other => {
                    return Err(Error::InvalidConfiguration {
                        id: id.into(),
                        reason: format!("expected an object, found {other}"),
                    });
                }
            }
        }
        self.reconstitute_set(payloads)
    }

    /// Parse and rebuild a capability set from a JSON string.
    pub fn reconstitute_json(&self, json: &str) -> Result<Capabilities> {
        self.reconstitute_value(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FtpUserCount, MailboxCount, StorageSpaceQuota};
    use serde_json::json;

    fn config(value: Value) -> Configuration {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_resolve_builtin() {
        let registry = CapabilityRegistry::with_builtin();
        let capability = registry
            .resolve("storage_space_quota", config(json!({ "limit_bytes": 42 })))
            .unwrap();

        assert_eq!(
            capability.downcast_ref::<StorageSpaceQuota>(),
            Some(&StorageSpaceQuota { limit_bytes: 42 })
        );
    }

    #[test]
    fn test_resolve_unknown_id() {
        let registry = CapabilityRegistry::new();
        let err = registry.resolve("nope", Configuration::new()).unwrap_err();
        assert!(matches!(err, Error::NotRegistered { id } if id.as_str() == "nope"));
    }

    #[test]
    fn test_register_twice_fails() {
        let mut registry = CapabilityRegistry::new();
        registry.register::<MailboxCount>().unwrap();
        let err = registry.register::<MailboxCount>().unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered { .. }));
    }

    #[test]
    fn test_register_with_constructor() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_with("mailbox_count", |configuration| {
                let capability = MailboxCount::reconstitute(configuration)?;
                Ok(Arc::new(capability) as Arc<dyn Capability>)
            })
            .unwrap();

        let capability = registry
            .resolve("mailbox_count", config(json!({ "limit": 2 })))
            .unwrap();
        assert_eq!(capability.downcast_ref::<MailboxCount>(), Some(&MailboxCount { limit: Some(2) }));
    }

    #[test]
    fn test_register_with_mismatched_id() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_with("ftp_accounts", |configuration| {
                let capability = FtpUserCount::reconstitute(configuration)?;
                Ok(Arc::new(capability) as Arc<dyn Capability>)
            })
            .unwrap();

        let err = registry
            .resolve("ftp_accounts", config(json!({ "limit": 2 })))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_reconstitute_json() {
        let registry = CapabilityRegistry::with_builtin();
        let set = registry
            .reconstitute_json(r#"{"mailbox_count":{"limit":10},"ftp_user_count":{"limit":null}}"#)
            .unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get::<MailboxCount>(), Some(&MailboxCount { limit: Some(10) }));
        assert_eq!(set.get::<FtpUserCount>(), Some(&FtpUserCount { limit: None }));
    }

    #[test]
    fn test_reconstitute_value_rejects_non_object() {
        let registry = CapabilityRegistry::with_builtin();
        assert!(registry.reconstitute_value(json!([1, 2])).is_err());
        assert!(registry.reconstitute_value(json!({ "mailbox_count": 3 })).is_err());
    }

    #[test]
    fn test_ids_sorted() {
        let registry = CapabilityRegistry::with_builtin();
        let ids: Vec<_> = registry.ids().into_iter().map(|id| id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["ftp_user_count", "mailbox_count", "monthly_traffic_quota", "storage_space_quota"]
        );
    }

    #[test]
    fn test_unknown_configuration_keys_rejected() {
        let registry = CapabilityRegistry::with_builtin();

        let typo = registry
            .resolve("mailbox_count", config(json!({ "limt": 10 })))
            .unwrap_err();
        assert!(matches!(typo, Error::InvalidConfiguration { id, .. } if id.as_str() == "mailbox_count"));

        let extra = registry
            .resolve("storage_space_quota", config(json!({ "limit_bytes": 5, "extra": 1 })))
            .unwrap_err();
        assert!(matches!(extra, Error::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_count_limit_must_be_explicit() {
        let registry = CapabilityRegistry::with_builtin();

        let missing = registry
            .resolve("ftp_user_count", Configuration::new())
            .unwrap_err();
        assert!(matches!(missing, Error::InvalidConfiguration { .. }));

        let unlimited = registry
            .resolve("ftp_user_count", config(json!({ "limit": null })))
            .unwrap();
        assert_eq!(unlimited.downcast_ref::<FtpUserCount>(), Some(&FtpUserCount { limit: None }));
        assert_eq!(Value::Object(unlimited.configuration()), json!({ "limit": null }));
    }

    #[test]
    fn test_is_registered() {
        let mut registry = CapabilityRegistry::new();
        assert!(!registry.is_registered("mailbox_count"));

        registry.register::<MailboxCount>().unwrap();
        assert!(registry.is_registered("mailbox_count"));
        assert!(!registry.is_registered("ftp_user_count"));
        assert!(CapabilityRegistry::with_builtin().is_registered("storage_space_quota"));
    }
}
