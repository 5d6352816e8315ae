use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::borrow::Borrow;
use std::fmt;

/// Configuration payload of a capability, as it is persisted.
pub type Configuration = Map<String, Value>;

/// Stable identifier of a capability kind.
///
/// Stored configuration is keyed by this id and never by the Rust type name,
/// so a kind can be renamed or moved without touching persisted data.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityId(String);

impl CapabilityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CapabilityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for CapabilityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A configured limitation or feature of a webhosting plan or space.
///
/// Capabilities are immutable value objects. A set holds at most one
/// capability per [`id`](Capability::id).
pub trait Capability: Any + fmt::Debug + Send + Sync {
    /// Stable id of the capability kind.
    fn id(&self) -> &str;

    /// Configuration payload, reconstitutable through the registry.
    fn configuration(&self) -> Configuration;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Capability {
    /// Downcast to a concrete capability kind.
    pub fn downcast_ref<C: CapabilityType>(&self) -> Option<&C> {
        self.as_any().downcast_ref::<C>()
    }

    /// Two capabilities are equivalent when they share an id and configuration.
    pub fn is_equivalent(&self, other: &dyn Capability) -> bool {
        self.id() == other.id() && self.configuration() == other.configuration()
    }
}

/// A concrete capability kind.
///
/// Kinds are plain structs with named fields; their serde representation is
/// the persisted configuration.
pub trait CapabilityType:
    Serialize + DeserializeOwned + fmt::Debug + Clone + PartialEq + Send + Sync + 'static
{
    const ID: &'static str;

    fn capability_id() -> CapabilityId {
        CapabilityId::from(Self::ID)
    }

    /// Rebuild the capability from its configuration payload.
    fn reconstitute(configuration: Configuration) -> Result<Self> {
        serde_json::from_value(Value::Object(configuration)).map_err(|e| {
            Error::InvalidConfiguration {
                id: Self::capability_id(),
                reason: e.to_string(),
            }
        })
    }
}

impl<C: CapabilityType> Capability for C {
    fn id(&self) -> &str {
        C::ID
    }

    fn configuration(&self) -> Configuration {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                tracing::warn!(capability = C::ID, value = %other, "capability does not serialize to an object");
                Configuration::new()
            }
            Err(e) => {
                tracing::warn!(capability = C::ID, error = %e, "failed to serialize capability");
                Configuration::new()
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
