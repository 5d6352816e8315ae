//! Immutable capability sets.

use crate::{Capability, CapabilityId, CapabilityType, Configuration, Error, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A set of capabilities holding at most one entry per capability id.
///
/// Sets are never mutated in place: [`with`](Capabilities::with) and
/// [`without`](Capabilities::without) return a new set. Entries are shared,
/// so deriving a set is cheap.
#[derive(Clone, Default)]
pub struct Capabilities {
    entries: BTreeMap<CapabilityId, Arc<dyn Capability>>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a set that also contains `capability`, replacing any entry
    /// with the same id.
    pub fn with<C: Capability>(&self, capability: C) -> Self {
        self.with_shared(Arc::new(capability))
    }

    pub fn with_shared(&self, capability: Arc<dyn Capability>) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(CapabilityId::from(capability.id()), capability);
        Self { entries }
    }

    /// Return a set without the entry for `id`.
    pub fn without(&self, id: &str) -> Self {
        let mut entries = self.entries.clone();
        entries.remove(id);
        Self { entries }
    }

    pub fn get<C: CapabilityType>(&self) -> Option<&C> {
        self.entries.get(C::ID).and_then(|c| c.downcast_ref::<C>())
    }

    /// Like [`get`](Capabilities::get), failing with [`Error::NotInSet`].
    pub fn require<C: CapabilityType>(&self) -> Result<&C> {
        self.get::<C>().ok_or_else(|| Error::NotInSet {
            id: C::capability_id(),
        })
    }

    pub fn get_by_id(&self, id: &str) -> Option<&dyn Capability> {
        self.entries.get(id).map(|c| &**c)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Iterate capabilities ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Capability> {
        self.entries.values().map(|c| &**c)
    }

    pub fn ids(&self) -> impl Iterator<Item = &CapabilityId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persistable `(id, configuration)` pairs, ordered by id.
    pub fn to_array(&self) -> Vec<(CapabilityId, Configuration)> {
        self.entries
            .iter()
            .map(|(id, c)| (id.clone(), c.configuration()))
            .collect()
    }

    /// The persisted JSON object form: `{ "<id>": { ... } }`.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(id, c)| (id.to_string(), Value::Object(c.configuration())))
                .collect(),
        )
    }

    /// Ids that were added, removed or reconfigured between `self` and `other`.
    pub fn diff(&self, other: &Capabilities) -> Vec<CapabilityId> {
        let mut changed: Vec<CapabilityId> = self
            .entries
            .iter()
            .filter(|(id, c)| {
                other
                    .entries
                    .get(*id)
                    .is_none_or(|o| !c.is_equivalent(&**o))
            })
            .map(|(id, _)| id.clone())
            .collect();

        changed.extend(
            other
                .entries
                .keys()
                .filter(|id| !self.entries.contains_key(*id))
                .cloned(),
        );
        changed.sort();
        changed
    }
}

impl PartialEq for Capabilities {
    fn eq(&self, other: &Self) -> bool {
        self.to_array() == other.to_array()
    }
}

impl Eq for Capabilities {}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(id, c)| (id, c.configuration())))
            .finish()
    }
}

impl Serialize for Capabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, capability) in &self.entries {
            map.serialize_entry(id, &capability.configuration())?;
        }
        map.end()
    }
}

impl FromIterator<Arc<dyn Capability>> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Capability>>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|c| (CapabilityId::from(c.id()), c))
            .collect();
        Self { entries }
    }
}
