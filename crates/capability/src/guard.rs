//! Guard dispatch.
//!
//! Guards are asked before an operation covered by a capability runs (for
//! example, creating a mailbox while `mailbox_count` is set). Every guard of
//! the capability must agree. Guards are evaluated against the configuration
//! passed in on each call and must not cache: an account that is already over
//! a freshly lowered limit has to be refused.

use crate::{Capabilities, Capability, CapabilityId, CapabilityType};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Operation context handed to guards (usage counters, requested sizes).
pub type Context = Map<String, Value>;

/// Vetoes operations on targets of type `T` that would violate a capability.
pub trait Guard<T>: Send + Sync {
    type Capability: CapabilityType;

    /// `true` when the operation may proceed.
    fn decide(&self, capability: &Self::Capability, context: &Context, target: &T) -> bool;
}

trait ErasedGuard<T>: Send + Sync {
    fn decide_dyn(&self, capability: &dyn Capability, context: &Context, target: &T) -> bool;
}

impl<T, G: Guard<T>> ErasedGuard<T> for G {
    fn decide_dyn(&self, capability: &dyn Capability, context: &Context, target: &T) -> bool {
        match capability.downcast_ref::<G::Capability>() {
            Some(capability) => self.decide(capability, context, target),
            None => {
                tracing::warn!(
                    capability = capability.id(),
                    expected = std::any::type_name::<G::Capability>(),
                    "guard received capability of unexpected type, denying"
                );
                false
            }
        }
    }
}

/// Guards registered per capability id.
pub struct GuardDispatch<T> {
    guards: HashMap<CapabilityId, Vec<Box<dyn ErasedGuard<T>>>>,
}

impl<T> Default for GuardDispatch<T> {
    fn default() -> Self {
        Self {
            guards: HashMap::new(),
        }
    }
}

impl<T> fmt::Debug for GuardDispatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self.guards.iter().map(|(id, g)| (id, g.len())).collect();
        f.debug_struct("GuardDispatch").field("guards", &counts).finish()
    }
}

impl<T> GuardDispatch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<G>(&mut self, guard: G) -> &mut Self
    where
        G: Guard<T> + 'static,
    {
        self.guards
            .entry(G::Capability::capability_id())
            .or_default()
            .push(Box::new(guard));
        self
    }

    pub fn has_guards(&self, id: &str) -> bool {
        self.guards.get(id).is_some_and(|g| !g.is_empty())
    }

    /// Ask every guard of the capability. A capability without guards does
    /// not restrict anything.
    pub fn decide(&self, capability: &dyn Capability, context: &Context, target: &T) -> bool {
        let Some(guards) = self.guards.get(capability.id()) else {
            return true;
        };

        let allowed = guards
            .iter()
            .all(|guard| guard.decide_dyn(capability, context, target));

        if allowed {
            tracing::debug!(capability = capability.id(), "guards allowed operation");
        } else {
            tracing::info!(capability = capability.id(), "guard denied operation");
        }
        allowed
    }

    /// Look `id` up in `capabilities` and ask its guards. A capability that
    /// is not part of the set imposes no limit.
    pub fn decide_in(&self, capabilities: &Capabilities, id: &str, context: &Context, target: &T) -> bool {
        match capabilities.get_by_id(id) {
            Some(capability) => self.decide(capability, context, target),
            None => true,
        }
    }
}
