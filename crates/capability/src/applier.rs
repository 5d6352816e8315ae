//! Applier dispatch.
//!
//! An applier enforces a capability's configuration on a target (usually a
//! webhosting space). Appliers never fail: anything worth reporting, like a
//! quota lowered below current usage, is pushed as a [`Message`].

use crate::{Capabilities, Capability, CapabilityId, CapabilityType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// A non-fatal message produced while applying a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub capability: CapabilityId,
    pub severity: Severity,
    pub text: String,
}

/// Message collector handed to a single applier run.
#[derive(Debug)]
pub struct Messages {
    capability: CapabilityId,
    entries: Vec<Message>,
}

impl Messages {
    fn new(capability: CapabilityId) -> Self {
        Self {
            capability,
            entries: Vec::new(),
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(Severity::Info, text.into());
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(Severity::Warning, text.into());
    }

    fn push(&mut self, severity: Severity, text: String) {
        self.entries.push(Message {
            capability: self.capability.clone(),
            severity,
            text,
        });
    }
}

/// Enforces one capability kind on targets of type `T`.
pub trait Applier<T>: Send + Sync {
    type Capability: CapabilityType;

    fn apply(&self, capability: &Self::Capability, target: &T, messages: &mut Messages);
}

trait ErasedApplier<T>: Send + Sync {
    fn apply_dyn(&self, capability: &dyn Capability, target: &T, messages: &mut Messages);
}

impl<T, A: Applier<T>> ErasedApplier<T> for A {
    fn apply_dyn(&self, capability: &dyn Capability, target: &T, messages: &mut Messages) {
        match capability.downcast_ref::<A::Capability>() {
            Some(capability) => self.apply(capability, target, messages),
            None => {
                tracing::warn!(
                    capability = capability.id(),
                    expected = std::any::type_name::<A::Capability>(),
                    "skipping applier for capability of unexpected type"
                );
            }
        }
    }
}

/// Appliers registered per capability id.
pub struct ApplierDispatch<T> {
    appliers: HashMap<CapabilityId, Vec<Box<dyn ErasedApplier<T>>>>,
}

impl<T> Default for ApplierDispatch<T> {
    fn default() -> Self {
        Self {
            appliers: HashMap::new(),
        }
    }
}

impl<T> fmt::Debug for ApplierDispatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self.appliers.iter().map(|(id, a)| (id, a.len())).collect();
        f.debug_struct("ApplierDispatch").field("appliers", &counts).finish()
    }
}

impl<T> ApplierDispatch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an applier for its capability kind. Several appliers may
    /// share a kind; they run in registration order.
    pub fn register<A>(&mut self, applier: A) -> &mut Self
    where
        A: Applier<T> + 'static,
    {
        self.appliers
            .entry(A::Capability::capability_id())
            .or_default()
            .push(Box::new(applier));
        self
    }

    /// Run every registered applier for every capability in the set and
    /// return the collected messages.
    pub fn apply(&self, capabilities: &Capabilities, target: &T) -> Vec<Message> {
        let mut collected = Vec::new();
        for capability in capabilities.iter() {
            let Some(appliers) = self.appliers.get(capability.id()) else {
                continue;
            };
            let mut messages = Messages::new(CapabilityId::from(capability.id()));
            for applier in appliers {
                applier.apply_dyn(capability, target, &mut messages);
            }
            tracing::debug!(
                capability = capability.id(),
                appliers = appliers.len(),
                messages = messages.entries.len(),
                "applied capability"
            );
            collected.append(&mut messages.entries);
        }
        collected
    }
}
