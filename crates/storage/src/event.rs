//! Domain events and identifiers.

use capability::CapabilityId;
use chrono::{DateTime, Utc};
use policy::UserId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A unique identifier for a webhosting plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(pub Uuid);

impl PlanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unique identifier for a webhosting space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpaceId(pub Uuid);

impl SpaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SpaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SpaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened to a plan or space.
///
/// Capability payloads carry the complete new set in its persisted JSON
/// form, not a diff; `changed` lists the ids that differ from before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    PlanCreated {
        plan: PlanId,
        capabilities: Value,
    },
    PlanCapabilitiesChanged {
        plan: PlanId,
        capabilities: Value,
        changed: Vec<CapabilityId>,
    },
    PlanRemoved {
        plan: PlanId,
    },
    SpaceRegistered {
        space: SpaceId,
        owner: Option<UserId>,
        plan: Option<PlanId>,
        capabilities: Value,
    },
    SpaceOwnerChanged {
        space: SpaceId,
        old_owner: Option<UserId>,
        new_owner: Option<UserId>,
    },
    SpacePlanAssigned {
        space: SpaceId,
        plan: Option<PlanId>,
    },
    SpaceCapabilitiesChanged {
        space: SpaceId,
        capabilities: Value,
        changed: Vec<CapabilityId>,
    },
    SpaceMarkedForRemoval {
        space: SpaceId,
    },
    SpaceRemoved {
        space: SpaceId,
    },
}

impl EventKind {
    /// Id of the plan or space the event belongs to.
    pub fn aggregate_id(&self) -> Uuid {
        match self {
            EventKind::PlanCreated { plan, .. }
            | EventKind::PlanCapabilitiesChanged { plan, .. }
            | EventKind::PlanRemoved { plan } => plan.0,
            EventKind::SpaceRegistered { space, .. }
            | EventKind::SpaceOwnerChanged { space, .. }
            | EventKind::SpacePlanAssigned { space, .. }
            | EventKind::SpaceCapabilitiesChanged { space, .. }
            | EventKind::SpaceMarkedForRemoval { space }
            | EventKind::SpaceRemoved { space } => space.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::PlanCreated { .. } => "plan_created",
            EventKind::PlanCapabilitiesChanged { .. } => "plan_capabilities_changed",
            EventKind::PlanRemoved { .. } => "plan_removed",
            EventKind::SpaceRegistered { .. } => "space_registered",
            EventKind::SpaceOwnerChanged { .. } => "space_owner_changed",
            EventKind::SpacePlanAssigned { .. } => "space_plan_assigned",
            EventKind::SpaceCapabilitiesChanged { .. } => "space_capabilities_changed",
            EventKind::SpaceMarkedForRemoval { .. } => "space_marked_for_removal",
            EventKind::SpaceRemoved { .. } => "space_removed",
        }
    }
}

/// A persisted domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id: kind.aggregate_id(),
            timestamp: Utc::now(),
            kind,
        }
    }
}
