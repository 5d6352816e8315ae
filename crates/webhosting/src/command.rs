//! Commands accepted by [`Webhosting::handle`](crate::Webhosting::handle).

use capability::{Capabilities, Message};
use policy::UserId;
use storage::{Event, PlanId, SpaceId};

#[derive(Debug, Clone)]
pub enum Command {
    CreatePlan {
        id: PlanId,
        capabilities: Capabilities,
    },
    /// Replace a plan's capabilities. Spaces keep theirs until synced.
    ChangePlanCapabilities {
        id: PlanId,
        capabilities: Capabilities,
    },
    /// Copy a plan's capabilities onto every space assigned to it.
    SyncPlanCapabilities {
        id: PlanId,
    },
    RemovePlan {
        id: PlanId,
    },
    RegisterSpace {
        id: SpaceId,
        owner: Option<UserId>,
        plan: PlanId,
    },
    RegisterSpaceWithCapabilities {
        id: SpaceId,
        owner: Option<UserId>,
        capabilities: Capabilities,
    },
    AssignPlan {
        space: SpaceId,
        plan: PlanId,
        /// Also take over the plan's capabilities.
        with_capabilities: bool,
    },
    AssignCustomCapabilities {
        space: SpaceId,
        capabilities: Capabilities,
    },
    SwitchOwner {
        space: SpaceId,
        owner: Option<UserId>,
    },
    MarkSpaceForRemoval {
        space: SpaceId,
    },
    RemoveSpace {
        space: SpaceId,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreatePlan { .. } => "create_plan",
            Command::ChangePlanCapabilities { .. } => "change_plan_capabilities",
            Command::SyncPlanCapabilities { .. } => "sync_plan_capabilities",
            Command::RemovePlan { .. } => "remove_plan",
            Command::RegisterSpace { .. } => "register_space",
            Command::RegisterSpaceWithCapabilities { .. } => "register_space_with_capabilities",
            Command::AssignPlan { .. } => "assign_plan",
            Command::AssignCustomCapabilities { .. } => "assign_custom_capabilities",
            Command::SwitchOwner { .. } => "switch_owner",
            Command::MarkSpaceForRemoval { .. } => "mark_space_for_removal",
            Command::RemoveSpace { .. } => "remove_space",
        }
    }
}

/// What a handled command produced.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Persisted events, in the order they were recorded.
    pub events: Vec<Event>,
    /// Messages from appliers run against changed spaces.
    pub messages: Vec<Message>,
}

impl Outcome {
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.iter().map(|e| e.kind.name()).collect()
    }
}
