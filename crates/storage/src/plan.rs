//! Webhosting plans.

use crate::{EventKind, PlanId};
use capability::Capabilities;

/// A webhosting plan: a named bundle of capabilities assigned to spaces.
#[derive(Debug, Clone)]
pub struct WebhostingPlan {
    id: PlanId,
    capabilities: Capabilities,
    recorded: Vec<EventKind>,
}

impl WebhostingPlan {
    /// Create a new plan.
    pub fn create(id: PlanId, capabilities: Capabilities) -> Self {
        let created = EventKind::PlanCreated {
            plan: id,
            capabilities: capabilities.to_value(),
        };
        Self {
            id,
            capabilities,
            recorded: vec![created],
        }
    }

    /// Rebuild a plan from storage, without recording events.
    pub(crate) fn reconstitute(id: PlanId, capabilities: Capabilities) -> Self {
        Self {
            id,
            capabilities,
            recorded: Vec::new(),
        }
    }

    pub fn id(&self) -> PlanId {
        self.id
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Replace the plan's capabilities. Returns `false` when nothing changed.
    pub fn change_capabilities(&mut self, capabilities: Capabilities) -> bool {
        let changed = self.capabilities.diff(&capabilities);
        if changed.is_empty() {
            return false;
        }

        self.recorded.push(EventKind::PlanCapabilitiesChanged {
            plan: self.id,
            capabilities: capabilities.to_value(),
            changed,
        });
        self.capabilities = capabilities;
        true
    }

    /// Events recorded since the plan was last saved.
    pub fn recorded_events(&self) -> &[EventKind] {
        &self.recorded
    }

    pub(crate) fn take_events(&mut self) -> Vec<EventKind> {
        std::mem::take(&mut self.recorded)
    }
}
