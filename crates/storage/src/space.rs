//! Webhosting spaces (accounts).

use crate::{EventKind, PlanId, SpaceId, WebhostingPlan};
use capability::Capabilities;
use policy::{Resource, UserId};

/// A webhosting space.
///
/// A space is either linked to a plan or carries a custom capability set.
/// Its capabilities are always the effective ones: linking a plan with
/// capabilities copies the plan's set at that moment.
#[derive(Debug, Clone)]
pub struct Space {
    id: SpaceId,
    owner: Option<UserId>,
    plan: Option<PlanId>,
    capabilities: Capabilities,
    marked_for_removal: bool,
    recorded: Vec<EventKind>,
}

impl Space {
    /// Register a space using a plan's capabilities.
    pub fn register(id: SpaceId, owner: Option<UserId>, plan: &WebhostingPlan) -> Self {
        Self::registered(id, owner, Some(plan.id()), plan.capabilities().clone())
    }

    /// Register a space with a custom capability set and no plan.
    pub fn register_with_capabilities(
        id: SpaceId,
        owner: Option<UserId>,
        capabilities: Capabilities,
    ) -> Self {
        Self::registered(id, owner, None, capabilities)
    }

    fn registered(
        id: SpaceId,
        owner: Option<UserId>,
        plan: Option<PlanId>,
        capabilities: Capabilities,
    ) -> Self {
        let registered = EventKind::SpaceRegistered {
            space: id,
            owner,
            plan,
            capabilities: capabilities.to_value(),
        };
        Self {
            id,
            owner,
            plan,
            capabilities,
            marked_for_removal: false,
            recorded: vec![registered],
        }
    }

    pub(crate) fn reconstitute(
        id: SpaceId,
        owner: Option<UserId>,
        plan: Option<PlanId>,
        capabilities: Capabilities,
        marked_for_removal: bool,
    ) -> Self {
        Self {
            id,
            owner,
            plan,
            capabilities,
            marked_for_removal,
            recorded: Vec::new(),
        }
    }

    pub fn id(&self) -> SpaceId {
        self.id
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn plan(&self) -> Option<PlanId> {
        self.plan
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn is_marked_for_removal(&self) -> bool {
        self.marked_for_removal
    }

    pub fn switch_owner(&mut self, owner: Option<UserId>) {
        if self.owner == owner {
            return;
        }
        self.recorded.push(EventKind::SpaceOwnerChanged {
            space: self.id,
            old_owner: self.owner,
            new_owner: owner,
        });
        self.owner = owner;
    }

    /// Link the space to a plan, keeping its current capabilities.
    pub fn assign_plan(&mut self, plan: &WebhostingPlan) {
        self.link_plan(Some(plan.id()));
    }

    /// Link the space to a plan and take over the plan's capabilities.
    pub fn assign_plan_with_capabilities(&mut self, plan: &WebhostingPlan) {
        self.link_plan(Some(plan.id()));
        self.replace_capabilities(plan.capabilities().clone());
    }

    /// Detach the space from its plan and give it its own capabilities.
    pub fn assign_custom_capabilities(&mut self, capabilities: Capabilities) {
        self.link_plan(None);
        self.replace_capabilities(capabilities);
    }

    pub fn mark_for_removal(&mut self) {
        if self.marked_for_removal {
            return;
        }
        self.marked_for_removal = true;
        self.recorded
            .push(EventKind::SpaceMarkedForRemoval { space: self.id });
    }

    /// Events recorded since the space was last saved.
    pub fn recorded_events(&self) -> &[EventKind] {
        &self.recorded
    }

    pub(crate) fn take_events(&mut self) -> Vec<EventKind> {
        std::mem::take(&mut self.recorded)
    }

    fn link_plan(&mut self, plan: Option<PlanId>) {
        if self.plan == plan {
            return;
        }
        self.plan = plan;
        self.recorded.push(EventKind::SpacePlanAssigned {
            space: self.id,
            plan,
        });
    }

    fn replace_capabilities(&mut self, capabilities: Capabilities) {
        let changed = self.capabilities.diff(&capabilities);
        if changed.is_empty() {
            return;
        }
        self.recorded.push(EventKind::SpaceCapabilitiesChanged {
            space: self.id,
            capabilities: capabilities.to_value(),
            changed,
        });
        self.capabilities = capabilities;
    }
}

impl Resource for Space {
    fn owner(&self) -> Option<UserId> {
        self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capability::{FtpUserCount, MailboxCount};

    fn plan() -> WebhostingPlan {
        WebhostingPlan::create(
            PlanId::new(),
            Capabilities::new().with(MailboxCount { limit: Some(10) }),
        )
    }

    fn names(space: &Space) -> Vec<&'static str> {
        space.recorded_events().iter().map(|e| e.name()).collect()
    }

    #[test]
    fn test_register_copies_plan_capabilities() {
        let plan = plan();
        let space = Space::register(SpaceId::new(), None, &plan);

        assert_eq!(space.plan(), Some(plan.id()));
        assert_eq!(space.capabilities(), plan.capabilities());
        assert_eq!(names(&space), vec!["space_registered"]);
    }

    #[test]
    fn test_assign_plan_keeps_capabilities() {
        let custom = Capabilities::new().with(FtpUserCount { limit: Some(1) });
        let mut space = Space::register_with_capabilities(SpaceId::new(), None, custom.clone());
        let plan = plan();

        space.assign_plan(&plan);
        assert_eq!(space.plan(), Some(plan.id()));
        assert_eq!(space.capabilities(), &custom);
        assert_eq!(names(&space), vec!["space_registered", "space_plan_assigned"]);
    }

    #[test]
    fn test_assign_plan_with_capabilities() {
        let mut space = Space::register_with_capabilities(SpaceId::new(), None, Capabilities::new());
        let plan = plan();

        space.assign_plan_with_capabilities(&plan);
        assert_eq!(space.capabilities(), plan.capabilities());
        assert_eq!(
            names(&space),
            vec!["space_registered", "space_plan_assigned", "space_capabilities_changed"]
        );
    }

    #[test]
    fn test_custom_capabilities_detach_plan() {
        let plan = plan();
        let mut space = Space::register(SpaceId::new(), None, &plan);
        space.assign_custom_capabilities(Capabilities::new().with(MailboxCount { limit: Some(1) }));

        assert_eq!(space.plan(), None);
        assert_eq!(space.capabilities().get::<MailboxCount>(), Some(&MailboxCount { limit: Some(1) }));
    }

    #[test]
    fn test_switch_owner_records_old_and_new() {
        let first = UserId::new();
        let second = UserId::new();
        let mut space = Space::register_with_capabilities(SpaceId::new(), Some(first), Capabilities::new());

        space.switch_owner(Some(first));
        space.switch_owner(Some(second));

        assert_eq!(Resource::owner(&space), Some(second));
        assert_eq!(
            space.recorded_events().last(),
            Some(&EventKind::SpaceOwnerChanged {
                space: space.id(),
                old_owner: Some(first),
                new_owner: Some(second),
            })
        );
        assert_eq!(space.recorded_events().len(), 2);
    }

    #[test]
    fn test_mark_for_removal_once() {
        let mut space = Space::register_with_capabilities(SpaceId::new(), None, Capabilities::new());
        space.mark_for_removal();
        space.mark_for_removal();
        assert!(space.is_marked_for_removal());
        assert_eq!(names(&space), vec!["space_registered", "space_marked_for_removal"]);
    }
}
