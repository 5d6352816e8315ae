//! Repository interfaces.
//!
//! `save` and `remove` persist the entity together with the events it
//! recorded, then hand those events back so the caller can publish them.

use crate::{Event, PlanId, Result, Space, SpaceId, WebhostingPlan};

pub trait PlanRepository {
    fn get(&self, id: PlanId) -> Result<WebhostingPlan>;

    fn all(&self) -> Result<Vec<WebhostingPlan>>;

    fn save(&self, plan: &mut WebhostingPlan) -> Result<Vec<Event>>;

    /// Fails with [`Error::PlanInUse`](crate::Error::PlanInUse) while any
    /// space is assigned to the plan.
    fn remove(&self, plan: &mut WebhostingPlan) -> Result<Vec<Event>>;
}

pub trait SpaceRepository {
    fn get(&self, id: SpaceId) -> Result<Space>;

    fn all_with_plan(&self, plan: PlanId) -> Result<Vec<Space>>;

    fn save(&self, space: &mut Space) -> Result<Vec<Event>>;

    /// Fails with
    /// [`Error::CannotRemoveActiveSpace`](crate::Error::CannotRemoveActiveSpace)
    /// unless the space was marked for removal.
    fn remove(&self, space: &mut Space) -> Result<Vec<Event>>;
}
