//! The webhosting service: command handling, guards and permissions.

use crate::{Command, Config, Error, Outcome, Result};
use capability::{
    Applier, ApplierDispatch, Capabilities, CapabilityRegistry, Context, CountLimitGuard,
    FtpUserCount, Guard, GuardDispatch, MailboxCount, Severity, StorageQuotaGuard,
};
use policy::{Decision, Permission, PermissionDeciders, Token};
use std::sync::Arc;
use storage::{
    EventKind, PlanId, PlanRepository, Space, SpaceId, SpaceRepository, Store, WebhostingPlan,
};

/// Managing a space: changing its owner, plan or capabilities.
pub const MANAGE_SPACE: Permission = Permission::from_static("webhosting.space.manage");

/// Managing plans.
pub const MANAGE_PLAN: Permission = Permission::from_static("webhosting.plan.manage");

/// Builder for a [`Webhosting`] service.
pub struct WebhostingBuilder {
    store: Store,
    appliers: ApplierDispatch<Space>,
    guards: GuardDispatch<Space>,
    deciders: PermissionDeciders,
}

impl WebhostingBuilder {
    /// Start from a store with no appliers, no guards and no deciders.
    pub fn new(store: Store) -> Self {
        Self {
            store,
            appliers: ApplierDispatch::new(),
            guards: GuardDispatch::new(),
            deciders: PermissionDeciders::new(),
        }
    }

    /// Open the configured database, seed its plans and install the
    /// configured deciders along with the built-in guards.
    ///
    /// The policy and every plan seed are validated before anything is
    /// written to the store.
    pub fn from_config(config: &Config, registry: Arc<CapabilityRegistry>) -> Result<Self> {
        let deciders = config.policy.deciders()?;
        let seeds = resolve_seeds(config, &registry)?;

        let store = match &config.database.path {
            Some(path) => Store::open(path, registry)?,
            None => Store::in_memory(registry)?,
        };
        seed_plans(&store, seeds)?;

        Ok(Self::new(store).builtin_guards().deciders(deciders))
    }

    pub fn applier<A>(mut self, applier: A) -> Self
    where
        A: Applier<Space> + 'static,
    {
        self.appliers.register(applier);
        self
    }

    pub fn guard<G>(mut self, guard: G) -> Self
    where
        G: Guard<Space> + 'static,
    {
        self.guards.register(guard);
        self
    }

    /// Register the limit guards of the built-in capability kinds.
    pub fn builtin_guards(self) -> Self {
        self.guard(StorageQuotaGuard)
            .guard(CountLimitGuard::<FtpUserCount>::new())
            .guard(CountLimitGuard::<MailboxCount>::new())
    }

    pub fn deciders(mut self, deciders: PermissionDeciders) -> Self {
        self.deciders = deciders;
        self
    }

    pub fn build(self) -> Webhosting {
        Webhosting {
            store: self.store,
            appliers: self.appliers,
            guards: self.guards,
            deciders: self.deciders,
        }
    }
}

fn resolve_seeds(
    config: &Config,
    registry: &CapabilityRegistry,
) -> Result<Vec<(PlanId, Capabilities)>> {
    config
        .plans
        .iter()
        .map(|seed| {
            let id = seed.plan_id();
            seed.resolve(registry)
                .map(|capabilities| (id, capabilities))
                .map_err(|e| Error::Config(format!("plan {id}: {e}")))
        })
        .collect()
}

fn seed_plans(store: &Store, seeds: Vec<(PlanId, Capabilities)>) -> Result<()> {
    for (id, capabilities) in seeds {
        let mut plan = match store.plans().get(id) {
            Ok(mut plan) => {
                plan.change_capabilities(capabilities);
                plan
            }
            Err(storage::Error::PlanNotFound(_)) => WebhostingPlan::create(id, capabilities),
            Err(e) => return Err(e.into()),
        };

        let events = store.plans().save(&mut plan)?;
        tracing::info!(plan = %id, events = events.len(), "seeded webhosting plan");
    }
    Ok(())
}

/// Webhosting plans and spaces, with their capability enforcement and
/// access checks.
pub struct Webhosting {
    store: Store,
    appliers: ApplierDispatch<Space>,
    guards: GuardDispatch<Space>,
    deciders: PermissionDeciders,
}

impl Webhosting {
    pub fn builder(store: Store) -> WebhostingBuilder {
        WebhostingBuilder::new(store)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn plan(&self, id: PlanId) -> Result<WebhostingPlan> {
        Ok(self.store.plans().get(id)?)
    }

    pub fn space(&self, id: SpaceId) -> Result<Space> {
        Ok(self.store.spaces().get(id)?)
    }

    /// Execute a command and persist its effects.
    pub fn handle(&self, command: Command) -> Result<Outcome> {
        let name = command.name();
        tracing::debug!(command = name, "handling command");

        let mut outcome = Outcome::default();
        match command {
            Command::CreatePlan { id, capabilities } => {
                if self.plan_exists(id)? {
                    return Err(Error::PlanExists(id));
                }
                let mut plan = WebhostingPlan::create(id, capabilities);
                outcome.events = self.store.plans().save(&mut plan)?;
            }
            Command::ChangePlanCapabilities { id, capabilities } => {
                let mut plan = self.plan(id)?;
                plan.change_capabilities(capabilities);
                outcome.events = self.store.plans().save(&mut plan)?;
            }
            Command::SyncPlanCapabilities { id } => {
                let plan = self.plan(id)?;
                for mut space in self.store.spaces().all_with_plan(id)? {
                    space.assign_plan_with_capabilities(&plan);
                    self.save_space(&mut space, &mut outcome)?;
                }
            }
            Command::RemovePlan { id } => {
                let mut plan = self.plan(id)?;
                outcome.events = self.store.plans().remove(&mut plan)?;
            }
            Command::RegisterSpace { id, owner, plan } => {
                self.ensure_space_is_new(id)?;
                let plan = self.plan(plan)?;
                let mut space = Space::register(id, owner, &plan);
                self.save_space(&mut space, &mut outcome)?;
            }
            Command::RegisterSpaceWithCapabilities {
                id,
                owner,
                capabilities,
            } => {
                self.ensure_space_is_new(id)?;
                let mut space = Space::register_with_capabilities(id, owner, capabilities);
                self.save_space(&mut space, &mut outcome)?;
            }
            Command::AssignPlan {
                space,
                plan,
                with_capabilities,
            } => {
                let mut space = self.space(space)?;
                let plan = self.plan(plan)?;
                if with_capabilities {
                    space.assign_plan_with_capabilities(&plan);
                } else {
                    space.assign_plan(&plan);
                }
                self.save_space(&mut space, &mut outcome)?;
            }
            Command::AssignCustomCapabilities {
                space,
                capabilities,
            } => {
                let mut space = self.space(space)?;
                space.assign_custom_capabilities(capabilities);
                self.save_space(&mut space, &mut outcome)?;
            }
            Command::SwitchOwner { space, owner } => {
                let mut space = self.space(space)?;
                space.switch_owner(owner);
                self.save_space(&mut space, &mut outcome)?;
            }
            Command::MarkSpaceForRemoval { space } => {
                let mut space = self.space(space)?;
                space.mark_for_removal();
                self.save_space(&mut space, &mut outcome)?;
            }
            Command::RemoveSpace { space } => {
                let mut space = self.space(space)?;
                outcome.events = self.store.spaces().remove(&mut space)?;
            }
        }

        tracing::info!(
            command = name,
            events = outcome.events.len(),
            messages = outcome.messages.len(),
            "handled command"
        );
        Ok(outcome)
    }

    /// Save a space and run the appliers when its capabilities were set.
    fn save_space(&self, space: &mut Space, outcome: &mut Outcome) -> Result<()> {
        let events = self.store.spaces().save(space)?;

        let applies = events.iter().any(|event| {
            matches!(
                event.kind,
                EventKind::SpaceRegistered { .. } | EventKind::SpaceCapabilitiesChanged { .. }
            )
        });
        if applies {
            for message in self.appliers.apply(space.capabilities(), space) {
                if message.severity == Severity::Warning {
                    tracing::warn!(
                        space = %space.id(),
                        capability = %message.capability,
                        "{}",
                        message.text
                    );
                }
                outcome.messages.push(message);
            }
        }

        outcome.events.extend(events);
        Ok(())
    }

    fn plan_exists(&self, id: PlanId) -> Result<bool> {
        match self.store.plans().get(id) {
            Ok(_) => Ok(true),
            Err(storage::Error::PlanNotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_space_is_new(&self, id: SpaceId) -> Result<()> {
        match self.store.spaces().get(id) {
            Ok(_) => Err(Error::SpaceExists(id)),
            Err(storage::Error::SpaceNotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the space's capability allows the operation described by
    /// `context`. A capability the space doesn't have limits nothing.
    pub fn is_allowed(&self, space: &Space, capability: &str, context: &Context) -> bool {
        self.guards
            .decide_in(space.capabilities(), capability, context, space)
    }

    /// Like [`is_allowed`](Self::is_allowed), failing with
    /// [`Error::CapabilityLimitReached`] on denial.
    pub fn ensure_allowed(&self, space: &Space, capability: &str, context: &Context) -> Result<()> {
        if self.is_allowed(space, capability, context) {
            return Ok(());
        }

        tracing::warn!(space = %space.id(), capability, "capability limit reached");
        Err(Error::CapabilityLimitReached {
            space: space.id(),
            capability: capability.into(),
        })
    }

    pub fn decide(&self, token: &Token, permission: &Permission, space: &Space) -> Decision {
        self.deciders.decide(permission, token, space)
    }

    /// Check a permission, failing with [`Error::AccessDenied`] on denial.
    pub fn authorize(&self, token: &Token, permission: &Permission, space: &Space) -> Result<()> {
        match self.decide(token, permission, space) {
            Decision::Allow => Ok(()),
            Decision::Deny { reason } => Err(Error::AccessDenied(format!(
                "{} on space {}: {reason}",
                permission,
                space.id()
            ))),
        }
    }

    /// Spaces currently linked to a plan.
    pub fn spaces_with_plan(&self, plan: PlanId) -> Result<Vec<Space>> {
        Ok(self.store.spaces().all_with_plan(plan)?)
    }

    /// Capabilities a space registered with `plan` starts out with.
    pub fn plan_capabilities(&self, plan: PlanId) -> Result<Capabilities> {
        Ok(self.plan(plan)?.capabilities().clone())
    }
}
