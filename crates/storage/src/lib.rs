//! Persistence for webhosting plans and spaces.
//!
//! Plans and spaces are the two aggregates of the webhosting core. Both carry
//! a [`Capabilities`](capability::Capabilities) set and record domain events
//! as they change. Saving an entity writes its row and its pending events in
//! a single SQLite transaction, so the event log never disagrees with the
//! stored state.
//!
//! # Core Concepts
//!
//! ## WebhostingPlan
//!
//! A [`WebhostingPlan`] bundles capabilities that spaces can be assigned.
//! Changing a plan's capabilities does not touch its spaces; callers decide
//! whether to sync them.
//!
//! ## Space
//!
//! A [`Space`] is a hosting account. It is either linked to a plan or holds a
//! custom capability set, and it must be marked for removal before it can be
//! removed.
//!
//! ## Store
//!
//! The [`Store`] opens the database and hands out repositories through
//! [`Store::plans`] and [`Store::spaces`]. Capabilities are persisted as a
//! JSON object keyed by capability id and rebuilt through a
//! [`CapabilityRegistry`](capability::CapabilityRegistry), so every stored id
//! must be registered.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use capability::{Capabilities, CapabilityRegistry, MailboxCount};
//! use storage::{PlanId, PlanRepository, Space, SpaceId, SpaceRepository, Store, WebhostingPlan};
//!
//! let store = Store::open("parkmanager.db", Arc::new(CapabilityRegistry::with_builtin()))?;
//!
//! let mut plan = WebhostingPlan::create(
//!     PlanId::new(),
//!     Capabilities::new().with(MailboxCount { limit: Some(10) }),
//! );
//! store.plans().save(&mut plan)?;
//!
//! let mut space = Space::register(SpaceId::new(), None, &plan);
//! for event in store.spaces().save(&mut space)? {
//!     println!("{}: {}", event.timestamp, event.kind.name());
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod event;
mod plan;
mod repository;
mod space;
mod store;

pub use error::{Error, Result};
pub use event::{Event, EventKind, PlanId, SpaceId};
pub use plan::WebhostingPlan;
pub use repository::{PlanRepository, SpaceRepository};
pub use space::Space;
pub use store::{Plans, Spaces, Store};
