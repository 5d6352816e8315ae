//! Webhosting plans and spaces with typed capabilities.
//!
//! This crate ties the workspace together: it loads `parkmanager.toml`, opens
//! the [`Store`](storage::Store), and executes [`Command`]s against plans and
//! spaces. Whenever a command sets a space's capabilities the registered
//! appliers run against the space and their messages come back in the
//! [`Outcome`].
//!
//! Guards answer "may this space do X?" through [`Webhosting::is_allowed`],
//! and permission deciders answer "may this user manage this space?" through
//! [`Webhosting::authorize`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use capability::{Capabilities, CapabilityRegistry, Context, MailboxCount};
//! use policy::{Token, UserId};
//! use storage::{PlanId, SpaceId};
//! use webhosting::{Command, Config, MANAGE_SPACE, WebhostingBuilder};
//!
//! let config = Config::load("parkmanager.toml")?;
//! let service = WebhostingBuilder::from_config(&config, Arc::new(CapabilityRegistry::with_builtin()))?
//!     .build();
//!
//! let plan = PlanId::new();
//! service.handle(Command::CreatePlan {
//!     id: plan,
//!     capabilities: Capabilities::new().with(MailboxCount { limit: Some(10) }),
//! })?;
//!
//! let owner = UserId::new();
//! let id = SpaceId::new();
//! service.handle(Command::RegisterSpace { id, owner: Some(owner), plan })?;
//!
//! let space = service.space(id)?;
//! service.authorize(&Token::user(owner), &MANAGE_SPACE, &space)?;
//! service.ensure_allowed(&space, "mailbox_count", &Context::new())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod command;
mod config;
mod error;
mod service;

pub use command::{Command, Outcome};
pub use config::{Config, ConfigError, DatabaseConfig, PlanConfig};
pub use error::{Error, Result};
pub use service::{MANAGE_PLAN, MANAGE_SPACE, Webhosting, WebhostingBuilder};
