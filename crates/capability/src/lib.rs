//! Capabilities of webhosting plans and spaces.
//!
//! A plan declares what a space may use: disk space, monthly traffic, FTP
//! users, mailboxes. Each of these is a [`Capability`], a small immutable
//! value identified by a stable id and persisted as a JSON configuration map.
//!
//! # Core Concepts
//!
//! - [`CapabilityRegistry`] turns `(id, configuration)` payloads back into
//!   typed capabilities. It is constructed explicitly and passed to whatever
//!   reads stored data.
//! - [`Capabilities`] is an immutable set with one entry per id. Its JSON
//!   form `{ "<id>": { ... } }` is the storage format.
//! - [`ApplierDispatch`] runs [`Applier`]s that enforce a set on a target and
//!   collect non-fatal [`Message`]s.
//! - [`GuardDispatch`] asks [`Guard`]s whether an operation stays within a
//!   capability. All guards of a capability must agree.
//!
//! # Example
//!
//! ```
//! use capability::{Capabilities, CapabilityRegistry, MailboxCount, StorageSpaceQuota};
//!
//! let registry = CapabilityRegistry::with_builtin();
//! let set = Capabilities::new()
//!     .with(StorageSpaceQuota { limit_bytes: 1 << 30 })
//!     .with(MailboxCount { limit: Some(10) });
//!
//! let stored = set.to_value().to_string();
//! let restored = registry.reconstitute_json(&stored)?;
//! assert_eq!(set, restored);
//! # Ok::<(), capability::Error>(())
//! ```

mod applier;
mod builtin;
mod capability;
mod error;
mod guard;
mod registry;
mod set;

pub use applier::{Applier, ApplierDispatch, Message, Messages, Severity};
pub use builtin::{
    CONTEXT_CURRENT, CONTEXT_REQUESTED_BYTES, CONTEXT_USED_BYTES, CountLimit, CountLimitGuard,
    FtpUserCount, MailboxCount, MonthlyTrafficQuota, StorageQuotaGuard, StorageSpaceQuota,
};
pub use capability::{Capability, CapabilityId, CapabilityType, Configuration};
pub use error::{Error, Result};
pub use guard::{Context, Guard, GuardDispatch};
pub use registry::CapabilityRegistry;
pub use set::Capabilities;
