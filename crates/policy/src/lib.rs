//! Permission decisions.
//!
//! Core principle: **access is denied unless a decider allows it and none
//! denies it.**
//!
//! Every [`Permission`] has zero or more [`PermissionDecider`]s. Each votes
//! [`Vote::Allow`], [`Vote::Deny`] or [`Vote::Abstain`] for a requesting
//! [`Token`] and a [`Resource`]; [`PermissionDeciders::decide`] folds the
//! votes into a [`Decision`].

mod decider;
mod error;
mod permission;
mod policy;

pub use decider::{HasRole, IsSpaceOwner};
pub use error::{Error, Result};
pub use permission::{
    Decision, Permission, PermissionDecider, PermissionDeciders, Resource, Role, Token, UserId, Vote,
};
pub use policy::{DeciderConfig, PermissionRules, Policy};
