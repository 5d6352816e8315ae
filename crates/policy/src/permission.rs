//! Permissions, identities and vote aggregation.

use serde::{Deserialize, Serialize};
use std::borrow::{Borrow, Cow};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use uuid::Uuid;

/// A unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A protected action, identified by name (e.g. `webhosting.space.manage`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

/// The identity asking for access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub user: UserId,
    pub roles: BTreeSet<Role>,
}

impl Token {
    pub fn new(user: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn user(user: UserId) -> Self {
        Self::new(user, [Role::User])
    }

    pub fn admin(user: UserId) -> Self {
        Self::new(user, [Role::User, Role::Admin])
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin) || self.has_role(Role::SuperAdmin)
    }
}

/// Something access is requested for.
pub trait Resource {
    /// Owner of the resource, if it has one.
    fn owner(&self) -> Option<UserId>;
}

/// A single decider's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Allow,
    Deny,
    Abstain,
}

/// Result of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// A voter in the access decision for a permission.
pub trait PermissionDecider: Send + Sync {
    /// Name used in logs and denial reasons.
    fn name(&self) -> &str;

    fn vote(&self, permission: &Permission, token: &Token, resource: &dyn Resource) -> Vote;
}

/// Deciders registered per permission.
#[derive(Default)]
pub struct PermissionDeciders {
    deciders: HashMap<Permission, Vec<Box<dyn PermissionDecider>>>,
}

impl fmt::Debug for PermissionDeciders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: HashMap<_, Vec<_>> = self
            .deciders
            .iter()
            .map(|(p, ds)| (p.name(), ds.iter().map(|d| d.name()).collect()))
            .collect();
        f.debug_struct("PermissionDeciders").field("deciders", &names).finish()
    }
}

impl PermissionDeciders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        permission: Permission,
        decider: impl PermissionDecider + 'static,
    ) -> &mut Self {
        self.deciders
            .entry(permission)
            .or_default()
            .push(Box::new(decider));
        self
    }

    pub fn is_configured(&self, permission: &Permission) -> bool {
        self.deciders.get(permission).is_some_and(|d| !d.is_empty())
    }

    /// Collect every decider's vote, in registration order.
    pub fn votes(&self, permission: &Permission, token: &Token, resource: &dyn Resource) -> Vec<Vote> {
        self.deciders
            .get(permission)
            .map(|deciders| {
                deciders
                    .iter()
                    .map(|d| d.vote(permission, token, resource))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Decide access. A deny vote stops evaluation; without any allow vote
    /// access is denied.
    pub fn decide(&self, permission: &Permission, token: &Token, resource: &dyn Resource) -> Decision {
        let Some(deciders) = self.deciders.get(permission) else {
            tracing::debug!(%permission, "no deciders registered, denying");
            return Decision::Deny {
                reason: format!("no deciders registered for {permission}"),
            };
        };

        let mut allowed_by = None;
        for decider in deciders {
            let vote = decider.vote(permission, token, resource);
            tracing::trace!(%permission, decider = decider.name(), ?vote, "vote");
            match vote {
                Vote::Deny => {
                    tracing::debug!(%permission, user = %token.user, decider = decider.name(), "access denied");
                    return Decision::Deny {
                        reason: format!("{permission} denied by {}", decider.name()),
                    };
                }
                Vote::Allow if allowed_by.is_none() => allowed_by = Some(decider.name()),
                Vote::Allow | Vote::Abstain => {}
            }
        }

        match allowed_by {
            Some(name) => {
                tracing::debug!(%permission, user = %token.user, decider = name, "access granted");
                Decision::Allow
            }
            None => Decision::Deny {
                reason: format!("{permission}: every decider abstained"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vote);

    impl PermissionDecider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn vote(&self, _: &Permission, _: &Token, _: &dyn Resource) -> Vote {
            self.0
        }
    }

    struct Nothing;

    impl Resource for Nothing {
        fn owner(&self) -> Option<UserId> {
            None
        }
    }

    const READ: Permission = Permission::from_static("thing.read");

    fn decide(votes: &[Vote]) -> Decision {
        let mut deciders = PermissionDeciders::new();
        for vote in votes {
            deciders.register(READ, Fixed(*vote));
        }
        deciders.decide(&READ, &Token::user(UserId::new()), &Nothing)
    }

    #[test]
    fn test_all_abstain_denies() {
        assert!(!decide(&[Vote::Abstain, Vote::Abstain]).is_allowed());
    }

    #[test]
    fn test_single_allow_wins_over_abstain() {
        assert!(decide(&[Vote::Abstain, Vote::Allow]).is_allowed());
    }

    #[test]
    fn test_deny_overrides_allow() {
        assert!(!decide(&[Vote::Allow, Vote::Deny]).is_allowed());
        assert!(!decide(&[Vote::Deny, Vote::Allow]).is_allowed());
    }

    #[test]
    fn test_unregistered_permission_denies() {
        let deciders = PermissionDeciders::new();
        assert!(!deciders.is_configured(&READ));
        let decision = deciders.decide(&READ, &Token::admin(UserId::new()), &Nothing);
        assert!(matches!(decision, Decision::Deny { reason } if reason.contains("thing.read")));
    }

    #[test]
    fn test_votes_in_order() {
        let mut deciders = PermissionDeciders::new();
        deciders
            .register(READ, Fixed(Vote::Abstain))
            .register(READ, Fixed(Vote::Allow));
        let votes = deciders.votes(&READ, &Token::user(UserId::new()), &Nothing);
        assert_eq!(votes, vec![Vote::Abstain, Vote::Allow]);
    }

    #[test]
    fn test_token_roles() {
        let user = UserId::new();
        assert!(!Token::user(user).is_admin());
        assert!(Token::admin(user).is_admin());
        assert!(Token::new(user, [Role::SuperAdmin]).is_admin());
    }
}
