//! Built-in permission deciders.

use crate::{Permission, PermissionDecider, Resource, Role, Token, Vote};

/// Grants access to the owner of a space, and to administrators.
///
/// Ownerless spaces can only be managed by administrators. When the
/// requester is neither owner nor admin the decider abstains, leaving the
/// decision to other deciders.
#[derive(Debug, Default, Clone, Copy)]
pub struct IsSpaceOwner;

impl PermissionDecider for IsSpaceOwner {
    fn name(&self) -> &str {
        "is_space_owner"
    }

    fn vote(&self, _permission: &Permission, token: &Token, resource: &dyn Resource) -> Vote {
        if token.is_admin() {
            return Vote::Allow;
        }

        match resource.owner() {
            None => Vote::Deny,
            Some(owner) if owner == token.user => Vote::Allow,
            Some(_) => Vote::Abstain,
        }
    }
}

/// Grants access to tokens carrying a role; abstains otherwise.
#[derive(Debug, Clone, Copy)]
pub struct HasRole(pub Role);

impl PermissionDecider for HasRole {
    fn name(&self) -> &str {
        match self.0 {
            Role::User => "has_role:user",
            Role::Admin => "has_role:admin",
            Role::SuperAdmin => "has_role:super_admin",
        }
    }

    fn vote(&self, _permission: &Permission, token: &Token, _resource: &dyn Resource) -> Vote {
        if token.has_role(self.0) {
            Vote::Allow
        } else {
            Vote::Abstain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserId;

    struct Space(Option<UserId>);

    impl Resource for Space {
        fn owner(&self) -> Option<UserId> {
            self.0
        }
    }

    const MANAGE: Permission = Permission::from_static("webhosting.space.manage");

    #[test]
    fn test_admin_allowed_on_any_space() {
        let admin = Token::admin(UserId::new());
        assert_eq!(IsSpaceOwner.vote(&MANAGE, &admin, &Space(None)), Vote::Allow);
        assert_eq!(IsSpaceOwner.vote(&MANAGE, &admin, &Space(Some(UserId::new()))), Vote::Allow);
    }

    #[test]
    fn test_ownerless_space_denied_for_user() {
        let user = Token::user(UserId::new());
        assert_eq!(IsSpaceOwner.vote(&MANAGE, &user, &Space(None)), Vote::Deny);
    }

    #[test]
    fn test_owner_allowed() {
        let owner = UserId::new();
        assert_eq!(IsSpaceOwner.vote(&MANAGE, &Token::user(owner), &Space(Some(owner))), Vote::Allow);
    }

    #[test]
    fn test_other_user_abstains() {
        let user = Token::user(UserId::new());
        assert_eq!(IsSpaceOwner.vote(&MANAGE, &user, &Space(Some(UserId::new()))), Vote::Abstain);
    }

    #[test]
    fn test_has_role() {
        let user = UserId::new();
        assert_eq!(HasRole(Role::Admin).vote(&MANAGE, &Token::admin(user), &Space(None)), Vote::Allow);
        assert_eq!(HasRole(Role::Admin).vote(&MANAGE, &Token::user(user), &Space(None)), Vote::Abstain);
    }
}
