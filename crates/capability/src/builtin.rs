//! Built-in capability kinds and their limit guards.

use crate::{CapabilityRegistry, CapabilityType, Context, Guard};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Context key: number of existing items (mailboxes, FTP users, ...).
pub const CONTEXT_CURRENT: &str = "current";
/// Context key: bytes already in use.
pub const CONTEXT_USED_BYTES: &str = "used_bytes";
/// Context key: bytes the operation is about to add.
pub const CONTEXT_REQUESTED_BYTES: &str = "requested_bytes";

/// Disk space available to a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSpaceQuota {
    pub limit_bytes: u64,
}

impl CapabilityType for StorageSpaceQuota {
    const ID: &'static str = "storage_space_quota";
}

/// Outgoing traffic allowed per calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonthlyTrafficQuota {
    pub limit_gb: u32,
}

impl CapabilityType for MonthlyTrafficQuota {
    const ID: &'static str = "monthly_traffic_quota";
}

/// Maximum number of FTP users. `None` (an explicit `null`) is unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FtpUserCount {
    #[serde(deserialize_with = "Option::deserialize")]
    pub limit: Option<u32>,
}

impl CapabilityType for FtpUserCount {
    const ID: &'static str = "ftp_user_count";
}

/// Maximum number of mailboxes. `None` (an explicit `null`) is unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailboxCount {
    #[serde(deserialize_with = "Option::deserialize")]
    pub limit: Option<u32>,
}

impl CapabilityType for MailboxCount {
    const ID: &'static str = "mailbox_count";
}

pub(crate) fn register_kinds(registry: &mut CapabilityRegistry) {
    registry.insert::<StorageSpaceQuota>();
    registry.insert::<MonthlyTrafficQuota>();
    registry.insert::<FtpUserCount>();
    registry.insert::<MailboxCount>();
}

/// Capability kinds that cap a count of items.
pub trait CountLimit: CapabilityType {
    fn limit(&self) -> Option<u32>;
}

impl CountLimit for FtpUserCount {
    fn limit(&self) -> Option<u32> {
        self.limit
    }
}

impl CountLimit for MailboxCount {
    fn limit(&self) -> Option<u32> {
        self.limit
    }
}

/// Read a usage counter. An absent key counts as 0; a value that is not a
/// non-negative integer yields `None` and the guard denies.
fn context_u64(context: &Context, key: &str) -> Option<u64> {
    match context.get(key) {
        None => Some(0),
        Some(value) => {
            let count = value.as_u64();
            if count.is_none() {
                tracing::warn!(key, %value, "malformed usage counter in guard context");
            }
            count
        }
    }
}

/// Allows adding one more item while the current count is below the limit.
pub struct CountLimitGuard<C> {
    _kind: PhantomData<fn() -> C>,
}

impl<C> CountLimitGuard<C> {
    pub fn new() -> Self {
        Self { _kind: PhantomData }
    }
}

impl<C> Default for CountLimitGuard<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CountLimit, T> Guard<T> for CountLimitGuard<C> {
    type Capability = C;

    fn decide(&self, capability: &C, context: &Context, _target: &T) -> bool {
        let Some(current) = context_u64(context, CONTEXT_CURRENT) else {
            return false;
        };
        match capability.limit() {
            Some(limit) => current < u64::from(limit),
            None => true,
        }
    }
}

/// Allows a write while used plus requested bytes stay within the quota.
#[derive(Debug, Default, Clone, Copy)]
pub struct StorageQuotaGuard;

impl<T> Guard<T> for StorageQuotaGuard {
    type Capability = StorageSpaceQuota;

    fn decide(&self, capability: &StorageSpaceQuota, context: &Context, _target: &T) -> bool {
        let (Some(used), Some(requested)) = (
            context_u64(context, CONTEXT_USED_BYTES),
            context_u64(context, CONTEXT_REQUESTED_BYTES),
        ) else {
            return false;
        };
        used.saturating_add(requested) <= capability.limit_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GuardDispatch;
    use serde_json::json;

    fn context(value: serde_json::Value) -> Context {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_count_limit_guard() {
        let guard = CountLimitGuard::<MailboxCount>::new();
        let two = MailboxCount { limit: Some(2) };

        assert!(Guard::<()>::decide(&guard, &two, &context(json!({ "current": 1 })), &()));
        assert!(!Guard::<()>::decide(&guard, &two, &context(json!({ "current": 2 })), &()));
        assert!(Guard::<()>::decide(&guard, &two, &Context::new(), &()));
    }

    #[test]
    fn test_count_limit_unlimited() {
        let guard = CountLimitGuard::<FtpUserCount>::new();
        let unlimited = FtpUserCount { limit: None };
        assert!(Guard::<()>::decide(&guard, &unlimited, &context(json!({ "current": 9999 })), &()));
    }

    #[test]
    fn test_lowered_limit_refuses_account_over_limit() {
        let mut dispatch = GuardDispatch::<()>::new();
        dispatch.register(CountLimitGuard::<MailboxCount>::new());
        let usage = context(json!({ "current": 5 }));

        assert!(dispatch.decide(&MailboxCount { limit: Some(10) }, &usage, &()));
        assert!(!dispatch.decide(&MailboxCount { limit: Some(3) }, &usage, &()));
    }

    #[test]
    fn test_storage_quota_guard() {
        let quota = StorageSpaceQuota { limit_bytes: 100 };
        let guard = StorageQuotaGuard;

        let fits = context(json!({ "used_bytes": 60, "requested_bytes": 40 }));
        let overflows = context(json!({ "used_bytes": 60, "requested_bytes": 41 }));
        assert!(Guard::<()>::decide(&guard, &quota, &fits, &()));
        assert!(!Guard::<()>::decide(&guard, &quota, &overflows, &()));
    }

    #[test]
    fn test_malformed_counters_deny() {
        let mut dispatch = GuardDispatch::<()>::new();
        dispatch
            .register(StorageQuotaGuard)
            .register(CountLimitGuard::<MailboxCount>::new())
            .register(CountLimitGuard::<FtpUserCount>::new());

        let quota = StorageSpaceQuota { limit_bytes: 1000 };
        let fractional = context(json!({ "used_bytes": 900, "requested_bytes": 5000.0 }));
        let negative = context(json!({ "used_bytes": -1, "requested_bytes": 10 }));
        assert!(!dispatch.decide(&quota, &fractional, &()));
        assert!(!dispatch.decide(&quota, &negative, &()));

        let two = MailboxCount { limit: Some(2) };
        assert!(!dispatch.decide(&two, &context(json!({ "current": 7.0 })), &()));
        assert!(!dispatch.decide(&two, &context(json!({ "current": "1" })), &()));

        // even an unlimited kind refuses a counter it cannot read
        let unlimited = FtpUserCount { limit: None };
        assert!(!dispatch.decide(&unlimited, &context(json!({ "current": null })), &()));
        assert!(dispatch.decide(&unlimited, &Context::new(), &()));
    }
}
