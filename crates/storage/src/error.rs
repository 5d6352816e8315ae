use crate::{PlanId, SpaceId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Capability(#[from] capability::Error),

    #[error("webhosting plan not found: {0}")]
    PlanNotFound(PlanId),

    #[error("webhosting space not found: {0}")]
    SpaceNotFound(SpaceId),

    /// Only spaces marked for removal can be removed.
    #[error("cannot remove active webhosting space {0}: mark it for removal first")]
    CannotRemoveActiveSpace(SpaceId),

    #[error("webhosting plan {plan} is still assigned to {spaces} space(s)")]
    PlanInUse { plan: PlanId, spaces: usize },

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, Error>;
