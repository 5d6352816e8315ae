use capability::CapabilityId;
use storage::{PlanId, SpaceId};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    /// A guard refused the operation for the space's current capabilities.
    #[error("capability limit reached: {capability} on space {space}")]
    CapabilityLimitReached { space: SpaceId, capability: CapabilityId },

    #[error("webhosting plan already exists: {0}")]
    PlanExists(PlanId),

    #[error("webhosting space already exists: {0}")]
    SpaceExists(SpaceId),

    #[error(transparent)]
    Storage(#[from] storage::Error),

    #[error(transparent)]
    Capability(#[from] capability::Error),

    #[error(transparent)]
    Policy(#[from] policy::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
