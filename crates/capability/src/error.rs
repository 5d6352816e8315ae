//! Capability error types.

use crate::CapabilityId;
use thiserror::Error;

/// Capability errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No constructor is registered for the capability id.
    ///
    /// This is a configuration error: every id that can appear in stored
    /// data must be registered when the registry is built.
    #[error("capability not registered: {id}")]
    NotRegistered { id: CapabilityId },

    /// A constructor for the id was already registered.
    #[error("capability already registered: {id}")]
    AlreadyRegistered { id: CapabilityId },

    /// The capability was required but is not part of the set.
    #[error("capability not in set: {id}")]
    NotInSet { id: CapabilityId },

    /// The configuration payload does not describe a valid capability.
    #[error("invalid configuration for capability {id}: {reason}")]
    InvalidConfiguration { id: CapabilityId, reason: String },

    /// Failed to parse a serialized capability set.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
