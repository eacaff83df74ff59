//! Error types for service discovery.

use crate::dns::ResolveError;

/// Result type alias.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Failure of a discovery operation.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// DNS transport or server failure, passed through unmodified.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// No SRV record exists for the looked up instance.
    #[error("no service instance registered at {name}")]
    NoInstance { name: String },

    /// The selector was handed an empty candidate set.
    #[error(transparent)]
    NoCandidates(#[from] NoCandidates),

    /// Publish prerequisite failed: the instance name is already in use.
    #[error("service instance {name} is already registered")]
    Conflict { name: String },

    /// Unpublish prerequisite failed: the instance name is not in use.
    #[error("service instance {name} is not registered")]
    NotPublished { name: String },

    /// The server refused an update for another reason.
    #[error("update of zone {zone} rejected: {reason}")]
    UpdateRejected { zone: String, reason: String },

    /// A record without a domain was published and no registration domain is known.
    #[error("no registration domain available for {name}")]
    NoRegistrationDomain { name: String },

    /// Local network interfaces could not be listed.
    #[error("failed to list network interfaces: {0}")]
    Interfaces(#[source] std::io::Error),
}

/// Weighted selection over an empty SRV set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no SRV candidates to select from")]
pub struct NoCandidates;
