use std::net::IpAddr;
use async_trait::async_trait;
use futures::future::join_all;
use super::records::{Srv, Txt, UpdateMessage, UpdateOutcome};

/// Failure of a single DNS query or update exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid domain name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("no {record_type} records found for {name}")]
    NotFound { name: String, record_type: &'static str },

    #[error("server answered {code} for {name}")]
    Server { name: String, code: String },

    #[error("DNS transport failure: {0}")]
    Transport(String),
}

impl ResolveError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// DNS transport used by service discovery.
///
/// Every call is an independent exchange; batch methods return one result
/// slot per input so that a single failing name does not hide the others.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// PTR targets at `name`.
    async fn resolve_ptr(&self, name: &str) -> Result<Vec<String>, ResolveError>;

    async fn resolve_srv(&self, name: &str) -> Result<Vec<Srv>, ResolveError>;

    async fn resolve_txt(&self, name: &str) -> Result<Vec<Txt>, ResolveError>;

    /// Name pointed to by the reverse mapping of `address`.
    async fn reverse(&self, address: IpAddr) -> Result<String, ResolveError>;

    /// Submits a dynamic update transaction.
    async fn send(&self, message: UpdateMessage) -> Result<UpdateOutcome, ResolveError>;

    async fn resolve_ptrs(&self, names: &[String]) -> Vec<Result<Vec<String>, ResolveError>> {
        join_all(names.iter().map(|name| self.resolve_ptr(name))).await
    }

    async fn reverse_all(&self, addresses: &[IpAddr]) -> Vec<Result<String, ResolveError>> {
        join_all(addresses.iter().map(|address| self.reverse(*address))).await
    }
}
