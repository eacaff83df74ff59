//! DNS-SD discovery and advertisement for the configuration service.
//!
//! Service types, instances and their endpoints are found through PTR, SRV
//! and TXT queries; instances are registered with a single dynamic update
//! per publish.

pub mod api;
pub mod config;
pub mod daemon;
pub mod discovery;
pub mod dns;
pub mod error;

#[cfg(test)]
pub(crate) mod testing;

pub use discovery::{DnsSd, ServiceDiscovery};
pub use error::{DiscoveryError, Result};
