pub mod dnssd;
pub mod domains;
pub mod select;

use async_trait::async_trait;
use shared::types::{ServiceIdentifier, ServiceRecord, ServiceType};
use crate::dns::ResolveError;
use crate::error::Result;

pub use dnssd::DnsSd;
pub use domains::DiscoveryDomains;

/// Discovery and advertisement of service instances.
///
/// Implementations keep no state between calls; every operation is a fresh
/// round of queries or one update transaction.
#[async_trait]
pub trait ServiceDiscovery: Send + Sync {
    /// Service types registered in any browsing domain.
    async fn lookup_types(&self) -> Result<Vec<ServiceType>>;

    /// Instances of `service_type`.
    async fn lookup_identifiers(&self, service_type: &ServiceType) -> Result<Vec<ServiceIdentifier>>;

    /// Endpoint and metadata of one instance.
    async fn lookup_record(&self, identifier: &ServiceIdentifier) -> Result<ServiceRecord>;

    /// Registers `record`, failing with a conflict if its name is taken.
    async fn publish(&self, record: &ServiceRecord) -> Result<()>;

    /// Removes a registration made by [`ServiceDiscovery::publish`].
    async fn unpublish(&self, record: &ServiceRecord) -> Result<()>;
}

/// Receives the per-item failures that batch operations drop.
pub trait FailureSink: Send + Sync {
    fn report(&self, item: &str, error: &ResolveError);
}

/// Logs dropped failures as warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn report(&self, item: &str, error: &ResolveError) {
        tracing::warn!("Ignoring failed lookup of {}: {}", item, error);
    }
}

/// Keeps the successful results, reporting every failure to `sink`.
/// `items` and `results` are paired by position.
pub(crate) fn collect_successes<I, T>(
    sink: &dyn FailureSink,
    items: &[I],
    results: Vec<std::result::Result<T, ResolveError>>,
) -> Vec<T>
where
    I: std::fmt::Display,
{
    items
        .iter()
        .zip(results)
        .filter_map(|(item, result)| match result {
            Ok(value) => Some(value),
            Err(e) => {
                sink.report(&item.to_string(), &e);
                None
            }
        })
        .collect()
}

/// Removes repeated entries, keeping the first occurrence of each.
pub(crate) fn dedup_in_order(values: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}
