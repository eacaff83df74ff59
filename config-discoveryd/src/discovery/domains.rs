use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use shared::protocol::{qualify, BROWSING_PREFIX, REGISTRATION_PREFIX};
use crate::config::DnsSdConfig;
use crate::dns::Resolver;
use crate::error::{DiscoveryError, Result};
use super::{collect_successes, dedup_in_order, FailureSink};

/// Source of the local addresses that get reverse-resolved into hostnames.
pub type AddressSource = fn() -> io::Result<Vec<IpAddr>>;

/// Works out which domains to browse and register in.
///
/// Each list is either pinned by configuration or derived again on every
/// call. Individual lookup failures are reported to the sink and skipped.
pub struct DiscoveryDomains<R> {
    resolver: Arc<R>,
    sink: Arc<dyn FailureSink>,
    browsing: Option<Vec<String>>,
    registration: Option<Vec<String>>,
    hostnames: Option<Vec<String>>,
    local_addresses: AddressSource,
}

impl<R: Resolver> DiscoveryDomains<R> {
    pub fn new(resolver: Arc<R>, sink: Arc<dyn FailureSink>, config: &DnsSdConfig) -> Self {
        Self {
            resolver,
            sink,
            browsing: config.browsing_domains.clone(),
            registration: config.registration_domains.clone(),
            hostnames: config.hostnames.clone(),
            local_addresses: external_interface_addresses,
        }
    }

    pub fn with_local_addresses(mut self, source: AddressSource) -> Self {
        self.local_addresses = source;
        self
    }

    /// Domains of this host, found by reverse-resolving its interface
    /// addresses and dropping the host label: `node2.example.com` yields
    /// `example.com`.
    pub async fn hostnames(&self) -> Result<Vec<String>> {
        if let Some(hostnames) = &self.hostnames {
            return Ok(hostnames.clone());
        }

        let addresses = (self.local_addresses)().map_err(DiscoveryError::Interfaces)?;
        tracing::debug!("Reverse resolving {} local addresses", addresses.len());

        let results = self.resolver.reverse_all(&addresses).await;
        let names = collect_successes(self.sink.as_ref(), &addresses, results);

        let hostnames = names
            .iter()
            .filter_map(|name| name.trim_end_matches('.').split_once('.'))
            .map(|(_host, domain)| domain.to_string())
            .filter(|domain| !domain.is_empty())
            .collect();
        Ok(dedup_in_order(hostnames))
    }

    pub async fn browsing_domains(&self) -> Result<Vec<String>> {
        match &self.browsing {
            Some(domains) => Ok(domains.clone()),
            None => self.enumerate(BROWSING_PREFIX).await,
        }
    }

    pub async fn registration_domains(&self) -> Result<Vec<String>> {
        match &self.registration {
            Some(domains) => Ok(domains.clone()),
            None => self.enumerate(REGISTRATION_PREFIX).await,
        }
    }

    /// PTR lookup of `<prefix>.<hostname>` for every hostname.
    async fn enumerate(&self, prefix: &str) -> Result<Vec<String>> {
        let names: Vec<String> = self
            .hostnames()
            .await?
            .iter()
            .map(|hostname| qualify(prefix, hostname))
            .collect();

        let results = self.resolver.resolve_ptrs(&names).await;
        let domains = collect_successes(self.sink.as_ref(), &names, results)
            .into_iter()
            .flatten()
            .map(|domain| domain.trim_end_matches('.').to_string())
            .filter(|domain| !domain.is_empty())
            .collect();
        Ok(dedup_in_order(domains))
    }
}

/// Addresses of all non-loopback network interfaces.
pub fn external_interface_addresses() -> io::Result<Vec<IpAddr>> {
    Ok(if_addrs::get_if_addrs()?
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .map(|iface| iface.ip())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use crate::testing::{MockResolver, RecordingSink};

    fn three_addresses() -> io::Result<Vec<IpAddr>> {
        Ok(vec![
            IpAddr::V4(Ipv4Addr::new(192, 168, 0, 2)),
            IpAddr::V4(Ipv4Addr::new(192, 168, 0, 3)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)),
        ])
    }

    fn no_interfaces() -> io::Result<Vec<IpAddr>> {
        Err(io::Error::new(io::ErrorKind::Other, "no interfaces"))
    }

    fn dynamic(resolver: MockResolver, sink: Arc<RecordingSink>) -> DiscoveryDomains<MockResolver> {
        DiscoveryDomains::new(Arc::new(resolver), sink, &DnsSdConfig::default())
            .with_local_addresses(three_addresses)
    }

    #[tokio::test]
    async fn test_hostnames_drop_failed_reverse_lookups() {
        let resolver = MockResolver::new()
            .with_reverse("192.168.0.2".parse().unwrap(), "node2.example.arrowhead.eu.")
            .with_reverse("10.0.0.7".parse().unwrap(), "gw.lab.example.com.");
        let sink = Arc::new(RecordingSink::default());
        let domains = dynamic(resolver, sink.clone());

        let hostnames = domains.hostnames().await.unwrap();
        assert_eq!(hostnames, vec!["example.arrowhead.eu", "lab.example.com"]);

        let failures = sink.items();
        assert_eq!(failures, vec!["192.168.0.3".to_string()], "Failure should be reported, not raised");
    }

    #[tokio::test]
    async fn test_hostnames_deduplicate_and_skip_single_labels() {
        let resolver = MockResolver::new()
            .with_reverse("192.168.0.2".parse().unwrap(), "node2.example.com.")
            .with_reverse("192.168.0.3".parse().unwrap(), "node3.example.com.")
            .with_reverse("10.0.0.7".parse().unwrap(), "localhost.");
        let sink = Arc::new(RecordingSink::default());
        let domains = dynamic(resolver, sink.clone());

        assert_eq!(domains.hostnames().await.unwrap(), vec!["example.com"]);
        assert!(sink.items().is_empty());
    }

    #[tokio::test]
    async fn test_hostnames_fail_without_interfaces() {
        let domains = DiscoveryDomains::new(
            Arc::new(MockResolver::new()),
            Arc::new(RecordingSink::default()),
            &DnsSdConfig::default(),
        )
        .with_local_addresses(no_interfaces);

        let err = domains.hostnames().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Interfaces(_)));
    }

    #[tokio::test]
    async fn test_browsing_and_registration_domains_are_enumerated() {
        let resolver = MockResolver::new()
            .with_reverse("192.168.0.2".parse().unwrap(), "node2.example.com.")
            .with_reverse("10.0.0.7".parse().unwrap(), "gw.lab.example.com.")
            .with_ptr("b._dns-sd._udp.example.com.", &["example.com.", "services.example.com."])
            .failing("b._dns-sd._udp.lab.example.com.")
            .with_ptr("r._dns-sd._udp.example.com.", &["example.com."])
            .with_ptr("r._dns-sd._udp.lab.example.com.", &["lab.example.com."]);
        let sink = Arc::new(RecordingSink::default());
        let domains = dynamic(resolver, sink.clone());

        let browsing = domains.browsing_domains().await.unwrap();
        assert_eq!(browsing, vec!["example.com", "services.example.com"]);
        assert!(sink.items().contains(&"b._dns-sd._udp.lab.example.com.".to_string()));

        let registration = domains.registration_domains().await.unwrap();
        assert_eq!(registration, vec!["example.com", "lab.example.com"]);
    }

    #[tokio::test]
    async fn test_configured_lists_are_not_resolved() {
        let config = DnsSdConfig {
            browsing_domains: Some(vec!["browse.example.com".to_string()]),
            registration_domains: Some(vec!["register.example.com".to_string()]),
            hostnames: Some(vec!["example.com".to_string()]),
            name_server_addresses: None,
        };
        let resolver = Arc::new(MockResolver::new());
        let domains = DiscoveryDomains::new(resolver.clone(), Arc::new(RecordingSink::default()), &config)
            .with_local_addresses(no_interfaces);

        assert_eq!(domains.hostnames().await.unwrap(), vec!["example.com"]);
        assert_eq!(domains.browsing_domains().await.unwrap(), vec!["browse.example.com"]);
        assert_eq!(domains.registration_domains().await.unwrap(), vec!["register.example.com"]);
        assert!(resolver.queries().is_empty());
    }

    #[tokio::test]
    async fn test_configured_hostnames_drive_enumeration() {
        let config = DnsSdConfig {
            hostnames: Some(vec!["example.com".to_string()]),
            ..DnsSdConfig::default()
        };
        let resolver = MockResolver::new().with_ptr("b._dns-sd._udp.example.com.", &["example.com."]);
        let domains = DiscoveryDomains::new(Arc::new(resolver), Arc::new(RecordingSink::default()), &config)
            .with_local_addresses(no_interfaces);

        assert_eq!(domains.browsing_domains().await.unwrap(), vec!["example.com"]);
    }
}
