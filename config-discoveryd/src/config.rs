use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use serde::Deserialize;
use anyhow::{Context, Result};
use shared::protocol::CONFIGURATION_SERVICE_TYPE;
use shared::types::{ServiceIdentifier, ServiceRecord, ServiceType};

const DNS_PORT: u16 = 53;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dnssd: DnsSdConfig,
    pub instance: InstanceConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// DNS-SD settings. Every list that is given replaces the corresponding
/// lookup with a fixed value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DnsSdConfig {
    pub browsing_domains: Option<Vec<String>>,
    pub registration_domains: Option<Vec<String>>,
    /// Domains of this host; otherwise derived from reverse lookups of the
    /// local interface addresses
    pub hostnames: Option<Vec<String>>,
    /// `ip` or `ip:port`; otherwise the system name servers are used
    pub name_server_addresses: Option<Vec<String>>,
}

/// The configuration service instance this daemon publishes.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    /// Defaults to "configuration-<system hostname>"
    #[serde(default)]
    pub name: Option<String>,
    pub endpoint: String,
    pub port: u16,
    /// Defaults to the first registration domain
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "[::]:8053".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }
}

impl DnsSdConfig {
    /// Configured name servers, if any.
    pub fn name_servers(&self) -> Result<Option<Vec<SocketAddr>>> {
        let Some(addresses) = &self.name_server_addresses else {
            return Ok(None);
        };

        addresses
            .iter()
            .map(|address| parse_name_server(address))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

fn parse_name_server(address: &str) -> Result<SocketAddr> {
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DNS_PORT));
    }
    address
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid name server address: {}", address))
}

impl InstanceConfig {
    pub fn instance_name(&self) -> Result<String> {
        if let Some(name) = &self.name {
            return Ok(name.clone());
        }
        let hostname = hostname::get()
            .context("Failed to get system hostname")?
            .to_string_lossy()
            .to_string();
        Ok(format!("configuration-{}", hostname))
    }

    /// The record to publish. An unset domain is left empty so that
    /// publishing picks a registration domain.
    pub fn to_record(&self) -> Result<ServiceRecord> {
        let service_type = ServiceType::new(
            CONFIGURATION_SERVICE_TYPE,
            self.domain.clone().unwrap_or_default(),
        );
        let identifier = ServiceIdentifier::new(self.instance_name()?, service_type);
        Ok(ServiceRecord::new(
            identifier,
            self.endpoint.clone(),
            self.port,
            self.metadata.clone(),
        ))
    }
}
