use std::collections::HashMap;
use std::fmt;
use serde::{Serialize, Deserialize};

/// A DNS-SD service type within a domain, e.g. `_http._tcp` in `example.com`.
///
/// Parsing is permissive and never fails. Labels are scanned from the right
/// and the hostname extends until the first label that starts with `_`; a name
/// without any such label is all hostname and has an empty service type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceType {
    /// Underscore labels, e.g. "_http._tcp"
    service_type: String,

    /// Domain the type is registered in, e.g. "example.com"
    hostname: String,
}

impl ServiceType {
    pub fn new(service_type: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            hostname: hostname.into(),
        }
    }

    /// Dissects a wire name such as `_http._tcp.example.com.`.
    pub fn parse(name: &str) -> Self {
        let (service_type, hostname) = split_service_type(name);
        Self { service_type, hostname }
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn to_wire_name(&self) -> String {
        wire_name(&[&self.service_type, &self.hostname])
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire_name())
    }
}

impl From<&ServiceIdentifier> for ServiceType {
    fn from(id: &ServiceIdentifier) -> Self {
        Self::new(id.service_type.clone(), id.hostname.clone())
    }
}

/// A named instance of a service type, e.g. `cfg1._http._tcp.example.com.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceIdentifier {
    /// Leftmost label naming the instance
    service_name: String,
    service_type: String,
    hostname: String,
}

impl ServiceIdentifier {
    pub fn new(service_name: impl Into<String>, service_type: ServiceType) -> Self {
        Self {
            service_name: service_name.into(),
            service_type: service_type.service_type,
            hostname: service_type.hostname,
        }
    }

    /// Dissects a wire name such as `cfg1._http._tcp.example.com.`.
    ///
    /// The instance name is everything before the first dot of the computed
    /// service type. A type without any dot leaves the instance name empty.
    pub fn parse(name: &str) -> Self {
        let (full_type, hostname) = split_service_type(name);
        let (service_name, service_type) = match full_type.split_once('.') {
            Some((service_name, service_type)) => (service_name.to_string(), service_type.to_string()),
            None => (String::new(), full_type),
        };
        Self { service_name, service_type, hostname }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn to_type(&self) -> ServiceType {
        ServiceType::from(self)
    }

    /// Copy of this identifier registered in another domain.
    pub fn in_domain(&self, hostname: impl Into<String>) -> Self {
        Self {
            service_name: self.service_name.clone(),
            service_type: self.service_type.clone(),
            hostname: hostname.into(),
        }
    }

    pub fn to_wire_name(&self) -> String {
        wire_name(&[&self.service_name, &self.service_type, &self.hostname])
    }
}

impl fmt::Display for ServiceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire_name())
    }
}

impl From<&ServiceRecord> for ServiceIdentifier {
    fn from(record: &ServiceRecord) -> Self {
        record.identifier.clone()
    }
}

/// A resolved service instance: where to reach it and its TXT metadata.
/// Built per lookup from the SRV and TXT records of one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    #[serde(flatten)]
    identifier: ServiceIdentifier,

    /// Target host of the selected SRV record
    endpoint: String,

    port: u16,

    /// TXT record key-value pairs
    metadata: HashMap<String, String>,
}

impl ServiceRecord {
    pub fn new(
        identifier: ServiceIdentifier,
        endpoint: impl Into<String>,
        port: u16,
        metadata: HashMap<String, String>,
    ) -> Self {
        Self {
            identifier,
            endpoint: endpoint.into(),
            port,
            metadata,
        }
    }

    pub fn identifier(&self) -> &ServiceIdentifier {
        &self.identifier
    }

    pub fn service_name(&self) -> &str {
        self.identifier.service_name()
    }

    pub fn service_type(&self) -> &str {
        self.identifier.service_type()
    }

    pub fn hostname(&self) -> &str {
        self.identifier.hostname()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Copy of this record registered in another domain.
    pub fn in_domain(&self, hostname: impl Into<String>) -> Self {
        Self {
            identifier: self.identifier.in_domain(hostname),
            endpoint: self.endpoint.clone(),
            port: self.port,
            metadata: self.metadata.clone(),
        }
    }

    pub fn to_wire_name(&self) -> String {
        self.identifier.to_wire_name()
    }
}

impl fmt::Display for ServiceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{endpoint={},port={}", self.identifier, self.endpoint, self.port)?;
        let mut keys: Vec<&String> = self.metadata.keys().collect();
        keys.sort();
        for key in keys {
            match self.metadata[key].as_str() {
                "" => write!(f, ",{}", key)?,
                value => write!(f, ",{}={}", key, value)?,
            }
        }
        f.write_str("}")
    }
}

/// Splits a name into `(service_type, hostname)` at the rightmost label that
/// starts with `_`. Trailing dots are ignored.
fn split_service_type(name: &str) -> (String, String) {
    let name = name.trim_end_matches('.');
    let labels: Vec<&str> = name.split('.').collect();
    let boundary = labels
        .iter()
        .rposition(|label| label.starts_with('_'))
        .map_or(0, |i| i + 1);
    (labels[..boundary].join("."), labels[boundary..].join("."))
}

fn wire_name(parts: &[&str]) -> String {
    let mut name = String::new();
    for part in parts.iter().filter(|part| !part.is_empty()) {
        name.push_str(part);
        name.push('.');
    }
    name
}
