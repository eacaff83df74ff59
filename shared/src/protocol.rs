/// DNS-SD service type advertised by configuration service instances
pub const CONFIGURATION_SERVICE_TYPE: &str = "_ahf-Configuration._http._tcp";

/// Meta-query name prefix used to enumerate the service types of a domain
pub const SERVICES_PREFIX: &str = "_services._dns-sd._udp";

/// Domain enumeration prefix for browsing domains
pub const BROWSING_PREFIX: &str = "b._dns-sd._udp";

/// Domain enumeration prefix for registration domains
pub const REGISTRATION_PREFIX: &str = "r._dns-sd._udp";

/// TTL in seconds of every record written by a publish
pub const PUBLISHED_TTL: u32 = 3600;

/// API path prefix
pub const API_PREFIX: &str = "/v1";

/// Joins `prefix` and `domain` into a fully qualified name.
pub fn qualify(prefix: &str, domain: &str) -> String {
    let domain = domain.trim_end_matches('.');
    match (prefix.is_empty(), domain.is_empty()) {
        (true, _) => format!("{}.", domain),
        (false, true) => format!("{}.", prefix),
        (false, false) => format!("{}.{}.", prefix, domain),
    }
}
