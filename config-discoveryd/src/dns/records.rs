use std::collections::HashMap;

/// SRV payload: where an instance can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Srv {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

impl Srv {
    pub fn new(priority: u16, weight: u16, port: u16, target: impl Into<String>) -> Self {
        Self {
            priority,
            weight,
            port,
            target: target.into(),
        }
    }
}

/// TXT payload: a list of `key=value` or bare `key` attribute strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Txt(pub Vec<String>);

impl Txt {
    /// One entry per key. Empty values are written as bare keys. An empty map
    /// yields a single empty string, since RFC 6763 §6.1 forbids TXT records
    /// with no strings.
    pub fn from_attributes(attributes: &HashMap<String, String>) -> Self {
        if attributes.is_empty() {
            return Self(vec![String::new()]);
        }
        let mut entries: Vec<String> = attributes
            .iter()
            .map(|(key, value)| {
                if value.is_empty() {
                    key.clone()
                } else {
                    format!("{}={}", key, value)
                }
            })
            .collect();
        entries.sort();
        Self(entries)
    }

    /// Splits every entry on its first `=`; a bare key maps to an empty value.
    /// On duplicate keys the later entry wins.
    pub fn into_attributes(self) -> HashMap<String, String> {
        self.0
            .into_iter()
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (entry, String::new()),
            })
            .collect()
    }
}

/// Record payloads used by DNS-SD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    Ptr(String),
    Srv(Srv),
    Txt(Txt),
}

/// An IN-class resource record. The record type follows from `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    pub ttl: u32,
    pub data: RData,
}

impl ResourceRecord {
    pub fn record_type(&self) -> &'static str {
        match self.data {
            RData::Ptr(_) => "PTR",
            RData::Srv(_) => "SRV",
            RData::Txt(_) => "TXT",
        }
    }

    pub fn ptr(name: impl Into<String>, ttl: u32, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl,
            data: RData::Ptr(target.into()),
        }
    }

    pub fn srv(name: impl Into<String>, ttl: u32, srv: Srv) -> Self {
        Self {
            name: name.into(),
            ttl,
            data: RData::Srv(srv),
        }
    }

    pub fn txt(name: impl Into<String>, ttl: u32, txt: Txt) -> Self {
        Self {
            name: name.into(),
            ttl,
            data: RData::Txt(txt),
        }
    }
}

/// Prerequisite section entry of a dynamic update (RFC 2136 §2.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prerequisite {
    /// No RRset of any type exists at the name
    NameAbsent(String),
    /// At least one RRset exists at the name
    NamePresent(String),
}

/// Update section entry of a dynamic update (RFC 2136 §2.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Add(ResourceRecord),
    /// Delete one record matching name, type and payload
    Delete(ResourceRecord),
    /// Delete every RRset at the name
    DeleteName(String),
}

/// A dynamic update transaction. The server applies all of it or none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateMessage {
    pub zone: String,
    pub prerequisites: Vec<Prerequisite>,
    pub updates: Vec<Update>,
}

impl UpdateMessage {
    pub fn builder() -> UpdateBuilder {
        UpdateBuilder::default()
    }

    /// Records added by this transaction.
    pub fn additions(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.updates.iter().filter_map(|update| match update {
            Update::Add(record) => Some(record),
            _ => None,
        })
    }
}

#[derive(Debug, Default)]
pub struct UpdateBuilder {
    zone: String,
    prerequisites: Vec<Prerequisite>,
    updates: Vec<Update>,
}

impl UpdateBuilder {
    pub fn zone(mut self, domain: impl Into<String>) -> Self {
        self.zone = domain.into();
        self
    }

    pub fn absent(mut self, name: impl Into<String>) -> Self {
        self.prerequisites.push(Prerequisite::NameAbsent(name.into()));
        self
    }

    pub fn present(mut self, name: impl Into<String>) -> Self {
        self.prerequisites.push(Prerequisite::NamePresent(name.into()));
        self
    }

    pub fn update(mut self, records: impl IntoIterator<Item = ResourceRecord>) -> Self {
        self.updates.extend(records.into_iter().map(Update::Add));
        self
    }

    pub fn delete(mut self, records: impl IntoIterator<Item = ResourceRecord>) -> Self {
        self.updates.extend(records.into_iter().map(Update::Delete));
        self
    }

    pub fn delete_name(mut self, name: impl Into<String>) -> Self {
        self.updates.push(Update::DeleteName(name.into()));
        self
    }

    pub fn build(self) -> UpdateMessage {
        UpdateMessage {
            zone: self.zone,
            prerequisites: self.prerequisites,
            updates: self.updates,
        }
    }
}

/// Server verdict on an update transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// YXDOMAIN: a name required to be absent exists
    NameExists,
    /// NXDOMAIN: a name required to be present does not exist
    NameMissing,
    /// Any other response code
    Rejected(String),
}
