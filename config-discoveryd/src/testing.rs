//! In-memory DNS used by unit tests.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Mutex;
use async_trait::async_trait;
use crate::discovery::FailureSink;
use crate::dns::records::{Prerequisite, Update};
use crate::dns::{ResolveError, Resolver, Srv, Txt, UpdateMessage, UpdateOutcome};

fn key(name: &str) -> String {
    name.trim_end_matches('.').to_string()
}

/// Answers queries from fixed tables and applies updates to a set of
/// registered names, honouring name prerequisites the way a server would.
#[derive(Default)]
pub struct MockResolver {
    ptr: HashMap<String, Vec<String>>,
    srv: HashMap<String, Vec<Srv>>,
    txt: HashMap<String, Vec<Txt>>,
    reverse: HashMap<IpAddr, String>,
    failing: HashSet<String>,
    outcome: Option<UpdateOutcome>,
    names: Mutex<HashSet<String>>,
    sent: Mutex<Vec<UpdateMessage>>,
    queries: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ptr(mut self, name: &str, targets: &[&str]) -> Self {
        self.ptr.insert(key(name), targets.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn with_srv(mut self, name: &str, records: Vec<Srv>) -> Self {
        self.srv.insert(key(name), records);
        self
    }

    pub fn with_txt(mut self, name: &str, records: Vec<Txt>) -> Self {
        self.txt.insert(key(name), records);
        self
    }

    pub fn with_reverse(mut self, address: IpAddr, name: &str) -> Self {
        self.reverse.insert(address, name.to_string());
        self
    }

    /// Queries of `name` fail with a transport error.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(key(name));
        self
    }

    /// Every update is answered with `outcome` instead of being applied.
    pub fn with_outcome(mut self, outcome: UpdateOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn sent(&self) -> Vec<UpdateMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn lookup<T: Clone>(
        &self,
        table: &HashMap<String, Vec<T>>,
        name: &str,
        record_type: &'static str,
    ) -> Result<Vec<T>, ResolveError> {
        self.queries.lock().unwrap().push(name.to_string());
        let name = key(name);
        if self.failing.contains(&name) {
            return Err(ResolveError::transport(format!("timed out querying {}", name)));
        }
        table
            .get(&name)
            .cloned()
            .ok_or(ResolveError::NotFound { name, record_type })
    }

    fn apply(&self, message: &UpdateMessage) -> UpdateOutcome {
        let mut names = self.names.lock().unwrap();
        for prerequisite in &message.prerequisites {
            match prerequisite {
                Prerequisite::NameAbsent(name) if names.contains(&key(name)) => return UpdateOutcome::NameExists,
                Prerequisite::NamePresent(name) if !names.contains(&key(name)) => return UpdateOutcome::NameMissing,
                _ => {}
            }
        }
        for update in &message.updates {
            match update {
                Update::Add(record) => {
                    names.insert(key(&record.name));
                }
                Update::DeleteName(name) => {
                    names.remove(&key(name));
                }
                Update::Delete(_) => {}
            }
        }
        UpdateOutcome::Applied
    }
}

#[async_trait]
impl Resolver for MockResolver {
    async fn resolve_ptr(&self, name: &str) -> Result<Vec<String>, ResolveError> {
        self.lookup(&self.ptr, name, "PTR")
    }

    async fn resolve_srv(&self, name: &str) -> Result<Vec<Srv>, ResolveError> {
        self.lookup(&self.srv, name, "SRV")
    }

    async fn resolve_txt(&self, name: &str) -> Result<Vec<Txt>, ResolveError> {
        self.lookup(&self.txt, name, "TXT")
    }

    async fn reverse(&self, address: IpAddr) -> Result<String, ResolveError> {
        self.queries.lock().unwrap().push(address.to_string());
        self.reverse.get(&address).cloned().ok_or(ResolveError::NotFound {
            name: address.to_string(),
            record_type: "PTR",
        })
    }

    async fn send(&self, message: UpdateMessage) -> Result<UpdateOutcome, ResolveError> {
        let outcome = match &self.outcome {
            Some(outcome) => outcome.clone(),
            None => self.apply(&message),
        };
        self.sent.lock().unwrap().push(message);
        Ok(outcome)
    }
}

/// Keeps every reported failure.
#[derive(Default)]
pub struct RecordingSink {
    failures: Mutex<Vec<(String, ResolveError)>>,
}

impl RecordingSink {
    pub fn items(&self) -> Vec<String> {
        self.failures
            .lock()
            .unwrap()
            .iter()
            .map(|(item, _)| item.clone())
            .collect()
    }
}

impl FailureSink for RecordingSink {
    fn report(&self, item: &str, error: &ResolveError) {
        self.failures.lock().unwrap().push((item.to_string(), error.clone()));
    }
}
