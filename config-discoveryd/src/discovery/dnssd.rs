use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use shared::protocol::{qualify, PUBLISHED_TTL, SERVICES_PREFIX};
use shared::types::{ServiceIdentifier, ServiceRecord, ServiceType};
use crate::config::DnsSdConfig;
use crate::dns::{ResolveError, Resolver, ResourceRecord, Srv, Txt, UpdateMessage, UpdateOutcome};
use crate::error::{DiscoveryError, Result};
use super::domains::DiscoveryDomains;
use super::select::select;
use super::{collect_successes, FailureSink, ServiceDiscovery, TracingSink};

/// [`ServiceDiscovery`] over DNS-SD records and dynamic updates.
pub struct DnsSd<R> {
    resolver: Arc<R>,
    domains: DiscoveryDomains<R>,
    sink: Arc<dyn FailureSink>,
}

impl<R: Resolver> DnsSd<R> {
    pub fn new(resolver: Arc<R>, config: &DnsSdConfig) -> Self {
        Self::with_sink(resolver, config, Arc::new(TracingSink))
    }

    pub fn with_sink(resolver: Arc<R>, config: &DnsSdConfig, sink: Arc<dyn FailureSink>) -> Self {
        Self {
            domains: DiscoveryDomains::new(resolver.clone(), sink.clone(), config),
            resolver,
            sink,
        }
    }

    /// `record` itself, or a copy placed in the first registration domain
    /// when it names no domain.
    pub async fn place(&self, record: &ServiceRecord) -> Result<ServiceRecord> {
        if !record.hostname().is_empty() {
            return Ok(record.clone());
        }

        let domain = self
            .domains
            .registration_domains()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DiscoveryError::NoRegistrationDomain {
                name: record.to_wire_name(),
            })?;
        tracing::debug!("Placing {} in registration domain {}", record.identifier(), domain);
        Ok(record.in_domain(domain))
    }
}

#[async_trait]
impl<R: Resolver> ServiceDiscovery for DnsSd<R> {
    async fn lookup_types(&self) -> Result<Vec<ServiceType>> {
        let names: Vec<String> = self
            .domains
            .browsing_domains()
            .await?
            .iter()
            .map(|domain| qualify(SERVICES_PREFIX, domain))
            .collect();

        let results = self.resolver.resolve_ptrs(&names).await;
        Ok(collect_successes(self.sink.as_ref(), &names, results)
            .into_iter()
            .flatten()
            .map(|name| ServiceType::parse(&name))
            .collect())
    }

    async fn lookup_identifiers(&self, service_type: &ServiceType) -> Result<Vec<ServiceIdentifier>> {
        let targets = match self.resolver.resolve_ptr(&service_type.to_wire_name()).await {
            Ok(targets) => targets,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(targets.iter().map(|name| ServiceIdentifier::parse(name)).collect())
    }

    async fn lookup_record(&self, identifier: &ServiceIdentifier) -> Result<ServiceRecord> {
        let name = identifier.to_wire_name();
        let (srv, txt) = tokio::join!(self.resolver.resolve_srv(&name), self.resolver.resolve_txt(&name));
        let srv = found_or_empty(srv)?;
        let txt = found_or_empty(txt)?;

        if srv.is_empty() {
            return Err(DiscoveryError::NoInstance { name });
        }
        let selected = select(&srv)?;

        Ok(ServiceRecord::new(
            identifier.clone(),
            selected.target.trim_end_matches('.'),
            selected.port,
            merge_attributes(txt),
        ))
    }

    async fn publish(&self, record: &ServiceRecord) -> Result<()> {
        let record = self.place(record).await?;
        let message = publish_message(&record);
        let zone = message.zone.clone();

        match self.resolver.send(message).await? {
            UpdateOutcome::Applied => {
                tracing::info!("Published {} in zone {}", record, zone);
                Ok(())
            }
            UpdateOutcome::NameExists => Err(DiscoveryError::Conflict {
                name: record.to_wire_name(),
            }),
            UpdateOutcome::NameMissing => Err(DiscoveryError::UpdateRejected {
                zone,
                reason: "NXDOMAIN".to_string(),
            }),
            UpdateOutcome::Rejected(reason) => Err(DiscoveryError::UpdateRejected { zone, reason }),
        }
    }

    async fn unpublish(&self, record: &ServiceRecord) -> Result<()> {
        let record = self.place(record).await?;
        let message = unpublish_message(&record);
        let zone = message.zone.clone();

        match self.resolver.send(message).await? {
            UpdateOutcome::Applied => {
                tracing::info!("Unpublished {} from zone {}", record.identifier(), zone);
                Ok(())
            }
            UpdateOutcome::NameMissing => Err(DiscoveryError::NotPublished {
                name: record.to_wire_name(),
            }),
            UpdateOutcome::NameExists => Err(DiscoveryError::UpdateRejected {
                zone,
                reason: "YXDOMAIN".to_string(),
            }),
            UpdateOutcome::Rejected(reason) => Err(DiscoveryError::UpdateRejected { zone, reason }),
        }
    }
}

fn found_or_empty<T>(result: std::result::Result<Vec<T>, ResolveError>) -> Result<Vec<T>> {
    match result {
        Ok(values) => Ok(values),
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Folds TXT records in order; later records overwrite earlier keys.
fn merge_attributes(txt: Vec<Txt>) -> HashMap<String, String> {
    txt.into_iter().fold(HashMap::new(), |mut attributes, txt| {
        attributes.extend(txt.into_attributes());
        attributes
    })
}

/// PTR records from the type name, and from every shorter type suffix that
/// still spans a dot, to the instance name. For `_a._http._tcp` these live
/// at `_a._http._tcp` (twice) and `_http._tcp`.
fn instance_pointers(service_type: &str, domain: &str, instance: &str) -> Vec<ResourceRecord> {
    let mut pointers = vec![ResourceRecord::ptr(qualify(service_type, domain), PUBLISHED_TTL, instance)];

    let mut start = 0;
    while let Some(offset) = service_type[start..].find('.') {
        pointers.push(ResourceRecord::ptr(
            qualify(&service_type[start..], domain),
            PUBLISHED_TTL,
            instance,
        ));
        start += offset + 1;
    }
    pointers
}

/// Register-once transaction for `record`, which must name its domain.
pub(crate) fn publish_message(record: &ServiceRecord) -> UpdateMessage {
    let domain = record.hostname();
    let service_type = qualify(record.service_type(), domain);
    let instance = record.to_wire_name();

    let mut records = vec![ResourceRecord::ptr(
        qualify(SERVICES_PREFIX, domain),
        PUBLISHED_TTL,
        service_type,
    )];
    records.extend(instance_pointers(record.service_type(), domain, &instance));
    records.push(ResourceRecord::srv(
        instance.clone(),
        PUBLISHED_TTL,
        Srv::new(0, 0, record.port(), record.endpoint()),
    ));
    records.push(ResourceRecord::txt(
        instance.clone(),
        PUBLISHED_TTL,
        Txt::from_attributes(record.metadata()),
    ));

    UpdateMessage::builder()
        .zone(domain)
        .absent(instance)
        .update(records)
        .build()
}

/// Removes what [`publish_message`] added for this instance. The services
/// PTR is shared with other instances of the type and stays.
pub(crate) fn unpublish_message(record: &ServiceRecord) -> UpdateMessage {
    let domain = record.hostname();
    let instance = record.to_wire_name();

    let mut pointers = instance_pointers(record.service_type(), domain, &instance);
    pointers.dedup();

    UpdateMessage::builder()
        .zone(domain)
        .present(instance.clone())
        .delete(pointers)
        .delete_name(instance)
        .build()
}
