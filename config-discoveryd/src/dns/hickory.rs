use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use async_trait::async_trait;
use futures::StreamExt;
use hickory_client::client::{AsyncClient, ClientHandle};
use hickory_client::udp::UdpClientStream;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode, UpdateMessage as _};
use hickory_proto::rr::rdata::{PTR, SRV, TXT};
use hickory_proto::rr::{DNSClass, Name, RData as WireData, Record, RecordType};
use hickory_proto::xfer::{DnsHandle, DnsRequest, DnsRequestOptions, DnsResponse};
use tokio::net::UdpSocket;
use super::records::{Prerequisite, RData, ResourceRecord, Srv, Txt, Update, UpdateMessage, UpdateOutcome};
use super::resolver::{ResolveError, Resolver};

/// Unicast DNS transport over UDP.
///
/// Name servers are tried in configured order; the first one that answers
/// decides the outcome. Timeouts and retries are left to the client.
pub struct HickoryResolver {
    clients: Vec<(SocketAddr, AsyncClient)>,
}

impl HickoryResolver {
    /// Connects to each name server and spawns its background exchange task.
    pub async fn connect(name_servers: &[SocketAddr]) -> Result<Self, ResolveError> {
        if name_servers.is_empty() {
            return Err(ResolveError::transport("no name servers available"));
        }

        let mut clients = Vec::with_capacity(name_servers.len());
        for addr in name_servers {
            let stream = UdpClientStream::<UdpSocket>::new(*addr);
            let (client, background) = AsyncClient::connect(stream)
                .await
                .map_err(|e| ResolveError::transport(format!("failed to connect to {}: {}", addr, e)))?;
            tokio::spawn(background);
            tracing::debug!("Connected DNS client to {}", addr);
            clients.push((*addr, client));
        }

        Ok(Self { clients })
    }

    /// Name servers from the system resolver configuration.
    pub fn system_name_servers() -> Result<Vec<SocketAddr>, ResolveError> {
        let (config, _opts) = hickory_resolver::system_conf::read_system_conf()
            .map_err(|e| ResolveError::transport(format!("failed to read system resolver config: {}", e)))?;

        let mut addrs: Vec<SocketAddr> = Vec::new();
        for server in config.name_servers() {
            if !addrs.contains(&server.socket_addr) {
                addrs.push(server.socket_addr);
            }
        }
        Ok(addrs)
    }

    async fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<WireData>, ResolveError> {
        self.query_name(name, parse_name(name)?, record_type).await
    }

    async fn query_name(
        &self,
        name: &str,
        fqdn: Name,
        record_type: RecordType,
    ) -> Result<Vec<WireData>, ResolveError> {
        let mut last_error = None;
        for (addr, client) in &self.clients {
            let mut client = client.clone();
            match client.query(fqdn.clone(), DNSClass::IN, record_type).await {
                Ok(response) => return answers_of(name, record_type, &response),
                Err(e) => {
                    tracing::debug!("Query {} {} via {} failed: {}", record_type, name, addr, e);
                    last_error = Some(e);
                }
            }
        }
        Err(transport_error(last_error))
    }
}

#[async_trait]
impl Resolver for HickoryResolver {
    async fn resolve_ptr(&self, name: &str) -> Result<Vec<String>, ResolveError> {
        let data = self.query(name, RecordType::PTR).await?;
        Ok(data
            .into_iter()
            .filter_map(|rdata| match rdata {
                WireData::PTR(PTR(target)) => Some(target.to_ascii()),
                _ => None,
            })
            .collect())
    }

    async fn resolve_srv(&self, name: &str) -> Result<Vec<Srv>, ResolveError> {
        let data = self.query(name, RecordType::SRV).await?;
        Ok(data
            .into_iter()
            .filter_map(|rdata| match rdata {
                WireData::SRV(srv) => Some(Srv::new(
                    srv.priority(),
                    srv.weight(),
                    srv.port(),
                    srv.target().to_ascii(),
                )),
                _ => None,
            })
            .collect())
    }

    async fn resolve_txt(&self, name: &str) -> Result<Vec<Txt>, ResolveError> {
        let data = self.query(name, RecordType::TXT).await?;
        Ok(data
            .into_iter()
            .filter_map(|rdata| match rdata {
                WireData::TXT(txt) => Some(Txt(
                    txt.txt_data()
                        .iter()
                        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                        .collect(),
                )),
                _ => None,
            })
            .collect())
    }

    async fn reverse(&self, address: IpAddr) -> Result<String, ResolveError> {
        let fqdn = Name::from(address);
        let name = fqdn.to_ascii();
        let data = self.query_name(&name, fqdn, RecordType::PTR).await?;
        data.into_iter()
            .find_map(|rdata| match rdata {
                WireData::PTR(PTR(target)) => Some(target.to_ascii()),
                _ => None,
            })
            .ok_or(ResolveError::NotFound { name, record_type: "PTR" })
    }

    async fn send(&self, message: UpdateMessage) -> Result<UpdateOutcome, ResolveError> {
        let zone = message.zone.clone();
        let wire = to_wire_message(message)?;

        let mut last_error = None;
        for (addr, client) in &self.clients {
            let request = DnsRequest::new(wire.clone(), DnsRequestOptions::default());
            match client.send(request).next().await {
                Some(Ok(response)) => {
                    tracing::debug!("Update of zone {} via {} answered {}", zone, addr, response.response_code());
                    return Ok(outcome_of(response.response_code()));
                }
                Some(Err(e)) => {
                    tracing::debug!("Update of zone {} via {} failed: {}", zone, addr, e);
                    last_error = Some(e);
                }
                None => {
                    tracing::debug!("Update of zone {} via {} got no response", zone, addr);
                }
            }
        }
        Err(transport_error(last_error))
    }
}

fn parse_name(name: &str) -> Result<Name, ResolveError> {
    let fqdn = if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    };
    Name::from_ascii(&fqdn).map_err(|e| ResolveError::InvalidName {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn transport_error<E: Display>(error: Option<E>) -> ResolveError {
    match error {
        Some(e) => ResolveError::transport(e.to_string()),
        None => ResolveError::transport("no name server answered"),
    }
}

fn answers_of(name: &str, record_type: RecordType, response: &DnsResponse) -> Result<Vec<WireData>, ResolveError> {
    match response.response_code() {
        ResponseCode::NoError => Ok(response
            .answers()
            .iter()
            .filter(|record| record.record_type() == record_type)
            .filter_map(|record| record.data().cloned())
            .collect()),
        ResponseCode::NXDomain => Err(ResolveError::NotFound {
            name: name.to_string(),
            record_type: record_type_name(record_type),
        }),
        code => Err(ResolveError::Server {
            name: name.to_string(),
            code: code.to_string(),
        }),
    }
}

fn record_type_name(record_type: RecordType) -> &'static str {
    match record_type {
        RecordType::PTR => "PTR",
        RecordType::SRV => "SRV",
        RecordType::TXT => "TXT",
        _ => "other",
    }
}

fn outcome_of(code: ResponseCode) -> UpdateOutcome {
    match code {
        ResponseCode::NoError => UpdateOutcome::Applied,
        ResponseCode::YXDomain => UpdateOutcome::NameExists,
        ResponseCode::NXDomain => UpdateOutcome::NameMissing,
        other => UpdateOutcome::Rejected(other.to_string()),
    }
}

/// Builds the RFC 2136 message for an update transaction.
fn to_wire_message(message: UpdateMessage) -> Result<Message, ResolveError> {
    let mut wire = Message::new();
    wire.set_id(rand::random())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Update)
        .set_recursion_desired(false);

    let mut zone = Query::query(parse_name(&message.zone)?, RecordType::SOA);
    zone.set_query_class(DNSClass::IN);
    wire.add_zone(zone);

    for prerequisite in message.prerequisites {
        let (name, class) = match prerequisite {
            Prerequisite::NameAbsent(name) => (name, DNSClass::NONE),
            Prerequisite::NamePresent(name) => (name, DNSClass::ANY),
        };
        let mut record = Record::with(parse_name(&name)?, RecordType::ANY, 0);
        record.set_dns_class(class);
        wire.add_pre_requisite(record);
    }

    for update in message.updates {
        let record = match update {
            Update::Add(record) => to_wire_record(record)?,
            Update::Delete(record) => {
                let mut record = to_wire_record(ResourceRecord { ttl: 0, ..record })?;
                record.set_dns_class(DNSClass::NONE);
                record
            }
            Update::DeleteName(name) => {
                let mut record = Record::with(parse_name(&name)?, RecordType::ANY, 0);
                record.set_dns_class(DNSClass::ANY);
                record
            }
        };
        wire.add_update(record);
    }

    Ok(wire)
}

fn to_wire_record(record: ResourceRecord) -> Result<Record, ResolveError> {
    let data = match record.data {
        RData::Ptr(target) => WireData::PTR(PTR(parse_name(&target)?)),
        RData::Srv(srv) => WireData::SRV(SRV::new(srv.priority, srv.weight, srv.port, parse_name(&srv.target)?)),
        RData::Txt(txt) => WireData::TXT(TXT::new(txt.0)),
    };
    Ok(Record::from_rdata(parse_name(&record.name)?, record.ttl, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use hickory_proto::error::ProtoError;

    #[test]
    fn test_parse_name_is_fully_qualified() {
        let name = parse_name("_http._tcp.example.com").unwrap();
        assert!(name.is_fqdn());
        assert_eq!(name.to_ascii(), "_http._tcp.example.com.");
    }

    #[test]
    fn test_outcome_of_response_codes() {
        assert_eq!(outcome_of(ResponseCode::NoError), UpdateOutcome::Applied);
        assert_eq!(outcome_of(ResponseCode::YXDomain), UpdateOutcome::NameExists);
        assert_eq!(outcome_of(ResponseCode::NXDomain), UpdateOutcome::NameMissing);
        assert!(matches!(outcome_of(ResponseCode::Refused), UpdateOutcome::Rejected(_)));
    }

    #[test]
    fn test_wire_message_sections() {
        let message = UpdateMessage::builder()
            .zone("example.com")
            .absent("a._http._tcp.example.com.")
            .update([
                ResourceRecord::ptr("_http._tcp.example.com.", 3600, "a._http._tcp.example.com."),
                ResourceRecord::srv("a._http._tcp.example.com.", 3600, Srv::new(0, 0, 8080, "host.example.com")),
            ])
            .build();

        let wire = to_wire_message(message).unwrap();
        assert_eq!(wire.op_code(), OpCode::Update);
        assert_eq!(wire.zones().len(), 1);
        assert_eq!(wire.zones()[0].query_type(), RecordType::SOA);

        let prerequisites = wire.prerequisites();
        assert_eq!(prerequisites.len(), 1);
        assert_eq!(prerequisites[0].dns_class(), DNSClass::NONE);
        assert_eq!(prerequisites[0].record_type(), RecordType::ANY);

        let updates = wire.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].record_type(), RecordType::PTR);
        assert_eq!(updates[1].record_type(), RecordType::SRV);
        assert_eq!(updates[1].ttl(), 3600);
    }

    #[test]
    fn test_wire_message_deletes() {
        let message = UpdateMessage::builder()
            .zone("example.com")
            .present("a._http._tcp.example.com.")
            .delete([ResourceRecord::ptr("_http._tcp.example.com.", 3600, "a._http._tcp.example.com.")])
            .delete_name("a._http._tcp.example.com.")
            .build();

        let wire = to_wire_message(message).unwrap();
        assert_eq!(wire.prerequisites()[0].dns_class(), DNSClass::ANY);

        let updates = wire.updates();
        assert_eq!(updates[0].dns_class(), DNSClass::NONE);
        assert_eq!(updates[0].ttl(), 0);
        assert_eq!(updates[1].dns_class(), DNSClass::ANY);
        assert_eq!(updates[1].record_type(), RecordType::ANY);
    }

    fn response(code: ResponseCode, answers: Vec<Record>) -> DnsResponse {
        let mut message = Message::new();
        message
            .set_message_type(MessageType::Response)
            .set_response_code(code)
            .add_answers(answers);
        DnsResponse::from_message(message).unwrap()
    }

    #[test]
    fn test_nxdomain_answer_is_not_found() {
        let result = answers_of(
            "_http._tcp.example.com.",
            RecordType::PTR,
            &response(ResponseCode::NXDomain, Vec::new()),
        );
        assert_eq!(
            result,
            Err(ResolveError::NotFound {
                name: "_http._tcp.example.com.".to_string(),
                record_type: "PTR",
            })
        );
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_answers_keep_requested_type() {
        let name = parse_name("_http._tcp.example.com.").unwrap();
        let target = parse_name("a._http._tcp.example.com.").unwrap();
        let answers = vec![
            Record::from_rdata(name.clone(), 60, WireData::PTR(PTR(target.clone()))),
            Record::from_rdata(name, 60, WireData::TXT(TXT::new(vec!["x=1".to_string()]))),
        ];
        let data = answers_of("_http._tcp.example.com.", RecordType::PTR, &response(ResponseCode::NoError, answers)).unwrap();
        assert_eq!(data, vec![WireData::PTR(PTR(target))]);
    }

    #[test]
    fn test_server_failure_answer() {
        let result = answers_of("a.example.com.", RecordType::SRV, &response(ResponseCode::ServFail, Vec::new()));
        assert!(matches!(result, Err(ResolveError::Server { .. })));
    }

    #[test]
    fn test_empty_txt_is_one_empty_string_on_the_wire() {
        let message = UpdateMessage::builder()
            .zone("example.com")
            .update([ResourceRecord::txt(
                "a._http._tcp.example.com.",
                3600,
                Txt::from_attributes(&HashMap::new()),
            )])
            .build();

        let wire = to_wire_message(message).unwrap();
        match wire.updates()[0].data() {
            Some(WireData::TXT(txt)) => {
                assert_eq!(txt.txt_data().len(), 1);
                assert!(txt.txt_data()[0].is_empty());
            }
            other => panic!("expected TXT data, got {:?}", other),
        }
        assert!(wire.to_vec().is_ok());
    }

    #[test]
    fn test_transport_error_keeps_cause() {
        match transport_error(Some(ProtoError::from("connection refused"))) {
            ResolveError::Transport(msg) => assert!(msg.contains("connection refused")),
            other => panic!("expected transport error, got {:?}", other),
        }
        assert_eq!(transport_error::<ProtoError>(None), ResolveError::transport("no name server answered"));
    }
}
