use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType as WireRecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use rand::Rng;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use crate::net::{read_tcp_bytes, send_tcp_bytes, send_udp_bytes, UDP_BUFFER_SIZE};
use crate::types::*;

/// Default per-attempt timeout for a query to a single address.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the system's recursive resolvers are configured.
pub const RESOLV_CONF: &str = "/etc/resolv.conf";

/// Everything the delegation checks need from the DNS.
///
/// A `None` result means no usable response arrived at all, which is
/// different from a response with empty sections.
#[allow(async_fn_in_trait)]
pub trait Resolver {
    /// Ask the given nameservers, in order, with recursion disabled.
    /// The first response wins.
    async fn query_nameservers(
        &self,
        targets: &[HostOrIP],
        name: &DomainName,
        rtype: RecordType,
    ) -> Option<QueryResult>;

    /// Ask the system's recursive resolvers, with recursion enabled.
    async fn query_recursive(&self, name: &DomainName, rtype: RecordType) -> Option<QueryResult>;
}

/// A `Resolver` which talks to real nameservers over UDP, falling
/// back to TCP.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NetworkResolver {
    pub system_resolvers: Vec<IpAddr>,
    pub timeout: Duration,
}

impl NetworkResolver {
    pub fn new(system_resolvers: Vec<IpAddr>, timeout: Duration) -> Self {
        Self {
            system_resolvers,
            timeout,
        }
    }

    /// Addresses to send a query for this target to.  Hostnames are
    /// looked up through the system resolvers, IPv4 first.
    async fn addresses_for(&self, target: &HostOrIP) -> Vec<IpAddr> {
        match target {
            HostOrIP::IP(address) => vec![*address],
            HostOrIP::Host(name) => {
                let mut addresses = Vec::new();
                for rtype in [RecordType::A, RecordType::AAAA] {
                    if let Some(result) = self.query_recursive(name, rtype).await {
                        for rr in &result.answers {
                            if rr.rtype_with_data.rtype() == rtype {
                                addresses.extend(rr.rtype_with_data.address());
                            }
                        }
                    }
                }
                addresses
            }
        }
    }

    /// Send one question to one address, UDP first and then TCP if
    /// that fails or the answer is truncated.
    async fn query_address(
        &self,
        address: IpAddr,
        name: &DomainName,
        rtype: RecordType,
        recursion_desired: bool,
    ) -> Option<QueryResult> {
        let request = make_request(name, rtype, recursion_desired)?;
        let serialised_request = serialise(&request)?;

        tracing::trace!(%address, %name, %rtype, recursion_desired, "sending query");

        let udp_response = self
            .query_nameserver_udp(address, &serialised_request)
            .await
            .filter(|response| response_matches_request(&request, response));
        let response = if udp_response.is_some() {
            udp_response
        } else {
            self.query_nameserver_tcp(address, &serialised_request)
                .await
                .filter(|response| response_matches_request(&request, response))
        };

        match response {
            Some(response) => {
                let result = query_result_from_message(&response);
                tracing::trace!(%address, rcode = %result.rcode, answers = result.answers.len(), authority = result.authority.len(), additional = result.additional.len(), "got response");
                Some(result)
            }
            None => {
                tracing::debug!(%address, %name, %rtype, "no response");
                None
            }
        }
    }

    /// Send a message to a remote nameserver over UDP, returning the
    /// response.  The response is NOT validated.
    async fn query_nameserver_udp(
        &self,
        address: IpAddr,
        serialised_request: &[u8],
    ) -> Option<Message> {
        timeout(
            self.timeout,
            query_nameserver_udp_notimeout(address, serialised_request),
        )
        .await
        .ok()
        .flatten()
    }

    /// Send a message to a remote nameserver over TCP, returning the
    /// response.  Same caveats as `query_nameserver_udp`.
    async fn query_nameserver_tcp(
        &self,
        address: IpAddr,
        serialised_request: &[u8],
    ) -> Option<Message> {
        timeout(
            self.timeout,
            query_nameserver_tcp_notimeout(address, serialised_request),
        )
        .await
        .ok()
        .flatten()
    }
}

impl Resolver for NetworkResolver {
    async fn query_nameservers(
        &self,
        targets: &[HostOrIP],
        name: &DomainName,
        rtype: RecordType,
    ) -> Option<QueryResult> {
        for target in targets {
            let addresses = self.addresses_for(target).await;
            if addresses.is_empty() {
                tracing::debug!(%target, "nameserver has no addresses");
            }
            for address in addresses {
                if let Some(result) = self.query_address(address, name, rtype, false).await {
                    return Some(result);
                }
            }
        }

        None
    }

    async fn query_recursive(&self, name: &DomainName, rtype: RecordType) -> Option<QueryResult> {
        for address in &self.system_resolvers {
            if let Some(result) = self.query_address(*address, name, rtype, true).await {
                return Some(result);
            }
        }

        None
    }
}

/// Timeout-less version of `query_nameserver_udp`.
async fn query_nameserver_udp_notimeout(
    address: IpAddr,
    serialised_request: &[u8],
) -> Option<Message> {
    let bind_address: SocketAddr = match address {
        IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };

    let sock = UdpSocket::bind(bind_address).await.ok()?;
    sock.connect((address, 53)).await.ok()?;
    send_udp_bytes(&sock, serialised_request).await.ok()?;

    let mut buf = vec![0u8; UDP_BUFFER_SIZE];
    let size = sock.recv(&mut buf).await.ok()?;
    Message::from_vec(&buf[..size]).ok()
}

/// Timeout-less version of `query_nameserver_tcp`.
async fn query_nameserver_tcp_notimeout(
    address: IpAddr,
    serialised_request: &[u8],
) -> Option<Message> {
    let mut stream = TcpStream::connect((address, 53)).await.ok()?;
    send_tcp_bytes(&mut stream, serialised_request).await.ok()?;
    match read_tcp_bytes(&mut stream).await {
        Ok(bytes) => Message::from_vec(bytes.as_ref()).ok(),
        Err(error) => {
            tracing::debug!(%address, %error, "tcp read error");
            None
        }
    }
}

/// Build a single-question query message with a random ID.
fn make_request(name: &DomainName, rtype: RecordType, recursion_desired: bool) -> Option<Message> {
    let wire_name = wire_from_domain(name)?;

    let mut query = Query::new();
    query.set_name(wire_name);
    query.set_query_type(WireRecordType::from(u16::from(rtype)));
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new(rand::thread_rng().gen(), MessageType::Query, OpCode::Query);
    message.set_recursion_desired(recursion_desired);
    message.add_query(query);

    Some(message)
}

fn serialise(message: &Message) -> Option<Vec<u8>> {
    let mut buf = Vec::with_capacity(UDP_BUFFER_SIZE);
    let mut encoder = BinEncoder::new(&mut buf);

    if let Err(error) = message.emit(&mut encoder) {
        tracing::warn!(?message, %error, "could not serialise message");
        return None;
    }

    Some(buf)
}

/// Very basic validation that a nameserver response matches a
/// message:
///
/// - Check the ID, opcode, and questions match the question.
///
/// - Check it is a response.
///
/// - Check it is not truncated.
///
/// Unlike a resolver, the rcode is not checked here: name errors and
/// failures are things the delegation checks report on.
pub fn response_matches_request(request: &Message, response: &Message) -> bool {
    if request.id() != response.id() {
        return false;
    }
    if response.message_type() != MessageType::Response {
        return false;
    }
    if request.op_code() != response.op_code() {
        return false;
    }
    if response.truncated() {
        return false;
    }
    if request.queries() != response.queries() {
        return false;
    }

    true
}

/// Convert a wire message into the sections the checks look at.
/// Records whose names cannot be represented are dropped.
pub fn query_result_from_message(message: &Message) -> QueryResult {
    QueryResult {
        rcode: Rcode::from(u16::from(message.response_code())),
        answers: message.answers().iter().filter_map(convert_record).collect(),
        authority: message
            .name_servers()
            .iter()
            .filter_map(convert_record)
            .collect(),
        additional: message
            .additionals()
            .iter()
            .filter_map(convert_record)
            .collect(),
    }
}

fn convert_record(record: &Record) -> Option<ResourceRecord> {
    let name = domain_from_wire(record.name())?;
    let rtype_with_data = match record.data() {
        RData::A(a) => RecordTypeWithData::A { address: a.0 },
        RData::AAAA(aaaa) => RecordTypeWithData::AAAA { address: aaaa.0 },
        RData::NS(ns) => RecordTypeWithData::NS {
            nsdname: domain_from_wire(&ns.0)?,
        },
        _ => RecordTypeWithData::Unknown {
            tag: u16::from(record.record_type()),
        },
    };

    Some(ResourceRecord {
        name,
        rtype_with_data,
        ttl: record.ttl(),
    })
}

/// Convert a name off the wire label by label, so punycode and
/// escaped octets are kept exactly as they were sent.
pub fn domain_from_wire(name: &Name) -> Option<DomainName> {
    let mut labels = Vec::with_capacity(usize::from(name.num_labels()) + 1);
    for octets in name.iter() {
        labels.push(Label::try_from(octets).ok()?);
    }
    labels.push(Label::new());

    DomainName::from_labels(labels)
}

/// The inverse of `domain_from_wire`.
pub fn wire_from_domain(name: &DomainName) -> Option<Name> {
    let labels = name
        .labels
        .iter()
        .filter(|label| !label.is_empty())
        .map(|label| &label.octets()[..]);

    match Name::from_labels(labels) {
        Ok(wire_name) => Some(wire_name),
        Err(error) => {
            tracing::warn!(%name, %error, "could not convert domain name");
            None
        }
    }
}

/// Read the `nameserver` lines of a resolv.conf file.
pub fn parse_resolv_conf(contents: &str) -> Vec<IpAddr> {
    let mut addresses = Vec::new();
    for line in contents.lines() {
        let mut words = line.split_whitespace();
        if let (Some("nameserver"), Some(address)) = (words.next(), words.next()) {
            match address.parse() {
                Ok(address) => addresses.push(address),
                Err(_) => tracing::debug!(%address, "skipping unparseable nameserver"),
            }
        }
    }
    addresses
}

/// The system's recursive resolvers, or localhost if none are
/// configured (or the file can't be read).
pub fn system_resolvers(path: &Path) -> Vec<IpAddr> {
    let addresses = match std::fs::read_to_string(path) {
        Ok(contents) => parse_resolv_conf(&contents),
        Err(error) => {
            tracing::warn!(?path, %error, "could not read resolver configuration");
            Vec::new()
        }
    };

    if addresses.is_empty() {
        vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]
    } else {
        addresses
    }
}
