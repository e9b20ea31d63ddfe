use bytes::Bytes;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Maximum encoded length of a domain name.  The number of labels
/// plus sum of the lengths of the labels.
pub const DOMAINNAME_MAX_LEN: usize = 255;

/// Maximum length of a single label in a domain name.
pub const LABEL_MAX_LEN: usize = 63;

/// A domain name is a sequence of labels, ending with the empty root
/// label.
///
/// Labels are lower-cased on construction, so the derived equality,
/// ordering, and hashing are all case-insensitive: `NS1.Example.ORG`
/// and `ns1.example.org.` are the same name.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DomainName {
    pub labels: Vec<Label>,
    // INVARIANT: len == len(labels) + sum(map(len, labels))
    pub len: usize,
}

impl DomainName {
    pub fn root_domain() -> Self {
        DomainName {
            labels: vec![Label::new()],
            len: 1,
        }
    }

    pub fn is_root(&self) -> bool {
        self.len == 1 && self.labels[0].is_empty()
    }

    pub fn to_dotted_string(&self) -> String {
        if self.is_root() {
            return ".".to_string();
        }

        let mut out = String::with_capacity(self.len);
        for label in &self.labels {
            for &octet in label.octets() {
                match octet {
                    b'.' | b'\\' => {
                        out.push('\\');
                        out.push(char::from(octet));
                    }
                    0x21..=0x7e => out.push(char::from(octet)),
                    _ => out.push_str(&format!("\\{octet:03}")),
                }
            }
            out.push('.');
        }
        // the root label contributes the final '.', drop the
        // duplicate it would otherwise produce
        out.pop();

        out
    }

    /// Parse a dotted name.  A name without a trailing dot is taken to
    /// be fully-qualified anyway.
    pub fn from_dotted_string(s: &str) -> Option<Self> {
        if s == "." {
            return Some(Self::root_domain());
        }
        if s.is_empty() {
            return None;
        }

        let qualified = if s.ends_with('.') {
            s.to_string()
        } else {
            format!("{s}.")
        };

        let chunks = qualified.split('.').collect::<Vec<_>>();
        let mut labels = Vec::with_capacity(chunks.len());

        for (i, label_chars) in chunks.iter().enumerate() {
            if label_chars.is_empty() && i != chunks.len() - 1 {
                return None;
            }

            match label_chars.as_bytes().try_into() {
                Ok(label) => labels.push(label),
                Err(_) => return None,
            }
        }

        Self::from_labels(labels)
    }

    pub fn from_labels(labels: Vec<Label>) -> Option<Self> {
        if labels.is_empty() {
            return None;
        }

        let mut len = labels.len();
        let mut blank_label = false;

        for label in &labels {
            if blank_label {
                return None;
            }

            blank_label |= label.is_empty();
            len += label.len() as usize;
        }

        if blank_label && len <= DOMAINNAME_MAX_LEN {
            Some(Self { labels, len })
        } else {
            None
        }
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainName")
            .field("to_dotted_string()", &self.to_dotted_string())
            .finish()
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", &self.to_dotted_string())
    }
}

impl FromStr for DomainName {
    type Err = DomainNameFromStr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(domain) = DomainName::from_dotted_string(s) {
            Ok(domain)
        } else {
            Err(DomainNameFromStr::NoParse)
        }
    }
}

/// Errors that can arise when converting a `&str` into a `DomainName`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, thiserror::Error)]
pub enum DomainNameFromStr {
    #[error("could not parse string to domain name")]
    NoParse,
}

/// A label is just a sequence of octets, which are compared as
/// case-insensitive ASCII.  A label can be no longer than 63 octets.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Label {
    /// Private to this module so constructing an invalid `Label` is
    /// impossible.
    octets: Bytes,
}

impl Label {
    /// Create a new, empty, label.
    pub fn new() -> Self {
        Self {
            octets: Bytes::new(),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn len(&self) -> u8 {
        // the `TryFrom` ensures a label is <= 63 bytes
        self.octets.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.octets.is_empty()
    }

    pub fn octets(&self) -> &Bytes {
        &self.octets
    }
}

impl Default for Label {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<&[u8]> for Label {
    type Error = LabelTryFromOctetsError;

    fn try_from(mixed_case_octets: &[u8]) -> Result<Self, Self::Error> {
        if mixed_case_octets.len() > LABEL_MAX_LEN {
            return Err(LabelTryFromOctetsError::TooLong);
        }

        Ok(Self {
            octets: Bytes::copy_from_slice(&mixed_case_octets.to_ascii_lowercase()),
        })
    }
}

/// Errors that can arise when converting a `[u8]` into a `Label`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LabelTryFromOctetsError {
    TooLong,
}

/// The record types the delegation checks care about.  Everything
/// else is carried as `Unknown` and never looked inside.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordType {
    A,
    NS,
    AAAA,
    Unknown(u16),
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::NS => write!(f, "NS"),
            RecordType::AAAA => write!(f, "AAAA"),
            RecordType::Unknown(tag) => write!(f, "TYPE{tag}"),
        }
    }
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::NS,
            28 => RecordType::AAAA,
            _ => RecordType::Unknown(value),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::AAAA => 28,
            RecordType::Unknown(value) => value,
        }
    }
}

/// A record type with its associated, deserialised, data.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordTypeWithData {
    A { address: Ipv4Addr },
    NS { nsdname: DomainName },
    AAAA { address: Ipv6Addr },
    Unknown { tag: u16 },
}

impl RecordTypeWithData {
    pub fn rtype(&self) -> RecordType {
        match self {
            RecordTypeWithData::A { .. } => RecordType::A,
            RecordTypeWithData::NS { .. } => RecordType::NS,
            RecordTypeWithData::AAAA { .. } => RecordType::AAAA,
            RecordTypeWithData::Unknown { tag } => RecordType::Unknown(*tag),
        }
    }

    /// The address carried by an `A` or `AAAA` record.
    pub fn address(&self) -> Option<IpAddr> {
        match self {
            RecordTypeWithData::A { address } => Some(IpAddr::V4(*address)),
            RecordTypeWithData::AAAA { address } => Some(IpAddr::V6(*address)),
            _ => None,
        }
    }
}

/// A single resource record from one of the sections of a response.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ResourceRecord {
    /// a domain name to which this resource record pertains.
    pub name: DomainName,

    /// A combination of the RTYPE and RDATA fields
    pub rtype_with_data: RecordTypeWithData,

    pub ttl: u32,
}

/// Response code of a DNS message.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Rcode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Other(u16),
}

impl Rcode {
    /// Whether a chain walk can make use of a response with this code.
    pub fn is_usable(&self) -> bool {
        matches!(self, Rcode::NoError | Rcode::NameError)
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rcode::NoError => write!(f, "NOERROR"),
            Rcode::FormatError => write!(f, "FORMERR"),
            Rcode::ServerFailure => write!(f, "SERVFAIL"),
            Rcode::NameError => write!(f, "NXDOMAIN"),
            Rcode::NotImplemented => write!(f, "NOTIMP"),
            Rcode::Refused => write!(f, "REFUSED"),
            Rcode::Other(code) => write!(f, "RCODE{code}"),
        }
    }
}

impl From<u16> for Rcode {
    fn from(value: u16) -> Self {
        match value {
            0 => Rcode::NoError,
            1 => Rcode::FormatError,
            2 => Rcode::ServerFailure,
            3 => Rcode::NameError,
            4 => Rcode::NotImplemented,
            5 => Rcode::Refused,
            other => Rcode::Other(other),
        }
    }
}

/// The sections of a response which the checks look at.
///
/// A query which got no response at all is represented by the absence
/// of a `QueryResult`, never by an empty one.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct QueryResult {
    pub rcode: Rcode,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl QueryResult {
    /// A response with an empty answer section is a referral (or a
    /// name error, or no data): something the chain walk has to keep
    /// following.
    pub fn is_referral(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn has_answer(&self) -> bool {
        !self.answers.is_empty()
    }
}

/// A hostname or an IP
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum HostOrIP {
    Host(DomainName),
    IP(IpAddr),
}

impl fmt::Display for HostOrIP {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HostOrIP::Host(name) => write!(f, "{name}"),
            HostOrIP::IP(address) => write!(f, "{address}"),
        }
    }
}

impl FromStr for HostOrIP {
    type Err = DomainNameFromStr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(address) = s.parse::<IpAddr>() {
            Ok(HostOrIP::IP(address))
        } else {
            s.parse().map(HostOrIP::Host)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;

    #[test]
    fn domainname_is_lowercased() {
        assert_eq!(domain("NS1.Example.ORG."), domain("ns1.example.org."));
        assert_eq!("ns1.example.org.", domain("NS1.Example.ORG.").to_string());
    }

    #[test]
    fn domainname_is_qualified() {
        assert_eq!(domain("example.org"), domain("example.org."));
        assert_eq!("example.org.", domain("example.org").to_string());
    }

    #[test]
    fn domainname_root() {
        assert!(domain(".").is_root());
        assert_eq!(".", DomainName::root_domain().to_string());
    }

    #[test]
    fn domainname_rejects_empty_labels() {
        assert_eq!(None, DomainName::from_dotted_string("example..org."));
        assert_eq!(None, DomainName::from_dotted_string(""));
    }

    #[test]
    fn domainname_rejects_long_labels() {
        let label = "x".repeat(LABEL_MAX_LEN + 1);
        assert_eq!(None, DomainName::from_dotted_string(&format!("{label}.org.")));
    }

    #[test]
    fn domainname_escapes_unprintable_octets() {
        let name = DomainName::from_labels(vec![
            Label::try_from(&b"a b"[..]).unwrap(),
            Label::try_from(&b"x.y"[..]).unwrap(),
            Label::new(),
        ])
        .unwrap();

        assert_eq!("a\\032b.x\\.y.", name.to_dotted_string());
    }

    #[test]
    fn host_or_ip_parses_both() {
        assert_eq!(
            Ok(HostOrIP::IP(IpAddr::V4(Ipv4Addr::new(192, 58, 128, 30)))),
            "192.58.128.30".parse::<HostOrIP>()
        );
        assert_eq!(
            Ok(HostOrIP::Host(domain("j.root-servers.net."))),
            "J.ROOT-SERVERS.NET".parse::<HostOrIP>()
        );
    }

    #[test]
    fn rcode_mnemonics() {
        assert_eq!("NXDOMAIN", Rcode::NameError.to_string());
        assert_eq!("SERVFAIL", Rcode::from(2).to_string());
        assert_eq!("RCODE9", Rcode::from(9).to_string());
        assert!(Rcode::NameError.is_usable());
        assert!(!Rcode::Refused.is_usable());
    }
}
