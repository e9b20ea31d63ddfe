use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use crate::rr_util::comma_separated;
use crate::types::*;

/// Something wrong (or worth knowing) found while tracing a domain.
/// The `Display` impl is the line printed for it.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Diagnostic {
    /// A parent returned NXDOMAIN: the chain stops here.
    DelegationEnds {
        domain: DomainName,
        at: Option<DomainName>,
    },
    /// The hop limit was reached.
    LoopingDetected { domain: DomainName },
    /// A referral names a nameserver with no `A` or `AAAA` records.
    InvalidDelegation {
        domain: DomainName,
        nameserver: DomainName,
    },
    /// A candidate nameserver did not respond.
    QueryFailed {
        domain: DomainName,
        nameserver: DomainName,
    },
    /// A candidate nameserver responded with something other than
    /// NOERROR or NXDOMAIN.
    UnexpectedRcode {
        domain: DomainName,
        rcode: Rcode,
        nameserver: DomainName,
    },
    /// None of the nameservers of a referral responded.
    NoData {
        domain: DomainName,
        last_referral: BTreeSet<DomainName>,
    },
    MissingGlue {
        owner: DomainName,
        addresses: BTreeSet<IpAddr>,
    },
    ExtraGlue {
        owner: DomainName,
        addresses: BTreeSet<IpAddr>,
    },
    /// Nameservers in the zone apex which the parent does not delegate
    /// to.
    MissingDelegations {
        domain: DomainName,
        nameservers: BTreeSet<DomainName>,
    },
    /// Nameservers the parent delegates to which are not in the zone
    /// apex.
    ExtraDelegations {
        domain: DomainName,
        nameservers: BTreeSet<DomainName>,
    },
    NotInDelegationNorApex {
        domain: DomainName,
        server: DomainName,
    },
    InApexNotDelegated {
        domain: DomainName,
        server: DomainName,
    },
    DelegatedNotInApex {
        domain: DomainName,
        server: DomainName,
    },
    /// The answer came from a more specific zone on the same
    /// nameserver, and that zone's apex does not list the server.
    SubdomainNotInApex {
        domain: DomainName,
        server: DomainName,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Diagnostic::DelegationEnds {
                domain,
                at: Some(at),
            } => write!(f, "{domain}: delegation ends at {at}"),
            Diagnostic::DelegationEnds { domain, at: None } => {
                write!(f, "{domain}: delegation ends")
            }
            Diagnostic::LoopingDetected { domain } => write!(f, "{domain}: looping detected"),
            Diagnostic::InvalidDelegation { domain, nameserver } => {
                write!(f, "{domain}: invalid delegation to {nameserver}")
            }
            Diagnostic::QueryFailed { domain, nameserver } => {
                write!(f, "{domain}: query failed on server {nameserver}")
            }
            Diagnostic::UnexpectedRcode {
                domain,
                rcode,
                nameserver,
            } => write!(f, "{domain}: RCODE {rcode} from server {nameserver}"),
            Diagnostic::NoData {
                domain,
                last_referral,
            } => {
                if last_referral.is_empty() {
                    write!(f, "{domain}: no data, last referral was empty")
                } else {
                    write!(
                        f,
                        "{domain}: no data, last referral was to {}",
                        comma_separated(last_referral)
                    )
                }
            }
            Diagnostic::MissingGlue { owner, addresses } => {
                write!(f, "missing glue for {owner}: {}", comma_separated(addresses))
            }
            Diagnostic::ExtraGlue { owner, addresses } => {
                write!(f, "extra glue for {owner}: {}", comma_separated(addresses))
            }
            Diagnostic::MissingDelegations {
                domain,
                nameservers,
            } => write!(
                f,
                "missing delegations for {domain}: {}",
                comma_separated(nameservers)
            ),
            Diagnostic::ExtraDelegations {
                domain,
                nameservers,
            } => write!(
                f,
                "extra delegations for {domain}: {}",
                comma_separated(nameservers)
            ),
            Diagnostic::NotInDelegationNorApex { domain, server } => {
                write!(f, "{domain}: server {server} not in delegation nor zone apex")
            }
            Diagnostic::InApexNotDelegated { domain, server } => write!(
                f,
                "{domain}: server {server} in zone apex, but not in the delegation"
            ),
            Diagnostic::DelegatedNotInApex { domain, server } => {
                write!(f, "{domain}: server {server} delegated, but not in zone apex")
            }
            Diagnostic::SubdomainNotInApex { domain, server } => {
                write!(f, "{domain}: subdomain on same server, {server} not in apex")
            }
        }
    }
}
