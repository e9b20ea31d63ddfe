use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use crate::types::*;

/// The set of nameserver hostnames named by the `NS` records in a
/// sequence of RRs.  Records of any other type are ignored.
///
/// Names are already normalised by `DomainName`, so the result can be
/// compared with plain set operations.
pub fn ns_names(rrs: &[ResourceRecord]) -> BTreeSet<DomainName> {
    let mut names = BTreeSet::new();
    for rr in rrs {
        if let RecordTypeWithData::NS { nsdname } = &rr.rtype_with_data {
            names.insert(nsdname.clone());
        }
    }
    names
}

/// The `NS` records from a sequence of RRs, in their original order.
pub fn ns_records(rrs: &[ResourceRecord]) -> Vec<ResourceRecord> {
    rrs.iter()
        .filter(|rr| rr.rtype_with_data.rtype() == RecordType::NS)
        .cloned()
        .collect()
}

/// The nameserver hostnames from a sequence of RRs, in the order they
/// first appear.  Candidate nameservers are tried in this order.
pub fn ns_names_in_order(rrs: &[ResourceRecord]) -> Vec<DomainName> {
    let mut seen = BTreeSet::new();
    let mut names = Vec::new();
    for rr in rrs {
        if let RecordTypeWithData::NS { nsdname } = &rr.rtype_with_data {
            if seen.insert(nsdname.clone()) {
                names.push(nsdname.clone());
            }
        }
    }
    names
}

/// Group the `A` and `AAAA` records in a sequence of RRs by owner
/// name.
pub fn addresses_by_owner(rrs: &[ResourceRecord]) -> BTreeMap<DomainName, BTreeSet<IpAddr>> {
    let mut out: BTreeMap<DomainName, BTreeSet<IpAddr>> = BTreeMap::new();
    for rr in rrs {
        if let Some(address) = rr.rtype_with_data.address() {
            out.entry(rr.name.clone()).or_default().insert(address);
        }
    }
    out
}

/// Render a set as a comma-separated list, in set order.
pub fn comma_separated<T: std::fmt::Display>(items: &BTreeSet<T>) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;
    use crate::types::test_util::*;

    #[test]
    fn ns_names_ignores_other_types() {
        let rrs = vec![
            ns_record("example.org.", "ns1.example.org."),
            a_record("ns1.example.org.", Ipv4Addr::new(1, 1, 1, 1)),
            unknown_record("example.org."),
            ns_record("example.org.", "ns2.example.org."),
        ];

        let expected = [domain("ns1.example.org."), domain("ns2.example.org.")]
            .into_iter()
            .collect::<BTreeSet<_>>();

        assert_eq!(expected, ns_names(&rrs));
    }

    #[test]
    fn ns_names_normalises_case() {
        let rrs = vec![
            ns_record("example.org.", "NS1.EXAMPLE.ORG."),
            ns_record("example.org.", "ns1.example.org."),
        ];

        assert_eq!(1, ns_names(&rrs).len());
    }

    #[test]
    fn ns_names_in_order_keeps_first_occurrence() {
        let rrs = vec![
            ns_record("example.org.", "ns2.example.org."),
            a_record("ns2.example.org.", Ipv4Addr::new(1, 1, 1, 1)),
            ns_record("example.org.", "ns1.example.org."),
            ns_record("example.org.", "ns2.example.org."),
        ];

        assert_eq!(
            vec![domain("ns2.example.org."), domain("ns1.example.org.")],
            ns_names_in_order(&rrs)
        );
    }

    #[test]
    fn addresses_by_owner_groups() {
        let rrs = vec![
            a_record("ns1.example.org.", Ipv4Addr::new(1, 1, 1, 1)),
            aaaa_record("ns1.example.org.", Ipv6Addr::LOCALHOST),
            a_record("ns2.example.org.", Ipv4Addr::new(2, 2, 2, 2)),
            unknown_record("."),
        ];

        let grouped = addresses_by_owner(&rrs);

        assert_eq!(2, grouped.len());
        assert_eq!(2, grouped[&domain("ns1.example.org.")].len());
        assert_eq!(1, grouped[&domain("ns2.example.org.")].len());
    }

    #[test]
    fn comma_separated_is_ordered() {
        let names = [domain("b.example."), domain("a.example.")]
            .into_iter()
            .collect::<BTreeSet<_>>();

        assert_eq!("a.example., b.example.", comma_separated(&names));
    }
}
