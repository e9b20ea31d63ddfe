use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::metrics::Metrics;
use crate::resolver::Resolver;
use crate::types::*;

/// Look up all the IPv4 and IPv6 addresses of a hostname through the
/// system's recursive resolvers.
///
/// `A` and `AAAA` are queried independently and merged.  A name with
/// no address records and a name which could not be looked up both
/// give an empty set.
pub async fn resolve_addresses<R: Resolver>(
    resolver: &R,
    metrics: &mut Metrics,
    name: &DomainName,
) -> BTreeSet<IpAddr> {
    let mut addresses = BTreeSet::new();

    for rtype in [RecordType::A, RecordType::AAAA] {
        metrics.recursive_query();
        match resolver.query_recursive(name, rtype).await {
            Some(result) => {
                for rr in &result.answers {
                    // skip CNAMEs and anything else in the chain
                    if rr.rtype_with_data.rtype() == rtype {
                        addresses.extend(rr.rtype_with_data.address());
                    }
                }
            }
            None => tracing::debug!(%name, %rtype, "address lookup failed"),
        }
    }

    tracing::trace!(%name, count = addresses.len(), "resolved addresses");
    addresses
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;
    use crate::resolver::test_util::*;
    use crate::types::test_util::*;

    #[tokio::test]
    async fn merges_ipv4_and_ipv6() {
        let resolver = FakeResolver::new().addresses(
            "ns1.example.org.",
            &[
                IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
                IpAddr::V6(Ipv6Addr::LOCALHOST),
            ],
        );
        let mut metrics = Metrics::new();

        let addresses = resolve_addresses(&resolver, &mut metrics, &domain("ns1.example.org.")).await;

        assert_eq!(2, addresses.len());
        assert_eq!(2, metrics.recursive_queries);
    }

    #[tokio::test]
    async fn failure_is_empty() {
        let resolver = FakeResolver::new();
        let mut metrics = Metrics::new();

        let addresses = resolve_addresses(&resolver, &mut metrics, &domain("ns1.example.org.")).await;

        assert!(addresses.is_empty());
    }
}
