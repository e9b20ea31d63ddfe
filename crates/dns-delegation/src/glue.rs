use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::addresses::resolve_addresses;
use crate::diagnostic::Diagnostic;
use crate::metrics::Metrics;
use crate::resolver::Resolver;
use crate::rr_util::addresses_by_owner;
use crate::types::*;

/// Compare the glue in the ADDITIONAL section of a referral with what
/// the DNS says about each glue owner.
///
/// For each owner name, addresses in the live DNS but not the glue are
/// missing glue, and addresses in the glue but not the live DNS are
/// extra glue.  When they agree nothing is reported.
pub async fn check_glue<R: Resolver>(
    resolver: &R,
    metrics: &mut Metrics,
    additional: &[ResourceRecord],
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for (owner, glue) in addresses_by_owner(additional) {
        let live = resolve_addresses(resolver, metrics, &owner).await;

        let missing = live.difference(&glue).copied().collect::<BTreeSet<IpAddr>>();
        let extra = glue.difference(&live).copied().collect::<BTreeSet<IpAddr>>();

        if !missing.is_empty() {
            diagnostics.push(Diagnostic::MissingGlue {
                owner: owner.clone(),
                addresses: missing,
            });
        }
        if !extra.is_empty() {
            diagnostics.push(Diagnostic::ExtraGlue {
                owner,
                addresses: extra,
            });
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;
    use crate::resolver::test_util::*;
    use crate::types::test_util::*;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[tokio::test]
    async fn matching_glue_is_silent() {
        let resolver = FakeResolver::new().addresses("ns1.example.org.", &[v4(1, 1, 1, 1)]);
        let additional = vec![a_record("ns1.example.org.", Ipv4Addr::new(1, 1, 1, 1))];

        let diagnostics = check_glue(&resolver, &mut Metrics::new(), &additional).await;

        assert!(diagnostics.is_empty());
    }

    #[tokio::test]
    async fn reports_missing_glue() {
        let resolver = FakeResolver::new()
            .addresses("ns1.example.org.", &[v4(1, 1, 1, 1), v4(2, 2, 2, 2)]);
        let additional = vec![a_record("ns1.example.org.", Ipv4Addr::new(1, 1, 1, 1))];

        let diagnostics = check_glue(&resolver, &mut Metrics::new(), &additional).await;

        assert_eq!(1, diagnostics.len());
        assert_eq!(
            "missing glue for ns1.example.org.: 2.2.2.2",
            diagnostics[0].to_string()
        );
    }

    #[tokio::test]
    async fn reports_extra_glue() {
        let resolver = FakeResolver::new().addresses("ns1.example.org.", &[v4(1, 1, 1, 1)]);
        let additional = vec![
            a_record("ns1.example.org.", Ipv4Addr::new(1, 1, 1, 1)),
            aaaa_record("ns1.example.org.", Ipv6Addr::LOCALHOST),
        ];

        let diagnostics = check_glue(&resolver, &mut Metrics::new(), &additional).await;

        assert_eq!(
            vec!["extra glue for ns1.example.org.: ::1".to_string()],
            diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn reports_both_per_owner() {
        let resolver = FakeResolver::new()
            .addresses("ns1.example.org.", &[v4(1, 1, 1, 1)])
            .addresses("ns2.example.org.", &[v4(3, 3, 3, 3)]);
        let additional = vec![
            a_record("ns1.example.org.", Ipv4Addr::new(1, 1, 1, 1)),
            a_record("ns2.example.org.", Ipv4Addr::new(4, 4, 4, 4)),
        ];

        let diagnostics = check_glue(&resolver, &mut Metrics::new(), &additional).await;

        assert_eq!(
            vec![
                "missing glue for ns2.example.org.: 3.3.3.3".to_string(),
                "extra glue for ns2.example.org.: 4.4.4.4".to_string(),
            ],
            diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn ignores_non_address_records() {
        let resolver = FakeResolver::new();
        let additional = vec![unknown_record(".")];

        let diagnostics = check_glue(&resolver, &mut Metrics::new(), &additional).await;

        assert!(diagnostics.is_empty());
        assert_eq!(0, resolver.query_count());
    }
}
