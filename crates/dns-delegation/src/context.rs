use crate::diagnostic::Diagnostic;
use crate::metrics::Metrics;
use crate::rr_util::ns_records;
use crate::types::*;

/// One referral along the chain: the `NS` records of the AUTHORITY
/// section, and the ADDITIONAL section which carries the glue.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ReferralStep {
    pub nameservers: Vec<ResourceRecord>,
    pub glue: Vec<ResourceRecord>,
}

impl ReferralStep {
    pub fn from_response(response: &QueryResult) -> Self {
        Self {
            nameservers: ns_records(&response.authority),
            glue: response.additional.clone(),
        }
    }

    /// The zone this referral delegates, taken from its first `NS`
    /// record.
    pub fn owner(&self) -> Option<&DomainName> {
        self.nameservers.first().map(|rr| &rr.name)
    }
}

/// The referrals seen so far, root first.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct DelegationChain {
    steps: Vec<ReferralStep>,
}

impl DelegationChain {
    pub fn push(&mut self, step: ReferralStep) {
        self.steps.push(step);
    }

    pub fn pop(&mut self) -> Option<ReferralStep> {
        self.steps.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Per-trace state.  A fresh one is built for every domain and
/// consumed when the outcome is produced, so nothing leaks from one
/// domain into the next.
pub struct TraceState {
    pub domain: DomainName,
    /// The nameservers the next chain query goes to.
    pub targets: Vec<HostOrIP>,
    pub hops: usize,
    pub chain: DelegationChain,
    diagnostics: Vec<Diagnostic>,
    metrics: Metrics,
}

impl TraceState {
    pub fn new(domain: DomainName, root_server: HostOrIP) -> Self {
        Self {
            domain,
            targets: vec![root_server],
            hops: 0,
            chain: DelegationChain::default(),
            diagnostics: Vec::new(),
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&mut self) -> &mut Metrics {
        &mut self.metrics
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(%diagnostic, "found anomaly");
        self.diagnostics.push(diagnostic);
    }

    pub fn report_all(&mut self, diagnostics: Vec<Diagnostic>) {
        for diagnostic in diagnostics {
            self.report(diagnostic);
        }
    }

    pub fn retarget(&mut self, targets: Vec<HostOrIP>) {
        self.targets = targets;
    }

    pub fn done(self) -> (Vec<Diagnostic>, Metrics) {
        (self.diagnostics, self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::types::test_util::*;

    #[test]
    fn referral_step_keeps_only_ns_authority() {
        let response = QueryResult {
            rcode: Rcode::NoError,
            answers: Vec::new(),
            authority: vec![
                unknown_record("org."),
                ns_record("example.org.", "ns1.example.org."),
            ],
            additional: vec![a_record("ns1.example.org.", Ipv4Addr::new(1, 1, 1, 1))],
        };

        let step = ReferralStep::from_response(&response);

        assert_eq!(vec![ns_record("example.org.", "ns1.example.org.")], step.nameservers);
        assert_eq!(1, step.glue.len());
        assert_eq!(Some(&domain("example.org.")), step.owner());
    }

    #[test]
    fn trace_state_starts_at_root() {
        let root = HostOrIP::Host(domain("j.root-servers.net."));
        let state = TraceState::new(domain("example.org."), root.clone());

        assert_eq!(vec![root], state.targets);
        assert_eq!(0, state.hops);
        assert!(state.chain.is_empty());
    }
}
