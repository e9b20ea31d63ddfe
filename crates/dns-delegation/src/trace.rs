use std::collections::BTreeSet;
use tracing::Instrument;

use crate::addresses::resolve_addresses;
use crate::context::{ReferralStep, TraceState};
use crate::diagnostic::Diagnostic;
use crate::glue::check_glue;
use crate::metrics::Metrics;
use crate::resolver::Resolver;
use crate::rr_util::{ns_names, ns_names_in_order};
use crate::types::*;

/// Maximum number of referrals followed for one domain.  This is what
/// stops a set of nameservers which refer to each other forever.
pub const HOP_LIMIT: usize = 20;

/// While fewer than this many referrals have been followed, a further
/// referral is preferred over a final answer when picking between
/// candidate nameservers.
pub const TRUST_DEPTH: usize = 10;

/// What a trace is checking.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum AuditMode {
    /// Should this nameserver still be configured for the domain?
    Server(DomainName),
    /// Does the parent's delegation (and glue) match the zone?
    Delegation,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TraceStatus {
    /// The chain reached an answer and nothing was wrong with it.
    Validated,
    /// The chain reached an answer which disagrees with the delegation.
    LameDelegation,
    /// The chain ended without an answer: a name error, or no
    /// candidate nameserver gave a usable response.
    BrokenChain,
    /// The hop limit was reached.
    LoopDetected,
    /// None of the nameservers of a referral gave a usable response.
    QueryFailed,
    /// The root zone is never delegated, so there is nothing to trace.
    RootZone,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TraceOutcome {
    pub status: TraceStatus,
    pub diagnostics: Vec<Diagnostic>,
    /// In server-audit mode, whether the domain should be removed from
    /// the server's configuration.  Always `false` in delegation-audit
    /// mode.
    pub remove: bool,
    pub metrics: Metrics,
}

/// Failures which stop a trace before it gets anywhere.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum TraceError {
    #[error("root name server failure while tracing {domain}")]
    RootServerFailure { domain: DomainName },
}

/// The verdict on one candidate nameserver of a referral.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CandidateVerdict {
    /// Unusable, or no better than what is already held: try the next.
    Continue,
    /// A further referral: take it and stop looking.
    AdoptReferral(QueryResult),
    /// A final answer: take it, but keep looking for a referral.
    AdoptAnswer(QueryResult),
}

/// Walks delegation chains from a root server, one domain at a time.
pub struct Tracer<'a, R> {
    resolver: &'a R,
    root_server: HostOrIP,
}

impl<'a, R: Resolver> Tracer<'a, R> {
    pub fn new(resolver: &'a R, root_server: HostOrIP) -> Self {
        Self {
            resolver,
            root_server,
        }
    }

    /// Trace a domain from the root down.
    ///
    /// # Errors
    ///
    /// If the root server does not respond at all.
    pub async fn trace(
        &self,
        domain: &DomainName,
        mode: &AuditMode,
    ) -> Result<TraceOutcome, TraceError> {
        let span = match mode {
            AuditMode::Server(server) => {
                tracing::error_span!("trace_delegation", %domain, %server)
            }
            AuditMode::Delegation => tracing::error_span!("trace_delegation", %domain),
        };
        self.trace_notinstrumented(domain, mode)
            .instrument(span)
            .await
    }

    async fn trace_notinstrumented(
        &self,
        domain: &DomainName,
        mode: &AuditMode,
    ) -> Result<TraceOutcome, TraceError> {
        // a query for the root zone can never produce a referral to
        // check against
        if domain.is_root() && matches!(mode, AuditMode::Server(_)) {
            tracing::debug!("root zone");
            return Ok(TraceOutcome {
                status: TraceStatus::RootZone,
                diagnostics: Vec::new(),
                remove: true,
                metrics: Metrics::new(),
            });
        }

        let mut state = TraceState::new(domain.clone(), self.root_server.clone());

        let Some(response) = self.query_targets(&mut state).await else {
            tracing::debug!(root_server = %self.root_server, "no response from root server");
            return Err(TraceError::RootServerFailure {
                domain: domain.clone(),
            });
        };

        let mut result = Some(response);
        let mut status = None;

        while result.as_ref().is_some_and(QueryResult::is_referral) {
            let Some(response) = result.take() else {
                break;
            };

            let step = ReferralStep::from_response(&response);
            tracing::trace!(hops = %state.hops, owner = ?step.owner(), nameservers = step.nameservers.len(), "got referral");
            state.chain.push(step.clone());

            if *mode == AuditMode::Delegation {
                let diagnostics = check_glue(self.resolver, state.metrics(), &step.glue).await;
                state.report_all(diagnostics);
            }

            if response.rcode == Rcode::NameError {
                state.report(Diagnostic::DelegationEnds {
                    domain: domain.clone(),
                    at: response.authority.last().map(|rr| rr.name.clone()),
                });
                status = Some(TraceStatus::BrokenChain);
                break;
            }

            state.hops += 1;
            if state.hops > HOP_LIMIT {
                state.report(Diagnostic::LoopingDetected {
                    domain: domain.clone(),
                });
                status = Some(TraceStatus::LoopDetected);
                break;
            }
            state.metrics().hop();

            result = match mode {
                AuditMode::Server(_) => self.select_candidate(&mut state, &step).await,
                AuditMode::Delegation => self.follow_referral(&mut state, &step).await,
            };

            if result.is_none() {
                status = Some(match mode {
                    AuditMode::Server(_) => TraceStatus::BrokenChain,
                    AuditMode::Delegation => TraceStatus::QueryFailed,
                });
            }
        }

        let (remove, status) = match result {
            Some(response) => compare_with_apex(&mut state, mode, &response),
            // cannot confirm the domain is still delegated
            None => (
                matches!(mode, AuditMode::Server(_)),
                status.unwrap_or(TraceStatus::BrokenChain),
            ),
        };

        let (diagnostics, metrics) = state.done();
        tracing::debug!(?status, remove, diagnostics = diagnostics.len(), ?metrics, "trace finished");

        Ok(TraceOutcome {
            status,
            diagnostics,
            remove,
            metrics,
        })
    }

    /// Send the chain query (the domain's `NS` records, no recursion)
    /// to the current targets.
    async fn query_targets(&self, state: &mut TraceState) -> Option<QueryResult> {
        let response = self
            .resolver
            .query_nameservers(&state.targets, &state.domain, RecordType::NS)
            .await;

        if response.is_some() {
            state.metrics().nameserver_hit();
        } else {
            state.metrics().nameserver_miss();
        }

        response
    }

    /// Pick the response to continue with out of the referral's
    /// nameservers, in order.  A referral ends the search; an answer is
    /// held while the remaining candidates are checked for a referral.
    async fn select_candidate(
        &self,
        state: &mut TraceState,
        step: &ReferralStep,
    ) -> Option<QueryResult> {
        let mut held = None;

        for nameserver in ns_names_in_order(&step.nameservers) {
            match self
                .evaluate_candidate(state, &nameserver, held.as_ref())
                .await
            {
                CandidateVerdict::Continue => (),
                CandidateVerdict::AdoptAnswer(response) => {
                    tracing::trace!(%nameserver, "adopting answer");
                    held = Some(response);
                }
                CandidateVerdict::AdoptReferral(response) => {
                    tracing::trace!(%nameserver, "adopting referral");
                    held = Some(response);
                    break;
                }
            }
        }

        held
    }

    async fn evaluate_candidate(
        &self,
        state: &mut TraceState,
        nameserver: &DomainName,
        held: Option<&QueryResult>,
    ) -> CandidateVerdict {
        let domain = state.domain.clone();

        if resolve_addresses(self.resolver, state.metrics(), nameserver)
            .await
            .is_empty()
        {
            state.report(Diagnostic::InvalidDelegation {
                domain,
                nameserver: nameserver.clone(),
            });
            return CandidateVerdict::Continue;
        }

        state.retarget(vec![HostOrIP::Host(nameserver.clone())]);
        let Some(response) = self.query_targets(state).await else {
            state.report(Diagnostic::QueryFailed {
                domain,
                nameserver: nameserver.clone(),
            });
            return CandidateVerdict::Continue;
        };

        if !response.rcode.is_usable() {
            state.report(Diagnostic::UnexpectedRcode {
                domain,
                rcode: response.rcode,
                nameserver: nameserver.clone(),
            });
            return CandidateVerdict::Continue;
        }

        if !should_adopt(held, &response, state.hops) {
            CandidateVerdict::Continue
        } else if response.is_referral() {
            CandidateVerdict::AdoptReferral(response)
        } else {
            CandidateVerdict::AdoptAnswer(response)
        }
    }

    /// Send the chain query to the nameservers of the referral in
    /// order; the first usable response is followed.  Responses with an
    /// rcode other than NOERROR or NXDOMAIN are reported and skipped.
    async fn follow_referral(
        &self,
        state: &mut TraceState,
        step: &ReferralStep,
    ) -> Option<QueryResult> {
        let domain = state.domain.clone();
        let nameservers = ns_names_in_order(&step.nameservers);

        for nameserver in &nameservers {
            state.retarget(vec![HostOrIP::Host(nameserver.clone())]);
            match self.query_targets(state).await {
                Some(response) if response.rcode.is_usable() => return Some(response),
                Some(response) => state.report(Diagnostic::UnexpectedRcode {
                    domain: domain.clone(),
                    rcode: response.rcode,
                    nameserver: nameserver.clone(),
                }),
                None => tracing::debug!(%nameserver, "no response"),
            }
        }

        state.report(Diagnostic::NoData {
            domain,
            last_referral: nameservers.into_iter().collect(),
        });
        None
    }
}

/// Whether a usable candidate response should replace what is held:
/// anything beats nothing, and a referral beats an answer while the
/// chain is still short enough to trust.
pub fn should_adopt(held: Option<&QueryResult>, response: &QueryResult, hops: usize) -> bool {
    match held {
        None => true,
        Some(held) => held.has_answer() && response.is_referral() && hops < TRUST_DEPTH,
    }
}

/// Compare the last delegation with the answer the chain ended at.
/// Returns the removal recommendation and the status.
fn compare_with_apex(
    state: &mut TraceState,
    mode: &AuditMode,
    response: &QueryResult,
) -> (bool, TraceStatus) {
    let domain = state.domain.clone();
    let apex = ns_names(&response.answers);
    let answer_owner = response.answers.first().map(|rr| &rr.name);

    let delegation = match state.chain.pop() {
        Some(step) if step.owner().is_some() && step.owner() == answer_owner => step,
        _ => {
            // no delegation for the answering zone (a more specific
            // zone on the same nameserver): only the apex can be checked
            return match mode {
                AuditMode::Server(server) if !apex.contains(server) => {
                    state.report(Diagnostic::SubdomainNotInApex {
                        domain,
                        server: server.clone(),
                    });
                    (true, TraceStatus::LameDelegation)
                }
                _ => (false, TraceStatus::Validated),
            };
        }
    };

    let delegated = ns_names(&delegation.nameservers);

    match mode {
        AuditMode::Server(server) => {
            let diagnostic = match (delegated.contains(server), apex.contains(server)) {
                (true, true) => return (false, TraceStatus::Validated),
                (false, false) => {
                    state.report(Diagnostic::NotInDelegationNorApex {
                        domain,
                        server: server.clone(),
                    });
                    return (true, TraceStatus::LameDelegation);
                }
                (false, true) => Diagnostic::InApexNotDelegated {
                    domain,
                    server: server.clone(),
                },
                (true, false) => Diagnostic::DelegatedNotInApex {
                    domain,
                    server: server.clone(),
                },
            };
            state.report(diagnostic);
            (false, TraceStatus::LameDelegation)
        }
        AuditMode::Delegation => {
            let missing = apex.difference(&delegated).cloned().collect::<BTreeSet<_>>();
            let extra = delegated.difference(&apex).cloned().collect::<BTreeSet<_>>();
            let mut status = TraceStatus::Validated;

            if !missing.is_empty() {
                state.report(Diagnostic::MissingDelegations {
                    domain: domain.clone(),
                    nameservers: missing,
                });
                status = TraceStatus::LameDelegation;
            }
            if !extra.is_empty() {
                state.report(Diagnostic::ExtraDelegations {
                    domain,
                    nameservers: extra,
                });
                status = TraceStatus::LameDelegation;
            }

            (false, status)
        }
    }
}
