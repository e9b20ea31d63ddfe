#![warn(clippy::pedantic)]
// TODO: fix
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
// Don't care enough to fix
#![allow(clippy::match_same_arms)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::similar_names)]
#![allow(clippy::wildcard_imports)]

//! Audits the delegation of DNS domains: walks the referral chain from
//! a root server down to each domain's own nameservers, comparing what
//! the parents say (delegation and glue) with what the zone itself
//! publishes.

pub mod addresses;
pub mod cli;
pub mod context;
pub mod diagnostic;
pub mod glue;
pub mod metrics;
pub mod net;
pub mod resolver;
pub mod rr_util;
pub mod trace;
pub mod types;

/// The root server every trace starts from, unless configured
/// otherwise.
pub const DEFAULT_ROOT_SERVER: &str = "j.root-servers.net.";

pub use self::diagnostic::Diagnostic;
pub use self::resolver::{NetworkResolver, Resolver};
pub use self::trace::{
    AuditMode, TraceError, TraceOutcome, TraceStatus, Tracer, HOP_LIMIT, TRUST_DEPTH,
};
