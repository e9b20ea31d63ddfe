use clap::Parser;

use dns_delegation::cli::{init_tracing, ResolverArgs};
use dns_delegation::types::DomainName;
use dns_delegation::{AuditMode, Tracer};

// the doc comments for this struct turn into the CLI help text
#[derive(Parser)]
/// Check the delegation of domains
///
/// Each domain is traced from the root down to its own nameservers.
/// Glue which disagrees with the nameservers' real addresses, and
/// delegations which disagree with the zone's own NS records, are
/// printed one per line.
struct Args {
    /// Domain to check, can be given more than once
    #[clap(value_parser, required = true)]
    domain: Vec<DomainName>,

    #[clap(flatten)]
    resolver: ResolverArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_tracing();

    let resolver = args.resolver.to_resolver();
    let tracer = Tracer::new(&resolver, args.resolver.root_server.clone());

    for domain in &args.domain {
        match tracer.trace(domain, &AuditMode::Delegation).await {
            Ok(outcome) => {
                tracing::info!(%domain, status = ?outcome.status, "traced");
                for diagnostic in &outcome.diagnostics {
                    println!("{diagnostic}");
                }
            }
            Err(err) => eprintln!("error: {err}"),
        }
    }
}
