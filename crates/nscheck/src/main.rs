use clap::Parser;
use std::process;

use dns_delegation::cli::{init_tracing, ResolverArgs};
use dns_delegation::types::DomainName;
use dns_delegation::{AuditMode, Tracer};

// the doc comments for this struct turn into the CLI help text
#[derive(Parser)]
/// Check which domains a nameserver should still be serving
///
/// Each domain is traced from the root down to its own nameservers.
/// Problems found along the way are printed one per line, followed by
/// the domains which should be deleted from the server's configuration:
/// those which no longer reach an answer, or whose delegation and zone
/// apex both leave the server out.
struct Args {
    /// Nameserver whose configuration is being checked
    #[clap(value_parser)]
    server: DomainName,

    /// Domain configured on the nameserver, can be given more than once
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
    let mode = AuditMode::Server(args.server);

    let mut to_delete = Vec::new();
    for domain in &args.domain {
        match tracer.trace(domain, &mode).await {
            Ok(outcome) => {
                tracing::info!(%domain, status = ?outcome.status, remove = outcome.remove, "traced");
                for diagnostic in &outcome.diagnostics {
                    println!("{diagnostic}");
                }
                if outcome.remove {
                    to_delete.push(domain);
                }
            }
            Err(err) => {
                eprintln!("error: {err}");
                process::exit(1);
            }
        }
    }

    println!("\nList of domains which should be deleted from server config:");
    for domain in to_delete {
        println!("{domain}");
    }
}
