//! Command-line plumbing shared by the audit tools.

use std::env;
use std::io;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::resolver::{system_resolvers, NetworkResolver, DEFAULT_TIMEOUT, RESOLV_CONF};
use crate::types::HostOrIP;
use crate::DEFAULT_ROOT_SERVER;

// the doc comments on these fields turn into the CLI help text
#[derive(Debug, Clone, clap::Args)]
pub struct ResolverArgs {
    /// Root nameserver to start each trace from, a hostname or an IP
    #[clap(
        long,
        value_parser,
        env = "DNS_DELEGATION_ROOT_SERVER",
        default_value = DEFAULT_ROOT_SERVER
    )]
    pub root_server: HostOrIP,

    /// Recursive resolver to look up nameserver addresses with, can be
    /// specified more than once [default: the nameservers in
    /// /etc/resolv.conf]
    #[clap(
        long,
        value_parser,
        env = "DNS_DELEGATION_SYSTEM_RESOLVER",
        value_delimiter = ','
    )]
    pub system_resolver: Vec<IpAddr>,

    /// How long to wait for each response, in seconds
    #[clap(
        long,
        value_parser,
        env = "DNS_DELEGATION_TIMEOUT",
        default_value_t = DEFAULT_TIMEOUT.as_secs()
    )]
    pub timeout: u64,
}

impl ResolverArgs {
    pub fn to_resolver(&self) -> NetworkResolver {
        let system_resolvers = if self.system_resolver.is_empty() {
            system_resolvers(Path::new(RESOLV_CONF))
        } else {
            self.system_resolver.clone()
        };

        tracing::debug!(?system_resolvers, timeout = self.timeout, "configured resolver");
        NetworkResolver::new(system_resolvers, Duration::from_secs(self.timeout))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogFormat {
    Plain,
    Json,
}

impl LogFormat {
    /// Interpret the value of `RUST_LOG_FORMAT`: only "json" changes
    /// anything.
    pub fn from_setting(setting: Option<&str>) -> Self {
        match setting {
            Some(value) if value.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Plain,
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default "warn"), formatted by
/// `RUST_LOG_FORMAT`.  Stdout is left for the diagnostics.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let format = LogFormat::from_setting(env::var("RUST_LOG_FORMAT").ok().as_deref());

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
        LogFormat::Plain => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stderr))
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use std::net::Ipv4Addr;

    use super::*;
    use crate::types::test_util::*;

    #[derive(Parser)]
    struct TestArgs {
        #[clap(flatten)]
        resolver: ResolverArgs,
    }

    #[test]
    fn resolver_args_override_everything() {
        let args = TestArgs::try_parse_from([
            "test",
            "--root-server",
            "192.0.2.53",
            "--system-resolver",
            "127.0.0.53",
            "--system-resolver",
            "::1",
            "--timeout",
            "2",
        ])
        .unwrap();

        assert_eq!(
            HostOrIP::IP(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 53))),
            args.resolver.root_server
        );

        let resolver = args.resolver.to_resolver();
        assert_eq!(
            vec![
                "127.0.0.53".parse::<IpAddr>().unwrap(),
                "::1".parse::<IpAddr>().unwrap()
            ],
            resolver.system_resolvers
        );
        assert_eq!(Duration::from_secs(2), resolver.timeout);
    }

    #[test]
    fn timeout_defaults_to_resolver_default() {
        let args = TestArgs::try_parse_from(["test"]).unwrap();

        assert_eq!(DEFAULT_TIMEOUT, args.resolver.to_resolver().timeout);
    }

    #[test]
    fn root_server_hostname() {
        let args = TestArgs::try_parse_from(["test", "--root-server", "A.Root-Servers.Net"]).unwrap();

        assert_eq!(
            HostOrIP::Host(domain("a.root-servers.net.")),
            args.resolver.root_server
        );
    }

    #[test]
    fn rejects_bad_root_server() {
        assert!(TestArgs::try_parse_from(["test", "--root-server", "a..b"]).is_err());
    }

    #[test]
    fn log_format_setting() {
        assert_eq!(LogFormat::Plain, LogFormat::from_setting(None));
        assert_eq!(LogFormat::Plain, LogFormat::from_setting(Some("pretty")));
        assert_eq!(LogFormat::Json, LogFormat::from_setting(Some("JSON")));
    }
}
