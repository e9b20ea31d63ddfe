/// Metrics from a trace.  The tracer builds this structure as it goes
/// and hands it back with the outcome; nothing is exported.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Metrics {
    /// Non-recursive queries sent along the delegation chain.
    pub nameserver_queries: u64,
    /// Queries which some nameserver answered.
    pub nameserver_hits: u64,
    /// Queries which got no response at all.
    pub nameserver_misses: u64,
    /// Address lookups through the system resolvers.
    pub recursive_queries: u64,
    /// Referrals followed.
    pub hops: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nameserver_hit(&mut self) {
        self.nameserver_queries += 1;
        self.nameserver_hits += 1;
    }

    pub fn nameserver_miss(&mut self) {
        self.nameserver_queries += 1;
        self.nameserver_misses += 1;
    }

    pub fn recursive_query(&mut self) {
        self.recursive_queries += 1;
    }

    pub fn hop(&mut self) {
        self.hops += 1;
    }

    /// Total queries of any sort.
    pub fn queries(&self) -> u64 {
        self.nameserver_queries + self.recursive_queries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_queries() {
        let mut metrics = Metrics::new();
        metrics.nameserver_hit();
        metrics.nameserver_miss();
        metrics.recursive_query();

        assert_eq!(2, metrics.nameserver_queries);
        assert_eq!(3, metrics.queries());
    }
}
