use trust_dns_resolver::{Resolver, error::ResolveError};

use super::MxRecord;

/// Lookup the probing order for `domain` using the system resolver.
///
/// Failures (resolver initialization, lookup errors, NXDOMAIN) degrade to the
/// implicit-MX fallback `[domain]`; the result is always non-empty.
pub fn lookup_hosts(domain: &str) -> Vec<String> {
    match Resolver::from_system_conf() {
        Ok(resolver) => resolve_with(&resolver, domain),
        Err(err) => {
            tracing::debug!(error = %err, "system resolver unavailable, falling back to domain");
            vec![domain.to_string()]
        }
    }
}

/// Resolve MX records through `resolver` and order them for probing:
/// ascending preference (stable, so equal preferences keep resolver order),
/// domain itself appended last. Never fails.
pub(crate) fn resolve_with<R>(resolver: &R, domain: &str) -> Vec<String>
where
    R: LookupMx,
{
    let mut records = match resolver.lookup_mx(domain) {
        Ok(records) => records,
        Err(err) => {
            tracing::debug!(domain, error = %err, "MX lookup failed, falling back to domain");
            Vec::new()
        }
    };

    records.sort_by_key(|record| record.preference);

    let mut hosts: Vec<String> = records.into_iter().map(|record| record.exchange).collect();
    hosts.push(domain.to_string());
    hosts
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

pub(crate) trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        let lookup = Resolver::mx_lookup(self, domain)?;
        let mut records = Vec::new();
        for mx in lookup.iter() {
            let exchange = normalize_exchange(mx.exchange().to_utf8());
            records.push(MxRecord::new(mx.preference(), exchange));
        }
        Ok(records)
    }
}

#[cfg(test)]
impl LookupMx for crate::mx::tests::StubResolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        (self.on_lookup)(domain)
    }
}
