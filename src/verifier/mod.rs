//! Mailbox verification driver and result shaping.
//!
//! [`Verifier`] is built once from an immutable [`VerifyOptions`] value and
//! exposes the whole pipeline: grouping, MX resolution, per-domain SMTP
//! passes, and reshaping the verdicts into the caller's input shape. The
//! `verify` contract is best-effort: network and protocol failures are
//! swallowed per domain and only visible through [`verify_with_report`] and
//! the logs.
//!
//! [`verify_with_report`]: Verifier::verify_with_report

mod engine;
mod error;
mod options;
mod types;

pub use error::VerifyError;
pub use options::VerifyOptions;
pub use types::{
    AddressOutcome, DomainDisposition, DomainReport, RcptOutcome, SkipReason, VerifyInput,
    VerifyOutcome, VerifyReport,
};

use std::collections::HashSet;

use native_tls::TlsConnector;
use trust_dns_resolver::Resolver;

use crate::grouping::{self, DomainBuckets};
use crate::mx;

use engine::{DomainJob, Sender};

pub struct Verifier {
    options: VerifyOptions,
    resolver: Resolver,
    tls: TlsConnector,
    from_domain: Option<String>,
    from_name: Option<String>,
}

impl Verifier {
    pub fn new(options: VerifyOptions) -> Result<Self, VerifyError> {
        let resolver = Resolver::from_system_conf()
            .map_err(|source| VerifyError::ResolverInit { source })?;
        let tls = TlsConnector::new().map_err(|source| VerifyError::TlsInit { source })?;
        Ok(Self {
            options,
            resolver,
            tls,
            from_domain: None,
            from_name: None,
        })
    }

    /// Check whether the given address(es) are accepted by their mail
    /// exchangers. A single address yields a boolean, a list yields the
    /// order-preserving subset that was accepted. Malformed addresses are
    /// dropped, unreachable or misbehaving domains contribute nothing, and
    /// no network failure ever reaches the caller.
    pub fn verify(&self, input: impl Into<VerifyInput>) -> Result<VerifyOutcome, VerifyError> {
        Ok(self.verify_with_report(input)?.outcome)
    }

    /// Like [`verify`](Verifier::verify), but also returns per-domain
    /// dispositions so silent skips (catch-all, dead exchangers, rejected
    /// envelopes) can be told apart.
    pub fn verify_with_report(
        &self,
        input: impl Into<VerifyInput>,
    ) -> Result<VerifyReport, VerifyError> {
        let input = input.into();
        let emails: &[String] = match &input {
            VerifyInput::Single(email) => std::slice::from_ref(email),
            VerifyInput::Many(emails) => emails,
            VerifyInput::Collection(_) => return Err(VerifyError::CollectionUnsupported),
        };

        let buckets = grouping::group_by_domains(emails);
        let resolved: Vec<Vec<String>> = buckets
            .domains()
            .map(|domain| mx::resolve_with(&self.resolver, domain))
            .collect();
        let jobs: Vec<DomainJob<'_>> = buckets
            .entries()
            .iter()
            .zip(&resolved)
            .map(|((domain, bucket), hosts)| DomainJob {
                domain: domain.as_str(),
                hosts: hosts.as_slice(),
                emails: bucket.as_slice(),
            })
            .collect();

        let domains = engine::check_domains(&self.options, &self.sender(), &self.tls, &jobs);

        let accepted: Vec<&str> = domains
            .iter()
            .flat_map(|report| report.addresses.iter())
            .filter(|address| address.outcome.is_accepted())
            .map(|address| address.address.as_str())
            .collect();

        Ok(VerifyReport {
            outcome: adapt_outcome(&input, &accepted),
            domains,
        })
    }

    /// Grouping step exposed standalone: per-domain buckets of the valid
    /// addresses in `input`, first-seen order preserved.
    pub fn get_by_domains(
        &self,
        input: impl Into<VerifyInput>,
    ) -> Result<DomainBuckets, VerifyError> {
        let input = input.into();
        let emails: &[String] = match &input {
            VerifyInput::Single(email) => std::slice::from_ref(email),
            VerifyInput::Many(emails) => emails,
            VerifyInput::Collection(_) => return Err(VerifyError::CollectionUnsupported),
        };
        Ok(grouping::group_by_domains(emails))
    }

    /// Resolution step exposed standalone: the exchanger probing order for
    /// every domain in `buckets`.
    pub fn get_mx_records(&self, buckets: &DomainBuckets) -> Vec<(String, Vec<String>)> {
        buckets
            .domains()
            .map(|domain| (domain.to_string(), mx::resolve_with(&self.resolver, domain)))
            .collect()
    }

    /// Override the sender domain for subsequent calls; an empty value
    /// restores the configured one.
    pub fn set_from_domain(&mut self, domain: impl Into<String>) {
        let domain = domain.into();
        self.from_domain = (!domain.is_empty()).then_some(domain);
    }

    /// Override the MAIL FROM local part for subsequent calls; an empty
    /// value restores the configured one.
    pub fn set_from_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.from_name = (!name.is_empty()).then_some(name);
    }

    fn sender(&self) -> Sender {
        Sender {
            domain: self
                .from_domain
                .clone()
                .unwrap_or_else(|| self.options.from_domain.clone()),
            name: self
                .from_name
                .clone()
                .unwrap_or_else(|| self.options.from_name.clone()),
        }
    }
}

fn adapt_outcome(input: &VerifyInput, accepted: &[&str]) -> VerifyOutcome {
    let set: HashSet<&str> = accepted.iter().copied().collect();
    match input {
        VerifyInput::Single(email) => VerifyOutcome::Single(set.contains(email.as_str())),
        VerifyInput::Many(emails) => VerifyOutcome::Many(
            emails
                .iter()
                .filter(|email| set.contains(email.as_str()))
                .cloned()
                .collect(),
        ),
        // Rejected before any pass runs; never adapted.
        VerifyInput::Collection(_) => VerifyOutcome::Many(Vec::new()),
    }
}
