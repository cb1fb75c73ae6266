//! Per-domain SMTP passes and the cross-domain driver.
//!
//! A domain pass owns exactly one connection at a time. The script runs
//! HELO, optional EHLO/STARTTLS/EHLO, MAIL FROM, NOOP,
//! optional synthetic catch-all probe, then NOOP + RCPT TO per address.
//! Teardown (RSET, QUIT, close) runs on every exit path.

use std::thread;

use native_tls::TlsConnector;
use rand::{Rng, distributions::Alphanumeric};

use crate::smtp::{SmtpError, SmtpSession};

use super::options::VerifyOptions;
use super::types::{AddressOutcome, DomainDisposition, DomainReport, RcptOutcome, SkipReason};

/// Effective sender identity for one verification call (configuration plus
/// per-call overrides, already merged).
pub(crate) struct Sender {
    pub domain: String,
    pub name: String,
}

/// One domain bucket with its resolved exchanger candidates.
pub(crate) struct DomainJob<'a> {
    pub domain: &'a str,
    pub hosts: &'a [String],
    pub emails: &'a [String],
}

enum ScriptEnd {
    Completed,
    CatchAll,
}

/// Probe every domain and return one report per job, in job order.
///
/// With `concurrency` > 1 the jobs are spread over scoped worker threads;
/// domains stay independent and each connection still sees a strict
/// command/reply sequence. Reports come back in job order, exactly one per
/// job even when a worker dies.
pub(crate) fn check_domains(
    options: &VerifyOptions,
    sender: &Sender,
    tls: &TlsConnector,
    jobs: &[DomainJob<'_>],
) -> Vec<DomainReport> {
    let workers = options.concurrency.clamp(1, jobs.len().max(1));
    if workers <= 1 {
        return jobs
            .iter()
            .map(|job| run_domain(options, sender, tls, job))
            .collect();
    }

    let indexed: Vec<(usize, DomainReport)> = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            handles.push(scope.spawn(move || {
                let mut out = Vec::new();
                let mut index = worker;
                while index < jobs.len() {
                    out.push((index, run_domain(options, sender, tls, &jobs[index])));
                    index += workers;
                }
                out
            }));
        }
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap_or_default())
            .collect()
    });
    merge_reports(jobs, indexed)
}

/// Restore job order and keep the one-report-per-job contract: a job whose
/// worker died before delivering a report is filled in as an aborted pass
/// with its bucket skipped.
pub(crate) fn merge_reports(
    jobs: &[DomainJob<'_>],
    mut indexed: Vec<(usize, DomainReport)>,
) -> Vec<DomainReport> {
    let mut seen = vec![false; jobs.len()];
    for (index, _) in &indexed {
        seen[*index] = true;
    }
    for (index, job) in jobs.iter().enumerate() {
        if !seen[index] {
            tracing::debug!(domain = job.domain, "worker result missing, reporting aborted pass");
            indexed.push((
                index,
                DomainReport {
                    domain: job.domain.to_string(),
                    hosts_tried: Vec::new(),
                    disposition: DomainDisposition::Aborted {
                        reason: "worker thread failed".to_string(),
                    },
                    addresses: all_skipped(job.emails, SkipReason::SessionAborted),
                },
            ));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, report)| report).collect()
}

/// Try the exchanger candidates in order and run the session script on the
/// first one that yields a usable connection. Nothing here ever escapes to
/// the caller: the report's disposition carries the failure, if any.
fn run_domain(
    options: &VerifyOptions,
    sender: &Sender,
    tls: &TlsConnector,
    job: &DomainJob<'_>,
) -> DomainReport {
    let timeout = options.timeout();
    let mut hosts_tried = Vec::new();

    for host in job.hosts {
        hosts_tried.push(host.clone());
        let mut session = match SmtpSession::connect(host, options.smtp_port, timeout) {
            Ok(session) => session,
            Err(err) => {
                tracing::debug!(domain = job.domain, host = host.as_str(), error = %err,
                    "exchanger unusable, trying next candidate");
                continue;
            }
        };

        let mut addresses = Vec::new();
        let result = run_script(&mut session, options, sender, tls, job, &mut addresses);
        session.teardown();

        match result {
            Ok(ScriptEnd::Completed) => {
                tracing::debug!(domain = job.domain, host = session.host(), "domain pass completed");
                return DomainReport {
                    domain: job.domain.to_string(),
                    hosts_tried,
                    disposition: DomainDisposition::Completed,
                    addresses,
                };
            }
            Ok(ScriptEnd::CatchAll) => {
                tracing::debug!(domain = job.domain, "catch-all behaviour detected, discarding bucket");
                return DomainReport {
                    domain: job.domain.to_string(),
                    hosts_tried,
                    disposition: DomainDisposition::CatchAll,
                    addresses: all_skipped(job.emails, SkipReason::CatchAllDomain),
                };
            }
            Err(err) if err.is_host_fallback() => {
                tracing::debug!(domain = job.domain, error = %err, "host abandoned, trying next candidate");
                continue;
            }
            Err(err) => {
                tracing::debug!(domain = job.domain, error = %err, "domain pass aborted");
                // Verdicts gathered before the failure are kept; the rest of
                // the bucket is marked skipped.
                for email in job.emails.iter().skip(addresses.len()) {
                    addresses.push(AddressOutcome {
                        address: email.clone(),
                        outcome: RcptOutcome::Skipped {
                            reason: SkipReason::SessionAborted,
                        },
                    });
                }
                return DomainReport {
                    domain: job.domain.to_string(),
                    hosts_tried,
                    disposition: DomainDisposition::Aborted {
                        reason: err.to_string(),
                    },
                    addresses,
                };
            }
        }
    }

    tracing::debug!(domain = job.domain, "no usable mail exchanger");
    DomainReport {
        domain: job.domain.to_string(),
        hosts_tried,
        disposition: DomainDisposition::NoServer,
        addresses: all_skipped(job.emails, SkipReason::NoServer),
    }
}

fn run_script(
    session: &mut SmtpSession,
    options: &VerifyOptions,
    sender: &Sender,
    tls: &TlsConnector,
    job: &DomainJob<'_>,
    addresses: &mut Vec<AddressOutcome>,
) -> Result<ScriptEnd, SmtpError> {
    let hello = sender.domain.as_str();
    session.command(&format!("HELO {hello}"), &[250])?;

    if options.tls_connection {
        session.command(&format!("EHLO {hello}"), &[250])?;
        session.command("STARTTLS", &[220])?;
        session.upgrade_tls(tls)?;
        // Capabilities must be renegotiated on the encrypted channel; the
        // reply itself is not load-bearing.
        session.command(&format!("EHLO {hello}"), &[])?;
    }

    session.command(
        &format!("MAIL FROM:<{}@{}>", sender.name, sender.domain),
        &[250, 251],
    )?;
    session.command(&format!("NOOP {hello}"), &[250])?;

    if options.test_catch_all {
        let probe = synthetic_recipient(job.domain);
        match session.command(&format!("RCPT TO:<{probe}>"), &[250, 251]) {
            // Acceptance of a recipient that cannot exist means positive
            // answers from this server prove nothing.
            Ok(_) => return Ok(ScriptEnd::CatchAll),
            Err(SmtpError::UnexpectedResponse { code, .. }) => {
                tracing::trace!(domain = job.domain, code, "synthetic probe rejected, proceeding");
            }
            Err(err) => return Err(err),
        }
    }

    for email in job.emails {
        let result = session
            .command(&format!("NOOP {hello}"), &[250])
            .and_then(|_| session.command(&format!("RCPT TO:<{email}>"), &[250, 251]));
        let outcome = match result {
            Ok(reply) => RcptOutcome::Accepted { code: reply.code },
            Err(SmtpError::UnexpectedResponse { code, .. }) => RcptOutcome::Rejected { code },
            Err(err) => return Err(err),
        };
        addresses.push(AddressOutcome {
            address: email.clone(),
            outcome,
        });
    }

    Ok(ScriptEnd::Completed)
}

fn all_skipped(emails: &[String], reason: SkipReason) -> Vec<AddressOutcome> {
    emails
        .iter()
        .map(|email| AddressOutcome {
            address: email.clone(),
            outcome: RcptOutcome::Skipped { reason },
        })
        .collect()
}

/// Recipient that should not exist; its acceptance marks a catch-all server.
fn synthetic_recipient(domain: &str) -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("catch-{}@{}", token.to_ascii_lowercase(), domain)
}
