#![forbid(unsafe_code)]
//! mxverify — mailbox existence pre-checks over partial SMTP sessions.
//!
//! Addresses are grouped per domain, each domain's mail exchangers are
//! resolved and tried in preference order, and a short SMTP dialogue (HELO,
//! optional STARTTLS, MAIL FROM, RCPT TO) decides which mailboxes the server
//! claims to accept. No mail is sent. A catch-all guard probes a synthetic
//! recipient first and discards domains that accept anything.
//!
//! The verdict is inherently best-effort: greylisting, catch-all setups and
//! anti-spam defenses mean a negative answer can never be guaranteed, and
//! unreachable or uncooperative domains simply contribute no addresses.
//!
//! ```no_run
//! use mxverify::{Verifier, VerifyOptions, VerifyOutcome};
//!
//! # fn main() -> Result<(), mxverify::VerifyError> {
//! let options = VerifyOptions {
//!     from_domain: "example.org".to_string(),
//!     from_name: "verifier".to_string(),
//!     ..VerifyOptions::default()
//! };
//! let verifier = Verifier::new(options)?;
//!
//! if let VerifyOutcome::Single(exists) = verifier.verify("someone@example.com")? {
//!     println!("mailbox likely exists: {exists}");
//! }
//! # Ok(())
//! # }
//! ```

mod address;
mod grouping;
pub mod mx;
pub mod smtp;
mod verifier;

pub use grouping::{DomainBuckets, group_by_domains};
pub use verifier::{
    AddressOutcome, DomainDisposition, DomainReport, RcptOutcome, SkipReason, Verifier,
    VerifyError, VerifyInput, VerifyOptions, VerifyOutcome, VerifyReport,
};
