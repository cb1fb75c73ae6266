use std::time::Duration;

/// Configuration consumed by [`Verifier`](super::Verifier). The core only
/// reads it; loading it from files or environments is the caller's business.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Domain announced in HELO/EHLO/NOOP and used as the MAIL FROM domain.
    pub from_domain: String,
    /// Local part of the MAIL FROM address.
    pub from_name: String,
    /// Destination port on each mail exchanger.
    pub smtp_port: u16,
    /// Attempt the EHLO / STARTTLS / EHLO upgrade before the envelope.
    pub tls_connection: bool,
    /// Probe a synthetic recipient first and discard the domain when the
    /// server accepts it (catch-all guard).
    pub test_catch_all: bool,
    /// Per-socket connect/read/write deadline in milliseconds; 0 disables it.
    pub timeout_ms: u64,
    /// Upper bound on domains probed in parallel; 1 keeps probing strictly
    /// sequential.
    pub concurrency: usize,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            from_domain: "localhost".to_string(),
            from_name: "postmaster".to_string(),
            smtp_port: 25,
            tls_connection: false,
            test_catch_all: true,
            timeout_ms: 5_000,
            concurrency: 1,
        }
    }
}

impl VerifyOptions {
    /// Return the timeout as a [`Duration`]. A zero timeout disables the
    /// connection/read deadline.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }
}
