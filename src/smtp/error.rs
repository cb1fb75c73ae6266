use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmtpError {
    #[error("connection to {host}:{port} failed: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("unexpected response (code {code}): {text}")]
    UnexpectedResponse { code: u16, text: String },
    #[error("TLS upgrade failed: {source}")]
    EncryptionUpgradeFailed {
        #[source]
        source: native_tls::Error,
    },
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SmtpError {
    pub(crate) fn io(source: std::io::Error) -> Self {
        Self::Io { source }
    }

    /// Failures that disqualify one exchanger host without condemning the
    /// whole domain pass: the fallback loop moves on to the next candidate.
    pub fn is_host_fallback(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::EncryptionUpgradeFailed { .. }
        )
    }
}
