use thiserror::Error;

/// Failures surfaced by [`Verifier`](super::Verifier) itself.
///
/// Network and protocol trouble during a verification pass never shows up
/// here: those are swallowed per domain and only visible through the report
/// dispositions and logs.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("system resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("TLS connector initialization failed: {source}")]
    TlsInit {
        #[source]
        source: native_tls::Error,
    },
    #[error("collection inputs are not implemented")]
    CollectionUnsupported,
}
