/// Input accepted by [`Verifier::verify`](super::Verifier::verify).
///
/// `Collection` is reserved for externally-defined collection types; passing
/// it fails with [`VerifyError::CollectionUnsupported`](super::VerifyError)
/// rather than silently degrading to a list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VerifyInput {
    Single(String),
    Many(Vec<String>),
    Collection(Vec<String>),
}

impl From<&str> for VerifyInput {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for VerifyInput {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for VerifyInput {
    fn from(value: Vec<String>) -> Self {
        Self::Many(value)
    }
}

impl From<Vec<&str>> for VerifyInput {
    fn from(value: Vec<&str>) -> Self {
        Self::Many(value.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for VerifyInput {
    fn from(value: &[&str]) -> Self {
        Self::Many(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Result shape mirroring the input shape: a boolean for a single address, an
/// order-preserving subset of the input for a list.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Single(bool),
    Many(Vec<String>),
}

impl VerifyOutcome {
    pub fn as_single(&self) -> Option<bool> {
        match self {
            Self::Single(exists) => Some(*exists),
            Self::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&[String]> {
        match self {
            Self::Single(_) => None,
            Self::Many(accepted) => Some(accepted),
        }
    }
}

/// Why an address ended up without a RCPT TO verdict.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The synthetic probe was accepted, so positive answers from this
    /// domain prove nothing.
    CatchAllDomain,
    /// The session died before this address was probed.
    SessionAborted,
    /// No exchanger accepted a connection with a 220 greeting.
    NoServer,
}

/// Verdict for one address within a domain pass.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RcptOutcome {
    Accepted { code: u16 },
    Rejected { code: u16 },
    Skipped { reason: SkipReason },
}

impl RcptOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressOutcome {
    pub address: String,
    pub outcome: RcptOutcome,
}

/// How a domain pass ended.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainDisposition {
    /// Every address in the bucket got an individual verdict.
    Completed,
    /// The catch-all guard fired; the whole bucket was discarded.
    CatchAll,
    /// All exchanger candidates were exhausted without a usable connection.
    NoServer,
    /// The session script failed mid-pass; verdicts gathered before the
    /// failure are kept.
    Aborted { reason: String },
}

/// Per-domain diagnostics for one verification call.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainReport {
    pub domain: String,
    pub hosts_tried: Vec<String>,
    pub disposition: DomainDisposition,
    pub addresses: Vec<AddressOutcome>,
}

/// Outcome plus per-domain diagnostics, for callers that need to know why a
/// domain produced nothing (the bare `verify` contract is best-effort and
/// silent).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub outcome: VerifyOutcome,
    pub domains: Vec<DomainReport>,
}
