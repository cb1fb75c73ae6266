//! Mail-exchanger resolution.
//!
//! [`lookup_hosts`] performs a synchronous MX lookup with the system
//! resolver and returns the probing order for a domain: exchangers ascending
//! by preference, then the domain itself as implicit-MX fallback. The list is
//! never empty and the lookup never fails from the caller's point of view.

mod resolver;
mod types;

pub use resolver::lookup_hosts;
pub use types::MxRecord;

pub(crate) use resolver::resolve_with;
