//! Minimal SMTP client plumbing for mailbox probing.
//!
//! [`SmtpStream`] owns the TCP (optionally TLS-upgraded) byte stream and the
//! reply grammar; [`SmtpSession`] layers command/expected-code checking on
//! top. One session drives exactly one connection, and the dialogue is
//! strictly half-duplex: a command is fully answered before the next one is
//! sent.

mod error;
mod session;
mod stream;

pub use error::SmtpError;
pub use session::SmtpSession;
pub use stream::{SmtpReply, SmtpStream};
