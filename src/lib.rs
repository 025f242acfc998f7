//! Passwordless identity and session registry.
//!
//! `latchkey` issues bearer-credential sessions, proves control of email
//! addresses through one-time mailed tokens, and links proved sessions to
//! long-lived accounts. Secrets are stored only as one-way digests and
//! compared in constant time; proof tokens are single use and short lived.
//!
//! The [`Registry`] is the state machine over a pluggable [`Store`]; the
//! [`Gateway`] drives the full mail-a-token-and-confirm flow on top of it,
//! speaking encoded credentials and throttling outbound mail per
//! destination domain.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use latchkey::{Gateway, LinkMessage, MemoryStore, NullMailer};
//!
//! # async fn demo() -> Result<(), latchkey::Error> {
//! let gateway = Gateway::new(MemoryStore::new(), Arc::new(NullMailer));
//!
//! // A device signs in and holds its credential.
//! let (credential, _session) = gateway.login().await?;
//!
//! // Prove an email address: a one-time token is rendered and mailed.
//! let message = LinkMessage::new("Example", "https://example.com");
//! let proof = gateway.request_proof("user@example.com", &message).await?;
//!
//! // The user opens the link; the device's session becomes verified.
//! let outcome = gateway.confirm(Some(credential.as_str()), &proof).await?;
//! assert!(outcome.is_confirmed());
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod clock;
pub mod config;
pub mod credential;
pub mod crypto;
pub mod events;
pub mod gateway;
pub mod mailer;
pub mod rate_limit;
pub mod registry;
pub mod session;
pub mod store;
pub mod validators;

pub use account::Account;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use config::LatchkeyConfig;
pub use config::LifespanConfig;
pub use config::SendRateConfig;
pub use credential::Credential;
pub use crypto::HashAlgorithm;
pub use crypto::Secret;
pub use events::register_event_listeners;
pub use gateway::renewed_credential;
pub use gateway::ConfirmOutcome;
pub use gateway::Gateway;
pub use mailer::LinkMessage;
pub use mailer::Mailer;
pub use mailer::MemoryMailer;
pub use mailer::NullMailer;
pub use mailer::OutboundMail;
pub use mailer::ProofMessage;
pub use rate_limit::SendLimiter;
pub use registry::AuthOutcome;
pub use registry::Registry;
pub use session::Claim;
pub use session::Session;
pub use session::EMAIL_CLAIM;
pub use store::MemoryStore;
pub use store::Store;

use std::fmt;

/// Errors surfaced by registry and gateway operations.
///
/// Expected negative outcomes are not errors: an unknown, expired, or
/// mismatched credential authenticates as denied rather than failing, so a
/// caller can never tell those cases apart (or apart from a wrong secret).
/// `Error` is reserved for malformed input and for infrastructure trouble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    SessionNotFound,
    AccountNotFound,
    InvalidIdentifier,
    InvalidCredential,
    TooManyAttempts,
    Crypto(String),
    Storage(String),
    Mail(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SessionNotFound => write!(f, "Session not found"),
            Error::AccountNotFound => write!(f, "Account not found"),
            Error::InvalidIdentifier => write!(f, "Invalid identifier"),
            Error::InvalidCredential => write!(f, "Invalid credential"),
            Error::TooManyAttempts => write!(f, "Too many attempts"),
            Error::Crypto(msg) => write!(f, "Crypto failure: {msg}"),
            Error::Storage(msg) => write!(f, "Storage failure: {msg}"),
            Error::Mail(msg) => write!(f, "Mail dispatch failure: {msg}"),
        }
    }
}
