use chrono::{DateTime, Utc};

/// A lifecycle transition in the session registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SessionCreated {
        session_id: String,
        at: DateTime<Utc>,
    },
    ProofRequested {
        session_id: String,
        identifier: String,
        at: DateTime<Utc>,
    },
    ClaimProved {
        session_id: String,
        kind: String,
        at: DateTime<Utc>,
    },
    SecretRenewed {
        session_id: String,
        at: DateTime<Utc>,
    },
    LoggedOut {
        session_id: String,
        at: DateTime<Utc>,
    },
    AccountRemoved {
        kind: String,
        id: String,
        at: DateTime<Utc>,
    },
}

impl AuthEvent {
    /// Stable dotted name, usable as a metric or log key.
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::SessionCreated { .. } => "session.created",
            AuthEvent::ProofRequested { .. } => "proof.requested",
            AuthEvent::ClaimProved { .. } => "claim.proved",
            AuthEvent::SecretRenewed { .. } => "secret.renewed",
            AuthEvent::LoggedOut { .. } => "session.logged_out",
            AuthEvent::AccountRemoved { .. } => "account.removed",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            AuthEvent::SessionCreated { at, .. }
            | AuthEvent::ProofRequested { at, .. }
            | AuthEvent::ClaimProved { at, .. }
            | AuthEvent::SecretRenewed { at, .. }
            | AuthEvent::LoggedOut { at, .. }
            | AuthEvent::AccountRemoved { at, .. } => *at,
        }
    }
}
