use async_trait::async_trait;

use crate::events::{AuthEvent, Listener};

/// Writes one log line per event at a configurable level.
#[derive(Debug, Clone, Copy)]
pub struct LoggingListener {
    level: log::Level,
}

impl LoggingListener {
    pub fn new(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new(log::Level::Info)
    }
}

#[async_trait]
impl Listener for LoggingListener {
    async fn handle(&self, event: &AuthEvent) {
        match event {
            AuthEvent::SessionCreated { session_id, at } => {
                log::log!(target: "latchkey::events", self.level, "event={}, session_id={}, at={}", event.name(), session_id, at);
            }
            AuthEvent::ProofRequested {
                session_id,
                identifier,
                at,
            } => {
                log::log!(target: "latchkey::events", self.level, "event={}, session_id={}, identifier={}, at={}", event.name(), session_id, identifier, at);
            }
            AuthEvent::ClaimProved {
                session_id,
                kind,
                at,
            } => {
                log::log!(target: "latchkey::events", self.level, "event={}, session_id={}, kind={}, at={}", event.name(), session_id, kind, at);
            }
            AuthEvent::SecretRenewed { session_id, at } => {
                log::log!(target: "latchkey::events", self.level, "event={}, session_id={}, at={}", event.name(), session_id, at);
            }
            AuthEvent::LoggedOut { session_id, at } => {
                log::log!(target: "latchkey::events", self.level, "event={}, session_id={}, at={}", event.name(), session_id, at);
            }
            AuthEvent::AccountRemoved { kind, id, at } => {
                log::log!(target: "latchkey::events", self.level, "event={}, kind={}, id={}, at={}", event.name(), kind, id, at);
            }
        }
    }
}
