//! Account entity: the aggregate of sessions that proved one identifier.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::{schema_version, Session, SCHEMA_VERSION};

/// All sessions proven to belong to one external identifier, keyed by
/// `(kind, id)` — one account per identifier.
///
/// `session_ids` holds only ids whose claim on this identifier was proved
/// and explicitly linked. `data` is an opaque blob for the embedding
/// application; the registry stores it untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default = "schema_version")]
    pub schema: u32,

    /// Identifier namespace, e.g. `"email"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Identifier value; together with `kind` this is the account's key.
    pub id: String,

    #[serde(default)]
    pub session_ids: Vec<String>,

    #[serde(default)]
    pub data: Value,
}

impl Account {
    pub fn new(kind: &str, id: &str) -> Self {
        Self {
            schema: SCHEMA_VERSION,
            kind: kind.to_owned(),
            id: id.to_owned(),
            session_ids: Vec::new(),
            data: Value::Null,
        }
    }

    /// Appends the session's id.
    ///
    /// The list does not dedupe; linking checks [`Account::has_session`]
    /// before calling.
    pub fn add_session(&mut self, session: &Session) {
        self.session_ids.push(session.id.clone());
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        self.session_ids.iter().any(|id| id == session_id)
    }

    /// Removes the first occurrence of `session_id`; absent ids are a
    /// no-op.
    pub fn remove_session(&mut self, session_id: &str) {
        if let Some(index) = self.session_ids.iter().position(|id| id == session_id) {
            self.session_ids.remove(index);
        }
    }
}
