//! Storage port.
//!
//! The registry persists sessions and accounts through this trait and makes
//! no assumptions about the backend beyond the contract on each method:
//! reads distinguish absent records (`Ok(None)`) from failure (`Err`),
//! updates may upsert, and deletes of absent records succeed — deletion
//! races are expected, not exceptional.
//!
//! | Implementation | Backing | Intended use |
//! |----------------|---------|--------------|
//! | [`MemoryStore`] | `HashMap` behind `RwLock` | tests, development, single instance |
//!
//! Durable backends (files, SQL) live with the embedding application.
//! Whatever the backend, a stored session never includes the runtime
//! account pointer — persist [`Session::detached`](crate::Session::detached).

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::account::Account;
use crate::session::Session;
use crate::Error;

/// Persistence contract consumed by the registry.
///
/// Within one registry call a read must observe the latest committed write
/// for the same record (read-your-writes per key). Cross-record ordering is
/// not required; the registry is written to tolerate a session committing
/// before its account update.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persists a new session record.
    async fn create_session(&self, session: &Session) -> Result<(), Error>;

    /// Reads a session; `Ok(None)` when absent.
    async fn read_session(&self, id: &str) -> Result<Option<Session>, Error>;

    /// Writes a session record; upsert semantics are acceptable.
    async fn update_session(&self, session: &Session) -> Result<(), Error>;

    /// Deletes a session; deleting an absent id is not an error.
    async fn delete_session(&self, id: &str) -> Result<(), Error>;

    /// Persists a new account record.
    async fn create_account(&self, account: &Account) -> Result<(), Error>;

    /// Reads the account keyed `(kind, id)`; `Ok(None)` when absent.
    async fn read_account(&self, kind: &str, id: &str) -> Result<Option<Account>, Error>;

    /// Writes an account record; upsert semantics are acceptable.
    async fn update_account(&self, account: &Account) -> Result<(), Error>;

    /// Deletes an account; deleting an absent key is not an error.
    async fn delete_account(&self, kind: &str, id: &str) -> Result<(), Error>;
}
