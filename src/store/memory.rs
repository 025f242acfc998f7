//! In-memory storage.
//!
//! Suitable for tests, development, and single-instance deployments.
//! Records are lost when the process exits.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::account::Account;
use crate::session::Session;
use crate::store::Store;
use crate::Error;

/// Sessions and accounts in `HashMap`s protected by `RwLock`s.
///
/// Cloning is cheap and shares the underlying maps, so a test can keep a
/// handle for inspection while the registry owns another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    accounts: Arc<RwLock<HashMap<(String, String), Account>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently stored.
    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|guard| guard.len()).unwrap_or(0)
    }

    /// Number of accounts currently stored.
    pub fn account_count(&self) -> usize {
        self.accounts.read().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_session(&self, session: &Session) -> Result<(), Error> {
        self.sessions
            .write()
            .map_err(|_| Error::Storage("lock poisoned".to_owned()))?
            .insert(session.id.clone(), session.detached());
        Ok(())
    }

    async fn read_session(&self, id: &str) -> Result<Option<Session>, Error> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| Error::Storage("lock poisoned".to_owned()))?;
        Ok(sessions.get(id).cloned())
    }

    async fn update_session(&self, session: &Session) -> Result<(), Error> {
        self.sessions
            .write()
            .map_err(|_| Error::Storage("lock poisoned".to_owned()))?
            .insert(session.id.clone(), session.detached());
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> Result<(), Error> {
        self.sessions
            .write()
            .map_err(|_| Error::Storage("lock poisoned".to_owned()))?
            .remove(id);
        Ok(())
    }

    async fn create_account(&self, account: &Account) -> Result<(), Error> {
        self.accounts
            .write()
            .map_err(|_| Error::Storage("lock poisoned".to_owned()))?
            .insert((account.kind.clone(), account.id.clone()), account.clone());
        Ok(())
    }

    async fn read_account(&self, kind: &str, id: &str) -> Result<Option<Account>, Error> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| Error::Storage("lock poisoned".to_owned()))?;
        Ok(accounts.get(&(kind.to_owned(), id.to_owned())).cloned())
    }

    async fn update_account(&self, account: &Account) -> Result<(), Error> {
        self.accounts
            .write()
            .map_err(|_| Error::Storage("lock poisoned".to_owned()))?
            .insert((account.kind.clone(), account.id.clone()), account.clone());
        Ok(())
    }

    async fn delete_account(&self, kind: &str, id: &str) -> Result<(), Error> {
        self.accounts
            .write()
            .map_err(|_| Error::Storage("lock poisoned".to_owned()))?
            .remove(&(kind.to_owned(), id.to_owned()));
        Ok(())
    }
}
