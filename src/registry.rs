//! Registry — orchestration over sessions, claims, and accounts.
//!
//! The registry is the only component that mutates persisted state. Each
//! claim on a session moves one way through its lifecycle: unproved when
//! added, proved once its one-time token round-trips, linked once the
//! session id is recorded in the identifier's account. There is no
//! "unprove" — deleting the session is the only exit.
//!
//! Authentication is deliberately flat: an unknown id, an expired record,
//! and a wrong secret all come back as [`AuthOutcome::Denied`], while
//! infrastructure trouble surfaces as an [`Error`]. Callers can distinguish
//! "no" from "broken" but never which kind of "no".

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;

use crate::account::Account;
use crate::clock::{Clock, SystemClock};
use crate::config::LifespanConfig;
use crate::crypto::Secret;
use crate::events::{self, AuthEvent};
use crate::session::Session;
use crate::store::Store;
use crate::Error;

/// Result of presenting a secret for a session id.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// The secret matched a live session. `renewed` carries the replacement
    /// secret when this authentication rotated it; the caller must propagate
    /// it to the stored credential, the old secret is already invalid.
    Granted {
        session: Session,
        renewed: Option<Secret>,
    },
    Denied,
}

impl AuthOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthOutcome::Granted { .. })
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthOutcome::Granted { session, .. } => Some(session),
            AuthOutcome::Denied => None,
        }
    }

    pub fn renewed(&self) -> Option<&Secret> {
        match self {
            AuthOutcome::Granted { renewed, .. } => renewed.as_ref(),
            AuthOutcome::Denied => None,
        }
    }

    pub fn into_session(self) -> Option<Session> {
        match self {
            AuthOutcome::Granted { session, .. } => Some(session),
            AuthOutcome::Denied => None,
        }
    }
}

/// The state machine over a storage backend.
///
/// Holds no locks of its own; consistency comes from the store's
/// read-your-writes guarantee per record. Time is injected, so policies
/// around expiry and renewal are testable without waiting.
pub struct Registry<S> {
    store: S,
    lifespans: LifespanConfig,
    clock: Arc<dyn Clock>,
}

impl<S: Store> Registry<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, LifespanConfig::default(), Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_lifespans(store: S, lifespans: LifespanConfig) -> Self {
        Self::with_clock(store, lifespans, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(store: S, lifespans: LifespanConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            lifespans,
            clock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn lifespans(&self) -> &LifespanConfig {
        &self.lifespans
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Mints the session a device holds: ordinary lifespan, no claims.
    ///
    /// Returns the session together with its raw secret — the only moment
    /// the secret exists outside the caller's hands.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "login", skip_all, err))]
    pub async fn login(&self) -> Result<(Session, Secret), Error> {
        let now = self.now();
        let mut session = Session::new(now, self.lifespans.session, self.lifespans.renewal)?;
        let secret = session.set_secret()?;
        self.store.create_session(&session).await?;

        log::info!(target: "latchkey", "msg=\"session created\", session_id={}", session.id);
        events::dispatch(AuthEvent::SessionCreated {
            session_id: session.id.clone(),
            at: now,
        })
        .await;
        Ok((session, secret))
    }

    /// Mints the short-lived session behind a mailed proof token.
    ///
    /// The session carries one unproved claim for `(kind, id)` and the
    /// proof lifespan; its secret authenticates only this session, never
    /// the device's. The claim stays unproved until the token round-trips.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "proof", skip_all, err))]
    pub async fn proof(&self, kind: &str, id: &str) -> Result<(Session, Secret), Error> {
        let now = self.now();
        let mut session = Session::new(now, self.lifespans.proof, None)?;
        session.add_claim(kind, id);
        let secret = session.set_secret()?;
        self.store.create_session(&session).await?;

        log::info!(target: "latchkey", "msg=\"proof session created\", session_id={}", session.id);
        events::dispatch(AuthEvent::SessionCreated {
            session_id: session.id.clone(),
            at: now,
        })
        .await;
        Ok((session, secret))
    }

    /// Attaches an unproved claim to an existing session. Re-claiming the
    /// same `(kind, id)` pair changes nothing.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "claim", skip_all, err))]
    pub async fn claim(&self, session_id: &str, kind: &str, id: &str) -> Result<Session, Error> {
        let Some(mut session) = self.store.read_session(session_id).await? else {
            return Err(Error::SessionNotFound);
        };
        session.add_claim(kind, id);
        self.store.update_session(&session).await?;
        Ok(session)
    }

    /// Verifies a presented secret against a session id.
    ///
    /// The digest comparison runs before the expiry branch, so expired and
    /// live records spend the same work on a presented secret. An expired
    /// record is deleted on the spot, whatever the secret was. On a match,
    /// `last_auth_at` moves to now and, when a renewal is due, the secret
    /// rotates and its replacement is returned.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "auth", skip_all, err))]
    pub async fn auth(
        &self,
        session_id: &str,
        presented_secret: &[u8],
    ) -> Result<AuthOutcome, Error> {
        let now = self.now();
        let Some(mut session) = self.store.read_session(session_id).await? else {
            return Ok(AuthOutcome::Denied);
        };

        let matches = session.verify_secret(presented_secret);

        if session.is_expired(now) {
            self.logout(session_id).await?;
            log::info!(target: "latchkey", "msg=\"expired session evicted\", session_id={}", session_id);
            return Ok(AuthOutcome::Denied);
        }
        if !matches {
            log::debug!(target: "latchkey", "msg=\"authentication denied\", session_id={}", session_id);
            return Ok(AuthOutcome::Denied);
        }

        session.last_auth_at = Some(now);
        let renewed = match self.lifespans.renewal {
            Some(period) if session.needs_renewal(now) => {
                let secret = session.set_secret()?;
                session.renew_at = Some(now + period);
                Some(secret)
            }
            _ => None,
        };
        self.store.update_session(&session).await?;

        let linked = self.linked_account(&session).await?;
        session.account = linked;
        if let Some(account) = &session.account {
            self.store.update_account(account).await?;
        }

        if renewed.is_some() {
            log::info!(target: "latchkey", "msg=\"session secret renewed\", session_id={}", session.id);
            events::dispatch(AuthEvent::SecretRenewed {
                session_id: session.id.clone(),
                at: now,
            })
            .await;
        }
        Ok(AuthOutcome::Granted { session, renewed })
    }

    /// Marks `(kind, id)` proved on the target session and links the
    /// session into the identifier's account.
    ///
    /// Call this only after the matching proof session has independently
    /// authenticated — this operation trusts its caller on that point.
    /// Running it again for an already-linked session is harmless.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "confirm_claim_proved", skip_all, err)
    )]
    pub async fn confirm_claim_proved(
        &self,
        session_id: &str,
        kind: &str,
        id: &str,
    ) -> Result<Session, Error> {
        let now = self.now();
        let Some(mut session) = self.store.read_session(session_id).await? else {
            return Err(Error::SessionNotFound);
        };
        session.add_claim(kind, id).prove(now);
        session.last_auth_at = Some(now);
        self.link_to_account(&mut session, kind, id).await?;

        log::info!(target: "latchkey", "msg=\"claim proved\", session_id={}, kind={}", session.id, kind);
        events::dispatch(AuthEvent::ClaimProved {
            session_id: session.id.clone(),
            kind: kind.to_owned(),
            at: now,
        })
        .await;
        Ok(session)
    }

    /// Deletes a session and unlinks its id from any account listing it.
    /// Unknown ids are fine — logout races with expiry and removal.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "logout", skip_all, err))]
    pub async fn logout(&self, session_id: &str) -> Result<(), Error> {
        let now = self.now();
        let Some(session) = self.store.read_session(session_id).await? else {
            return Ok(());
        };
        self.store.delete_session(session_id).await?;

        for claim in &session.claims {
            let Some(mut account) = self.store.read_account(&claim.kind, &claim.id).await? else {
                continue;
            };
            if account.has_session(session_id) {
                account.remove_session(session_id);
                self.store.update_account(&account).await?;
            }
        }

        log::info!(target: "latchkey", "msg=\"session deleted\", session_id={}", session_id);
        events::dispatch(AuthEvent::LoggedOut {
            session_id: session_id.to_owned(),
            at: now,
        })
        .await;
        Ok(())
    }

    /// Removes an account and every session it lists.
    ///
    /// Session deletions run independently: one failure does not stop the
    /// rest, the first error is surfaced at the end, and the account record
    /// is only deleted once every session deletion succeeded — a partial
    /// failure leaves the account pointing at whatever survived.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "rm_account", skip_all, err))]
    pub async fn rm_account(&self, kind: &str, id: &str) -> Result<(), Error> {
        let now = self.now();
        let Some(account) = self.store.read_account(kind, id).await? else {
            return Err(Error::AccountNotFound);
        };

        let mut first_error = None;
        for session_id in &account.session_ids {
            if let Err(error) = self.store.delete_session(session_id).await {
                log::warn!(target: "latchkey", "msg=\"session deletion failed during account removal\", session_id={}, error={}", session_id, error);
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        if let Some(error) = first_error {
            return Err(error);
        }
        self.store.delete_account(kind, id).await?;

        log::info!(target: "latchkey", "msg=\"account removed\", kind={}, id={}", kind, id);
        events::dispatch(AuthEvent::AccountRemoved {
            kind: kind.to_owned(),
            id: id.to_owned(),
            at: now,
        })
        .await;
        Ok(())
    }

    /// Reads a session with its linked account attached.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "load", skip_all, err))]
    pub async fn load(&self, session_id: &str) -> Result<Session, Error> {
        let Some(mut session) = self.store.read_session(session_id).await? else {
            return Err(Error::SessionNotFound);
        };
        let linked = self.linked_account(&session).await?;
        session.account = linked;
        Ok(session)
    }

    /// Reads the account for `(kind, id)`.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "load_account", skip_all, err))]
    pub async fn load_account(&self, kind: &str, id: &str) -> Result<Account, Error> {
        self.store
            .read_account(kind, id)
            .await?
            .ok_or(Error::AccountNotFound)
    }

    /// Replaces the account's opaque application blob.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "set_account_data", skip_all, err)
    )]
    pub async fn set_account_data(
        &self,
        kind: &str,
        id: &str,
        data: serde_json::Value,
    ) -> Result<Account, Error> {
        let mut account = self.load_account(kind, id).await?;
        account.data = data;
        self.store.update_account(&account).await?;
        Ok(account)
    }

    /// Account a reader gets attached: the first proved claim whose account
    /// record exists. An absent account leaves the pointer empty, so a
    /// session observed mid-link reads as not yet linked.
    async fn linked_account(&self, session: &Session) -> Result<Option<Account>, Error> {
        for claim in &session.claims {
            if !claim.proved() {
                continue;
            }
            if let Some(account) = self.store.read_account(&claim.kind, &claim.id).await? {
                return Ok(Some(account));
            }
        }
        Ok(None)
    }

    /// The linking step: ensure the account for `(kind, id)` exists, record
    /// the session id in it, persist the session and then the account, and
    /// attach the account to the session.
    ///
    /// Membership is checked before adding, so linking the same session
    /// twice leaves its id in the account exactly once. The session is
    /// written first: a reader catching the gap sees a proved claim without
    /// account membership and treats the session as not yet linked.
    async fn link_to_account(
        &self,
        session: &mut Session,
        kind: &str,
        id: &str,
    ) -> Result<(), Error> {
        let existing = self.store.read_account(kind, id).await?;
        let known = existing.is_some();
        let mut account = existing.unwrap_or_else(|| Account::new(kind, id));
        if !account.has_session(&session.id) {
            account.add_session(session);
        }

        self.store.update_session(session).await?;
        if known {
            self.store.update_account(&account).await?;
        } else {
            self.store.create_account(&account).await?;
        }
        session.account = Some(account);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::json;

    use super::*;
    use crate::clock::ManualClock;
    use crate::session::EMAIL_CLAIM;
    use crate::store::MemoryStore;

    fn registry_at(millis: i64) -> (Registry<MemoryStore>, Arc<ManualClock>) {
        registry_with(millis, LifespanConfig::default())
    }

    fn registry_with(
        millis: i64,
        lifespans: LifespanConfig,
    ) -> (Registry<MemoryStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_millis(millis));
        let registry =
            Registry::with_clock(MemoryStore::new(), lifespans, Arc::clone(&clock) as Arc<dyn Clock>);
        (registry, clock)
    }

    struct FailingStore;

    #[async_trait]
    impl Store for FailingStore {
        async fn create_session(&self, _session: &Session) -> Result<(), Error> {
            Err(Error::Storage("backend offline".to_owned()))
        }

        async fn read_session(&self, _id: &str) -> Result<Option<Session>, Error> {
            Err(Error::Storage("backend offline".to_owned()))
        }

        async fn update_session(&self, _session: &Session) -> Result<(), Error> {
            Err(Error::Storage("backend offline".to_owned()))
        }

        async fn delete_session(&self, _id: &str) -> Result<(), Error> {
            Err(Error::Storage("backend offline".to_owned()))
        }

        async fn create_account(&self, _account: &Account) -> Result<(), Error> {
            Err(Error::Storage("backend offline".to_owned()))
        }

        async fn read_account(&self, _kind: &str, _id: &str) -> Result<Option<Account>, Error> {
            Err(Error::Storage("backend offline".to_owned()))
        }

        async fn update_account(&self, _account: &Account) -> Result<(), Error> {
            Err(Error::Storage("backend offline".to_owned()))
        }

        async fn delete_account(&self, _kind: &str, _id: &str) -> Result<(), Error> {
            Err(Error::Storage("backend offline".to_owned()))
        }
    }

    #[tokio::test]
    async fn test_login_then_auth_succeeds() {
        let (registry, _clock) = registry_at(1_000);
        let (session, secret) = registry.login().await.unwrap();

        let outcome = registry.auth(&session.id, secret.as_bytes()).await.unwrap();
        assert!(outcome.is_granted());

        let authed = outcome.session().unwrap();
        assert_eq!(authed.id, session.id);
        assert_eq!(
            authed.last_auth_at,
            Some(DateTime::from_timestamp_millis(1_000).unwrap())
        );
    }

    #[tokio::test]
    async fn test_auth_with_wrong_secret_denied() {
        let (registry, _clock) = registry_at(1_000);
        let (session, secret) = registry.login().await.unwrap();

        let mut tampered = secret.as_bytes().to_vec();
        tampered[0] ^= 1;
        let outcome = registry.auth(&session.id, &tampered).await.unwrap();
        assert!(!outcome.is_granted());

        let outcome = registry.auth(&session.id, &[0u8; 32]).await.unwrap();
        assert!(!outcome.is_granted());
    }

    #[tokio::test]
    async fn test_auth_unknown_session_denied_not_error() {
        let (registry, _clock) = registry_at(1_000);
        let outcome = registry.auth("no-such-session", b"anything").await.unwrap();
        assert!(!outcome.is_granted());
    }

    #[tokio::test]
    async fn test_storage_failure_is_error_not_denied() {
        let registry = Registry::new(FailingStore);
        let result = registry.auth("some-id", b"secret").await;
        assert_eq!(
            result.unwrap_err(),
            Error::Storage("backend offline".to_owned())
        );
    }

    #[tokio::test]
    async fn test_logout_then_auth_denied_and_load_not_found() {
        let (registry, _clock) = registry_at(1_000);
        let (session, secret) = registry.login().await.unwrap();

        registry.logout(&session.id).await.unwrap();

        let outcome = registry.auth(&session.id, secret.as_bytes()).await.unwrap();
        assert!(!outcome.is_granted());
        assert_eq!(
            registry.load(&session.id).await.unwrap_err(),
            Error::SessionNotFound
        );
    }

    #[tokio::test]
    async fn test_logout_unknown_session_is_ok() {
        let (registry, _clock) = registry_at(1_000);
        assert!(registry.logout("never-existed").await.is_ok());
    }

    #[tokio::test]
    async fn test_proof_session_shape() {
        let (registry, _clock) = registry_at(1_000);
        let (session, _secret) = registry.proof(EMAIL_CLAIM, "u@example.com").await.unwrap();

        assert_eq!(session.claims.len(), 1);
        assert!(!session.claims[0].proved());
        assert!(!session.email_verified());
        assert_eq!(
            session.expire_at,
            DateTime::from_timestamp_millis(1_000).unwrap() + LifespanConfig::default().proof
        );
    }

    #[tokio::test]
    async fn test_expired_session_evicted_even_with_correct_secret() {
        let (registry, clock) = registry_at(0);
        let (session, secret) = registry.login().await.unwrap();

        clock.advance(LifespanConfig::default().session);

        let outcome = registry.auth(&session.id, secret.as_bytes()).await.unwrap();
        assert!(!outcome.is_granted());
        // eager self-cleaning: the record is gone, not just refused
        assert!(registry
            .store()
            .read_session(&session.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_confirm_claim_proved_links_account() {
        let (registry, _clock) = registry_at(1_000);
        let (session, _secret) = registry.login().await.unwrap();

        let confirmed = registry
            .confirm_claim_proved(&session.id, EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();

        assert!(confirmed.email_verified());
        assert_eq!(confirmed.primary_email(), Some("u@example.com"));
        let attached = confirmed.account.as_ref().unwrap();
        assert!(attached.has_session(&session.id));

        let account = registry
            .load_account(EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();
        assert!(account.has_session(&session.id));
    }

    #[tokio::test]
    async fn test_double_confirm_links_exactly_once() {
        let (registry, _clock) = registry_at(1_000);
        let (session, _secret) = registry.login().await.unwrap();

        registry
            .confirm_claim_proved(&session.id, EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();
        registry
            .confirm_claim_proved(&session.id, EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();

        let account = registry
            .load_account(EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();
        let occurrences = account
            .session_ids
            .iter()
            .filter(|id| **id == session.id)
            .count();
        assert_eq!(occurrences, 1);
    }

    #[tokio::test]
    async fn test_confirm_preserves_first_proof_time() {
        let (registry, clock) = registry_at(1_000);
        let (session, _secret) = registry.login().await.unwrap();

        registry
            .confirm_claim_proved(&session.id, EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();
        clock.advance(Duration::minutes(5));
        let confirmed = registry
            .confirm_claim_proved(&session.id, EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();

        let claim = confirmed.find_claim(EMAIL_CLAIM, "u@example.com").unwrap();
        assert_eq!(
            claim.proved_at,
            Some(DateTime::from_timestamp_millis(1_000).unwrap())
        );
    }

    #[tokio::test]
    async fn test_confirm_unknown_session_is_not_found() {
        let (registry, _clock) = registry_at(1_000);
        let result = registry
            .confirm_claim_proved("missing", EMAIL_CLAIM, "u@example.com")
            .await;
        assert_eq!(result.unwrap_err(), Error::SessionNotFound);
    }

    #[tokio::test]
    async fn test_renewal_rotates_secret() {
        let lifespans = LifespanConfig {
            renewal: Some(Duration::hours(24)),
            ..LifespanConfig::default()
        };
        let (registry, clock) = registry_with(0, lifespans);
        let (session, old_secret) = registry.login().await.unwrap();

        clock.advance(Duration::hours(24));

        let outcome = registry
            .auth(&session.id, old_secret.as_bytes())
            .await
            .unwrap();
        let new_secret = outcome.renewed().cloned().unwrap();
        assert_ne!(new_secret, old_secret);

        // next rotation is scheduled a full period out
        let renewed_session = outcome.session().unwrap();
        assert_eq!(
            renewed_session.renew_at,
            Some(clock.now() + Duration::hours(24))
        );

        // the old secret died with the rotation
        let old = registry
            .auth(&session.id, old_secret.as_bytes())
            .await
            .unwrap();
        assert!(!old.is_granted());
        let new = registry
            .auth(&session.id, new_secret.as_bytes())
            .await
            .unwrap();
        assert!(new.is_granted());
    }

    #[tokio::test]
    async fn test_auth_before_renewal_mark_keeps_secret() {
        let lifespans = LifespanConfig {
            renewal: Some(Duration::hours(24)),
            ..LifespanConfig::default()
        };
        let (registry, clock) = registry_with(0, lifespans);
        let (session, secret) = registry.login().await.unwrap();

        clock.advance(Duration::hours(23));

        let outcome = registry.auth(&session.id, secret.as_bytes()).await.unwrap();
        assert!(outcome.is_granted());
        assert!(outcome.renewed().is_none());
    }

    #[tokio::test]
    async fn test_rm_account_cascades_to_sessions() {
        let (registry, _clock) = registry_at(1_000);
        let (first, first_secret) = registry.login().await.unwrap();
        let (second, second_secret) = registry.login().await.unwrap();

        registry
            .confirm_claim_proved(&first.id, EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();
        registry
            .confirm_claim_proved(&second.id, EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();

        registry
            .rm_account(EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();

        let outcome = registry
            .auth(&first.id, first_secret.as_bytes())
            .await
            .unwrap();
        assert!(!outcome.is_granted());
        let outcome = registry
            .auth(&second.id, second_secret.as_bytes())
            .await
            .unwrap();
        assert!(!outcome.is_granted());
        assert_eq!(
            registry
                .load_account(EMAIL_CLAIM, "u@example.com")
                .await
                .unwrap_err(),
            Error::AccountNotFound
        );
    }

    #[tokio::test]
    async fn test_rm_account_unknown_is_not_found() {
        let (registry, _clock) = registry_at(1_000);
        let result = registry.rm_account(EMAIL_CLAIM, "nobody@example.com").await;
        assert_eq!(result.unwrap_err(), Error::AccountNotFound);
    }

    #[tokio::test]
    async fn test_claim_attaches_unproved() {
        let (registry, _clock) = registry_at(1_000);
        let (session, _secret) = registry.login().await.unwrap();

        registry
            .claim(&session.id, EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();
        registry
            .claim(&session.id, EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();

        let loaded = registry.load(&session.id).await.unwrap();
        assert_eq!(loaded.claims.len(), 1);
        assert!(!loaded.claims[0].proved());
        assert!(!loaded.email_verified());
    }

    #[tokio::test]
    async fn test_claim_unknown_session_is_not_found() {
        let (registry, _clock) = registry_at(1_000);
        let result = registry.claim("missing", EMAIL_CLAIM, "u@example.com").await;
        assert_eq!(result.unwrap_err(), Error::SessionNotFound);
    }

    #[tokio::test]
    async fn test_load_attaches_linked_account() {
        let (registry, _clock) = registry_at(1_000);
        let (session, _secret) = registry.login().await.unwrap();
        registry
            .confirm_claim_proved(&session.id, EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();

        let loaded = registry.load(&session.id).await.unwrap();
        let account = loaded.account.as_ref().unwrap();
        assert_eq!(account.kind, EMAIL_CLAIM);
        assert!(account.has_session(&session.id));
    }

    #[tokio::test]
    async fn test_logout_unlinks_from_account() {
        let (registry, _clock) = registry_at(1_000);
        let (session, _secret) = registry.login().await.unwrap();
        registry
            .confirm_claim_proved(&session.id, EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();

        registry.logout(&session.id).await.unwrap();

        // the account survives with the id removed, not deleted
        let account = registry
            .load_account(EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();
        assert!(!account.has_session(&session.id));
        assert!(account.session_ids.is_empty());
    }

    #[tokio::test]
    async fn test_set_account_data_round_trips() {
        let (registry, _clock) = registry_at(1_000);
        let (session, _secret) = registry.login().await.unwrap();
        registry
            .confirm_claim_proved(&session.id, EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();

        registry
            .set_account_data(EMAIL_CLAIM, "u@example.com", json!({ "plan": "pro" }))
            .await
            .unwrap();

        let account = registry
            .load_account(EMAIL_CLAIM, "u@example.com")
            .await
            .unwrap();
        assert_eq!(account.data, json!({ "plan": "pro" }));
        assert!(account.has_session(&session.id));
    }

    #[tokio::test]
    async fn test_set_account_data_unknown_account() {
        let (registry, _clock) = registry_at(1_000);
        let result = registry
            .set_account_data(EMAIL_CLAIM, "nobody@example.com", json!(null))
            .await;
        assert_eq!(result.unwrap_err(), Error::AccountNotFound);
    }

    #[tokio::test]
    async fn test_secrets_differ_across_sessions() {
        let (registry, _clock) = registry_at(1_000);
        let (_first, first_secret) = registry.login().await.unwrap();
        let (_second, second_secret) = registry.login().await.unwrap();
        assert_ne!(first_secret, second_secret);
    }
}
