//! Session and claim entities.
//!
//! A session is a bearer credential unit: an unguessable id, the digest of
//! its current secret, an expiry, and the claims its holder has made about
//! external identifiers. Claims move one way — unproved, proved, linked —
//! and only session deletion undoes a proof.
//!
//! Records serialize to a versioned JSON schema with millisecond
//! timestamps; the runtime account pointer is never part of it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::crypto::{self, HashAlgorithm, Secret};
use crate::Error;

/// Claim namespace for email addresses.
pub const EMAIL_CLAIM: &str = "email";

/// Version written into the `schema` field of new records.
pub const SCHEMA_VERSION: u32 = 1;

pub(crate) fn schema_version() -> u32 {
    SCHEMA_VERSION
}

/// An assertion that the session's holder controls an external identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Identifier namespace, e.g. [`EMAIL_CLAIM`].
    #[serde(rename = "type")]
    pub kind: String,

    /// Identifier value within the namespace.
    pub id: String,

    /// When the claim was proved; `None` until then.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub proved_at: Option<DateTime<Utc>>,
}

impl Claim {
    pub fn new(kind: &str, id: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            id: id.to_owned(),
            proved_at: None,
        }
    }

    pub fn proved(&self) -> bool {
        self.proved_at.is_some()
    }

    /// Marks the claim proved at `at`.
    ///
    /// Proving is monotonic and keeps the first proof time: re-proving an
    /// already-proved claim changes nothing.
    pub fn prove(&mut self, at: DateTime<Utc>) {
        if self.proved_at.is_none() {
            self.proved_at = Some(at);
        }
    }
}

/// A bearer credential unit.
///
/// Field mutation goes through [`Registry`](crate::Registry) for persisted
/// sessions; the fields stay public so storage backends and tests can build
/// records directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(default = "schema_version")]
    pub schema: u32,

    /// Unguessable identifier, URL-safe base64. Never changes; secrets
    /// rotate, ids do not.
    pub id: String,

    /// Digest algorithm for `secret_digest`.
    #[serde(default)]
    pub secret_hash: HashAlgorithm,

    /// Hex digest of the current secret. Empty until a secret is set; such
    /// a session matches nothing and must not be persisted.
    pub secret_digest: String,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// Last successful authentication; `None` until the first one.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_auth_at: Option<DateTime<Utc>>,

    /// Absolute expiry. Authentication past this point deletes the record.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expire_at: DateTime<Utc>,

    /// Next scheduled secret rotation; `None` when renewal is disabled.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub renew_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub claims: Vec<Claim>,

    /// Linked account, attached on registry reads for convenience.
    /// Runtime-only: never serialized, stripped by storage backends.
    #[serde(skip)]
    pub account: Option<Account>,
}

impl Session {
    /// Creates a bare session: fresh random id, no secret, no claims.
    ///
    /// The caller must set a secret before persisting.
    pub fn new(
        now: DateTime<Utc>,
        lifespan: Duration,
        renewal: Option<Duration>,
    ) -> Result<Self, Error> {
        Ok(Self {
            schema: SCHEMA_VERSION,
            id: crypto::generate_session_id()?,
            secret_hash: HashAlgorithm::default(),
            secret_digest: String::new(),
            created_at: now,
            last_auth_at: None,
            expire_at: now + lifespan,
            renew_at: renewal.map(|period| now + period),
            claims: Vec::new(),
            account: None,
        })
    }

    /// Rotates the session secret.
    ///
    /// Draws fresh randomness, stores its digest, and returns the raw
    /// secret — the only time it is visible. The previous secret stops
    /// matching immediately.
    pub fn set_secret(&mut self) -> Result<Secret, Error> {
        let secret = Secret::generate()?;
        self.secret_hash = HashAlgorithm::default();
        self.secret_digest = crypto::digest_secret(self.secret_hash, secret.as_bytes());
        Ok(secret)
    }

    /// Constant-time check of presented secret bytes against the stored
    /// digest. A session that was never given a secret matches nothing.
    pub fn verify_secret(&self, presented: &[u8]) -> bool {
        if self.secret_digest.is_empty() {
            return false;
        }
        let presented_digest = crypto::digest_secret(self.secret_hash, presented);
        crypto::verify_digest(&self.secret_digest, &presented_digest)
    }

    pub fn find_claim(&self, kind: &str, id: &str) -> Option<&Claim> {
        self.claims
            .iter()
            .find(|claim| claim.kind == kind && claim.id == id)
    }

    /// First claim in `kind`, for single-valued namespaces like email.
    pub fn find_claim_of_type(&self, kind: &str) -> Option<&Claim> {
        self.claims.iter().find(|claim| claim.kind == kind)
    }

    /// Returns the `(kind, id)` claim, appending a new unproved one when
    /// the session does not carry it yet. Never duplicates a pair.
    pub fn add_claim(&mut self, kind: &str, id: &str) -> &mut Claim {
        if let Some(index) = self
            .claims
            .iter()
            .position(|claim| claim.kind == kind && claim.id == id)
        {
            return &mut self.claims[index];
        }
        self.claims.push(Claim::new(kind, id));
        let last = self.claims.len() - 1;
        &mut self.claims[last]
    }

    /// True once an email claim has been proved.
    pub fn email_verified(&self) -> bool {
        self.claims
            .iter()
            .any(|claim| claim.kind == EMAIL_CLAIM && claim.proved())
    }

    /// The first email identifier attached to this session, proved or not.
    pub fn primary_email(&self) -> Option<&str> {
        self.find_claim_of_type(EMAIL_CLAIM)
            .map(|claim| claim.id.as_str())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_at <= now
    }

    /// True when rotation is scheduled and due.
    pub fn needs_renewal(&self, now: DateTime<Utc>) -> bool {
        self.renew_at.is_some_and(|at| at <= now)
    }

    /// Copy with the runtime account pointer stripped — the form a storage
    /// backend persists.
    pub fn detached(&self) -> Session {
        let mut session = self.clone();
        session.account = None;
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn fresh_session() -> Session {
        Session::new(at(1_000), Duration::minutes(30), None).unwrap()
    }

    #[test]
    fn test_new_session_fields() {
        let session = Session::new(at(1_000), Duration::minutes(30), None).unwrap();

        assert_eq!(session.schema, SCHEMA_VERSION);
        assert_eq!(session.id.len(), 43);
        assert!(session.secret_digest.is_empty());
        assert_eq!(session.created_at, at(1_000));
        assert!(session.last_auth_at.is_none());
        assert_eq!(session.expire_at, at(1_000) + Duration::minutes(30));
        assert!(session.renew_at.is_none());
        assert!(session.claims.is_empty());
        assert!(session.account.is_none());
    }

    #[test]
    fn test_new_session_with_renewal() {
        let session =
            Session::new(at(0), Duration::days(270), Some(Duration::hours(24))).unwrap();
        assert_eq!(session.renew_at, Some(at(0) + Duration::hours(24)));
    }

    #[test]
    fn test_set_secret_and_verify() {
        let mut session = fresh_session();
        let secret = session.set_secret().unwrap();

        assert_eq!(session.secret_digest.len(), 64);
        assert!(session.verify_secret(secret.as_bytes()));
        assert!(!session.verify_secret(b"not the secret"));
        assert!(!session.verify_secret(&[0u8; 32]));
    }

    #[test]
    fn test_rotation_invalidates_previous_secret() {
        let mut session = fresh_session();
        let old = session.set_secret().unwrap();
        let new = session.set_secret().unwrap();

        assert_ne!(old, new);
        assert!(!session.verify_secret(old.as_bytes()));
        assert!(session.verify_secret(new.as_bytes()));
    }

    #[test]
    fn test_secretless_session_matches_nothing() {
        let session = fresh_session();
        assert!(!session.verify_secret(b""));
        assert!(!session.verify_secret(&[0u8; 32]));
    }

    #[test]
    fn test_add_claim_deduplicates() {
        let mut session = fresh_session();

        session.add_claim(EMAIL_CLAIM, "a@b.com");
        session.add_claim(EMAIL_CLAIM, "a@b.com");
        session.add_claim(EMAIL_CLAIM, "other@b.com");

        assert_eq!(session.claims.len(), 2);
        assert!(session.find_claim(EMAIL_CLAIM, "a@b.com").is_some());
    }

    #[test]
    fn test_add_claim_returns_existing() {
        let mut session = fresh_session();
        session.add_claim(EMAIL_CLAIM, "a@b.com").prove(at(5_000));

        let claim = session.add_claim(EMAIL_CLAIM, "a@b.com");
        assert_eq!(claim.proved_at, Some(at(5_000)));
    }

    #[test]
    fn test_prove_preserves_first_timestamp() {
        let mut claim = Claim::new(EMAIL_CLAIM, "a@b.com");
        assert!(!claim.proved());

        claim.prove(at(1_000));
        claim.prove(at(9_000));
        assert_eq!(claim.proved_at, Some(at(1_000)));
    }

    #[test]
    fn test_email_verified_and_primary_email() {
        let mut session = fresh_session();
        assert!(!session.email_verified());
        assert!(session.primary_email().is_none());

        session.add_claim(EMAIL_CLAIM, "a@b.com");
        assert!(!session.email_verified());
        assert_eq!(session.primary_email(), Some("a@b.com"));

        session.add_claim(EMAIL_CLAIM, "a@b.com").prove(at(2_000));
        assert!(session.email_verified());
        assert_eq!(session.primary_email(), Some("a@b.com"));
    }

    #[test]
    fn test_find_claim_of_type_returns_first() {
        let mut session = fresh_session();
        session.add_claim(EMAIL_CLAIM, "first@b.com");
        session.add_claim(EMAIL_CLAIM, "second@b.com");

        assert_eq!(session.primary_email(), Some("first@b.com"));
    }

    #[test]
    fn test_expiry_boundary() {
        let session = Session::new(at(1_000), Duration::milliseconds(500), None).unwrap();

        assert!(!session.is_expired(at(1_499)));
        // expiry is inclusive: at the mark the session is already gone
        assert!(session.is_expired(at(1_500)));
        assert!(session.is_expired(at(2_000)));
    }

    #[test]
    fn test_needs_renewal() {
        let mut session =
            Session::new(at(0), Duration::days(1), Some(Duration::milliseconds(100))).unwrap();

        assert!(!session.needs_renewal(at(99)));
        assert!(session.needs_renewal(at(100)));
        assert!(session.needs_renewal(at(101)));

        session.renew_at = None;
        assert!(!session.needs_renewal(at(101)));
    }

    #[test]
    fn test_detached_strips_account() {
        let mut session = fresh_session();
        session.account = Some(crate::Account::new(EMAIL_CLAIM, "a@b.com"));

        let detached = session.detached();
        assert!(detached.account.is_none());
        assert_eq!(detached.id, session.id);
    }

    #[test]
    fn test_canonical_schema() {
        let mut session = Session::new(at(1_000), Duration::minutes(30), None).unwrap();
        session.set_secret().unwrap();
        session.add_claim(EMAIL_CLAIM, "a@b.com").prove(at(2_000));
        session.account = Some(crate::Account::new(EMAIL_CLAIM, "a@b.com"));

        let value = serde_json::to_value(&session).unwrap();

        assert_eq!(value["schema"], 1);
        assert_eq!(value["secret_hash"], "sha256");
        assert_eq!(value["created_at"], 1_000);
        assert_eq!(value["last_auth_at"], serde_json::Value::Null);
        assert_eq!(value["expire_at"], 1_000 + 30 * 60 * 1_000);
        assert_eq!(value["claims"][0]["type"], "email");
        assert_eq!(value["claims"][0]["id"], "a@b.com");
        assert_eq!(value["claims"][0]["proved_at"], 2_000);
        // the runtime pointer stays out of the record
        assert!(value.get("account").is_none());
    }

    #[test]
    fn test_schema_round_trip() {
        let mut session = Session::new(at(1_000), Duration::minutes(30), None).unwrap();
        session.set_secret().unwrap();
        session.add_claim(EMAIL_CLAIM, "a@b.com");

        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, session.id);
        assert_eq!(back.secret_digest, session.secret_digest);
        assert_eq!(back.expire_at, session.expire_at);
        assert_eq!(back.claims, session.claims);
        assert!(back.account.is_none());
    }
}
