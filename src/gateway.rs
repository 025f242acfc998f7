//! Gateway — the proof-mail flows over the registry.
//!
//! The gateway speaks encoded bearer credentials at its boundary and
//! plain sessions below it: it decodes what devices present, drives the
//! request/confirm round trip for mailed proof tokens, spaces outbound
//! mail per destination domain, and never touches storage directly.
//!
//! Anti-enumeration holds at this layer too: a credential that fails to
//! decode is treated exactly like one with a wrong secret.

use std::sync::Arc;

use chrono::Duration;

use crate::account::Account;
use crate::clock::{Clock, SystemClock};
use crate::config::LatchkeyConfig;
use crate::credential::Credential;
use crate::events::{self, AuthEvent};
use crate::mailer::{Mailer, ProofMessage};
use crate::rate_limit::SendLimiter;
use crate::registry::{AuthOutcome, Registry};
use crate::session::{Session, EMAIL_CLAIM};
use crate::store::Store;
use crate::validators;
use crate::Error;

/// Result of confirming a mailed proof token.
#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    /// The claim is proved and linked on `session`. `credential` carries a
    /// fresh bearer string when one was minted (no device session) or the
    /// device's secret rotated during confirmation; the caller must hand it
    /// to the device.
    Confirmed {
        session: Session,
        credential: Option<String>,
    },
    Denied,
}

impl ConfirmOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmOutcome::Confirmed { .. })
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            ConfirmOutcome::Confirmed { session, .. } => Some(session),
            ConfirmOutcome::Denied => None,
        }
    }

    pub fn credential(&self) -> Option<&str> {
        match self {
            ConfirmOutcome::Confirmed { credential, .. } => credential.as_deref(),
            ConfirmOutcome::Denied => None,
        }
    }
}

/// Re-encodes a credential after an authentication that rotated the
/// session secret; `None` when nothing rotated.
pub fn renewed_credential(outcome: &AuthOutcome) -> Option<String> {
    match outcome {
        AuthOutcome::Granted {
            session,
            renewed: Some(secret),
        } => Some(Credential::encode(&session.id, secret)),
        _ => None,
    }
}

/// Drives login, proof mail, and confirmation over a [`Registry`].
pub struct Gateway<S> {
    registry: Registry<S>,
    mailer: Arc<dyn Mailer>,
    limiter: SendLimiter,
    clock: Arc<dyn Clock>,
}

impl<S: Store> Gateway<S> {
    pub fn new(store: S, mailer: Arc<dyn Mailer>) -> Self {
        Self::with_config(store, mailer, LatchkeyConfig::default())
    }

    #[must_use]
    pub fn with_config(store: S, mailer: Arc<dyn Mailer>, config: LatchkeyConfig) -> Self {
        Self::with_clock(store, mailer, config, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(
        store: S,
        mailer: Arc<dyn Mailer>,
        config: LatchkeyConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry: Registry::with_clock(store, config.lifespans, Arc::clone(&clock)),
            mailer,
            limiter: SendLimiter::new(config.send_rate),
            clock,
        }
    }

    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    pub fn limiter(&self) -> &SendLimiter {
        &self.limiter
    }

    /// Mints a device session and returns its encoded credential.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "gateway_login", skip_all, err))]
    pub async fn login(&self) -> Result<(String, Session), Error> {
        let (session, secret) = self.registry.login().await?;
        Ok((Credential::encode(&session.id, &secret), session))
    }

    /// Authenticates an encoded credential.
    ///
    /// Malformed input is `Denied`, not an error — indistinguishable from a
    /// wrong secret. When the outcome carries a rotated secret, re-encode it
    /// for the device with [`renewed_credential`].
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "authenticate", skip_all, err))]
    pub async fn authenticate(&self, credential: &str) -> Result<AuthOutcome, Error> {
        let Ok(decoded) = Credential::decode(credential) else {
            return Ok(AuthOutcome::Denied);
        };
        self.registry.auth(&decoded.session_id, &decoded.secret).await
    }

    /// Mails a one-time proof token to `identifier` and returns the encoded
    /// proof credential.
    ///
    /// The identifier is normalized and validated first. Sends to one
    /// destination domain are spaced by the configured gap — this call
    /// sleeps its share of the queue — and refused outright with
    /// [`Error::TooManyAttempts`] once the computed wait passes the
    /// ceiling. A mail dispatch failure surfaces as [`Error::Mail`]; the
    /// already-persisted proof session is left to expire on its own.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "request_proof", skip_all, err)
    )]
    pub async fn request_proof(
        &self,
        identifier: &str,
        message: &dyn ProofMessage,
    ) -> Result<String, Error> {
        let identifier = validators::normalize_email(identifier);
        validators::validate_email(&identifier)?;
        let domain = validators::email_domain(&identifier).ok_or(Error::InvalidIdentifier)?;

        let wait = self.limiter.delay(domain, self.clock.now())?;
        if wait > self.limiter.max_delay() {
            log::warn!(target: "latchkey", "msg=\"proof request refused, send queue full\", domain={}", domain);
            return Err(Error::TooManyAttempts);
        }
        if wait > Duration::zero() {
            tokio::time::sleep(wait.to_std().unwrap_or_default()).await;
        }

        let (session, secret) = self.registry.proof(EMAIL_CLAIM, &identifier).await?;
        let credential = Credential::encode(&session.id, &secret);
        self.mailer
            .send(message.render(&identifier, &credential))
            .await?;

        log::info!(target: "latchkey", "msg=\"proof mail sent\", session_id={}, domain={}", session.id, domain);
        events::dispatch(AuthEvent::ProofRequested {
            session_id: session.id.clone(),
            identifier: identifier.clone(),
            at: self.clock.now(),
        })
        .await;
        Ok(credential)
    }

    /// Confirms a mailed proof token, proving its claim on the device's
    /// session.
    ///
    /// The proof credential must authenticate; it is burned on success —
    /// single use, whoever presents it. The claim lands on the session of
    /// `device_credential` when that credential itself authenticates;
    /// otherwise a fresh session is minted and its credential returned. A
    /// bare session id is never enough to receive a proved claim.
    ///
    /// A credential without claims is not a proof token: confirmation is
    /// denied and the session is left untouched, since it may well be
    /// somebody's login session.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "confirm", skip_all, err))]
    pub async fn confirm(
        &self,
        device_credential: Option<&str>,
        proof_credential: &str,
    ) -> Result<ConfirmOutcome, Error> {
        let Ok(proof) = Credential::decode(proof_credential) else {
            return Ok(ConfirmOutcome::Denied);
        };
        let proof_session = match self.registry.auth(&proof.session_id, &proof.secret).await? {
            AuthOutcome::Granted { session, .. } => session,
            AuthOutcome::Denied => return Ok(ConfirmOutcome::Denied),
        };

        let Some(claim) = proof_session.claims.first().cloned() else {
            return Ok(ConfirmOutcome::Denied);
        };

        // single use: burn before linking, whoever confirms
        self.registry.logout(&proof_session.id).await?;

        let (target_id, minted) = match self.device_session(device_credential).await? {
            Some((device, refreshed)) => (device.id, refreshed),
            None => {
                let (session, secret) = self.registry.login().await?;
                let credential = Credential::encode(&session.id, &secret);
                (session.id, Some(credential))
            }
        };

        let session = self
            .registry
            .confirm_claim_proved(&target_id, &claim.kind, &claim.id)
            .await?;
        log::info!(target: "latchkey", "msg=\"proof confirmed\", session_id={}", session.id);
        Ok(ConfirmOutcome::Confirmed {
            session,
            credential: minted,
        })
    }

    /// Deletes the session behind an encoded credential. Unknown sessions
    /// are fine; a credential that does not even decode is an
    /// [`Error::InvalidCredential`].
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "gateway_logout", skip_all, err))]
    pub async fn logout(&self, credential: &str) -> Result<(), Error> {
        let decoded = Credential::decode(credential)?;
        self.registry.logout(&decoded.session_id).await
    }

    /// Reads the account behind an email identifier.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "account", skip_all, err))]
    pub async fn account(&self, identifier: &str) -> Result<Account, Error> {
        let identifier = self.email_identifier(identifier)?;
        self.registry.load_account(EMAIL_CLAIM, &identifier).await
    }

    /// Removes the account behind an email identifier and every session it
    /// lists.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "remove_account", skip_all, err)
    )]
    pub async fn remove_account(&self, identifier: &str) -> Result<(), Error> {
        let identifier = self.email_identifier(identifier)?;
        self.registry.rm_account(EMAIL_CLAIM, &identifier).await
    }

    /// Replaces the opaque application blob on an email account.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "gateway_set_account_data", skip_all, err)
    )]
    pub async fn set_account_data(
        &self,
        identifier: &str,
        data: serde_json::Value,
    ) -> Result<Account, Error> {
        let identifier = self.email_identifier(identifier)?;
        self.registry
            .set_account_data(EMAIL_CLAIM, &identifier, data)
            .await
    }

    /// The session a device credential authenticates, with its re-encoded
    /// credential when the secret rotated on the way in.
    async fn device_session(
        &self,
        credential: Option<&str>,
    ) -> Result<Option<(Session, Option<String>)>, Error> {
        let Some(raw) = credential else {
            return Ok(None);
        };
        let Ok(decoded) = Credential::decode(raw) else {
            return Ok(None);
        };
        match self.registry.auth(&decoded.session_id, &decoded.secret).await? {
            AuthOutcome::Granted { session, renewed } => {
                let refreshed = renewed.map(|secret| Credential::encode(&session.id, &secret));
                Ok(Some((session, refreshed)))
            }
            AuthOutcome::Denied => Ok(None),
        }
    }

    fn email_identifier(&self, raw: &str) -> Result<String, Error> {
        let identifier = validators::normalize_email(raw);
        validators::validate_email(&identifier)?;
        Ok(identifier)
    }
}
