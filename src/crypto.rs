//! Cryptographic primitives behind session identifiers and secrets.
//!
//! Sessions are bearer credentials. The registry keeps only a one-way
//! digest of each secret; the raw value is handed to the caller exactly
//! once and never persisted or logged. Secrets carry 256 bits of OS
//! randomness, so a fast hash like SHA-256 is the appropriate digest —
//! there is no low-entropy input to stretch. Digest comparisons run in
//! constant time with respect to content (length may leak; digests under
//! one algorithm are fixed-width anyway).

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::Error;

/// Bytes of randomness behind session ids and secrets (256 bits).
pub const SECRET_LEN: usize = 32;

/// Generates a fresh session identifier.
///
/// 32 bytes from the OS CSPRNG, URL-safe base64 without padding: safe to
/// embed in cookies, links, and storage keys as-is.
pub fn generate_session_id() -> Result<String, Error> {
    let mut bytes = [0u8; SECRET_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| Error::Crypto(err.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// A raw session secret.
///
/// Both `Debug` and `Display` redact the value so it cannot reach logs by
/// accident. Use [`Secret::to_base64url`] when embedding it in a bearer
/// credential, [`Secret::as_bytes`] when digesting it.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret([u8; SECRET_LEN]);

impl Secret {
    /// Draws a fresh secret from the OS CSPRNG.
    ///
    /// Failure means the random source is unavailable; the operation in
    /// progress must be abandoned, never completed with a weaker secret.
    pub fn generate() -> Result<Self, Error> {
        let mut bytes = [0u8; SECRET_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|err| Error::Crypto(err.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// URL-safe base64 without padding, the credential wire encoding.
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Digest algorithm recorded next to a stored secret digest.
///
/// Stored per session so the algorithm can move without invalidating
/// records already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => f.write_str("sha256"),
        }
    }
}

/// Hex digest of `bytes` under `algorithm`.
pub fn digest_secret(algorithm: HashAlgorithm, bytes: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
    }
}

/// Constant-time equality over two digest strings.
pub fn verify_digest(stored: &str, presented: &str) -> bool {
    bool::from(stored.as_bytes().ct_eq(presented.as_bytes()))
}
