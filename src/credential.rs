//! Bearer credential wire format.
//!
//! A credential is the only thing a device holds: `1.<session id>.<secret>`
//! with the secret in unpadded URL-safe base64. The leading field is a
//! format version so the layout can evolve without guessing.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::crypto::Secret;
use crate::Error;

/// Current credential format version.
pub const CREDENTIAL_VERSION: u8 = 1;

/// A decoded bearer credential: session id plus the raw secret bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub version: u8,
    pub session_id: String,
    pub secret: Vec<u8>,
}

impl Credential {
    /// Renders the session id and secret into the dotted wire form.
    pub fn encode(session_id: &str, secret: &Secret) -> String {
        format!(
            "{}.{}.{}",
            CREDENTIAL_VERSION,
            session_id,
            secret.to_base64url()
        )
    }

    /// Parses a wire credential.
    ///
    /// Anything that does not parse cleanly is [`Error::InvalidCredential`];
    /// the message never echoes the offending input.
    pub fn decode(raw: &str) -> Result<Self, Error> {
        let mut fields = raw.split('.');
        let (Some(version), Some(session_id), Some(secret), None) = (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) else {
            return Err(Error::InvalidCredential);
        };

        let version: u8 = version
            .parse()
            .map_err(|_| Error::InvalidCredential)?;
        if version != CREDENTIAL_VERSION {
            return Err(Error::InvalidCredential);
        }

        if session_id.is_empty() || !valid_session_id(session_id) {
            return Err(Error::InvalidCredential);
        }

        if secret.is_empty() {
            return Err(Error::InvalidCredential);
        }
        let secret = URL_SAFE_NO_PAD
            .decode(secret)
            .map_err(|_| Error::InvalidCredential)?;

        Ok(Self {
            version,
            session_id: session_id.to_owned(),
            secret,
        })
    }
}

// Secrets must not leak through debug logging of decoded credentials.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("version", &self.version)
            .field("session_id", &self.session_id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Session ids are generated as unpadded URL-safe base64, so any other
/// character marks a forged or corrupted credential before storage is hit.
fn valid_session_id(candidate: &str) -> bool {
    candidate
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_session_id;

    #[test]
    fn test_encode_decode_round_trip() {
        let session_id = generate_session_id().unwrap();
        let secret = Secret::generate().unwrap();

        let raw = Credential::encode(&session_id, &secret);
        let decoded = Credential::decode(&raw).unwrap();

        assert_eq!(decoded.version, CREDENTIAL_VERSION);
        assert_eq!(decoded.session_id, session_id);
        assert_eq!(decoded.secret, secret.as_bytes());
    }

    #[test]
    fn test_encoded_shape() {
        let secret = Secret::generate().unwrap();
        let raw = Credential::encode("abc", &secret);

        assert!(raw.starts_with("1.abc."));
        assert_eq!(raw.split('.').count(), 3);
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(Credential::decode(""), Err(Error::InvalidCredential));
    }

    #[test]
    fn test_rejects_wrong_field_count() {
        assert_eq!(Credential::decode("1.abc"), Err(Error::InvalidCredential));
        assert_eq!(
            Credential::decode("1.abc.c2VjcmV0.extra"),
            Err(Error::InvalidCredential)
        );
    }

    #[test]
    fn test_rejects_unknown_version() {
        assert_eq!(
            Credential::decode("2.abc.c2VjcmV0"),
            Err(Error::InvalidCredential)
        );
        assert_eq!(
            Credential::decode("x.abc.c2VjcmV0"),
            Err(Error::InvalidCredential)
        );
    }

    #[test]
    fn test_rejects_empty_session_id() {
        assert_eq!(
            Credential::decode("1..c2VjcmV0"),
            Err(Error::InvalidCredential)
        );
    }

    #[test]
    fn test_rejects_session_id_charset() {
        assert_eq!(
            Credential::decode("1.abc/def.c2VjcmV0"),
            Err(Error::InvalidCredential)
        );
        assert_eq!(
            Credential::decode("1.abc def.c2VjcmV0"),
            Err(Error::InvalidCredential)
        );
    }

    #[test]
    fn test_rejects_empty_secret() {
        assert_eq!(Credential::decode("1.abc."), Err(Error::InvalidCredential));
    }

    #[test]
    fn test_rejects_invalid_base64_secret() {
        assert_eq!(
            Credential::decode("1.abc.%%%%"),
            Err(Error::InvalidCredential)
        );
        // padded base64 is not the wire alphabet
        assert_eq!(
            Credential::decode("1.abc.c2VjcmV0=="),
            Err(Error::InvalidCredential)
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let secret = Secret::generate().unwrap();
        let decoded = Credential::decode(&Credential::encode("abc", &secret)).unwrap();

        let rendered = format!("{decoded:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains(&secret.to_base64url()));
    }
}
