//! Identifier validation and destination-domain extraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::Error;

/// Liberal shape check: a nonempty local part (which may itself contain
/// `@`), a final `@`, and a nonempty domain with no whitespace. Deeper
/// validity is the mail system's problem — if it delivers, it counts.
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@[^@\s]+$").expect("email pattern is valid"));

/// Normalized identifier form used for claims, account keys, and throttle
/// domains.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates the identifier shape required before proof mail goes out.
pub fn validate_email(email: &str) -> Result<(), Error> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier)
    }
}

/// Destination domain of an identifier: the substring after the last `@`.
///
/// Returns `None` when there is no `@` or either side of it is empty —
/// such identifiers cannot be throttled or mailed.
pub fn email_domain(email: &str) -> Option<&str> {
    let at = email.rfind('@')?;
    let (local, domain) = (&email[..at], &email[at + 1..]);
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(domain)
}
