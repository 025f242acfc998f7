//! Outbound send throttling per destination domain.
//!
//! Proof mail to one receiving mail system is spaced at least a configured
//! gap apart. The limiter tracks the next permitted send time per domain
//! and tells callers how long to wait; it never sleeps or blocks itself,
//! and it holds no clock — `now` is an argument.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::config::SendRateConfig;
use crate::Error;

/// Minimum-spacing scheduler for sends keyed by destination domain.
///
/// The tracked map grows with distinct domains; long-running processes
/// call [`SendLimiter::cleanup_stale`] periodically to shed entries with
/// no pending sends.
pub struct SendLimiter {
    spacing: Duration,
    max_delay: Duration,
    next_send: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SendLimiter {
    pub fn new(config: SendRateConfig) -> Self {
        Self {
            spacing: config.spacing,
            max_delay: config.max_delay,
            next_send: Mutex::new(HashMap::new()),
        }
    }

    /// Longest wait a caller is expected to honor; beyond it the request
    /// should be refused rather than queued.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Wait required before sending to `domain` at `now`.
    ///
    /// A domain with no entry, or whose entry has lapsed, sends immediately
    /// and reserves `now + spacing`. A pending reservation queues this send
    /// behind it: the caller waits until the reserved time and the
    /// reservation advances by exactly one spacing, so scheduled send times
    /// increase monotonically and consecutive sends to one domain are never
    /// closer than the spacing.
    pub fn delay(&self, domain: &str, now: DateTime<Utc>) -> Result<Duration, Error> {
        let mut next_send = self
            .next_send
            .lock()
            .map_err(|_| Error::Storage("lock poisoned".to_owned()))?;
        match next_send.get(domain).copied() {
            Some(next) if now < next => {
                next_send.insert(domain.to_owned(), next + self.spacing);
                Ok(next - now)
            }
            _ => {
                next_send.insert(domain.to_owned(), now + self.spacing);
                Ok(Duration::zero())
            }
        }
    }

    /// Drops reservations at or before `now`; returns how many went.
    pub fn cleanup_stale(&self, now: DateTime<Utc>) -> Result<usize, Error> {
        let mut next_send = self
            .next_send
            .lock()
            .map_err(|_| Error::Storage("lock poisoned".to_owned()))?;
        let before = next_send.len();
        next_send.retain(|_, next| *next > now);
        Ok(before - next_send.len())
    }

    /// Number of domains currently tracked.
    pub fn tracked_domains(&self) -> usize {
        self.next_send.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

impl Default for SendLimiter {
    fn default() -> Self {
        Self::new(SendRateConfig::default())
    }
}
