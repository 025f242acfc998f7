//! Configuration for session lifespans and mail throttling.

use chrono::Duration;

/// Lifespan and renewal policy applied by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifespanConfig {
    /// How long an ordinary login session lives from creation.
    pub session: Duration,

    /// How long a proof session lives: long enough to open an email, short
    /// enough to bound replay of the mailed token.
    pub proof: Duration,

    /// When set, the first successful authentication at or past the renewal
    /// mark rotates the session secret and schedules the next rotation this
    /// far ahead. `None` disables rotation.
    pub renewal: Option<Duration>,
}

impl Default for LifespanConfig {
    /// Nine-month sessions, a 30 minute proof window, no rotation.
    fn default() -> Self {
        Self {
            session: Duration::days(270),
            proof: Duration::minutes(30),
            renewal: None,
        }
    }
}

/// Outbound-mail spacing policy, per destination domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendRateConfig {
    /// Minimum gap between two sends to the same domain.
    pub spacing: Duration,

    /// Requests whose computed wait would exceed this are refused outright
    /// instead of queued.
    pub max_delay: Duration,
}

impl Default for SendRateConfig {
    /// One send per second per domain, refusing waits beyond two minutes.
    fn default() -> Self {
        Self {
            spacing: Duration::seconds(1),
            max_delay: Duration::seconds(120),
        }
    }
}

/// Top-level configuration consumed by [`Gateway`](crate::Gateway).
///
/// The defaults match the reference deployment. Construct directly for
/// custom policies:
///
/// ```
/// use chrono::Duration;
/// use latchkey::{LatchkeyConfig, LifespanConfig};
///
/// let config = LatchkeyConfig {
///     lifespans: LifespanConfig {
///         renewal: Some(Duration::hours(24)),
///         ..LifespanConfig::default()
///     },
///     ..LatchkeyConfig::default()
/// };
/// assert!(config.lifespans.renewal.is_some());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatchkeyConfig {
    pub lifespans: LifespanConfig,
    pub send_rate: SendRateConfig,
}

impl LatchkeyConfig {
    /// Tighter policy: month-long sessions with daily secret rotation, a
    /// 15 minute proof window, and a one minute queue ceiling.
    pub fn strict() -> Self {
        Self {
            lifespans: LifespanConfig {
                session: Duration::days(30),
                proof: Duration::minutes(15),
                renewal: Some(Duration::hours(24)),
            },
            send_rate: SendRateConfig {
                spacing: Duration::seconds(1),
                max_delay: Duration::seconds(60),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lifespans() {
        let config = LifespanConfig::default();
        assert_eq!(config.session, Duration::days(270));
        assert_eq!(config.proof, Duration::minutes(30));
        assert!(config.renewal.is_none());
        assert!(config.proof < config.session);
    }

    #[test]
    fn test_default_send_rate() {
        let config = SendRateConfig::default();
        assert_eq!(config.spacing, Duration::seconds(1));
        assert_eq!(config.max_delay, Duration::seconds(120));
        assert!(config.spacing < config.max_delay);
    }

    #[test]
    fn test_strict_preset() {
        let config = LatchkeyConfig::strict();
        assert_eq!(config.lifespans.session, Duration::days(30));
        assert_eq!(config.lifespans.renewal, Some(Duration::hours(24)));
        assert!(config.send_rate.max_delay < SendRateConfig::default().max_delay);
    }
}
