//! Reconnect timing

use std::time::Duration;

/// Two-layer reconnect timing
///
/// Fast retries back off exponentially from `base` up to `cap`; after
/// `max_attempts` of them the supervisor waits `restart_delay` and starts
/// over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
    pub restart_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            max_attempts: 5,
            restart_delay: Duration::from_secs(5),
        }
    }
}

impl ReconnectPolicy {
    /// Delay after failed attempt `attempt` (1-based): `min(base * 2^(n-1), cap)`
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy {
            base: Duration::from_millis(100),
            cap: Duration::from_secs(1),
            max_attempts: 5,
            restart_delay: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_delay_doubles() {
        let p = policy();
        assert_eq!(p.delay(1), Duration::from_millis(100));
        assert_eq!(p.delay(2), Duration::from_millis(200));
        assert_eq!(p.delay(3), Duration::from_millis(400));
        assert_eq!(p.delay(4), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_capped() {
        let p = policy();
        assert_eq!(p.delay(5), Duration::from_secs(1));
        assert_eq!(p.delay(40), Duration::from_secs(1));
        assert_eq!(p.delay(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_delay_monotonic() {
        let p = policy();
        for n in 1..20 {
            assert!(p.delay(n + 1) >= p.delay(n));
        }
    }

    #[test]
    fn test_attempt_zero_is_base() {
        assert_eq!(policy().delay(0), Duration::from_millis(100));
    }
}
