//! Retry policy with exponential backoff and jitter for network sinks

use super::properties::{keys, ProviderProperties};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);
const DEFAULT_JITTER_PCT: u32 = 20;

/// Granularity at which a backoff sleep notices cancellation
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Retry policy configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry
    pub base_delay: Duration,
    /// Cap on a single delay
    pub max_delay: Duration,
    /// Jitter as a percentage of the delay (0..=100)
    pub jitter_pct: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_RETRY_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter_pct: DEFAULT_JITTER_PCT,
        }
    }
}

impl RetryPolicy {
    /// No retries: one attempt per event
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_pct: 0,
        }
    }

    /// Policy from `MaxRetries` and `RetryDelayMs`
    pub fn from_properties(properties: &ProviderProperties) -> Self {
        let defaults = Self::default();
        Self {
            max_retries: properties
                .count(keys::MAX_RETRIES)
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                .unwrap_or(defaults.max_retries),
            base_delay: properties
                .count(keys::RETRY_DELAY_MS)
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
            ..defaults
        }
    }

    /// Total attempts per event, including the first
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let pow = retry.saturating_sub(1).min(30);
        let base = self.base_delay.saturating_mul(1u32 << pow);
        let capped = base.min(self.max_delay);

        let jitter_pct = self.jitter_pct.min(100);
        if jitter_pct == 0 || capped.is_zero() {
            return capped;
        }
        let spread = capped.as_secs_f64() * f64::from(jitter_pct) / 100.0;
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_secs_f64((capped.as_secs_f64() + offset).max(0.0)).min(self.max_delay)
    }
}

/// Sleep for `delay` unless `cancelled` is raised first
///
/// Returns `false` when the sleep was cut short.
pub(crate) fn sleep_unless(cancelled: &AtomicBool, delay: Duration) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if cancelled.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProviderType;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.attempts(), 3);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_doubles_without_jitter() {
        let policy = RetryPolicy {
            jitter_pct: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(40), policy.max_delay);
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let policy = RetryPolicy::default();
        for _ in 0..200 {
            let delay = policy.delay_for(2);
            assert!(delay >= Duration::from_millis(159), "{:?}", delay);
            assert!(delay <= Duration::from_millis(241), "{:?}", delay);
        }
    }

    #[test]
    fn test_from_properties() {
        let mut props = ProviderProperties::new("redis", ProviderType::Redis);
        props
            .set_provider_info([("MaxRetries", 5), ("RetryDelayMs", 20)])
            .unwrap();
        let policy = RetryPolicy::from_properties(&props);
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(20));
    }

    #[test]
    fn test_sleep_unless_cancelled() {
        let flag = AtomicBool::new(true);
        let start = Instant::now();
        assert!(!sleep_unless(&flag, Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));

        flag.store(false, Ordering::Release);
        assert!(sleep_unless(&flag, Duration::from_millis(5)));
    }
}
