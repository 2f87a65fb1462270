//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Delay before the given retry attempt (1-based), capped and jittered.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(exponential).min(max_ms);

    // Jitter up to 10% of the delay.
    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        assert!(calculate_backoff(1, 100, 2000).as_millis() >= 100);
        assert!(calculate_backoff(2, 100, 2000).as_millis() >= 200);
        assert!(calculate_backoff(10, 100, 1000).as_millis() >= 1000);
        assert!(calculate_backoff(10, 100, 1000).as_millis() < 1100 + 110);
    }

    #[test]
    fn test_zero_attempt_has_no_delay() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);
    }
}
