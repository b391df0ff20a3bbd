//! Deliberate pacing delays. These are throttling, not backpressure — the
//! engine is intentionally slow to respect the daily quota and to keep
//! actions temporally distinguishable.

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

/// Random duration in `[min, max]`. Degenerate ranges collapse to `min`.
pub fn jittered(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let span = (max - min).as_millis() as u64;
    min + Duration::from_millis(rand::rng().random_range(0..=span))
}

/// `base` with a random offset in `[-minus, +plus]`, floored at zero.
/// A zero base stays zero so tests can disable pacing entirely.
pub fn jitter_around(base: Duration, minus: Duration, plus: Duration) -> Duration {
    if base.is_zero() {
        return base;
    }
    jittered(base.saturating_sub(minus), base + plus)
}

/// Sleep a jittered amount within the given bounds.
pub async fn pause(range: (Duration, Duration)) {
    let d = jittered(range.0, range.1);
    if !d.is_zero() {
        sleep(d).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jittered_stays_in_bounds() {
        let min = Duration::from_millis(10);
        let max = Duration::from_millis(50);
        for _ in 0..100 {
            let d = jittered(min, max);
            assert!(d >= min && d <= max);
        }
    }

    #[test]
    fn degenerate_range_returns_min() {
        let d = Duration::from_secs(3);
        assert_eq!(jittered(d, d), d);
        assert_eq!(jittered(d, Duration::from_secs(1)), d);
    }

    #[test]
    fn zero_base_stays_zero() {
        assert_eq!(
            jitter_around(Duration::ZERO, Duration::from_secs(30), Duration::from_secs(60)),
            Duration::ZERO
        );
    }

    #[test]
    fn jitter_around_floors_at_zero() {
        let d = jitter_around(
            Duration::from_secs(10),
            Duration::from_secs(30),
            Duration::ZERO,
        );
        assert!(d <= Duration::from_secs(10));
    }
}
