//! Exponential backoff with jitter, doubling from a floor to a cap.

use std::time::Duration;

use rand::Rng;

pub struct Backoff {
    min: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            attempt: 0,
        }
    }

    /// Returns the next delay and advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.min.as_millis().saturating_mul(1u128 << self.attempt.min(32));
        let capped = exp.min(self.max.as_millis());
        self.attempt = self.attempt.saturating_add(1);
        let jittered = rand::thread_rng().gen_range(0..=capped.max(1));
        Duration::from_millis(jittered as u64).max(self.min.min(self.max))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_capped() {
        let mut b = Backoff::new(Duration::from_millis(1), Duration::from_millis(50));
        for _ in 0..20 {
            let d = b.next_delay();
            assert!(d <= Duration::from_millis(50));
        }
    }

    #[test]
    fn reset_restarts_growth() {
        let mut b = Backoff::new(Duration::from_secs(1), Duration::from_secs(300));
        for _ in 0..10 {
            b.next_delay();
        }
        b.reset();
        assert_eq!(b.attempt, 0);
    }
}
