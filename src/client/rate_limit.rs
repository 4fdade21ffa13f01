// ABOUTME: Token bucket admission gate with capacity one for outbound submissions
// ABOUTME: Waiters reserve the next free slot under a lock and sleep until it arrives

use crate::client::error::{SmppError, SmppResult};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token bucket rate limiter with a burst size of 1.
///
/// A bucket of capacity one refilled `tps` times per second is the same as
/// handing out admission slots spaced `1s / tps` apart, which is how it is
/// tracked here. The first call is admitted immediately.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(tps: u32) -> SmppResult<Self> {
        if tps == 0 {
            return Err(SmppError::InvalidData(
                "rate limit must be at least 1 per second".to_string(),
            ));
        }

        // Round up so `tps` admissions never fit in less than a second
        let nanos = 1_000_000_000u64.div_ceil(u64::from(tps));
        Ok(Self {
            interval: Duration::from_nanos(nanos),
            next_slot: Mutex::new(None),
        })
    }

    /// Spacing between consecutive admissions
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until one admission token is available and take it
    pub async fn wait(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next_slot = Some(slot + self.interval);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn zero_rate_is_rejected() {
        assert!(matches!(RateLimiter::new(0), Err(SmppError::InvalidData(_))));
    }

    #[test]
    fn interval_rounds_up() {
        assert_eq!(RateLimiter::new(100).unwrap().interval(), Duration::from_millis(10));
        assert_eq!(RateLimiter::new(3).unwrap().interval(), Duration::from_nanos(333_333_334));
    }

    #[tokio::test(start_paused = true)]
    async fn first_admission_is_immediate() {
        let limiter = RateLimiter::new(1).unwrap();
        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn never_exceeds_rate_in_one_second() {
        let limiter = RateLimiter::new(10).unwrap();
        let start = Instant::now();

        let mut admitted = Vec::new();
        for _ in 0..25 {
            limiter.wait().await;
            admitted.push(start.elapsed());
        }

        // Any 11 consecutive admissions span at least one second
        for window in admitted.windows(11) {
            assert!(window[10] - window[0] >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_does_not_accumulate_burst() {
        let limiter = RateLimiter::new(10).unwrap();
        limiter.wait().await;

        tokio::time::sleep(Duration::from_secs(5)).await;

        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_waiters_get_distinct_slots() {
        let limiter = Arc::new(RateLimiter::new(4).unwrap());
        let start = Instant::now();

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.wait().await;
                    start.elapsed()
                })
            })
            .collect();

        let mut finished = Vec::new();
        for task in tasks {
            finished.push(task.await.unwrap());
        }
        finished.sort();

        assert_eq!(
            finished,
            vec![
                Duration::ZERO,
                Duration::from_millis(250),
                Duration::from_millis(500),
                Duration::from_millis(750),
            ]
        );
    }
}
