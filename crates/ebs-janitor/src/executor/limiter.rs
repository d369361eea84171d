//! Token bucket for provider mutations
//!
//! Capacity one: each `acquire` reserves the next free slot and sleeps until
//! it. Runs on the tokio clock, so paused-time tests advance instantly.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

#[derive(Debug)]
pub struct RateLimiter {
    period: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Allow `per_second` acquisitions per second (0 is treated as 1)
    pub fn per_second(per_second: u32) -> Self {
        Self {
            period: Duration::from_secs(1) / per_second.max(1),
            next_slot: Mutex::new(None),
        }
    }

    /// Wait for the next slot
    pub async fn acquire(&self) {
        let now = Instant::now();
        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            *next = Some(slot + self.period);
            slot
        };
        if slot > now {
            sleep_until(slot).await;
        }
    }
}
