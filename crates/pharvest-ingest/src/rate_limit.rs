//! Outbound request rate limiting.
//!
//! One shared [`RateGate`] sits in front of every network retrieval so the
//! total outbound request rate stays bounded no matter how many workers
//! the pipeline runs. Slots are handed out at a fixed cadence in arrival
//! order; a worker that arrives early simply sleeps until its slot.

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Default outbound budget: one request per second.
pub const DEFAULT_REQUESTS_PER_MINUTE: u64 = 60;

/// A fixed-cadence gate for outbound requests.
#[derive(Debug)]
pub struct RateGate {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateGate {
    /// Gate allowing `requests_per_minute` requests per minute (clamped to
    /// at least 1).
    pub fn per_minute(requests_per_minute: u64) -> Self {
        let per_minute = requests_per_minute.max(1);
        Self {
            interval: Duration::from_millis(60_000 / per_minute),
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Wait for the next free request slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = if *next > now { *next } else { now };
            *next = slot + self.interval;
            slot
        };
        sleep_until(slot).await;
    }
}
