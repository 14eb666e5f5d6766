//! Sliding-window limiter for outbound text-generation calls.
//!
//! One FIFO of admission timestamps behind a mutex. The lock is never held
//! across an await: a caller that finds the window full computes how long the
//! oldest entry has left, sleeps outside the lock, then tries again.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

const WINDOW: Duration = Duration::from_secs(60);

pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// `max_per_minute <= 0` disables limiting.
    pub fn per_minute(max_per_minute: i64) -> Self {
        Self::with_window(max_per_minute, WINDOW)
    }

    pub fn with_window(max_calls: i64, window: Duration) -> Self {
        Self {
            max_calls: usize::try_from(max_calls).unwrap_or(0),
            window,
            admitted: Mutex::new(VecDeque::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_calls > 0
    }

    /// Waits for a free slot and records the admission.
    ///
    /// Cancel-safe: dropping the future while it sleeps records nothing.
    pub async fn acquire(&self) {
        if !self.is_enabled() {
            return;
        }

        loop {
            let wait = match self.try_acquire_at(Instant::now()) {
                None => return,
                Some(wait) => wait,
            };

            debug!(wait_ms = wait.as_millis() as u64, "AI rate limit reached, waiting for a slot");
            tokio::time::sleep(wait).await;
        }
    }

    /// Admits immediately (`None`) or returns how long until the oldest entry expires.
    fn try_acquire_at(&self, now: Instant) -> Option<Duration> {
        let mut admitted = self
            .admitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        while let Some(oldest) = admitted.front() {
            if now.duration_since(*oldest) >= self.window {
                admitted.pop_front();
            } else {
                break;
            }
        }

        if admitted.len() < self.max_calls {
            admitted.push_back(now);
            return None;
        }

        let oldest = *admitted.front()?;
        Some((oldest + self.window).saturating_duration_since(now))
    }

    /// Admissions still inside the current window.
    #[cfg(test)]
    pub fn in_window(&self) -> usize {
        let now = Instant::now();
        self.admitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .count()
    }
}
