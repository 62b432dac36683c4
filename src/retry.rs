//! Exponential backoff for feed reconnection
//!
//! The reconnect policy lives with the lifecycle controller, not inside the
//! transport, so its schedule is inspectable in tests.

use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug)]
pub struct ExponentialBackoff {
    initial_delay_secs: u64,
    max_delay_secs: u64,
    max_attempts: u32,
    current_attempt: u32,
}

#[derive(Debug)]
pub struct MaxAttemptsExceeded;

impl std::fmt::Display for MaxAttemptsExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Maximum reconnect attempts exceeded")
    }
}

impl std::error::Error for MaxAttemptsExceeded {}

impl ExponentialBackoff {
    pub fn new(initial_secs: u64, max_secs: u64, max_attempts: u32) -> Self {
        Self {
            initial_delay_secs: initial_secs,
            max_delay_secs: max_secs,
            max_attempts,
            current_attempt: 0,
        }
    }

    /// Delay the next `sleep` call would wait for, without consuming an attempt
    pub fn next_delay(&self) -> Duration {
        let delay = std::cmp::min(
            self.initial_delay_secs
                .saturating_mul(2_u64.saturating_pow(self.current_attempt)),
            self.max_delay_secs,
        );
        Duration::from_secs(delay)
    }

    pub async fn sleep(&mut self) -> Result<(), MaxAttemptsExceeded> {
        if self.current_attempt >= self.max_attempts {
            return Err(MaxAttemptsExceeded);
        }

        let delay = self.next_delay();

        log::warn!(
            "Retry attempt {} of {} in {}s",
            self.current_attempt + 1,
            self.max_attempts,
            delay.as_secs()
        );

        sleep(delay).await;
        self.current_attempt += 1;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }
}
