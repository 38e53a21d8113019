use std::{fmt::Display, time::Duration};

use bon::Builder;

use crate::{core::shutdown::Shutdown, prelude::*};

/// Bounded exponential backoff for fallible operations.
#[must_use]
#[derive(Copy, Clone, Debug, Builder)]
pub struct Retry {
    /// Total number of attempts, including the first one.
    #[builder(default = 3)]
    max_attempts: u32,

    /// Delay after the first failed attempt, doubled after every next one.
    #[builder(default = Duration::from_secs(2))]
    base_delay: Duration,
}

impl Default for Retry {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Retry {
    #[must_use]
    pub const fn max_attempts(self) -> u32 {
        if self.max_attempts == 0 { 1 } else { self.max_attempts }
    }

    /// Delay between the attempt `attempt` (zero-based) and the next one.
    #[must_use]
    pub fn delay(self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Run the operation until it succeeds or the attempts are exhausted.
    ///
    /// Only the waiting task is suspended between the attempts. A shutdown request interrupts the
    /// wait, and the last error is returned right away.
    pub async fn run<T, E, F, Fut>(self, shutdown: &Shutdown, mut operation: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;
        loop {
            let error = match operation().await {
                Ok(value) => {
                    if attempt != 0 {
                        debug!(n_attempts = attempt + 1, "succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };
            if attempt + 1 >= max_attempts {
                warn!(max_attempts, "giving up: {error}");
                return Err(error);
            }
            let delay = self.delay(attempt);
            warn!(attempt = attempt + 1, max_attempts, ?delay, "failed, retrying: {error}");
            if !shutdown.sleep(delay).await {
                warn!("retrying interrupted by the shutdown");
                return Err(error);
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        sync::atomic::{AtomicU32, Ordering},
    };

    use itertools::Itertools;
    use tokio::time::Instant;

    use super::*;
    use crate::core::shutdown;

    #[test]
    fn delay_doubles() {
        let retry = Retry::default();
        assert_eq!(retry.delay(0), Duration::from_secs(2));
        assert_eq!(retry.delay(1), Duration::from_secs(4));
        assert_eq!(retry.delay(2), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_two_failures() {
        let attempted_at = RefCell::new(Vec::new());
        let result = Retry::default()
            .run(&Shutdown::never(), || async {
                attempted_at.borrow_mut().push(Instant::now());
                if attempted_at.borrow().len() <= 2 { Err("nope") } else { Ok(42) }
            })
            .await;
        assert_eq!(result, Ok(42));

        let waits = attempted_at
            .borrow()
            .iter()
            .tuple_windows()
            .map(|(lhs, rhs)| rhs.duration_since(*lhs))
            .collect_vec();
        assert_eq!(waits, [Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_the_last_error_when_exhausted() {
        let n_attempts = AtomicU32::new(0);
        let start = Instant::now();
        let result: Result<(), _> = Retry::builder()
            .max_attempts(3)
            .base_delay(Duration::from_secs(1))
            .build()
            .run(&Shutdown::never(), || async {
                Err(n_attempts.fetch_add(1, Ordering::Relaxed) + 1)
            })
            .await;
        assert_eq!(result, Err(3));
        assert_eq!(n_attempts.load(Ordering::Relaxed), 3);
        // No wait after the final attempt:
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_does_not_wait() {
        let start = Instant::now();
        let result = Retry::default().run(&Shutdown::never(), || async { Ok::<_, &str>(()) }).await;
        assert!(result.is_ok());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_tries_once() {
        let n_attempts = AtomicU32::new(0);
        let _ = Retry::builder()
            .max_attempts(0)
            .build()
            .run(&Shutdown::never(), || async {
                n_attempts.fetch_add(1, Ordering::Relaxed);
                Err::<(), _>("nope")
            })
            .await;
        assert_eq!(n_attempts.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_the_backoff() {
        let (trigger, shutdown) = shutdown::channel();
        trigger.trigger();
        let n_attempts = AtomicU32::new(0);
        let start = Instant::now();
        let result = Retry::builder()
            .base_delay(Duration::from_secs(60))
            .build()
            .run(&shutdown, || async {
                n_attempts.fetch_add(1, Ordering::Relaxed);
                Err::<(), _>("nope")
            })
            .await;
        assert_eq!(result, Err("nope"));
        assert_eq!(n_attempts.load(Ordering::Relaxed), 1);
        assert!(start.elapsed() < Duration::from_secs(60));
    }
}
