use clap::Parser;

use crate::core::retry::Retry;

#[derive(Copy, Clone, Parser)]
pub struct RetryArgs {
    /// Total attempts per device operation, including the first one.
    #[clap(long = "retry-attempts", env = "RETRY_ATTEMPTS", default_value = "3")]
    attempts: u32,

    /// Delay after the first failed attempt, doubled after every next one.
    #[clap(long = "retry-base-delay", env = "RETRY_BASE_DELAY", default_value = "2s")]
    base_delay: humantime::Duration,
}

impl RetryArgs {
    pub fn retry(self) -> Retry {
        Retry::builder().max_attempts(self.attempts).base_delay(self.base_delay.into()).build()
    }
}
