use async_trait::async_trait;
use chrono::{DateTime, Days, Local, NaiveTime, Utc};
use derive_more::{Display, Error};

use crate::{core::price::PriceSample, ops::Interval};

/// Price source is unavailable.
#[derive(Clone, Debug, Display, Error)]
#[display("failed to fetch the prices: {reason}")]
pub struct FetchError {
    pub reason: String,
}

impl FetchError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Upstream source of the price samples.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Fetch the samples starting within the interval, in any order.
    async fn fetch_series(&self, interval: Interval) -> Result<Vec<PriceSample>, FetchError>;
}

/// Today and tomorrow, counted from the UTC midnight.
pub fn horizon(now: DateTime<Local>) -> Interval {
    let start = now.with_timezone(&Utc).date_naive().and_time(NaiveTime::MIN).and_utc();
    let end = start.checked_add_days(Days::new(2)).unwrap_or(start);
    Interval::new(start.with_timezone(&Local), end.with_timezone(&Local))
}
