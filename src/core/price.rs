use average::Mean;
use chrono::{DateTime, Local, TimeDelta};
use derive_more::{Display, Error};
use itertools::Itertools;
use serde::Serialize;

use crate::{prelude::*, quantity::price::KilowattHourPrice};

/// Resolution and segmentation require at least one price sample.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Display, Error)]
#[display("no price data")]
pub struct NoPriceData;

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriceSample {
    /// Start of the sampling interval.
    pub timestamp: DateTime<Local>,

    pub price: KilowattHourPrice,
}

impl PriceSample {
    pub const fn new(timestamp: DateTime<Local>, price: KilowattHourPrice) -> Self {
        Self { timestamp, price }
    }
}

/// Price samples spaced by a fixed sampling interval.
///
/// Samples are always sorted by timestamp and never share one. Gaps are allowed.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceSeries {
    samples: Vec<PriceSample>,
    sampling_interval: TimeDelta,
}

impl PriceSeries {
    /// Build the series, sorting the samples and dropping the repeated timestamps.
    pub fn new(samples: impl IntoIterator<Item = PriceSample>, sampling_interval: TimeDelta) -> Self {
        let samples = samples
            .into_iter()
            .sorted_by_key(|sample| sample.timestamp)
            .dedup_by(|lhs, rhs| lhs.timestamp == rhs.timestamp)
            .collect_vec();
        Self { samples, sampling_interval }
    }

    pub fn samples(&self) -> &[PriceSample] {
        &self.samples
    }

    #[must_use]
    pub const fn sampling_interval(&self) -> TimeDelta {
        self.sampling_interval
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples at or after the specified timestamp.
    pub fn since(&self, since: DateTime<Local>) -> impl Iterator<Item = &PriceSample> {
        self.samples.iter().filter(move |sample| sample.timestamp >= since)
    }

    /// Median price over the entire series.
    ///
    /// For an even number of samples, this is the average of the two middle values.
    pub fn median(&self) -> Result<KilowattHourPrice, NoPriceData> {
        median(self.samples.iter().map(|sample| sample.price))
    }

    pub fn statistics(&self) -> Result<PriceStatistics, NoPriceData> {
        let median = self.median()?;
        let min = self.samples.iter().map(|sample| sample.price).min().ok_or(NoPriceData)?;
        let max = self.samples.iter().map(|sample| sample.price).max().ok_or(NoPriceData)?;
        let mean: Mean = self.samples.iter().map(|sample| sample.price.0).collect();
        Ok(PriceStatistics { min, max, mean: mean.mean().into(), median })
    }
}

pub fn median(prices: impl IntoIterator<Item = KilowattHourPrice>) -> Result<KilowattHourPrice, NoPriceData> {
    let prices = prices.into_iter().sorted_unstable().collect_vec();
    let middle = prices.len() / 2;
    match prices.len() {
        0 => Err(NoPriceData),
        n if n % 2 == 1 => Ok(prices[middle]),
        _ => Ok((prices[middle - 1] + prices[middle]) / 2.0),
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriceStatistics {
    pub min: KilowattHourPrice,
    pub max: KilowattHourPrice,
    pub mean: KilowattHourPrice,
    pub median: KilowattHourPrice,
}
