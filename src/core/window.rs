use average::Mean;
use bon::Builder;
use chrono::{DateTime, Local, TimeDelta};
use serde::Serialize;

use crate::{
    core::price::{PriceSample, PriceSeries},
    ops::Interval,
    prelude::*,
    quantity::price::KilowattHourPrice,
};

/// Maximal contiguous time range where the price stayed below the threshold.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FavorableWindow {
    /// Timestamp of the first cheap sample.
    pub start: DateTime<Local>,

    /// Timestamp of the last cheap sample plus one sampling interval, exclusive.
    pub end: DateTime<Local>,

    pub average_price: KilowattHourPrice,

    pub duration_minutes: i64,
}

impl FavorableWindow {
    pub const fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Local>) -> bool {
        self.interval().contains(timestamp)
    }
}

/// Splits a price series into favorable windows.
#[must_use]
#[derive(Copy, Clone, Builder)]
pub struct Segmenter {
    /// Samples strictly below the threshold are cheap.
    threshold: KilowattHourPrice,

    /// Runs shorter than this are dropped. Zero disables the filter.
    #[builder(default = TimeDelta::zero())]
    min_duration: TimeDelta,
}

impl Segmenter {
    #[must_use]
    pub fn is_cheap(&self, sample: &PriceSample) -> bool {
        sample.price < self.threshold
    }

    /// Group the maximal runs of consecutive cheap samples in a single pass.
    ///
    /// A missing sample breaks the run just like an expensive one does.
    #[instrument(skip_all, fields(threshold = %self.threshold, n_samples = series.len()))]
    pub fn segment(&self, series: &PriceSeries) -> Vec<FavorableWindow> {
        let sampling_interval = series.sampling_interval();
        let mut windows = Vec::new();
        let mut run: Vec<&PriceSample> = Vec::new();

        for sample in series.samples() {
            let is_continuation = run
                .last()
                .is_some_and(|last| last.timestamp + sampling_interval == sample.timestamp);
            if !is_continuation {
                windows.extend(self.close(&run, sampling_interval));
                run.clear();
            }
            if self.is_cheap(sample) {
                run.push(sample);
            } else {
                windows.extend(self.close(&run, sampling_interval));
                run.clear();
            }
        }
        windows.extend(self.close(&run, sampling_interval));

        debug!(n_windows = windows.len(), "segmented");
        windows
    }

    fn close(&self, run: &[&PriceSample], sampling_interval: TimeDelta) -> Option<FavorableWindow> {
        let (first, last) = (run.first()?, run.last()?);
        let start = first.timestamp;
        let end = last.timestamp + sampling_interval;
        if end - start < self.min_duration {
            debug!(?start, ?end, min_duration = ?self.min_duration, "skipping the short window");
            return None;
        }
        let average_price: Mean = run.iter().map(|sample| sample.price.0).collect();
        Some(FavorableWindow {
            start,
            end,
            average_price: average_price.mean().into(),
            duration_minutes: (end - start).num_minutes(),
        })
    }
}
