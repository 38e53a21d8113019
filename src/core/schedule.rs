use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Local, TimeDelta};
use serde::Serialize;
use tokio::sync::watch;

use crate::{
    core::{
        price::{NoPriceData, PriceSeries},
        threshold::ThresholdPolicy,
        window::{FavorableWindow, Segmenter},
    },
    prelude::*,
    quantity::price::KilowattHourPrice,
};

/// Favorable windows of a single device under its policy.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeviceSchedule {
    pub policy: ThresholdPolicy,
    pub threshold: KilowattHourPrice,
    pub windows: Vec<FavorableWindow>,
}

impl DeviceSchedule {
    pub fn compute(
        series: &PriceSeries,
        policy: ThresholdPolicy,
        min_duration: TimeDelta,
    ) -> Result<Self, NoPriceData> {
        let threshold = policy.resolve_for(series)?;
        let windows =
            Segmenter::builder().threshold(threshold).min_duration(min_duration).build().segment(series);
        Ok(Self { policy, threshold, windows })
    }

    #[must_use]
    pub fn is_favorable(&self, now: DateTime<Local>) -> bool {
        self.windows.iter().any(|window| window.contains(now))
    }
}

/// Immutable snapshot of the schedules of all devices, built from a single price series.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct Schedules {
    pub series: Option<Arc<PriceSeries>>,
    pub devices: BTreeMap<String, DeviceSchedule>,
}

impl Schedules {
    #[must_use]
    pub fn get(&self, device_name: &str) -> Option<&DeviceSchedule> {
        self.devices.get(device_name)
    }
}

/// Shared handle to the current [`Schedules`] snapshot.
///
/// Readers always see either the previous or the next snapshot in its entirety.
#[derive(Clone)]
pub struct ScheduleStore(Arc<watch::Sender<Arc<Schedules>>>);

impl Default for ScheduleStore {
    fn default() -> Self {
        Self(Arc::new(watch::Sender::new(Arc::new(Schedules::default()))))
    }
}

impl ScheduleStore {
    pub fn snapshot(&self) -> Arc<Schedules> {
        self.0.borrow().clone()
    }

    pub fn replace(&self, schedules: Schedules) {
        debug!(n_devices = schedules.devices.len(), "replacing the schedules");
        self.0.send_replace(Arc::new(schedules));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::tests::quarterly_series;

    #[test]
    fn compute_ok() {
        let series = quarterly_series(&[10.0, 5.0, 5.0, 12.0]);
        let schedule =
            DeviceSchedule::compute(&series, ThresholdPolicy::Multiplier(1.0), TimeDelta::zero())
                .unwrap();
        // Median is 7.5:
        assert_eq!(schedule.threshold, KilowattHourPrice(7.5));
        assert_eq!(schedule.windows.len(), 1);
    }

    #[test]
    fn compute_empty_fails() {
        let series = quarterly_series(&[]);
        assert_eq!(
            DeviceSchedule::compute(&series, ThresholdPolicy::default(), TimeDelta::zero()),
            Err(NoPriceData),
        );
    }

    #[test]
    fn replace_swaps_the_whole_snapshot() {
        let store = ScheduleStore::default();
        let before = store.snapshot();
        assert!(before.devices.is_empty());

        let series = Arc::new(quarterly_series(&[1.0]));
        let schedule =
            DeviceSchedule::compute(&series, ThresholdPolicy::default(), TimeDelta::zero()).unwrap();
        store.replace(Schedules {
            series: Some(series),
            devices: BTreeMap::from([("boiler".to_owned(), schedule)]),
        });

        // The old snapshot is untouched:
        assert!(before.devices.is_empty());
        assert!(store.snapshot().get("boiler").is_some());
    }
}
