use std::{collections::BTreeMap, sync::Arc, time::Duration};

use bon::Builder;
use chrono::{DateTime, Local, TimeDelta};
use derive_more::{Display, Error, From};
use tokio::{
    sync::{Notify, watch},
    time::{MissedTickBehavior, interval},
};

use crate::{
    core::{
        configuration::Configuration,
        feed::{FetchError, PriceFeed, horizon},
        price::{NoPriceData, PriceSeries},
        schedule::{DeviceSchedule, ScheduleStore, Schedules},
        shutdown::Shutdown,
    },
    prelude::*,
};

#[derive(Debug, Display, Error, From)]
pub enum RefreshError {
    Fetch(FetchError),
    NoPriceData(NoPriceData),
}

/// Keeps the schedules in line with the latest prices and device policies.
#[derive(Builder)]
pub struct Refresher {
    feed: Arc<dyn PriceFeed>,
    configuration: watch::Receiver<Arc<Configuration>>,
    schedules: ScheduleStore,

    /// Expected spacing between the consecutive samples.
    #[builder(default = TimeDelta::minutes(15))]
    sampling_interval: TimeDelta,

    /// Favorable windows shorter than this are dropped.
    #[builder(default = TimeDelta::zero())]
    min_duration: TimeDelta,
}

impl Refresher {
    /// Fetch the prices and recompute the schedules of all devices.
    ///
    /// On failure, the current schedules stay untouched.
    #[instrument(skip_all)]
    pub async fn refresh(&self, now: DateTime<Local>) -> Result<(), RefreshError> {
        let horizon = horizon(now);
        info!(?horizon, "fetching the prices…");
        let samples = self.feed.fetch_series(horizon).await?;
        let series = Arc::new(PriceSeries::new(samples, self.sampling_interval));
        info!(n_samples = series.len(), "fetched");
        self.schedules.replace(self.compute(series)?);
        Ok(())
    }

    /// Recompute the schedules from the cached prices, for example after a policy change.
    #[instrument(skip_all)]
    pub fn reschedule(&self) -> Result<(), NoPriceData> {
        let series = self.schedules.snapshot().series.clone().ok_or(NoPriceData)?;
        self.schedules.replace(self.compute(series)?);
        Ok(())
    }

    /// Refresh periodically and whenever requested, until the shutdown.
    ///
    /// The first periodic refresh happens one period from now, the startup one is up to the caller.
    pub async fn run(&self, period: Duration, requested: &Notify, shutdown: &Shutdown) {
        let mut interval = interval(period);
        interval.reset();
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(error) = self.refresh(Local::now()).await {
                        error!("failed to refresh, keeping the previous schedules: {error}");
                    }
                }
                () = requested.notified() => {
                    self.on_requested().await;
                }
                () = shutdown.requested() => {
                    break;
                }
            }
        }
        info!("stopped");
    }

    async fn on_requested(&self) {
        let result = match self.reschedule() {
            // Nothing cached yet, so try fetching:
            Err(NoPriceData) => self.refresh(Local::now()).await,
            Ok(()) => Ok(()),
        };
        if let Err(error) = result {
            error!("failed to reschedule: {error}");
        }
    }

    fn compute(&self, series: Arc<PriceSeries>) -> Result<Schedules, NoPriceData> {
        let configuration = self.configuration.borrow().clone();
        let statistics = series.statistics()?;
        info!(
            median = %statistics.median,
            min = %statistics.min,
            max = %statistics.max,
            n_devices = configuration.devices.len(),
            "computing the schedules…",
        );

        let devices = configuration
            .devices
            .values()
            .map(|device| {
                let schedule = DeviceSchedule::compute(&series, device.policy, self.min_duration)?;
                info!(
                    device = %device.name,
                    policy = %device.policy,
                    threshold = %schedule.threshold,
                    n_windows = schedule.windows.len(),
                    "scheduled",
                );
                for window in &schedule.windows {
                    debug!(
                        device = %device.name,
                        start = %window.start.format("%Y-%m-%d %H:%M"),
                        end = %window.end.format("%H:%M"),
                        duration_minutes = window.duration_minutes,
                        average_price = %window.average_price,
                    );
                }
                Ok((device.name.clone(), schedule))
            })
            .collect::<Result<BTreeMap<_, _>, NoPriceData>>()?;

        Ok(Schedules { series: Some(series), devices })
    }
}
