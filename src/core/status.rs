use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Local, TimeDelta};
use serde::Serialize;
use tokio::fs;

use crate::{
    core::{
        device::Override,
        price::{PriceSample, PriceStatistics},
        reconciler::{Correction, TickReport},
        threshold::ThresholdPolicy,
        window::FavorableWindow,
    },
    prelude::*,
    quantity::price::KilowattHourPrice,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedState {
    On,
    Off,
    Unreachable,
}

impl From<Option<bool>> for ObservedState {
    fn from(observed: Option<bool>) -> Self {
        match observed {
            Some(true) => Self::On,
            Some(false) => Self::Off,
            None => Self::Unreachable,
        }
    }
}

#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct DeviceStatus {
    pub address: String,
    pub desired: bool,
    pub observed: ObservedState,
    pub correction: Correction,
    #[serde(rename = "override")]
    pub override_: Override,
    pub policy: ThresholdPolicy,

    /// `None` until the first price series is available.
    pub threshold: Option<KilowattHourPrice>,

    pub windows: Vec<FavorableWindow>,
}

/// Dashboard snapshot published after every reconciliation tick.
#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct Status {
    pub generated_at: DateTime<Local>,
    pub statistics: Option<PriceStatistics>,

    /// Recent and upcoming prices.
    pub prices: Vec<PriceSample>,

    pub devices: BTreeMap<String, DeviceStatus>,
}

impl Status {
    /// Prices older than this are left out.
    pub const PRICE_LOOKBACK: TimeDelta = TimeDelta::hours(3);

    pub fn from_report(report: &TickReport) -> Self {
        let series = report.schedules.series.as_deref();
        let devices = report
            .devices
            .iter()
            .filter_map(|device| {
                let config = report.configuration.get(&device.name)?;
                let schedule = report.schedules.get(&device.name);
                let status = DeviceStatus {
                    address: config.address.to_string(),
                    desired: device.desired,
                    observed: device.observed.into(),
                    correction: device.correction,
                    override_: config.override_,
                    policy: config.policy,
                    threshold: schedule.map(|schedule| schedule.threshold),
                    windows: schedule.map(|schedule| schedule.windows.clone()).unwrap_or_default(),
                };
                Some((device.name.clone(), status))
            })
            .collect();
        Self {
            generated_at: report.at,
            statistics: series.and_then(|series| series.statistics().ok()),
            prices: series
                .map(|series| series.since(report.at - Self::PRICE_LOOKBACK).copied().collect())
                .unwrap_or_default(),
            devices,
        }
    }

    /// Replace the file contents without ever exposing a partially written file.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn write_to(&self, path: &Path) -> Result {
        let contents = serde_json::to_vec_pretty(self)?;
        let mut temporary_path = path.as_os_str().to_owned();
        temporary_path.push(".tmp");
        fs::write(&temporary_path, contents)
            .await
            .with_context(|| format!("failed to write `{}`", path.display()))?;
        fs::rename(&temporary_path, path)
            .await
            .with_context(|| format!("failed to replace `{}`", path.display()))?;
        debug!("written");
        Ok(())
    }
}
