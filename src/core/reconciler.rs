use std::sync::Arc;

use bon::Builder;
use chrono::{DateTime, Local};
use futures_util::{StreamExt, stream};
use itertools::Itertools;
use serde::Serialize;
use tokio::sync::{Mutex, watch};

use crate::{
    core::{
        configuration::{Configuration, DeviceConfig},
        device::DeviceControl,
        retry::Retry,
        schedule::{DeviceSchedule, ScheduleStore, Schedules},
        shutdown::Shutdown,
    },
    prelude::*,
};

/// What happened to a device during a tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Correction {
    /// Observed state already matched the desired one.
    NotNeeded,

    /// The device has been switched to the desired state.
    Applied,

    /// Switching failed, the device is left in the observed state.
    Failed,

    /// The device could not be read, so nothing was done.
    Skipped,
}

/// Outcome of a single device reconciliation.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceReport {
    pub name: String,
    pub desired: bool,

    /// `None` when the device is unreachable.
    pub observed: Option<bool>,

    pub correction: Correction,
}

/// Outcome of a single reconciliation tick.
#[must_use]
pub struct TickReport {
    pub at: DateTime<Local>,

    /// Configuration the tick has been based on.
    pub configuration: Arc<Configuration>,

    /// Schedules the tick has been based on.
    pub schedules: Arc<Schedules>,

    /// Sorted by the device name.
    pub devices: Vec<DeviceReport>,
}

impl TickReport {
    #[must_use]
    pub fn count(&self, correction: Correction) -> usize {
        self.devices.iter().filter(|device| device.correction == correction).count()
    }

    /// At least one device could be read, or there are no devices at all.
    #[must_use]
    pub fn has_reachable_devices(&self) -> bool {
        self.devices.is_empty() || self.devices.iter().any(|device| device.observed.is_some())
    }
}

/// Drives the observed device states towards the desired ones.
#[derive(Builder)]
pub struct Reconciler {
    device_control: Arc<dyn DeviceControl>,
    configuration: watch::Receiver<Arc<Configuration>>,
    schedules: ScheduleStore,
    shutdown: Shutdown,

    #[builder(default)]
    retry: Retry,

    /// Maximum number of devices being reconciled at the same time.
    #[builder(default = 4)]
    max_concurrency: usize,

    #[builder(skip)]
    in_progress: Mutex<()>,
}

impl Reconciler {
    /// Reconcile all the configured devices.
    ///
    /// Returns `None` without doing anything if another tick is still in progress.
    #[instrument(skip_all, fields(at = %at.format("%H:%M:%S")))]
    pub async fn tick(&self, at: DateTime<Local>) -> Option<TickReport> {
        let Ok(_guard) = self.in_progress.try_lock() else {
            warn!("previous tick is still in progress, skipping");
            return None;
        };

        let configuration = self.configuration.borrow().clone();
        let schedules = self.schedules.snapshot();
        debug!(n_devices = configuration.devices.len(), "reconciling…");

        let devices = stream::iter(configuration.devices.values())
            .map(|device| self.reconcile(device, schedules.get(&device.name), at))
            .buffer_unordered(self.max_concurrency.max(1))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .sorted_by(|lhs, rhs| lhs.name.cmp(&rhs.name))
            .collect_vec();

        Some(TickReport { at, configuration, schedules, devices })
    }

    #[instrument(skip_all, fields(device = %device.name, address = %device.address))]
    async fn reconcile(
        &self,
        device: &DeviceConfig,
        schedule: Option<&DeviceSchedule>,
        at: DateTime<Local>,
    ) -> DeviceReport {
        let desired = device.override_.desired_state(schedule, at);
        let report =
            |observed, correction| DeviceReport { name: device.name.clone(), desired, observed, correction };

        let observed = match self
            .retry
            .run(&self.shutdown, || self.device_control.read_state(&device.address))
            .await
        {
            Ok(observed) => observed,
            Err(error) => {
                error!("skipping the unreachable device: {error}");
                return report(None, Correction::Skipped);
            }
        };
        debug!(desired, observed, override_ = %device.override_);

        if desired == observed {
            return report(Some(observed), Correction::NotNeeded);
        }

        let action = if desired { "on" } else { "off" };
        match self
            .retry
            .run(&self.shutdown, || self.device_control.set_state(&device.address, desired))
            .await
        {
            Ok(()) => {
                info!(override_ = %device.override_, "turned {action}");
                report(Some(observed), Correction::Applied)
            }
            Err(error) => {
                error!("failed to turn {action}, will retry on the next tick: {error}");
                report(Some(observed), Correction::Failed)
            }
        }
    }
}
