use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::Local;
use clap::Parser;
use tokio::{
    signal::{
        ctrl_c,
        unix::{Signal, SignalKind, signal},
    },
    sync::Notify,
    time::{MissedTickBehavior, interval},
};

use crate::{
    cli::{
        config::ConfigArgs,
        device::DeviceArgs,
        heartbeat::HeartbeatArgs,
        prices::PriceArgs,
        retry::RetryArgs,
    },
    config::{Change, ConfigFile},
    core::{
        reconciler::Reconciler,
        refresh::Refresher,
        schedule::ScheduleStore,
        shutdown::{self, Shutdown, ShutdownTrigger},
        status::Status,
    },
    prelude::*,
    tables::build_status_table,
};

#[derive(Parser)]
pub struct ProwlArgs {
    /// How often to re-fetch the prices.
    #[clap(long = "refresh-interval", env = "REFRESH_INTERVAL", default_value = "4h")]
    refresh_interval: humantime::Duration,

    /// How often to reconcile the devices.
    #[clap(long = "tick-interval", env = "TICK_INTERVAL", default_value = "60s")]
    tick_interval: humantime::Duration,

    /// Maximum number of devices being reconciled at the same time.
    #[clap(long = "max-concurrency", env = "MAX_CONCURRENCY", default_value = "4")]
    max_concurrency: usize,

    /// Write the JSON status to this file after every tick.
    #[clap(long = "status-path", env = "STATUS_PATH")]
    status_path: Option<PathBuf>,

    #[clap(flatten)]
    config: ConfigArgs,

    #[clap(flatten)]
    prices: PriceArgs,

    #[clap(flatten)]
    device: DeviceArgs,

    #[clap(flatten)]
    retry: RetryArgs,

    #[clap(flatten)]
    heartbeat: HeartbeatArgs,
}

impl ProwlArgs {
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval.into()
    }

    pub async fn run(self) -> Result {
        let (trigger, shutdown) = shutdown::channel();
        let terminate = signal(SignalKind::terminate())?;

        let mut config_file = self.config.open().await?;
        let schedules = ScheduleStore::default();
        let refresher = Refresher::builder()
            .feed(Arc::new(self.prices.api()?))
            .configuration(config_file.subscribe())
            .schedules(schedules.clone())
            .sampling_interval(self.prices.sampling_interval()?)
            .min_duration(self.prices.min_window_duration()?)
            .build();
        let reconciler = Reconciler::builder()
            .device_control(Arc::new(self.device.client()?))
            .configuration(config_file.subscribe())
            .schedules(schedules)
            .shutdown(shutdown.clone())
            .retry(self.retry.retry())
            .max_concurrency(self.max_concurrency)
            .build();

        if let Err(error) = refresher.refresh(Local::now()).await {
            error!("initial refresh failed, automatic devices stay off for now: {error}");
        }

        let requested = Notify::new();
        tokio::join!(
            wait_for_signal(terminate, trigger),
            refresher.run(self.refresh_interval.into(), &requested, &shutdown),
            self.reconcile(&mut config_file, &reconciler, &requested, &shutdown),
        );
        Ok(())
    }

    async fn reconcile(
        &self,
        config_file: &mut ConfigFile,
        reconciler: &Reconciler,
        requested: &Notify,
        shutdown: &Shutdown,
    ) {
        let mut interval = interval(self.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                () = shutdown.requested() => break,
            }
            if config_file.reload_if_changed().await == Some(Change::Schedules) {
                requested.notify_one();
            }
            let Some(report) = reconciler.tick(Local::now()).await else {
                continue;
            };
            if shutdown.is_requested() {
                // The tick has likely been cut short.
                break;
            }
            let status = Status::from_report(&report);
            if tracing::enabled!(Level::DEBUG) {
                debug!("status:\n{}", build_status_table(&status));
            }
            if let Some(path) = &self.status_path
                && let Err(error) = status.write_to(path).await
            {
                warn!("failed to export the status: {error:#}");
            }
            self.heartbeat.send(&report).await;
        }
        info!("stopped");
    }
}

async fn wait_for_signal(mut terminate: Signal, trigger: ShutdownTrigger) {
    tokio::select! {
        result = ctrl_c() => {
            if let Err(error) = result {
                error!("failed to listen for Ctrl+C: {error:#}");
            }
        }
        _ = terminate.recv() => {}
    }
    trigger.trigger();
}

#[cfg(test)]
mod tests {
    use reqwest::Url;

    use super::*;

    #[test]
    fn elering_and_heartbeat_urls_are_separate() -> Result {
        let args = ProwlArgs::try_parse_from([
            "prowl",
            "--elering-url",
            "http://localhost:8080/prices",
            "--heartbeat-url",
            "http://localhost:9090/ping",
        ])?;
        assert_eq!(args.prices.elering_url.as_str(), "http://localhost:8080/prices");
        assert_eq!(args.heartbeat.url.as_ref().map(Url::as_str), Some("http://localhost:9090/ping"));
        Ok(())
    }
}
