use std::time::Duration;

use clap::Parser;
use reqwest::{Client, Url};

use crate::{
    core::reconciler::{Correction, TickReport},
    prelude::*,
};

#[derive(Parser)]
pub struct HeartbeatArgs {
    /// Liveness URL to `POST` the tick summary to.
    ///
    /// The ping is withheld while none of the devices can be read.
    #[clap(long = "heartbeat-url", env = "HEARTBEAT_URL")]
    pub url: Option<Url>,
}

impl HeartbeatArgs {
    pub async fn send(&self, report: &TickReport) {
        let Some(url) = &self.url else {
            return;
        };
        if !report.has_reachable_devices() {
            warn!(n_devices = report.devices.len(), "all devices are unreachable, withholding the heartbeat");
            return;
        }
        if let Err(error) = post_summary(url.clone(), summarize(report)).await {
            warn!("failed to send the heartbeat: {error:#}");
        }
    }
}

fn summarize(report: &TickReport) -> String {
    format!(
        "{} devices: {} switched, {} failed, {} unreachable",
        report.devices.len(),
        report.count(Correction::Applied),
        report.count(Correction::Failed),
        report.count(Correction::Skipped),
    )
}

#[instrument(skip_all, fields(url = %url))]
async fn post_summary(url: Url, summary: String) -> Result {
    debug!(%summary, "pinging…");
    Client::builder()
        .timeout(Duration::from_secs(3))
        .build()?
        .post(url)
        .body(summary)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::{
        configuration::Configuration,
        price::tests::midnight,
        reconciler::DeviceReport,
        schedule::Schedules,
    };

    fn report(corrections: &[(bool, Option<bool>, Correction)]) -> TickReport {
        TickReport {
            at: midnight(),
            configuration: Arc::new(Configuration::default()),
            schedules: Arc::new(Schedules::default()),
            devices: corrections
                .iter()
                .enumerate()
                .map(|(i, (desired, observed, correction))| DeviceReport {
                    name: format!("device-{i}"),
                    desired: *desired,
                    observed: *observed,
                    correction: *correction,
                })
                .collect(),
        }
    }

    #[test]
    fn summarize_ok() {
        let report = report(&[
            (true, Some(false), Correction::Applied),
            (false, Some(false), Correction::NotNeeded),
            (true, Some(false), Correction::Failed),
            (false, None, Correction::Skipped),
        ]);
        assert_eq!(summarize(&report), "4 devices: 1 switched, 1 failed, 1 unreachable");
        assert!(report.has_reachable_devices());
    }

    #[test]
    fn all_unreachable_withholds_the_heartbeat() {
        let report = report(&[(false, None, Correction::Skipped), (true, None, Correction::Skipped)]);
        assert!(!report.has_reachable_devices());
    }

    #[test]
    fn no_devices_still_counts_as_alive() {
        assert!(report(&[]).has_reachable_devices());
    }

    #[tokio::test]
    async fn send_without_url_is_noop() {
        HeartbeatArgs { url: None }.send(&report(&[])).await;
    }
}
