use chrono::{Local, TimeDelta};
use clap::Parser;
use reqwest::Url;

use crate::{
    api::elering,
    core::{
        feed::{PriceFeed, horizon},
        price::PriceSeries,
    },
    prelude::*,
};

#[derive(Clone, Parser)]
pub struct PriceArgs {
    #[clap(long = "elering-url", env = "ELERING_URL", default_value = elering::Api::DEFAULT_URL)]
    pub elering_url: Url,

    /// Expected spacing between the consecutive price samples.
    #[clap(long = "sampling-interval", env = "SAMPLING_INTERVAL", default_value = "15min")]
    sampling_interval: humantime::Duration,

    /// Drop favorable windows shorter than this.
    #[clap(long = "min-window-duration", env = "MIN_WINDOW_DURATION", default_value = "0s")]
    min_window_duration: humantime::Duration,
}

impl PriceArgs {
    pub fn sampling_interval(&self) -> Result<TimeDelta> {
        let interval = TimeDelta::from_std(self.sampling_interval.into())?;
        ensure!(interval > TimeDelta::zero(), "the sampling interval must be positive");
        Ok(interval)
    }

    pub fn min_window_duration(&self) -> Result<TimeDelta> {
        Ok(TimeDelta::from_std(self.min_window_duration.into())?)
    }

    pub fn api(&self) -> Result<elering::Api> {
        elering::Api::new(self.elering_url.clone())
    }

    /// Fetch the current horizon once.
    pub async fn fetch_series(&self) -> Result<PriceSeries> {
        let samples = self.api()?.fetch_series(horizon(Local::now())).await?;
        Ok(PriceSeries::new(samples, self.sampling_interval()?))
    }
}
