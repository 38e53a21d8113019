//! Nord Pool spot prices as published by Elering.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use reqwest::Url;
use serde::Deserialize;
use serde_with::{TimestampSeconds, serde_as};

use crate::{
    core::{
        feed::{FetchError, PriceFeed},
        price::PriceSample,
    },
    ops::Interval,
    prelude::*,
    quantity::price::MegawattHourPrice,
};

pub struct Api {
    client: reqwest::Client,
    url: Url,
}

impl Api {
    pub const DEFAULT_URL: &'static str = "https://dashboard.elering.ee/api/nps/price";

    /// Bounds are formatted exactly like the dashboard itself does.
    const BOUND_FORMAT: &'static str = "%Y-%m-%dT%H:%M:%S%.3fZ";

    pub fn new(url: Url) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, url })
    }

    #[instrument(skip_all, fields(start = ?interval.start, end = ?interval.end))]
    pub async fn get_prices(&self, interval: Interval) -> Result<Vec<PriceSample>> {
        let query = [
            ("start", interval.start.with_timezone(&Utc).format(Self::BOUND_FORMAT).to_string()),
            ("end", interval.end.with_timezone(&Utc).format(Self::BOUND_FORMAT).to_string()),
        ];
        let response = self
            .client
            .get(self.url.clone())
            .query(&query)
            .send()
            .await
            .with_context(|| format!("failed to request `{}`", self.url))?
            .error_for_status()?
            .json::<Response>()
            .await
            .context("failed to deserialize the prices")?;
        ensure!(response.success, "the price API has reported a failure");
        let samples: Vec<PriceSample> =
            response.data.estonia.into_iter().map(PriceSample::from).collect();
        info!(n_samples = samples.len(), "fetched");
        Ok(samples)
    }
}

#[async_trait]
impl PriceFeed for Api {
    async fn fetch_series(&self, interval: Interval) -> Result<Vec<PriceSample>, FetchError> {
        self.get_prices(interval).await.map_err(|error| FetchError::new(format!("{error:#}")))
    }
}

#[derive(Deserialize)]
struct Response {
    #[serde(default = "default_success")]
    success: bool,

    data: Data,
}

const fn default_success() -> bool {
    true
}

#[derive(Deserialize)]
struct Data {
    #[serde(rename = "ee", default)]
    estonia: Vec<Entry>,
}

#[serde_as]
#[derive(Deserialize)]
struct Entry {
    #[serde_as(as = "TimestampSeconds<i64>")]
    timestamp: DateTime<Utc>,

    price: MegawattHourPrice,
}

impl From<Entry> for PriceSample {
    fn from(entry: Entry) -> Self {
        Self::new(entry.timestamp.with_timezone(&Local), entry.price.into())
    }
}
