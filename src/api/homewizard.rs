//! HomeWizard Energy Socket local API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{
    core::device::{Address, ConnectError, DeviceControl},
    prelude::*,
};

/// Shared client for all the sockets.
#[derive(Clone)]
pub struct Client(reqwest::Client);

impl Client {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self(reqwest::Client::builder().timeout(timeout).build()?))
    }

    fn state_url(address: &Address) -> Result<Url> {
        let url = format!("http://{address}/api/v1/state");
        Url::parse(&url).with_context(|| format!("invalid device address `{address}`"))
    }

    #[instrument(skip_all, fields(address = %address))]
    pub async fn get_state(&self, address: &Address) -> Result<State> {
        let url = Self::state_url(address)?;
        let state = self
            .0
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to request the state from `{address}`"))?
            .error_for_status()?
            .json::<State>()
            .await
            .with_context(|| format!("failed to deserialize the state from `{address}`"))?;
        debug!(state.power_on);
        Ok(state)
    }

    #[instrument(skip_all, fields(address = %address, power_on = state.power_on))]
    pub async fn put_state(&self, address: &Address, state: &State) -> Result {
        let url = Self::state_url(address)?;
        self.0
            .put(url)
            .json(state)
            .send()
            .await
            .with_context(|| format!("failed to switch `{address}`"))?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl DeviceControl for Client {
    async fn read_state(&self, address: &Address) -> Result<bool, ConnectError> {
        self.get_state(address)
            .await
            .map(|state| state.power_on)
            .map_err(|error| ConnectError::new(address, format!("{error:#}")))
    }

    async fn set_state(&self, address: &Address, is_on: bool) -> Result<(), ConnectError> {
        self.put_state(address, &State { power_on: is_on })
            .await
            .map_err(|error| ConnectError::new(address, format!("{error:#}")))
    }

    async fn test_connection(&self, address: &Address) -> Result<(), ConnectError> {
        self.read_state(address).await.map(|_| ())
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct State {
    pub power_on: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_ok() -> Result {
        // language=json
        let body = r#"{
            "power_on": true,
            "switch_lock": false,
            "brightness": 255
        }"#;
        assert!(serde_json::from_str::<State>(body)?.power_on);
        Ok(())
    }

    #[test]
    fn put_state_body_ok() -> Result {
        assert_eq!(serde_json::to_string(&State { power_on: false })?, r#"{"power_on":false}"#);
        Ok(())
    }

    #[test]
    fn state_url_ok() -> Result {
        let url = Client::state_url(&Address::from("192.168.1.10"))?;
        assert_eq!(url.as_str(), "http://192.168.1.10/api/v1/state");
        let url = Client::state_url(&Address::from("boiler.local:8080"))?;
        assert_eq!(url.as_str(), "http://boiler.local:8080/api/v1/state");
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a socket on the local network"]
    async fn get_state_ok() -> Result {
        let address = Address::from(std::env::var("HOMEWIZARD_SOCKET_ADDRESS")?);
        let _ = Client::new(Duration::from_secs(5))?.get_state(&address).await?;
        Ok(())
    }
}
