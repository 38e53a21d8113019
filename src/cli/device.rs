use clap::Parser;

use crate::{api::homewizard, prelude::*};

#[derive(Copy, Clone, Parser)]
pub struct DeviceArgs {
    /// Timeout of a single device request.
    #[clap(long = "device-timeout", env = "DEVICE_TIMEOUT", default_value = "5s")]
    timeout: humantime::Duration,
}

impl DeviceArgs {
    pub fn client(self) -> Result<homewizard::Client> {
        homewizard::Client::new(self.timeout.into())
    }
}
