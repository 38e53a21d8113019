use std::path::PathBuf;

use clap::Parser;

use crate::{config::ConfigFile, core::threshold::ThresholdPolicy, prelude::*};

#[derive(Clone, Parser)]
pub struct ConfigArgs {
    /// Device configuration file, re-read whenever it changes.
    #[clap(long = "config", env = "CONFIG_PATH", default_value = "ferret.toml")]
    pub path: PathBuf,

    /// Threshold multiplier for the devices without a valid policy.
    #[clap(long = "default-multiplier", env = "DEFAULT_MULTIPLIER", default_value = "1.5")]
    default_multiplier: f64,
}

impl ConfigArgs {
    pub fn default_policy(&self) -> Result<ThresholdPolicy> {
        let policy = ThresholdPolicy::Multiplier(self.default_multiplier);
        ensure!(policy.is_valid(), "default multiplier must be positive");
        Ok(policy)
    }

    pub async fn open(&self) -> Result<ConfigFile> {
        ConfigFile::open(self.path.clone(), self.default_policy()?).await
    }
}
