//! Device configuration file, re-read whenever it changes.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use tokio::{fs, sync::watch};

use crate::{
    core::{
        configuration::{Configuration, RawConfiguration},
        threshold::ThresholdPolicy,
    },
    prelude::*,
};

/// What has changed after re-reading the file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Change {
    /// Only addresses or overrides changed, the current schedules remain valid.
    Devices,

    /// The device set or some policy changed, the schedules must be recomputed.
    Schedules,
}

#[must_use]
pub struct ConfigFile {
    path: PathBuf,
    default_policy: ThresholdPolicy,
    modified_at: Option<SystemTime>,
    sender: watch::Sender<Arc<Configuration>>,
}

impl ConfigFile {
    /// Load the configuration for the first time. Unlike the later reloads, any error is fatal.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn open(path: PathBuf, default_policy: ThresholdPolicy) -> Result<Self> {
        let modified_at = modified_at(&path).await?;
        let configuration = load(&path, modified_at.is_some(), default_policy).await?;
        info!(n_devices = configuration.devices.len(), "loaded");
        Ok(Self {
            path,
            default_policy,
            modified_at,
            sender: watch::Sender::new(Arc::new(configuration)),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Configuration>> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self) -> Arc<Configuration> {
        self.sender.borrow().clone()
    }

    /// Re-read the file if its modification time has changed.
    ///
    /// On failure, the previous configuration stays in force.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn reload_if_changed(&mut self) -> Option<Change> {
        match self.try_reload_if_changed().await {
            Ok(change) => change,
            Err(error) => {
                error!("failed to reload, keeping the previous configuration: {error:#}");
                None
            }
        }
    }

    async fn try_reload_if_changed(&mut self) -> Result<Option<Change>> {
        let modified_at = modified_at(&self.path).await?;
        if modified_at == self.modified_at {
            return Ok(None);
        }
        // Remember the new time even if the file is broken, so that it is reported once:
        self.modified_at = modified_at;
        let configuration = load(&self.path, modified_at.is_some(), self.default_policy).await?;

        let previous = self.snapshot();
        if *previous == configuration {
            debug!("touched but unchanged");
            return Ok(None);
        }
        let change = if previous.is_schedule_compatible(&configuration) {
            Change::Devices
        } else {
            Change::Schedules
        };
        info!(n_devices = configuration.devices.len(), ?change, "reloaded");
        self.sender.send_replace(Arc::new(configuration));
        Ok(Some(change))
    }
}

async fn modified_at(path: &Path) -> Result<Option<SystemTime>> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(Some(metadata.modified()?)),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error).with_context(|| format!("failed to stat `{}`", path.display())),
    }
}

async fn load(path: &Path, exists: bool, default_policy: ThresholdPolicy) -> Result<Configuration> {
    let raw = if exists {
        let text = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        toml::from_str::<RawConfiguration>(&text)
            .with_context(|| format!("failed to parse `{}`", path.display()))?
    } else {
        warn!("configuration file is missing, no devices to control");
        RawConfiguration::default()
    };
    Ok(Configuration::resolve(&raw, default_policy).0)
}
