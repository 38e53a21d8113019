use async_trait::async_trait;
use chrono::{DateTime, Local};
use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};

use crate::core::schedule::DeviceSchedule;

/// Network address of a switchable device: a host name or an IP address, optionally with a port.
#[derive(Clone, Debug, Display, Eq, PartialEq, Hash, From, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self(address.to_owned())
    }
}

/// Transient device I/O failure.
#[derive(Clone, Debug, Display, Error)]
#[display("device `{address}` is unavailable: {reason}")]
pub struct ConnectError {
    pub address: Address,
    pub reason: String,
}

impl ConnectError {
    pub fn new(address: &Address, reason: impl Into<String>) -> Self {
        Self { address: address.clone(), reason: reason.into() }
    }
}

/// Reads and switches the power state of on/off devices.
///
/// Implementations must be safe to call concurrently for distinct devices.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// Read whether the device is currently powered on.
    async fn read_state(&self, address: &Address) -> Result<bool, ConnectError>;

    /// Power the device on or off.
    async fn set_state(&self, address: &Address, is_on: bool) -> Result<(), ConnectError>;

    /// Check that the device is reachable, without changing its state.
    async fn test_connection(&self, address: &Address) -> Result<(), ConnectError>;
}

/// Manual instruction that bypasses the price-based scheduling.
#[derive(Copy, Clone, Debug, Default, Display, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Override {
    #[default]
    #[display("auto")]
    Auto,

    #[display("on")]
    #[serde(rename = "on")]
    ForcedOn,

    #[display("off")]
    #[serde(rename = "off")]
    ForcedOff,
}

impl Override {
    /// Whether the device should be powered on at the specified moment.
    ///
    /// Without a schedule, an automatic device stays off.
    #[must_use]
    pub fn desired_state(self, schedule: Option<&DeviceSchedule>, now: DateTime<Local>) -> bool {
        match self {
            Self::ForcedOn => true,
            Self::ForcedOff => false,
            Self::Auto => schedule.is_some_and(|schedule| schedule.is_favorable(now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::{
        core::{
            price::tests::{midnight, quarterly_series},
            threshold::ThresholdPolicy,
        },
        quantity::price::KilowattHourPrice,
    };

    fn schedule() -> DeviceSchedule {
        // Cheap from 00:15 until 00:45:
        DeviceSchedule::compute(
            &quarterly_series(&[10.0, 5.0, 5.0, 12.0]),
            ThresholdPolicy::Fixed(KilowattHourPrice(8.0)),
            TimeDelta::zero(),
        )
        .unwrap()
    }

    #[test]
    fn auto_follows_the_windows() {
        let schedule = schedule();
        assert!(!Override::Auto.desired_state(Some(&schedule), midnight()));
        assert!(Override::Auto.desired_state(Some(&schedule), midnight() + TimeDelta::minutes(15)));
        assert!(Override::Auto.desired_state(Some(&schedule), midnight() + TimeDelta::minutes(44)));
        assert!(!Override::Auto.desired_state(Some(&schedule), midnight() + TimeDelta::minutes(45)));
    }

    #[test]
    fn auto_without_schedule_is_off() {
        assert!(!Override::Auto.desired_state(None, midnight()));
    }

    #[test]
    fn forced_on_outside_windows_is_on() {
        assert!(Override::ForcedOn.desired_state(Some(&schedule()), midnight()));
        assert!(Override::ForcedOn.desired_state(None, midnight()));
    }

    #[test]
    fn forced_off_inside_window_is_off() {
        let now = midnight() + TimeDelta::minutes(20);
        assert!(!Override::ForcedOff.desired_state(Some(&schedule()), now));
    }

    #[test]
    fn deserialize_override_ok() -> crate::prelude::Result {
        #[derive(Deserialize)]
        struct Wrapper {
            state: Override,
        }
        assert_eq!(toml::from_str::<Wrapper>(r#"state = "on""#)?.state, Override::ForcedOn);
        assert_eq!(toml::from_str::<Wrapper>(r#"state = "off""#)?.state, Override::ForcedOff);
        assert_eq!(toml::from_str::<Wrapper>(r#"state = "auto""#)?.state, Override::Auto);
        Ok(())
    }
}
