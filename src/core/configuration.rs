use std::collections::BTreeMap;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        device::{Address, Override},
        threshold::ThresholdPolicy,
    },
    prelude::*,
};

/// Device configuration as it is stored by the configuration owner.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RawConfiguration {
    #[serde(default)]
    pub devices: BTreeMap<String, Address>,

    #[serde(default)]
    pub policies: BTreeMap<String, ThresholdPolicy>,

    #[serde(default)]
    pub overrides: BTreeMap<String, Override>,
}

/// Configuration problem that affects a single device and never stops the process.
#[derive(Clone, Debug, PartialEq, Display, Error)]
pub enum ConfigInconsistency {
    #[display("override for unknown device `{device}` is ignored")]
    UnknownOverride { device: String },

    #[display("policy for unknown device `{device}` is ignored")]
    UnknownPolicy { device: String },

    #[display("device `{device}` has no policy, using `{fallback}`")]
    MissingPolicy { device: String, fallback: ThresholdPolicy },

    #[display("device `{device}` has invalid policy `{policy}`, using `{fallback}`")]
    InvalidPolicy { device: String, policy: ThresholdPolicy, fallback: ThresholdPolicy },
}

/// Everything needed to make a decision about one device, taken from a single snapshot.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceConfig {
    pub name: String,
    pub address: Address,
    pub policy: ThresholdPolicy,
    pub override_: Override,
}

/// Resolved and immutable configuration snapshot.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Configuration {
    pub devices: BTreeMap<String, DeviceConfig>,
}

impl Configuration {
    /// Resolve the raw configuration, falling back to the default policy where needed.
    pub fn resolve(
        raw: &RawConfiguration,
        default_policy: ThresholdPolicy,
    ) -> (Self, Vec<ConfigInconsistency>) {
        let mut inconsistencies = Vec::new();

        for device in raw.overrides.keys().filter(|name| !raw.devices.contains_key(*name)) {
            inconsistencies.push(ConfigInconsistency::UnknownOverride { device: device.clone() });
        }
        for device in raw.policies.keys().filter(|name| !raw.devices.contains_key(*name)) {
            inconsistencies.push(ConfigInconsistency::UnknownPolicy { device: device.clone() });
        }

        let devices = raw
            .devices
            .iter()
            .map(|(name, address)| {
                let policy = match raw.policies.get(name) {
                    Some(policy) if policy.is_valid() => *policy,
                    Some(policy) => {
                        inconsistencies.push(ConfigInconsistency::InvalidPolicy {
                            device: name.clone(),
                            policy: *policy,
                            fallback: default_policy,
                        });
                        default_policy
                    }
                    None => {
                        inconsistencies.push(ConfigInconsistency::MissingPolicy {
                            device: name.clone(),
                            fallback: default_policy,
                        });
                        default_policy
                    }
                };
                let device = DeviceConfig {
                    name: name.clone(),
                    address: address.clone(),
                    policy,
                    override_: raw.overrides.get(name).copied().unwrap_or_default(),
                };
                (name.clone(), device)
            })
            .collect();

        for inconsistency in &inconsistencies {
            warn!("{inconsistency}");
        }
        (Self { devices }, inconsistencies)
    }

    #[must_use]
    pub fn get(&self, device_name: &str) -> Option<&DeviceConfig> {
        self.devices.get(device_name)
    }

    /// Whether the favorable windows computed for `self` are still valid for `other`.
    #[must_use]
    pub fn is_schedule_compatible(&self, other: &Self) -> bool {
        self.devices.len() == other.devices.len()
            && self.devices.iter().zip(&other.devices).all(|((lhs_name, lhs), (rhs_name, rhs))| {
                lhs_name == rhs_name && lhs.policy == rhs.policy
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::price::KilowattHourPrice;

    fn parse(text: &str) -> (Configuration, Vec<ConfigInconsistency>) {
        let raw: RawConfiguration = toml::from_str(text).unwrap();
        Configuration::resolve(&raw, ThresholdPolicy::default())
    }

    #[test]
    fn resolve_ok() {
        // language=toml
        let (configuration, inconsistencies) = parse(
            r#"
            [devices]
            boiler = "192.168.1.10"
            heater = "heater.local"

            [policies]
            boiler = { type = "fixed", value = 8.0 }
            heater = { type = "multiplier", value = 1.2 }

            [overrides]
            heater = "off"
            "#,
        );
        assert!(inconsistencies.is_empty());

        let boiler = configuration.get("boiler").unwrap();
        assert_eq!(boiler.address, Address::from("192.168.1.10"));
        assert_eq!(boiler.policy, ThresholdPolicy::Fixed(KilowattHourPrice(8.0)));
        assert_eq!(boiler.override_, Override::Auto);

        let heater = configuration.get("heater").unwrap();
        assert_eq!(heater.policy, ThresholdPolicy::Multiplier(1.2));
        assert_eq!(heater.override_, Override::ForcedOff);
    }

    #[test]
    fn empty_ok() {
        let (configuration, inconsistencies) = parse("");
        assert!(configuration.devices.is_empty());
        assert!(inconsistencies.is_empty());
    }

    #[test]
    fn unknown_devices_are_ignored() {
        // language=toml
        let (configuration, inconsistencies) = parse(
            r#"
            [devices]
            boiler = "192.168.1.10"

            [policies]
            boiler = { type = "multiplier", value = 1.5 }
            ghost = { type = "fixed", value = 1.0 }

            [overrides]
            phantom = "on"
            "#,
        );
        assert_eq!(configuration.devices.len(), 1);
        assert_eq!(
            inconsistencies,
            [
                ConfigInconsistency::UnknownOverride { device: "phantom".to_owned() },
                ConfigInconsistency::UnknownPolicy { device: "ghost".to_owned() },
            ],
        );
    }

    #[test]
    fn missing_and_invalid_policies_fall_back() {
        // language=toml
        let (configuration, inconsistencies) = parse(
            r#"
            [devices]
            boiler = "192.168.1.10"
            heater = "192.168.1.11"

            [policies]
            heater = { type = "fixed", value = -3.0 }
            "#,
        );
        assert_eq!(configuration.get("boiler").unwrap().policy, ThresholdPolicy::default());
        assert_eq!(configuration.get("heater").unwrap().policy, ThresholdPolicy::default());
        assert_eq!(inconsistencies.len(), 2);
    }

    #[test]
    fn schedule_compatibility_ignores_addresses_and_overrides() {
        let (lhs, _) = parse(
            r#"
            devices = { boiler = "192.168.1.10" }
            policies = { boiler = { type = "multiplier", value = 1.5 } }
            "#,
        );
        let (rhs, _) = parse(
            r#"
            devices = { boiler = "192.168.1.20" }
            policies = { boiler = { type = "multiplier", value = 1.5 } }
            overrides = { boiler = "on" }
            "#,
        );
        assert!(lhs.is_schedule_compatible(&rhs));

        let (other, _) = parse(
            r#"
            devices = { boiler = "192.168.1.10" }
            policies = { boiler = { type = "multiplier", value = 2.0 } }
            "#,
        );
        assert!(!lhs.is_schedule_compatible(&other));

        let (added, _) = parse(
            r#"
            devices = { boiler = "192.168.1.10", heater = "192.168.1.11" }
            policies = { boiler = { type = "multiplier", value = 1.5 } }
            "#,
        );
        assert!(!lhs.is_schedule_compatible(&added));
    }
}
