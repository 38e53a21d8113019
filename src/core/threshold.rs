use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{
    core::price::{NoPriceData, PriceSeries},
    quantity::price::KilowattHourPrice,
};

/// How a device decides which prices are cheap enough.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// Absolute price cutoff.
    Fixed(KilowattHourPrice),

    /// Cutoff relative to the median price of the current series.
    Multiplier(f64),
}

impl ThresholdPolicy {
    pub const DEFAULT_MULTIPLIER: f64 = 1.5;

    /// Compute the concrete threshold given the series central price.
    #[must_use]
    pub fn resolve(self, central_price: KilowattHourPrice) -> KilowattHourPrice {
        match self {
            Self::Fixed(value) => value,
            Self::Multiplier(factor) => central_price * factor,
        }
    }

    /// Compute the concrete threshold against the median of the series.
    pub fn resolve_for(self, series: &PriceSeries) -> Result<KilowattHourPrice, NoPriceData> {
        Ok(self.resolve(series.median()?))
    }

    /// Both the fixed price and the multiplier must be strictly positive and finite.
    #[must_use]
    pub fn is_valid(self) -> bool {
        let value = match self {
            Self::Fixed(price) => price.0,
            Self::Multiplier(factor) => factor,
        };
        value.is_finite() && value > 0.0
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::Multiplier(Self::DEFAULT_MULTIPLIER)
    }
}

impl Display for ThresholdPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(price) => write!(f, "fixed {price}"),
            Self::Multiplier(factor) => write!(f, "{factor:.2}× median"),
        }
    }
}
