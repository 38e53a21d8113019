quantity!(
    /// Energy price in euro cents per kilowatt-hour («senti/kWh»).
    KilowattHourPrice, via: f64, suffix: "¢/kWh", precision: 2
);

quantity!(
    /// Wholesale energy price in euros per megawatt-hour, as the exchanges publish it.
    MegawattHourPrice, via: f64, suffix: "€/MWh", precision: 2
);

impl From<MegawattHourPrice> for KilowattHourPrice {
    /// 1 €/MWh = 100 ¢ / 1000 kWh.
    fn from(price: MegawattHourPrice) -> Self {
        Self(price.0 / 10.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn megawatt_hour_price_to_cents_ok() {
        let price = KilowattHourPrice::from(MegawattHourPrice(123.4));
        assert_abs_diff_eq!(price.0, 12.34, epsilon = 1e-9);
    }

    #[test]
    fn display_ok() {
        assert_eq!(KilowattHourPrice(5.0).to_string(), "5.00 ¢/kWh");
    }

    #[test]
    fn ordering_ok() {
        assert!(KilowattHourPrice(-1.0) < KilowattHourPrice::ZERO);
        assert_eq!(KilowattHourPrice(3.0).max(KilowattHourPrice(2.0)), KilowattHourPrice(3.0));
    }
}
