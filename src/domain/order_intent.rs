//! Order intents handed to an external execution component.

use serde::Serialize;

use crate::domain::position::Side;

/// Rounds a price to 5 decimal places, the quote precision of most FX pairs.
pub fn round5(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderIntent {
    pub side: Side,
    pub units: u64,
    pub entry: f64,
    pub stop_price: f64,
    pub target_price: f64,
}

impl OrderIntent {
    /// Stop and target at fixed absolute distances from `entry`.
    pub fn with_fixed_distances(
        side: Side,
        units: u64,
        entry: f64,
        tp_distance: f64,
        sl_distance: f64,
    ) -> Self {
        let sign = side.sign();
        OrderIntent {
            side,
            units,
            entry,
            stop_price: round5(entry - sign * sl_distance),
            target_price: round5(entry + sign * tp_distance),
        }
    }

    /// Stop at `multiplier * atr` from entry, target mirrored at the same
    /// distance on the other side.
    pub fn with_atr_stop(side: Side, units: u64, entry: f64, atr: f64, multiplier: f64) -> Self {
        let distance = round5(multiplier * atr);
        let sign = side.sign();
        let stop_price = round5(entry - sign * distance);
        let target_price = round5(entry + (entry - stop_price));
        OrderIntent {
            side,
            units,
            entry,
            stop_price,
            target_price,
        }
    }

    /// Units as a broker expects them: negative for a short.
    pub fn signed_units(&self) -> i64 {
        let units = i64::try_from(self.units).unwrap_or(i64::MAX);
        match self.side {
            Side::Long => units,
            Side::Short => -units,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn round5_truncates_noise() {
        assert_relative_eq!(round5(1.0823449), 1.08234, epsilon = 1e-12);
        assert_relative_eq!(round5(1.0823451), 1.08235, epsilon = 1e-12);
        assert_relative_eq!(round5(0.000_123_4), 0.00012, epsilon = 1e-12);
    }

    #[test]
    fn fixed_long() {
        let intent = OrderIntent::with_fixed_distances(Side::Long, 1000, 1.1000, 0.0030, 0.0020);
        assert_relative_eq!(intent.stop_price, 1.0980, epsilon = 1e-12);
        assert_relative_eq!(intent.target_price, 1.1030, epsilon = 1e-12);
        assert_eq!(intent.signed_units(), 1000);
    }

    #[test]
    fn fixed_short_is_mirrored() {
        let intent = OrderIntent::with_fixed_distances(Side::Short, 1000, 1.1000, 0.0030, 0.0020);
        assert_relative_eq!(intent.stop_price, 1.1020, epsilon = 1e-12);
        assert_relative_eq!(intent.target_price, 1.0970, epsilon = 1e-12);
        assert_eq!(intent.signed_units(), -1000);
    }

    #[test]
    fn atr_stop_long() {
        // 1.5 * 0.0012 = 0.0018
        let intent = OrderIntent::with_atr_stop(Side::Long, 1000, 1.08500, 0.0012, 1.5);
        assert_relative_eq!(intent.stop_price, 1.08320, epsilon = 1e-12);
        assert_relative_eq!(intent.target_price, 1.08680, epsilon = 1e-12);
    }

    #[test]
    fn atr_stop_short() {
        let intent = OrderIntent::with_atr_stop(Side::Short, 500, 1.08500, 0.0012, 1.5);
        assert_relative_eq!(intent.stop_price, 1.08680, epsilon = 1e-12);
        assert_relative_eq!(intent.target_price, 1.08320, epsilon = 1e-12);
        assert_eq!(intent.signed_units(), -500);
    }

    #[test]
    fn atr_distance_is_rounded() {
        // 1.5 * 0.000123456 = 0.000185184 -> 0.00019
        let intent = OrderIntent::with_atr_stop(Side::Long, 1, 1.0, 0.000123456, 1.5);
        assert_relative_eq!(intent.entry - intent.stop_price, 0.00019, epsilon = 1e-12);
    }
}
