//! Amounts in the smallest currency unit.

use std::fmt;

/// Number of base units in one whole coin.
pub const UNITS_PER_COIN: i64 = 100_000_000;

/// A signed count of the smallest currency unit.
///
/// A value of `-1` is the coinbase sentinel meaning "unknown amount", not a
/// real negative balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(pub i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Sentinel for an unknown/coinbase amount.
    pub const UNKNOWN: Amount = Amount(-1);

    /// Construct from a count of base units.
    pub fn from_units(units: i64) -> Self {
        Amount(units)
    }

    /// Construct from a whole-coin value, truncating sub-unit precision.
    pub fn from_coins(coins: f64) -> Self {
        Amount((coins * UNITS_PER_COIN as f64).round() as i64)
    }

    /// The raw base-unit count.
    pub fn units(&self) -> i64 {
        self.0
    }

    /// The value in whole coins.
    pub fn to_coins(&self) -> f64 {
        self.0 as f64 / UNITS_PER_COIN as f64
    }

    /// True for the `-1` coinbase sentinel.
    pub fn is_unknown(&self) -> bool {
        self.0 == -1
    }

    /// True for amounts a transaction output can actually carry.
    pub fn is_spendable(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Amount {
    fn from(units: i64) -> Self {
        Amount(units)
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Amount(units as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_conversion() {
        assert_eq!(Amount::from_coins(1.0), Amount(UNITS_PER_COIN));
        assert_eq!(Amount::from_coins(0.00000001), Amount(1));
        assert_eq!(Amount(50_000_000).to_coins(), 0.5);
    }

    #[test]
    fn test_unknown_sentinel() {
        assert!(Amount::UNKNOWN.is_unknown());
        assert!(!Amount::UNKNOWN.is_spendable());
        assert!(!Amount(0).is_spendable());
        assert!(Amount(1).is_spendable());
    }
}
