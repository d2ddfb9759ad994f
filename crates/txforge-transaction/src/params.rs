//! Policy parameters for transaction building.

/// Outputs below this many base units are uneconomical to spend.
pub const DUST_LIMIT: u64 = 546;

/// Default fee rate in base units per kilobyte of transaction.
pub const DEFAULT_FEE_PER_KB: u64 = 500;

/// Multiplier applied to the estimated fee when deciding whether a leftover
/// with no change destination is an acceptable implicit fee or a burn.
pub const DEFAULT_FEE_SECURITY_MARGIN: u64 = 150;

/// Fee and standardness policy, passed explicitly to the builder.
///
/// There is no process-wide default instance; callers construct one (or take
/// [`NetworkParams::default`]) and hand it to [`crate::builder::TxBuilder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkParams {
    /// Smallest output value accepted for non-data outputs.
    pub dust_limit: u64,
    /// Fee rate in base units per 1000 bytes.
    pub fee_per_kb: u64,
    /// Tolerated ratio between an implicit fee and the estimated fee.
    pub fee_security_margin: u64,
}

impl NetworkParams {
    pub fn new(dust_limit: u64, fee_per_kb: u64, fee_security_margin: u64) -> Self {
        NetworkParams {
            dust_limit,
            fee_per_kb,
            fee_security_margin,
        }
    }

    /// Fee for a transaction of `size_bytes` at this fee rate, rounded to the
    /// nearest whole unit.
    pub fn fee_for_size(&self, size_bytes: u64) -> u64 {
        (size_bytes * self.fee_per_kb + 500) / 1000
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        NetworkParams {
            dust_limit: DUST_LIMIT,
            fee_per_kb: DEFAULT_FEE_PER_KB,
            fee_security_margin: DEFAULT_FEE_SECURITY_MARGIN,
        }
    }
}
