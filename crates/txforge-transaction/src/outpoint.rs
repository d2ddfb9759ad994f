//! Outpoints and unspent outputs.

use std::fmt;

use txforge_primitives::chainhash::Hash;
use txforge_script::Script;

use crate::error::TransactionError;

/// The input index used by coinbase transactions.
pub const COINBASE_INDEX: u32 = 0xFFFF_FFFF;

/// A reference to a specific output of a prior transaction.
///
/// The txid is held in internal byte order, as it appears on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: [u8; 32],
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: [u8; 32], index: u32) -> Self {
        OutPoint { txid, index }
    }

    /// Parse a display-order (reversed) txid hex string.
    pub fn from_hex(txid_hex: &str, index: u32) -> Result<Self, TransactionError> {
        let hash = Hash::from_hex(txid_hex)
            .map_err(|_| TransactionError::InvalidTransaction("invalid txid hex".to_string()))?;
        let mut txid = [0u8; 32];
        txid.copy_from_slice(hash.as_bytes());
        Ok(OutPoint { txid, index })
    }

    /// The null outpoint used by coinbase inputs: all-zero txid and the
    /// maximum index.
    pub fn null() -> Self {
        OutPoint {
            txid: [0u8; 32],
            index: COINBASE_INDEX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.index == COINBASE_INDEX && self.txid.iter().all(|&b| b == 0)
    }

    /// The txid in display order (reversed hex).
    pub fn txid_hex(&self) -> String {
        let mut reversed = self.txid;
        reversed.reverse();
        hex::encode(reversed)
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid_hex(), self.index)
    }
}

/// An unspent output: where it lives, how much it holds, and the locking
/// script that guards it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub satoshis: u64,
    pub locking_script: Script,
}

impl Utxo {
    pub fn new(outpoint: OutPoint, satoshis: u64, locking_script: Script) -> Self {
        Utxo {
            outpoint,
            satoshis,
            locking_script,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_outpoint() {
        let op = OutPoint::null();
        assert!(op.is_null());
        assert_eq!(op.index, COINBASE_INDEX);

        let other = OutPoint::new([1u8; 32], COINBASE_INDEX);
        assert!(!other.is_null());
    }

    #[test]
    fn test_from_hex_reverses_to_internal_order() {
        let display = "45be95d4f1af49c07e39d39a4fdecb1ad2a9b4c865b877a886b9e0571382fb96";
        let op = OutPoint::from_hex(display, 3).unwrap();
        assert_eq!(op.txid_hex(), display);
        // Internal order starts with the last display byte.
        assert_eq!(op.txid[0], 0x96);
    }
}
