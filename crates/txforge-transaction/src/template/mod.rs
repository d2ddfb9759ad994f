//! Unlocking-script templates used at signing time.

pub mod p2pkh;

pub use p2pkh::{P2PKH, P2PKH_UNLOCK_SIZE_ESTIMATE};

use txforge_script::Script;

use crate::error::TransactionError;
use crate::transaction::Transaction;

/// Produces the unlocking script for one input, and an up-front size
/// estimate the fee calculation can use before the signature exists.
pub trait UnlockingScriptTemplate {
    fn sign(&self, tx: &Transaction, input_index: u32) -> Result<Script, TransactionError>;

    /// Upper-bound length in bytes of the unlocking script `sign` will
    /// produce.
    fn estimate_length(&self, tx: &Transaction, input_index: u32) -> u32;
}
