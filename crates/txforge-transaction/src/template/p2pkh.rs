//! Pay-to-public-key-hash locking and unlocking.

use txforge_primitives::ec::PrivateKey;
use txforge_script::interpreter::ScriptFlags;
use txforge_script::{template, Address, Script};

use crate::error::TransactionError;
use crate::sighash::SIGHASH_ALL_FORKID;
use crate::template::UnlockingScriptTemplate;
use crate::transaction::Transaction;

/// Worst-case unlocking script size: a pushed 72-byte DER signature plus
/// sighash byte, then a pushed 33-byte compressed public key.
pub const P2PKH_UNLOCK_SIZE_ESTIMATE: u32 = 107;

/// Unlocking template for P2PKH outputs.
pub struct P2PKH {
    private_key: PrivateKey,
    sighash_type: u32,
}

impl P2PKH {
    /// The standard locking script paying to `address`.
    pub fn lock(address: &Address) -> Script {
        template::pay_to_pubkey_hash(&address.public_key_hash())
    }

    /// An unlocking template signing with `private_key`. The sighash type
    /// defaults to ALL with the fork-id modifier.
    pub fn unlock(private_key: PrivateKey, sighash_type: Option<u32>) -> Self {
        P2PKH {
            private_key,
            sighash_type: sighash_type.unwrap_or(SIGHASH_ALL_FORKID),
        }
    }
}

impl UnlockingScriptTemplate for P2PKH {
    fn sign(&self, tx: &Transaction, input_index: u32) -> Result<Script, TransactionError> {
        let digest = tx.calc_input_signature_hash(
            input_index,
            self.sighash_type,
            ScriptFlags::ENABLE_SIGHASH_FORKID,
        )?;
        let signature = self
            .private_key
            .sign(&digest)
            .map_err(|e| TransactionError::SigningError(e.to_string()))?;
        let sig_with_type = signature.to_tx_format(self.sighash_type as u8);
        let pub_key = self.private_key.pub_key();
        Ok(template::unlock_pay_to_pubkey_hash(&sig_with_type, &pub_key))
    }

    fn estimate_length(&self, _tx: &Transaction, _input_index: u32) -> u32 {
        P2PKH_UNLOCK_SIZE_ESTIMATE
    }
}
