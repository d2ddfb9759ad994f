//! Signature checker backing the script interpreter for one input.

use txforge_primitives::ec::{PublicKey, Signature};
use txforge_script::interpreter::{
    InterpreterError, InterpreterErrorCode, ScriptFlags, SignatureChecker,
};
use txforge_script::Script;

use crate::sighash;
use crate::transaction::Transaction;

/// Verifies signatures against the signature hash for one input of one
/// transaction.
pub struct TransactionSignatureChecker<'a> {
    tx: &'a Transaction,
    input_index: u32,
    satoshis: u64,
}

impl<'a> TransactionSignatureChecker<'a> {
    pub fn new(tx: &'a Transaction, input_index: u32, satoshis: u64) -> Self {
        TransactionSignatureChecker {
            tx,
            input_index,
            satoshis,
        }
    }
}

impl SignatureChecker for TransactionSignatureChecker<'_> {
    fn check_signature(
        &self,
        sig_with_type: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        flags: ScriptFlags,
    ) -> Result<bool, InterpreterError> {
        if sig_with_type.is_empty() {
            return Ok(false);
        }
        let (der, type_byte) = sig_with_type.split_at(sig_with_type.len() - 1);
        let sighash_type = type_byte[0] as u32;

        let signature = match Signature::from_der(der) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        let public_key = match PublicKey::from_bytes(pub_key) {
            Ok(pk) => pk,
            Err(_) => return Ok(false),
        };

        let digest = sighash::signature_hash(
            self.tx,
            self.input_index,
            sub_script,
            sighash_type,
            self.satoshis,
            flags,
        )
        .map_err(|e| InterpreterError::new(InterpreterErrorCode::Internal, e.to_string()))?;

        Ok(signature.verify(&digest, &public_key))
    }

    fn lock_time(&self) -> u32 {
        self.tx.lock_time
    }

    fn tx_version(&self) -> u32 {
        self.tx.version as u32
    }

    fn sequence(&self) -> u32 {
        self.tx
            .inputs
            .get(self.input_index as usize)
            .map(|i| i.sequence_number)
            .unwrap_or(0)
    }
}
