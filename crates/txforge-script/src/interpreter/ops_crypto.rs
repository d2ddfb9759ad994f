//! Hashing and signature-checking opcodes, plus the strict encoding
//! checks the verification flags can demand of signatures and keys.

use num_bigint::{BigInt, Sign};

use txforge_primitives::hash::{hash160, ripemd160, sha256, sha256d};

use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::*;
use super::thread::Thread;
use crate::opcodes::OP_CODESEPARATOR;

/// Sighash flag bits as they appear in the trailing signature byte.
const SIGHASH_FORKID_BIT: u32 = 0x40;
const SIGHASH_ANYONECANPAY_BIT: u32 = 0x80;

/// Half the secp256k1 group order; any S above this has a canonical twin.
const HALF_ORDER_HEX: &[u8] =
    b"7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0";

pub(crate) enum HashType {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

fn sha1_digest(buf: &[u8]) -> Vec<u8> {
    use sha1::{Digest, Sha1};
    Sha1::digest(buf).to_vec()
}

impl<'a> Thread<'a> {
    pub(crate) fn op_hash(&mut self, hash_type: HashType) -> Result<(), InterpreterError> {
        let buf = self.dstack.pop_byte_array()?;
        let digest = match hash_type {
            HashType::Ripemd160 => ripemd160(&buf).to_vec(),
            HashType::Sha1 => sha1_digest(&buf),
            HashType::Sha256 => sha256(&buf).to_vec(),
            HashType::Hash160 => hash160(&buf).to_vec(),
            HashType::Hash256 => sha256d(&buf).to_vec(),
        };
        self.dstack.push_byte_array(digest);
        Ok(())
    }

    /// The currently executing script from just past the most recent
    /// OP_CODESEPARATOR, or the whole script when none has run.
    pub(crate) fn sub_script(&self) -> ParsedScript {
        let start = match self.last_code_sep {
            0 => 0,
            sep => sep + 1,
        };
        self.scripts[self.script_idx][start..].to_vec()
    }

    fn require_checker(&self) -> Result<&'a dyn super::SignatureChecker, InterpreterError> {
        self.checker.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "no signature checker for checksig".to_string(),
            )
        })
    }

    pub(crate) fn op_checksig(&mut self) -> Result<(), InterpreterError> {
        let pk_bytes = self.dstack.pop_byte_array()?;
        let full_sig = self.dstack.pop_byte_array()?;

        if full_sig.is_empty() {
            self.dstack.push_bool(false);
            return Ok(());
        }
        let checker = self.require_checker()?;

        // Non-empty was checked above, so the hash-type byte exists.
        let shf = full_sig[full_sig.len() - 1] as u32;
        let der_sig = &full_sig[..full_sig.len() - 1];
        self.check_hash_type_encoding(shf)?;
        self.check_signature_encoding(der_sig)?;
        self.check_pub_key_encoding(&pk_bytes)?;

        // Legacy sighashes blank the signature and any code separators
        // out of the script being committed to.
        let mut sub = self.sub_script();
        let forkid_active =
            self.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID) && shf & SIGHASH_FORKID_BIT != 0;
        if !forkid_active {
            sub = remove_opcode_by_data(&sub, &full_sig);
            sub = remove_opcode(&sub, OP_CODESEPARATOR);
        }
        let sub_script = unparse(&sub);

        match checker.check_signature(&full_sig, &pk_bytes, &sub_script, self.flags) {
            Ok(valid) => {
                if !valid && self.has_flag(ScriptFlags::VERIFY_NULL_FAIL) && !der_sig.is_empty() {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::NullFail,
                        "signature not empty on failed checksig".to_string(),
                    ));
                }
                self.dstack.push_bool(valid);
            }
            // A checker that cannot parse the material reports failure
            // through the stack, not as a script error.
            Err(_) => self.dstack.push_bool(false),
        }
        Ok(())
    }

    pub(crate) fn op_checksigverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_checksig()?;
        self.abstract_verify(pop, InterpreterErrorCode::CheckSigVerify)
    }

    pub(crate) fn op_checkmultisig(&mut self) -> Result<(), InterpreterError> {
        let key_count = self.dstack.pop_int()?.to_int() as i32;
        if key_count < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!("number of pubkeys {} is negative", key_count),
            ));
        }
        if key_count as usize > self.cfg.max_pub_keys_per_multisig {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!(
                    "too many pubkeys: {} > {}",
                    key_count, self.cfg.max_pub_keys_per_multisig
                ),
            ));
        }

        // Each key counts against the operation budget.
        self.num_ops += key_count as usize;
        if self.num_ops > self.cfg.max_ops {
            return Err(InterpreterError::new(
                InterpreterErrorCode::TooManyOperations,
                format!("exceeded max operation limit of {}", self.cfg.max_ops),
            ));
        }

        let mut pub_keys = Vec::with_capacity(key_count as usize);
        for _ in 0..key_count {
            pub_keys.push(self.dstack.pop_byte_array()?);
        }

        let sig_count = self.dstack.pop_int()?.to_int() as i32;
        if sig_count < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!("number of signatures {} is negative", sig_count),
            ));
        }
        if sig_count > key_count {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!("more signatures than pubkeys: {} > {}", sig_count, key_count),
            ));
        }

        let mut signatures: Vec<Vec<u8>> = Vec::with_capacity(sig_count as usize);
        for _ in 0..sig_count {
            signatures.push(self.dstack.pop_byte_array()?);
        }

        // The historical off-by-one consumes one extra element.
        let dummy = self.dstack.pop_byte_array()?;
        if self.has_flag(ScriptFlags::STRICT_MULTI_SIG) && !dummy.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigNullDummy,
                format!(
                    "multisig dummy argument has length {} instead of 0",
                    dummy.len()
                ),
            ));
        }

        let mut sub = self.sub_script();
        for sig in &signatures {
            sub = remove_opcode_by_data(&sub, sig);
            sub = remove_opcode(&sub, OP_CODESEPARATOR);
        }

        let checker = match self.checker {
            Some(c) => c,
            None => {
                self.dstack.push_bool(false);
                return Ok(());
            }
        };
        let sub_script = unparse(&sub);

        // Signatures must appear in key order, so a single forward scan
        // over the keys suffices.
        let mut success = true;
        let mut sig_idx: usize = 0;
        let mut key_idx: usize = 0;
        while sig_idx < signatures.len() {
            let sigs_left = signatures.len() - sig_idx;
            let keys_left = pub_keys.len() - key_idx;
            if sigs_left > keys_left {
                success = false;
                break;
            }

            let sig = &signatures[sig_idx];
            let pub_key = &pub_keys[key_idx];
            key_idx += 1;

            if sig.is_empty() {
                continue;
            }
            let shf = *sig.last().unwrap() as u32;
            self.check_hash_type_encoding(shf)?;
            self.check_signature_encoding(&sig[..sig.len() - 1])?;
            self.check_pub_key_encoding(pub_key)?;

            if let Ok(true) = checker.check_signature(sig, pub_key, &sub_script, self.flags) {
                sig_idx += 1;
            }
        }

        if !success
            && self.has_flag(ScriptFlags::VERIFY_NULL_FAIL)
            && signatures.iter().any(|sig| !sig.is_empty())
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "not all signatures empty on failed checkmultisig".to_string(),
            ));
        }

        self.dstack.push_bool(success);
        Ok(())
    }

    pub(crate) fn op_checkmultisigverify(
        &mut self,
        pop: &ParsedOpcode,
    ) -> Result<(), InterpreterError> {
        self.op_checkmultisig()?;
        self.abstract_verify(pop, InterpreterErrorCode::CheckMultiSigVerify)
    }

    /// Under VERIFY_STRICT_ENCODING the trailing hash-type byte must
    /// name a base type of ALL, NONE, or SINGLE, and its fork-id bit
    /// must agree with the ENABLE_SIGHASH_FORKID flag.
    pub(crate) fn check_hash_type_encoding(&self, shf: u32) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_STRICT_ENCODING) {
            return Ok(());
        }

        let without_anyonecanpay = shf & !SIGHASH_ANYONECANPAY_BIT;
        let base = without_anyonecanpay & !SIGHASH_FORKID_BIT;
        if !(1..=3).contains(&base) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSigHashType,
                format!("invalid hash type 0x{:x}", shf),
            ));
        }

        let has_forkid_bit = without_anyonecanpay & SIGHASH_FORKID_BIT != 0;
        if has_forkid_bit != self.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::IllegalForkID,
                if has_forkid_bit {
                    "fork id sighash set without flag".to_string()
                } else {
                    "fork id sighash not set with flag".to_string()
                },
            ));
        }
        Ok(())
    }

    /// Under VERIFY_STRICT_ENCODING keys must be well-formed SEC1:
    /// 33 bytes starting 0x02/0x03, or 65 bytes starting 0x04.
    pub(crate) fn check_pub_key_encoding(&self, pub_key: &[u8]) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_STRICT_ENCODING) {
            return Ok(());
        }
        let well_formed = match pub_key.first() {
            Some(0x02) | Some(0x03) => pub_key.len() == 33,
            Some(0x04) => pub_key.len() == 65,
            _ => false,
        };
        if !well_formed {
            return Err(InterpreterError::new(
                InterpreterErrorCode::PubKeyType,
                "unsupported public key type".to_string(),
            ));
        }
        Ok(())
    }

    /// Strict-DER validation of a signature without its hash-type byte.
    ///
    /// Applies when any of the DER, low-S, or strict-encoding flags is
    /// set; the empty signature is always acceptable here since a
    /// failed check against it is handled by the opcode itself.
    pub(crate) fn check_signature_encoding(&self, sig: &[u8]) -> Result<(), InterpreterError> {
        if !self.has_any(&[
            ScriptFlags::VERIFY_DER_SIGNATURES,
            ScriptFlags::VERIFY_LOW_S,
            ScriptFlags::VERIFY_STRICT_ENCODING,
        ]) || sig.is_empty()
        {
            return Ok(());
        }

        let fail = |code, description: String| Err(InterpreterError::new(code, description));

        // Layout: 0x30 <total> 0x02 <rlen> R 0x02 <slen> S
        if sig.len() < 8 {
            return fail(
                InterpreterErrorCode::SigTooShort,
                format!("malformed signature: too short: {} < 8", sig.len()),
            );
        }
        if sig.len() > 72 {
            return fail(
                InterpreterErrorCode::SigTooLong,
                format!("malformed signature: too long: {} > 72", sig.len()),
            );
        }
        if sig[0] != 0x30 {
            return fail(
                InterpreterErrorCode::SigInvalidSeqID,
                format!("malformed signature: format has wrong type: {:#x}", sig[0]),
            );
        }
        if sig[1] as usize != sig.len() - 2 {
            return fail(
                InterpreterErrorCode::SigInvalidDataLen,
                format!(
                    "malformed signature: bad length: {} != {}",
                    sig[1],
                    sig.len() - 2
                ),
            );
        }

        let r_len = sig[3] as usize;
        let s_marker = 4 + r_len;
        if s_marker >= sig.len() {
            return fail(
                InterpreterErrorCode::SigMissingSTypeID,
                "malformed signature: S type indicator missing".to_string(),
            );
        }
        if s_marker + 1 >= sig.len() {
            return fail(
                InterpreterErrorCode::SigMissingSLen,
                "malformed signature: S length missing".to_string(),
            );
        }
        let s_len = sig[s_marker + 1] as usize;
        let s_start = s_marker + 2;
        if s_start + s_len != sig.len() {
            return fail(
                InterpreterErrorCode::SigInvalidSLen,
                "malformed signature: invalid S length".to_string(),
            );
        }

        if sig[2] != 0x02 {
            return fail(
                InterpreterErrorCode::SigInvalidRIntID,
                format!("malformed signature: R integer marker: {:#x} != 0x02", sig[2]),
            );
        }
        if r_len == 0 {
            return fail(
                InterpreterErrorCode::SigZeroRLen,
                "malformed signature: R length is zero".to_string(),
            );
        }
        if sig[4] & 0x80 != 0 {
            return fail(
                InterpreterErrorCode::SigNegativeR,
                "malformed signature: R is negative".to_string(),
            );
        }
        if r_len > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
            return fail(
                InterpreterErrorCode::SigTooMuchRPadding,
                "malformed signature: R value has too much padding".to_string(),
            );
        }

        if sig[s_marker] != 0x02 {
            return fail(
                InterpreterErrorCode::SigInvalidSIntID,
                format!(
                    "malformed signature: S integer marker: {:#x} != 0x02",
                    sig[s_marker]
                ),
            );
        }
        if s_len == 0 {
            return fail(
                InterpreterErrorCode::SigZeroSLen,
                "malformed signature: S length is zero".to_string(),
            );
        }
        if sig[s_start] & 0x80 != 0 {
            return fail(
                InterpreterErrorCode::SigNegativeS,
                "malformed signature: S is negative".to_string(),
            );
        }
        if s_len > 1 && sig[s_start] == 0x00 && sig[s_start + 1] & 0x80 == 0 {
            return fail(
                InterpreterErrorCode::SigTooMuchSPadding,
                "malformed signature: S value has too much padding".to_string(),
            );
        }

        if self.has_flag(ScriptFlags::VERIFY_LOW_S) {
            let half_order = BigInt::parse_bytes(HALF_ORDER_HEX, 16)
                .ok_or_else(|| {
                    InterpreterError::new(
                        InterpreterErrorCode::Internal,
                        "half order constant failed to parse".to_string(),
                    )
                })?;
            let s = BigInt::from_bytes_be(Sign::Plus, &sig[s_start..s_start + s_len]);
            if s > half_order {
                return fail(
                    InterpreterErrorCode::SigHighS,
                    "signature is not canonical due to unnecessarily high S value".to_string(),
                );
            }
        }

        Ok(())
    }
}
