//! Standard script templates.
//!
//! [`ScriptTemplate`] is a closed classification of locking scripts.
//! Each variant carries the parameters extracted from the script, and
//! the module provides the matching generators for building locking and
//! unlocking scripts from those parameters.

use txforge_primitives::hash::hash160;
use txforge_primitives::PublicKey;

use crate::opcodes::*;
use crate::operand::Operand;
use crate::{Script, ScriptError};

/// Maximum serialized redeem script accepted inside a P2SH unlocking script.
pub const MAX_REDEEM_SCRIPT_SIZE: usize = 520;

/// Maximum payload for a null-data output carrying a single push.
pub const MAX_NULL_DATA_SINGLE_PUSH: usize = 40;

/// Compressed and uncompressed SEC1 public key lengths.
const PUBKEY_LENS: [usize; 2] = [33, 65];

/// A locking script classified into one of the standard output patterns.
///
/// Classification never fails: anything that matches no standard pattern
/// is [`ScriptTemplate::NonStandard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptTemplate {
    /// `<pubkey> OP_CHECKSIG`
    PayToPubkey { pub_key: Vec<u8> },
    /// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
    PayToPubkeyHash { pubkey_hash: [u8; 20] },
    /// `OP_HASH160 <hash> OP_EQUAL`
    PayToScriptHash { script_hash: [u8; 20] },
    /// `<m> <pubkey>... <n> OP_CHECKMULTISIG`
    ///
    /// Embedded keys that fail point validation are collected in
    /// `invalid_pub_keys` instead of failing classification.
    MultiSig {
        required: usize,
        pub_keys: Vec<PublicKey>,
        invalid_pub_keys: Vec<Vec<u8>>,
    },
    /// `OP_RETURN [<data> ...]`
    NullData { data: Vec<Vec<u8>> },
    /// Anything else.
    NonStandard,
}

impl ScriptTemplate {
    /// Classify a locking script.
    ///
    /// Tries each standard pattern with a cheap leading-byte check
    /// before the full structural match, in the order P2SH, P2PKH,
    /// multisig, pay-to-pubkey, null-data.
    pub fn classify(script: &Script) -> ScriptTemplate {
        if script.is_p2sh() {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&script.as_bytes()[2..22]);
            return ScriptTemplate::PayToScriptHash { script_hash: hash };
        }
        if script.is_p2pkh() {
            // is_p2pkh already validated the full 25-byte pattern
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&script.as_bytes()[3..23]);
            return ScriptTemplate::PayToPubkeyHash { pubkey_hash: hash };
        }
        if fast_check_multisig(script) {
            if let Some(template) = check_multisig(script) {
                return template;
            }
        }
        if fast_check_p2pk(script) {
            if let Some(template) = check_p2pk(script) {
                return template;
            }
        }
        if fast_check_null_data(script) {
            if let Some(template) = check_null_data(script) {
                return template;
            }
        }
        ScriptTemplate::NonStandard
    }

    /// Structural check of an unlocking script against this template.
    ///
    /// Validates operand shape only; signatures are verified by the
    /// interpreter, not here.
    pub fn check_sig(&self, script_sig: &Script) -> bool {
        let mut iter = script_sig.operands();
        let ops: Vec<Operand> = iter.by_ref().collect();
        if iter.is_malformed() {
            return false;
        }
        match self {
            ScriptTemplate::PayToPubkey { .. } => ops.len() == 1 && is_signature_push(&ops[0]),
            ScriptTemplate::PayToPubkeyHash { .. } => {
                ops.len() == 2 && is_signature_push(&ops[0]) && is_pubkey_push(&ops[1])
            }
            ScriptTemplate::PayToScriptHash { .. } => {
                // Redeem inputs followed by the serialized redeem script.
                !ops.is_empty()
                    && ops.iter().all(|op| op.is_push())
                    && ops.last().map_or(false, |op| {
                        op.data_len() > 0 && op.data_len() <= MAX_REDEEM_SCRIPT_SIZE
                    })
            }
            ScriptTemplate::MultiSig { required, .. } => {
                // Leading OP_0 consumed by the off-by-one in OP_CHECKMULTISIG.
                ops.len() == required + 1
                    && ops[0].opcode == OP_0
                    && ops[1..].iter().all(is_signature_push)
            }
            ScriptTemplate::NullData { .. } => false,
            ScriptTemplate::NonStandard => false,
        }
    }
}

fn is_signature_push(op: &Operand) -> bool {
    // DER signature plus sighash byte: 9..=73 bytes.
    (9..=73).contains(&op.data_len())
}

fn is_pubkey_push(op: &Operand) -> bool {
    PUBKEY_LENS.contains(&op.data_len())
}

fn fast_check_multisig(script: &Script) -> bool {
    let bytes = script.as_bytes();
    bytes.len() >= 4
        && is_small_int_op(bytes[0])
        && bytes[bytes.len() - 1] == OP_CHECKMULTISIG
}

fn check_multisig(script: &Script) -> Option<ScriptTemplate> {
    let mut iter = script.operands();
    let ops: Vec<Operand> = iter.by_ref().collect();
    if iter.is_malformed() || ops.len() < 4 {
        return None;
    }
    let last = ops.len() - 1;
    if ops[last].opcode != OP_CHECKMULTISIG {
        return None;
    }
    if !is_small_int_op(ops[0].opcode) || !is_small_int_op(ops[last - 1].opcode) {
        return None;
    }
    let required = small_int_value(ops[0].opcode) as usize;
    let total = small_int_value(ops[last - 1].opcode) as usize;

    let key_ops = &ops[1..last - 1];
    if key_ops.len() != total || required > total {
        return None;
    }

    let mut pub_keys = Vec::new();
    let mut invalid_pub_keys = Vec::new();
    for op in key_ops {
        let data = op.data.as_deref()?;
        match PublicKey::from_bytes(data) {
            Ok(key) => pub_keys.push(key),
            Err(_) => invalid_pub_keys.push(data.to_vec()),
        }
    }
    Some(ScriptTemplate::MultiSig {
        required,
        pub_keys,
        invalid_pub_keys,
    })
}

fn fast_check_p2pk(script: &Script) -> bool {
    let bytes = script.as_bytes();
    bytes.len() >= 2
        && PUBKEY_LENS.contains(&(bytes[0] as usize))
        && bytes[bytes.len() - 1] == OP_CHECKSIG
}

fn check_p2pk(script: &Script) -> Option<ScriptTemplate> {
    let mut iter = script.operands();
    let ops: Vec<Operand> = iter.by_ref().collect();
    if iter.is_malformed() || ops.len() != 2 || ops[1].opcode != OP_CHECKSIG {
        return None;
    }
    let key = ops[0].data.as_deref()?;
    if !is_pubkey_push(&ops[0]) {
        return None;
    }
    Some(ScriptTemplate::PayToPubkey {
        pub_key: key.to_vec(),
    })
}

fn fast_check_null_data(script: &Script) -> bool {
    script.as_bytes().first() == Some(&OP_RETURN)
}

fn check_null_data(script: &Script) -> Option<ScriptTemplate> {
    let mut iter = script.operands();
    let ops: Vec<Operand> = iter.by_ref().collect();
    if iter.is_malformed() || ops.first()?.opcode != OP_RETURN {
        return None;
    }
    let mut data = Vec::new();
    for op in &ops[1..] {
        data.push(op.data.clone()?);
    }
    // A lone data element is capped; multi-push payloads are not.
    if data.len() == 1 && data[0].len() > MAX_NULL_DATA_SINGLE_PUSH {
        return None;
    }
    Some(ScriptTemplate::NullData { data })
}

/// Generate a P2PKH locking script for a pubkey hash.
pub fn pay_to_pubkey_hash(pubkey_hash: &[u8; 20]) -> Script {
    let mut script = Script::new();
    script.0.extend_from_slice(&[OP_DUP, OP_HASH160]);
    script.append_push_data(pubkey_hash).ok();
    script.0.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

/// Generate a P2PKH unlocking script: `<sig+type> <pubkey>`.
pub fn unlock_pay_to_pubkey_hash(sig_with_type: &[u8], pub_key: &PublicKey) -> Script {
    let mut script = Script::new();
    script.append_push_data(sig_with_type).ok();
    script.append_push_data(&pub_key.to_compressed()).ok();
    script
}

/// Generate a pay-to-pubkey locking script.
pub fn pay_to_pubkey(pub_key: &PublicKey) -> Script {
    let mut script = Script::new();
    script.append_push_data(&pub_key.to_compressed()).ok();
    script.0.push(OP_CHECKSIG);
    script
}

/// Generate a pay-to-pubkey unlocking script: `<sig+type>`.
pub fn unlock_pay_to_pubkey(sig_with_type: &[u8]) -> Script {
    let mut script = Script::new();
    script.append_push_data(sig_with_type).ok();
    script
}

/// Generate a P2SH locking script committing to a redeem script.
pub fn pay_to_script_hash(redeem: &Script) -> Result<Script, ScriptError> {
    if redeem.len() > MAX_REDEEM_SCRIPT_SIZE {
        return Err(ScriptError::ScriptTooLarge {
            size: redeem.len(),
            limit: MAX_REDEEM_SCRIPT_SIZE,
        });
    }
    let hash = hash160(redeem.as_bytes());
    let mut script = Script::new();
    script.0.push(OP_HASH160);
    script.append_push_data(&hash)?;
    script.0.push(OP_EQUAL);
    Ok(script)
}

/// Generate an m-of-n multisig locking script.
pub fn multisig(required: usize, pub_keys: &[PublicKey]) -> Result<Script, ScriptError> {
    let total = pub_keys.len();
    if required == 0 || required > total || total > 16 {
        return Err(ScriptError::InvalidMultiSigCounts { required, total });
    }
    let mut script = Script::new();
    script.0.push(OP_1 + (required as u8 - 1));
    for key in pub_keys {
        script.append_push_data(&key.to_compressed())?;
    }
    script.0.push(OP_1 + (total as u8 - 1));
    script.0.push(OP_CHECKMULTISIG);
    Ok(script)
}

/// Generate a null-data (OP_RETURN) locking script.
///
/// A single data element is limited to 40 bytes; multi-element payloads
/// are accepted at any push size.
pub fn null_data(parts: &[&[u8]]) -> Result<Script, ScriptError> {
    if parts.len() == 1 && parts[0].len() > MAX_NULL_DATA_SINGLE_PUSH {
        return Err(ScriptError::TemplateDataTooLarge {
            limit: MAX_NULL_DATA_SINGLE_PUSH,
        });
    }
    let mut script = Script::new();
    script.0.push(OP_RETURN);
    for part in parts {
        script.append_push_data(part)?;
    }
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use txforge_primitives::PrivateKey;

    fn test_key() -> PublicKey {
        PrivateKey::from_hex("0000000000000000000000000000000000000000000000000000000000000001")
            .unwrap()
            .pub_key()
    }

    /// Generated P2PKH scripts classify back to P2PKH with the same hash.
    #[test]
    fn test_p2pkh_roundtrip() {
        let hash = [0x42u8; 20];
        let script = pay_to_pubkey_hash(&hash);
        assert_eq!(
            ScriptTemplate::classify(&script),
            ScriptTemplate::PayToPubkeyHash { pubkey_hash: hash }
        );
    }

    /// Generated P2SH scripts classify back with the redeem script hash.
    #[test]
    fn test_p2sh_roundtrip() {
        let mut redeem = Script::new();
        redeem.append_opcodes(&[OP_1]).unwrap();
        let script = pay_to_script_hash(&redeem).unwrap();
        let expected = hash160(redeem.as_bytes());
        assert_eq!(
            ScriptTemplate::classify(&script),
            ScriptTemplate::PayToScriptHash {
                script_hash: expected
            }
        );
    }

    /// Oversized redeem scripts are rejected by the P2SH generator.
    #[test]
    fn test_p2sh_redeem_too_large() {
        let redeem = Script::from_bytes(vec![OP_NOP; MAX_REDEEM_SCRIPT_SIZE + 1]);
        assert!(pay_to_script_hash(&redeem).is_err());
    }

    /// 2-of-3 multisig round-trips through classification.
    #[test]
    fn test_multisig_roundtrip() {
        let keys: Vec<PublicKey> = (1u8..=3)
            .map(|i| {
                let mut bytes = [0u8; 32];
                bytes[31] = i;
                PrivateKey::from_bytes(&bytes).unwrap().pub_key()
            })
            .collect();
        let script = multisig(2, &keys).unwrap();
        match ScriptTemplate::classify(&script) {
            ScriptTemplate::MultiSig {
                required,
                pub_keys,
                invalid_pub_keys,
            } => {
                assert_eq!(required, 2);
                assert_eq!(pub_keys, keys);
                assert!(invalid_pub_keys.is_empty());
            }
            other => panic!("expected multisig, got {:?}", other),
        }
    }

    /// Invalid embedded keys are collected separately, not fatal.
    #[test]
    fn test_multisig_tolerates_invalid_keys() {
        let good = test_key();
        let mut script = Script::new();
        script.0.push(OP_1);
        script.append_push_data(&good.to_compressed()).unwrap();
        // 0x05 is not a valid SEC1 tag byte, so this can never parse as a key.
        script.append_push_data(&[0x05; 33]).unwrap();
        script.0.push(OP_2);
        script.0.push(OP_CHECKMULTISIG);

        match ScriptTemplate::classify(&script) {
            ScriptTemplate::MultiSig {
                required,
                pub_keys,
                invalid_pub_keys,
            } => {
                assert_eq!(required, 1);
                assert_eq!(pub_keys, vec![good]);
                assert_eq!(invalid_pub_keys, vec![vec![0x05; 33]]);
            }
            other => panic!("expected multisig, got {:?}", other),
        }
    }

    /// Mismatched key count or m > n falls through to non-standard.
    #[test]
    fn test_multisig_bad_counts() {
        let key = test_key();
        let mut script = Script::new();
        script.0.push(OP_2);
        script.append_push_data(&key.to_compressed()).unwrap();
        script.0.push(OP_1);
        script.0.push(OP_CHECKMULTISIG);
        assert_eq!(
            ScriptTemplate::classify(&script),
            ScriptTemplate::NonStandard
        );

        assert!(multisig(0, &[key.clone()]).is_err());
        assert!(multisig(2, &[key]).is_err());
    }

    /// Pay-to-pubkey round-trips through classification.
    #[test]
    fn test_p2pk_roundtrip() {
        let key = test_key();
        let script = pay_to_pubkey(&key);
        assert_eq!(
            ScriptTemplate::classify(&script),
            ScriptTemplate::PayToPubkey {
                pub_key: key.to_compressed().to_vec()
            }
        );
    }

    /// Null-data classification: single push capped at 40 bytes,
    /// multi-push payloads uncapped.
    #[test]
    fn test_null_data() {
        let script = null_data(&[b"hello"]).unwrap();
        assert_eq!(
            ScriptTemplate::classify(&script),
            ScriptTemplate::NullData {
                data: vec![b"hello".to_vec()]
            }
        );

        assert!(null_data(&[&[0u8; 41]]).is_err());

        let big = [0u8; 41];
        let script = null_data(&[b"a", &big]).unwrap();
        match ScriptTemplate::classify(&script) {
            ScriptTemplate::NullData { data } => assert_eq!(data.len(), 2),
            other => panic!("expected null data, got {:?}", other),
        }

        // Bare OP_RETURN carries no data.
        let bare = Script::from_bytes(vec![OP_RETURN]);
        assert_eq!(
            ScriptTemplate::classify(&bare),
            ScriptTemplate::NullData { data: vec![] }
        );
    }

    /// A 41-byte single push classifies as non-standard.
    #[test]
    fn test_null_data_oversized_single_push() {
        let mut script = Script::new();
        script.0.push(OP_RETURN);
        script.append_push_data(&[0u8; 41]).unwrap();
        assert_eq!(
            ScriptTemplate::classify(&script),
            ScriptTemplate::NonStandard
        );
    }

    /// Unlocking script shape checks per template.
    #[test]
    fn test_check_sig_shapes() {
        let key = test_key();
        let lock = ScriptTemplate::classify(&pay_to_pubkey_hash(&key.hash160()));

        let unlock = unlock_pay_to_pubkey_hash(&[0u8; 71], &key);
        assert!(lock.check_sig(&unlock));

        // Missing pubkey push
        let partial = unlock_pay_to_pubkey(&[0u8; 71]);
        assert!(!lock.check_sig(&partial));

        let p2pk = ScriptTemplate::classify(&pay_to_pubkey(&key));
        assert!(p2pk.check_sig(&partial));
        assert!(!p2pk.check_sig(&unlock));
    }

    /// Arbitrary scripts classify as non-standard.
    #[test]
    fn test_non_standard() {
        let script = Script::from_bytes(vec![OP_ADD, OP_NOP]);
        assert_eq!(
            ScriptTemplate::classify(&script),
            ScriptTemplate::NonStandard
        );
        assert_eq!(
            ScriptTemplate::classify(&Script::new()),
            ScriptTemplate::NonStandard
        );
    }
}
