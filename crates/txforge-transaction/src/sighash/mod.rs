//! Signature-hash computation.
//!
//! Two digest algorithms exist. The legacy algorithm serializes a modified
//! copy of the transaction. The fork-id algorithm hashes a fixed-layout
//! preimage that commits to the value being spent; it is used when the
//! sighash type carries [`SIGHASH_FORKID`] and the interpreter flags enable
//! it.

use txforge_primitives::hash::sha256d;
use txforge_primitives::util::ByteWriter;
use txforge_script::interpreter::ScriptFlags;
use txforge_script::opcodes::OP_CODESEPARATOR;
use txforge_script::Script;

use crate::error::TransactionError;
use crate::transaction::Transaction;

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_NONE: u32 = 0x02;
pub const SIGHASH_SINGLE: u32 = 0x03;
pub const SIGHASH_FORKID: u32 = 0x40;
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

/// Masks off the modifier bits, leaving the base type.
pub const SIGHASH_MASK: u32 = 0x1f;

/// Digest returned by the legacy algorithm when SIGHASH_SINGLE refers to an
/// output that does not exist. Historical behavior, preserved exactly.
const SINGLE_OUT_OF_RANGE_DIGEST: [u8; 32] = {
    let mut d = [0u8; 32];
    d[31] = 1;
    d
};

/// Compute the digest an input signature commits to.
///
/// `sub_script` is the locking script of the output being spent (or the
/// portion after the last OP_CODESEPARATOR executed). `satoshis` is the value
/// of that output; the legacy algorithm ignores it.
pub fn signature_hash(
    tx: &Transaction,
    input_index: u32,
    sub_script: &Script,
    sighash_type: u32,
    satoshis: u64,
    flags: ScriptFlags,
) -> Result<[u8; 32], TransactionError> {
    if input_index as usize >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range for {} inputs",
            input_index,
            tx.inputs.len()
        )));
    }

    if sighash_type & SIGHASH_FORKID != 0 && flags.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID) {
        let preimage = calc_preimage(tx, input_index, sub_script, sighash_type, satoshis)?;
        Ok(sha256d(&preimage))
    } else {
        legacy_signature_hash(tx, input_index, sub_script, sighash_type)
    }
}

/// Legacy digest: serialize a blanked copy of the transaction with the
/// subscript spliced into the signed input, then append the sighash type.
fn legacy_signature_hash(
    tx: &Transaction,
    input_index: u32,
    sub_script: &Script,
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    let base_type = sighash_type & SIGHASH_MASK;

    if base_type == SIGHASH_SINGLE && input_index as usize >= tx.outputs.len() {
        return Ok(SINGLE_OUT_OF_RANGE_DIGEST);
    }

    let mut tx_copy = tx.clone();
    let sub_script = strip_code_separators(sub_script);

    for (i, input) in tx_copy.inputs.iter_mut().enumerate() {
        if i == input_index as usize {
            input.unlocking_script = Some(sub_script.clone());
        } else {
            input.unlocking_script = None;
        }
    }

    match base_type {
        SIGHASH_NONE => {
            tx_copy.outputs.clear();
            for (i, input) in tx_copy.inputs.iter_mut().enumerate() {
                if i != input_index as usize {
                    input.sequence_number = 0;
                }
            }
        }
        SIGHASH_SINGLE => {
            tx_copy.outputs.truncate(input_index as usize + 1);
            for output in tx_copy.outputs.iter_mut().take(input_index as usize) {
                output.satoshis = u64::MAX;
                output.locking_script = Script::new();
            }
            for (i, input) in tx_copy.inputs.iter_mut().enumerate() {
                if i != input_index as usize {
                    input.sequence_number = 0;
                }
            }
        }
        _ => {}
    }

    if sighash_type & SIGHASH_ANYONECANPAY != 0 {
        let signed = tx_copy.inputs.swap_remove(input_index as usize);
        tx_copy.inputs = vec![signed];
    }

    let mut writer = ByteWriter::new();
    tx_copy.write_to(&mut writer);
    writer.write_u32_le(sighash_type);
    Ok(sha256d(writer.as_bytes()))
}

/// Fork-id preimage layout: version, prevouts hash, sequence hash, outpoint,
/// subscript, value, sequence, outputs hash, locktime, sighash type.
pub fn calc_preimage(
    tx: &Transaction,
    input_index: u32,
    sub_script: &Script,
    sighash_type: u32,
    satoshis: u64,
) -> Result<Vec<u8>, TransactionError> {
    let input = tx.inputs.get(input_index as usize).ok_or_else(|| {
        TransactionError::InvalidTransaction(format!("input {input_index} out of range"))
    })?;

    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    let prevouts_hash = if anyone_can_pay {
        [0u8; 32]
    } else {
        source_out_hash(tx)
    };

    let sequence_hash_value =
        if anyone_can_pay || base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE {
            [0u8; 32]
        } else {
            sequence_hash(tx)
        };

    let outputs_hash_value = if base_type == SIGHASH_SINGLE {
        if (input_index as usize) < tx.outputs.len() {
            outputs_hash(tx, input_index as i64)
        } else {
            [0u8; 32]
        }
    } else if base_type == SIGHASH_NONE {
        [0u8; 32]
    } else {
        outputs_hash(tx, -1)
    };

    let script_bytes = sub_script.as_bytes();

    let mut writer = ByteWriter::new();
    writer.write_u32_le(tx.version as u32);
    writer.write_bytes(&prevouts_hash);
    writer.write_bytes(&sequence_hash_value);
    writer.write_bytes(&input.source_txid);
    writer.write_u32_le(input.source_tx_out_index);
    writer.write_varint(script_bytes.len() as u64);
    writer.write_bytes(script_bytes);
    writer.write_u64_le(satoshis);
    writer.write_u32_le(input.sequence_number);
    writer.write_bytes(&outputs_hash_value);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);
    Ok(writer.into_bytes())
}

fn strip_code_separators(script: &Script) -> Script {
    if !script.as_bytes().contains(&OP_CODESEPARATOR) {
        return script.clone();
    }
    let mut out = Vec::with_capacity(script.len());
    for operand in script.operands() {
        if operand.opcode != OP_CODESEPARATOR {
            out.extend_from_slice(&operand.to_bytes());
        }
    }
    Script::from_bytes(out)
}

/// Double hash of every input outpoint.
fn source_out_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::new();
    for input in &tx.inputs {
        writer.write_bytes(&input.source_txid);
        writer.write_u32_le(input.source_tx_out_index);
    }
    sha256d(writer.as_bytes())
}

/// Double hash of every input sequence number.
fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::new();
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence_number);
    }
    sha256d(writer.as_bytes())
}

/// Double hash of the serialized outputs; `n` of -1 covers all of them,
/// otherwise just output `n`.
fn outputs_hash(tx: &Transaction, n: i64) -> [u8; 32] {
    let mut writer = ByteWriter::new();
    if n < 0 {
        for output in &tx.outputs {
            output.write_to(&mut writer);
        }
    } else {
        tx.outputs[n as usize].write_to(&mut writer);
    }
    sha256d(writer.as_bytes())
}
