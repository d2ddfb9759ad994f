use std::fmt;

use txforge_primitives::chainhash::Hash;
use txforge_primitives::hash::sha256d;
use txforge_primitives::util::{ByteReader, ByteWriter, VarInt};
use txforge_script::interpreter::ScriptFlags;
use txforge_script::Script;

use crate::error::TransactionError;
use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::sighash;

pub const DEFAULT_TX_VERSION: i32 = 1;

/// A transaction: version, inputs, outputs, and lock time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    pub fn new() -> Self {
        Transaction {
            version: DEFAULT_TX_VERSION,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::SerializationError(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a full serialized transaction. Trailing bytes are an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if !reader.is_empty() {
            return Err(TransactionError::SerializationError(format!(
                "{} trailing bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le()? as i32;

        let input_count = reader.read_varint()? as usize;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(TransactionInput::read_from(reader)?);
        }

        let output_count = reader.read_varint()? as usize;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            outputs.push(TransactionOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le()?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u32_le(self.version as u32);
        writer.write_varint(self.inputs.len() as u64);
        for input in &self.inputs {
            input.write_to(writer);
        }
        writer.write_varint(self.outputs.len() as u64);
        for output in &self.outputs {
            output.write_to(writer);
        }
        writer.write_u32_le(self.lock_time);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(self.size());
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    fn script_field_size(script: Option<&Script>) -> usize {
        let len = script.map_or(0, |s| s.len());
        VarInt(len as u64).length() + len
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Double-SHA256 of the serialized transaction, internal byte order.
    pub fn tx_id(&self) -> [u8; 32] {
        sha256d(&self.to_bytes())
    }

    /// Txid in the conventional reversed hex display order.
    pub fn tx_id_hex(&self) -> String {
        let mut id = self.tx_id();
        id.reverse();
        hex::encode(id)
    }

    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    /// Add an input spending `vout` of the transaction with the given
    /// display-order txid, attaching the source output for later signing.
    pub fn add_input_from(
        &mut self,
        prev_tx_id: &str,
        vout: u32,
        prev_locking_script_hex: &str,
        satoshis: u64,
    ) -> Result<(), TransactionError> {
        let hash = Hash::from_hex(prev_tx_id)?;
        let mut txid = [0u8; 32];
        txid.copy_from_slice(hash.as_bytes());

        let mut input = TransactionInput::new(txid, vout);
        let locking_script = Script::from_hex(prev_locking_script_hex)?;
        input.set_source_output(TransactionOutput::new(satoshis, locking_script));
        self.inputs.push(input);
        Ok(())
    }

    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn total_output_satoshis(&self) -> u64 {
        self.outputs.iter().map(|o| o.satoshis).sum()
    }

    /// Sum of the attached source-output values, if every input has one.
    pub fn total_input_satoshis(&self) -> Option<u64> {
        self.inputs
            .iter()
            .map(|i| i.source_tx_satoshis())
            .sum::<Option<u64>>()
    }

    /// The fee this transaction pays, if input values are known. Coinbase
    /// transactions mint rather than spend, so their fee is zero.
    pub fn fee(&self) -> Option<u64> {
        if self.is_coinbase() {
            return Some(0);
        }
        let total_in = self.total_input_satoshis()?;
        total_in.checked_sub(self.total_output_satoshis())
    }

    /// A coinbase transaction has exactly one input spending the null
    /// outpoint: all-zero txid and the maximum output index.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].outpoint().is_null()
    }

    /// Serialized size in bytes, computed without serializing.
    pub fn size(&self) -> usize {
        let mut size = 4 + 4;
        size += VarInt(self.inputs.len() as u64).length();
        for input in &self.inputs {
            size += 32 + 4 + 4 + Self::script_field_size(input.unlocking_script.as_ref());
        }
        size += VarInt(self.outputs.len() as u64).length();
        for output in &self.outputs {
            size += 8 + Self::script_field_size(Some(&output.locking_script));
        }
        size
    }

    /// Signature hash for one input, using the source output attached to it.
    pub fn calc_input_signature_hash(
        &self,
        input_index: u32,
        sighash_type: u32,
        flags: ScriptFlags,
    ) -> Result<[u8; 32], TransactionError> {
        let input = self.inputs.get(input_index as usize).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!("input {input_index} out of range"))
        })?;
        let sub_script = input.source_tx_script().ok_or_else(|| {
            TransactionError::SigningError(format!(
                "input {input_index} has no source output attached"
            ))
        })?;
        let satoshis = input.source_tx_satoshis().ok_or_else(|| {
            TransactionError::SigningError(format!(
                "input {input_index} has no source value attached"
            ))
        })?;
        let sub_script = sub_script.clone();
        sighash::signature_hash(self, input_index, &sub_script, sighash_type, satoshis, flags)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
