use txforge_primitives::util::{ByteReader, ByteWriter};
use txforge_script::opcodes::{OP_FALSE, OP_RETURN};
use txforge_script::Script;

use crate::error::TransactionError;

/// One output of a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    pub satoshis: u64,
    pub locking_script: Script,
    /// Marks this output as the builder's change output. Not serialized.
    pub change: bool,
}

impl TransactionOutput {
    pub fn new(satoshis: u64, locking_script: Script) -> Self {
        TransactionOutput {
            satoshis,
            locking_script,
            change: false,
        }
    }

    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let satoshis = reader.read_u64_le()?;
        let script_len = reader.read_varint()? as usize;
        let script_bytes = reader.read_bytes(script_len)?;
        Ok(TransactionOutput {
            satoshis,
            locking_script: Script::from_bytes(script_bytes.to_vec()),
            change: false,
        })
    }

    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u64_le(self.satoshis);
        let bytes = self.locking_script.as_bytes();
        writer.write_varint(bytes.len() as u64);
        writer.write_bytes(bytes);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    pub fn locking_script_hex(&self) -> String {
        self.locking_script.to_hex()
    }

    /// True if this output carries data only and can never be spent.
    pub fn is_null_data(&self) -> bool {
        let bytes = self.locking_script.as_bytes();
        matches!(bytes.first(), Some(&OP_RETURN))
            || (bytes.len() >= 2 && bytes[0] == OP_FALSE && bytes[1] == OP_RETURN)
    }
}
