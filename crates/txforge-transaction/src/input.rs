use txforge_primitives::util::{ByteReader, ByteWriter};
use txforge_script::Script;

use crate::error::TransactionError;
use crate::outpoint::OutPoint;
use crate::output::TransactionOutput;
use crate::transaction::Transaction;

/// Final sequence number, which disables locktime for this input.
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// One input of a transaction.
///
/// The source output can be attached in two ways: a full copy of the source
/// transaction, or just the output being spent. The latter is what a builder
/// working from a UTXO set has available.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    /// Txid of the transaction being spent, internal byte order.
    pub source_txid: [u8; 32],
    /// Index of the output being spent.
    pub source_tx_out_index: u32,
    pub sequence_number: u32,
    pub unlocking_script: Option<Script>,
    pub source_transaction: Option<Box<Transaction>>,
    source_output: Option<TransactionOutput>,
}

impl TransactionInput {
    pub fn new(source_txid: [u8; 32], source_tx_out_index: u32) -> Self {
        TransactionInput {
            source_txid,
            source_tx_out_index,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            unlocking_script: None,
            source_transaction: None,
            source_output: None,
        }
    }

    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let txid_bytes = reader.read_bytes(32)?;
        let mut source_txid = [0u8; 32];
        source_txid.copy_from_slice(txid_bytes);

        let source_tx_out_index = reader.read_u32_le()?;
        let script_len = reader.read_varint()? as usize;
        let script_bytes = reader.read_bytes(script_len)?;
        let unlocking_script = Some(Script::from_bytes(script_bytes.to_vec()));
        let sequence_number = reader.read_u32_le()?;

        Ok(TransactionInput {
            source_txid,
            source_tx_out_index,
            sequence_number,
            unlocking_script,
            source_transaction: None,
            source_output: None,
        })
    }

    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.source_txid);
        writer.write_u32_le(self.source_tx_out_index);
        match &self.unlocking_script {
            Some(script) => {
                let bytes = script.as_bytes();
                writer.write_varint(bytes.len() as u64);
                writer.write_bytes(bytes);
            }
            None => writer.write_varint(0),
        }
        writer.write_u32_le(self.sequence_number);
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.source_txid, self.source_tx_out_index)
    }

    /// Attach the output being spent without a full source transaction.
    pub fn set_source_output(&mut self, output: TransactionOutput) {
        self.source_output = Some(output);
    }

    /// The output this input spends, if known. A directly attached output
    /// takes priority over one looked up in the source transaction.
    pub fn source_tx_output(&self) -> Option<&TransactionOutput> {
        if let Some(output) = &self.source_output {
            return Some(output);
        }
        self.source_transaction
            .as_ref()
            .and_then(|tx| tx.outputs.get(self.source_tx_out_index as usize))
    }

    pub fn source_tx_satoshis(&self) -> Option<u64> {
        self.source_tx_output().map(|o| o.satoshis)
    }

    pub fn source_tx_script(&self) -> Option<&Script> {
        self.source_tx_output().map(|o| &o.locking_script)
    }
}
