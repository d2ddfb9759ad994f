//! Fluent transaction builder with fee, dust, and change handling.

use std::collections::HashMap;

use txforge_primitives::ec::PrivateKey;
use txforge_primitives::util::VarInt;
use txforge_script::{template, Address, Script};

use crate::amount::Amount;
use crate::error::TransactionError;
use crate::input::TransactionInput;
use crate::outpoint::{OutPoint, Utxo};
use crate::output::TransactionOutput;
use crate::params::NetworkParams;
use crate::template::{UnlockingScriptTemplate, P2PKH, P2PKH_UNLOCK_SIZE_ESTIMATE};
use crate::transaction::Transaction;

/// Builds a transaction from UTXOs and payment instructions.
///
/// Amount mistakes (paying zero or a negative value) fail immediately at the
/// call site. Fee, dust, and missing-change problems are only detectable once
/// the whole transaction is known, so those surface from [`TxBuilder::finalize`].
pub struct TxBuilder {
    params: NetworkParams,
    utxos: Vec<Utxo>,
    outputs: Vec<TransactionOutput>,
    change_script: Option<Script>,
    explicit_fee: Option<u64>,
    keys: Vec<PrivateKey>,
    input_templates: HashMap<usize, Box<dyn UnlockingScriptTemplate>>,
    lock_time: u32,
}

impl TxBuilder {
    pub fn new() -> Self {
        Self::with_params(NetworkParams::default())
    }

    pub fn with_params(params: NetworkParams) -> Self {
        TxBuilder {
            params,
            utxos: Vec::new(),
            outputs: Vec::new(),
            change_script: None,
            explicit_fee: None,
            keys: Vec::new(),
            input_templates: HashMap::new(),
            lock_time: 0,
        }
    }

    /// Add a UTXO to spend. Adding the same outpoint twice is a no-op.
    pub fn spend_from_utxo(&mut self, utxo: Utxo) -> &mut Self {
        if !self.utxos.iter().any(|u| u.outpoint == utxo.outpoint) {
            self.utxos.push(utxo);
        }
        self
    }

    /// Add a UTXO to spend from its raw parts, with a display-order txid.
    pub fn spend_from(
        &mut self,
        prev_tx_id: &str,
        vout: u32,
        satoshis: u64,
        locking_script: Script,
    ) -> Result<&mut Self, TransactionError> {
        let outpoint = OutPoint::from_hex(prev_tx_id, vout)?;
        Ok(self.spend_from_utxo(Utxo::new(outpoint, satoshis, locking_script)))
    }

    /// Pay `amount` to a standard address.
    pub fn spend_to_address(
        &mut self,
        address: &Address,
        amount: Amount,
    ) -> Result<&mut Self, TransactionError> {
        self.spend_to_script(P2PKH::lock(address), amount)
    }

    /// Pay `amount` to an arbitrary locking script.
    pub fn spend_to_script(
        &mut self,
        locking_script: Script,
        amount: Amount,
    ) -> Result<&mut Self, TransactionError> {
        if !amount.is_spendable() {
            return Err(TransactionError::AmountError(format!(
                "output amount must be positive, got {amount}"
            )));
        }
        self.outputs
            .push(TransactionOutput::new(amount.units() as u64, locking_script));
        Ok(self)
    }

    /// Add a zero-value data-only output.
    pub fn add_data(&mut self, parts: &[&[u8]]) -> Result<&mut Self, TransactionError> {
        let script = template::null_data(parts)?;
        self.outputs.push(TransactionOutput::new(0, script));
        Ok(self)
    }

    /// Direct leftover funds to `address`. There is no default change
    /// destination; without one, any meaningful leftover fails the build.
    pub fn send_change_to(&mut self, address: &Address) -> &mut Self {
        self.change_script = Some(P2PKH::lock(address));
        self
    }

    pub fn send_change_to_script(&mut self, locking_script: Script) -> &mut Self {
        self.change_script = Some(locking_script);
        self
    }

    /// Fix the fee to an exact value instead of deriving it from the rate.
    pub fn with_fee(&mut self, fee: u64) -> &mut Self {
        self.explicit_fee = Some(fee);
        self
    }

    pub fn with_fee_per_kb(&mut self, fee_per_kb: u64) -> &mut Self {
        self.params.fee_per_kb = fee_per_kb;
        self
    }

    pub fn with_lock_time(&mut self, lock_time: u32) -> &mut Self {
        self.lock_time = lock_time;
        self
    }

    /// Register a key for signing. Every P2PKH input whose script pays this
    /// key's hash gets signed with it during [`TxBuilder::finalize`].
    pub fn sign(&mut self, private_key: PrivateKey) -> &mut Self {
        self.keys.push(private_key);
        self
    }

    /// Register a custom unlocking template for one input.
    pub fn sign_input(
        &mut self,
        input_index: usize,
        unlocker: Box<dyn UnlockingScriptTemplate>,
    ) -> &mut Self {
        self.input_templates.insert(input_index, unlocker);
        self
    }

    pub fn total_input_satoshis(&self) -> u64 {
        self.utxos.iter().map(|u| u.satoshis).sum()
    }

    pub fn total_output_satoshis(&self) -> u64 {
        self.outputs.iter().map(|o| o.satoshis).sum()
    }

    /// Estimated serialized size in bytes, assuming every input is signed and
    /// a change output is present when a change destination is set.
    pub fn estimated_size(&self) -> usize {
        let mut size = 4 + 4;
        size += VarInt(self.utxos.len() as u64).length();
        for i in 0..self.utxos.len() {
            let unlock = self.estimated_unlock_size(i) as u64;
            size += 32 + 4 + 4 + VarInt(unlock).length() + unlock as usize;
        }

        let change_outputs = usize::from(self.change_script.is_some());
        size += VarInt((self.outputs.len() + change_outputs) as u64).length();
        for output in &self.outputs {
            size += output.to_bytes().len();
        }
        if let Some(script) = &self.change_script {
            size += 8 + VarInt(script.len() as u64).length() + script.len();
        }
        size
    }

    /// Fee the current rate implies for the estimated size.
    pub fn estimated_fee(&self) -> u64 {
        self.params.fee_for_size(self.estimated_size() as u64)
    }

    fn estimated_unlock_size(&self, input_index: usize) -> u32 {
        if let Some(unlocker) = self.input_templates.get(&input_index) {
            // Size estimation does not depend on transaction contents for the
            // shipped templates, so an empty transaction is good enough here.
            let placeholder = Transaction::new();
            return unlocker.estimate_length(&placeholder, input_index as u32);
        }
        P2PKH_UNLOCK_SIZE_ESTIMATE
    }

    /// Assemble, validate, and sign the transaction.
    pub fn finalize(&self) -> Result<Transaction, TransactionError> {
        if self.utxos.is_empty() {
            return Err(TransactionError::InvalidTransaction(
                "no inputs to spend".to_string(),
            ));
        }

        // Coinbase construction carries no real input value, so fee and dust
        // policy cannot apply to it.
        if self.utxos.len() == 1 && self.utxos[0].outpoint.is_null() {
            return self.finalize_unchecked();
        }

        let total_in = self.total_input_satoshis();
        let total_out = self.total_output_satoshis();
        if total_out > total_in {
            return Err(TransactionError::FeeError(format!(
                "outputs ({total_out}) exceed inputs ({total_in})"
            )));
        }

        let available = total_in - total_out;
        let fee = self.explicit_fee.unwrap_or_else(|| self.estimated_fee());

        let mut outputs = self.outputs.clone();
        match &self.change_script {
            Some(script) => {
                if available < fee {
                    return Err(TransactionError::FeeError(format!(
                        "insufficient funds for fee: {available} available, {fee} required"
                    )));
                }
                let change = available - fee;
                if change >= self.params.dust_limit {
                    let mut output = TransactionOutput::new(change, script.clone());
                    output.change = true;
                    outputs.push(output);
                }
                // Below-dust change is silently absorbed into the fee.
            }
            None => {
                // The whole leftover becomes the fee. Accept that only while
                // it stays within the security margin of the estimated fee;
                // a larger leftover is almost certainly a forgotten change
                // destination.
                let ceiling = self.estimated_fee() * self.params.fee_security_margin;
                if available > ceiling {
                    return Err(TransactionError::FeeError(format!(
                        "leftover of {available} with no change destination exceeds \
                         the fee ceiling of {ceiling}"
                    )));
                }
            }
        }

        for output in &outputs {
            if output.satoshis < self.params.dust_limit && !output.is_null_data() {
                return Err(TransactionError::DustOutput(
                    output.satoshis,
                    self.params.dust_limit,
                ));
            }
        }

        self.assemble(outputs)
    }

    fn finalize_unchecked(&self) -> Result<Transaction, TransactionError> {
        self.assemble(self.outputs.clone())
    }

    fn assemble(&self, outputs: Vec<TransactionOutput>) -> Result<Transaction, TransactionError> {
        let mut tx = Transaction::new();
        tx.lock_time = self.lock_time;
        for utxo in &self.utxos {
            let mut input = TransactionInput::new(utxo.outpoint.txid, utxo.outpoint.index);
            input.set_source_output(TransactionOutput::new(
                utxo.satoshis,
                utxo.locking_script.clone(),
            ));
            tx.add_input(input);
        }
        for output in outputs {
            tx.add_output(output);
        }

        self.sign_inputs(&mut tx)?;
        Ok(tx)
    }

    /// Finalize and serialize in one step.
    pub fn to_hex(&self) -> Result<String, TransactionError> {
        Ok(self.finalize()?.to_hex())
    }

    fn sign_inputs(&self, tx: &mut Transaction) -> Result<(), TransactionError> {
        for index in 0..tx.inputs.len() {
            let script = if let Some(unlocker) = self.input_templates.get(&index) {
                Some(unlocker.sign(tx, index as u32)?)
            } else {
                self.p2pkh_sign(tx, index)?
            };
            if let Some(script) = script {
                tx.inputs[index].unlocking_script = Some(script);
            }
        }
        Ok(())
    }

    fn p2pkh_sign(
        &self,
        tx: &Transaction,
        input_index: usize,
    ) -> Result<Option<Script>, TransactionError> {
        let locking_script = match tx.inputs[input_index].source_tx_script() {
            Some(script) if script.is_p2pkh() => script,
            _ => return Ok(None),
        };
        let pubkey_hash = locking_script.public_key_hash()?;
        for key in &self.keys {
            if key.pub_key().hash160() == pubkey_hash {
                let unlocker = P2PKH::unlock(key.clone(), None);
                return Ok(Some(unlocker.sign(tx, input_index as u32)?));
            }
        }
        Ok(None)
    }
}

impl Default for TxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TxBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxBuilder")
            .field("params", &self.params)
            .field("utxos", &self.utxos)
            .field("outputs", &self.outputs)
            .field("change_script", &self.change_script)
            .field("explicit_fee", &self.explicit_fee)
            .field("keys", &self.keys.len())
            .field("input_templates", &self.input_templates.len())
            .field("lock_time", &self.lock_time)
            .finish()
    }
}
