//! Immutable byte-oriented script container.
//!
//! A [`Script`] holds raw script bytes and stays faithful to them:
//! `to_bytes` always returns exactly what was parsed, even when the
//! bytes are not a well-formed operand sequence. Structure is exposed
//! lazily through [`Script::operands`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::opcodes::*;
use crate::operand::{encode_push_data, Operands};
use crate::ScriptError;

/// A Bitcoin script: locking, unlocking, or redeem.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Script(pub Vec<u8>);

impl Script {
    /// An empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Build a script from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }

    /// Build a script from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        Ok(Script(hex::decode(hex_str)?))
    }

    /// Parse a disassembly string back into a script.
    ///
    /// Accepts the token forms produced by [`Script::to_asm`]: decimal
    /// constants (`0`, `-1`, `1`..`16`), data pushes as `<length> 0x<hex>`
    /// or a bare `0x<hex>` token, and opcode mnemonics.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        let mut tokens = asm.split_whitespace().peekable();
        while let Some(token) = tokens.next() {
            if let Some(op) = string_to_opcode(token) {
                script.0.push(op);
                continue;
            }
            if let Some(hex_str) = token.strip_prefix("0x") {
                script.append_push_data(&hex::decode(hex_str)?)?;
                continue;
            }
            if let Ok(value) = token.parse::<i64>() {
                // A length token is followed by its 0x payload.
                if value >= 0 && tokens.peek().is_some_and(|t| t.starts_with("0x")) {
                    let payload = tokens.next().unwrap();
                    let data = hex::decode(&payload[2..])?;
                    if data.len() as i64 != value {
                        return Err(ScriptError::InvalidAsmToken(format!(
                            "push length {} does not match payload of {} bytes",
                            value,
                            data.len()
                        )));
                    }
                    script.append_push_data(&data)?;
                    continue;
                }
                match value {
                    0 => script.0.push(OP_0),
                    -1 => script.0.push(OP_1NEGATE),
                    1..=16 => script.0.push(OP_1 + (value as u8 - 1)),
                    _ => return Err(ScriptError::InvalidAsmToken(token.to_string())),
                }
                continue;
            }
            return Err(ScriptError::InvalidAsmToken(token.to_string()));
        }
        Ok(script)
    }

    /// The exact script bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.clone()
    }

    /// The script bytes as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex encoding of the script bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Length of the script in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lazily decompose the script into operands.
    ///
    /// Restartable: each call begins a fresh pass over the bytes.
    pub fn operands(&self) -> Operands<'_> {
        Operands::new(&self.0)
    }

    /// Whether the script decomposes cleanly into operands.
    ///
    /// False when a push declares a length that runs past the end of
    /// the script. An invalid script still serializes byte-for-byte.
    pub fn is_valid(&self) -> bool {
        let mut iter = self.operands();
        for _ in iter.by_ref() {}
        !iter.is_malformed()
    }

    /// Render the script as space-separated disassembly tokens.
    ///
    /// Constant pushes render as decimal values, data pushes as
    /// `<length> 0x<hex>`, and unnamed opcodes as `OP_UNKNOWN`. A
    /// malformed trailing push renders as `[error]`.
    pub fn to_asm(&self) -> String {
        let mut iter = self.operands();
        let mut tokens: Vec<String> = iter.by_ref().map(|op| op.to_asm_string()).collect();
        if iter.is_malformed() {
            tokens.push("[error]".to_string());
        }
        tokens.join(" ")
    }

    /// Append a data push with the minimal length prefix.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<&mut Self, ScriptError> {
        if data.len() > u32::MAX as usize {
            return Err(ScriptError::PushDataTooLarge {
                size: data.len(),
                limit: u32::MAX as usize,
            });
        }
        self.0.extend_from_slice(&encode_push_data(data));
        Ok(self)
    }

    /// Append a data push given as hex.
    pub fn append_push_data_hex(&mut self, hex_str: &str) -> Result<&mut Self, ScriptError> {
        let data = hex::decode(hex_str)?;
        self.append_push_data(&data)
    }

    /// Append raw opcodes.
    ///
    /// Push-prefix opcodes are rejected since they would desynchronize
    /// the operand stream; use [`Script::append_push_data`] instead.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<&mut Self, ScriptError> {
        for &op in opcodes {
            if (OP_DATA_1..=OP_PUSHDATA4).contains(&op) {
                return Err(ScriptError::InvalidOpcodeData(format!("{:#04x}", op)));
            }
        }
        self.0.extend_from_slice(opcodes);
        Ok(self)
    }

    /// Byte-pattern check for a pay-to-pubkey-hash locking script.
    pub fn is_p2pkh(&self) -> bool {
        self.0.len() == 25
            && self.0[0] == OP_DUP
            && self.0[1] == OP_HASH160
            && self.0[2] == OP_DATA_20
            && self.0[23] == OP_EQUALVERIFY
            && self.0[24] == OP_CHECKSIG
    }

    /// Byte-pattern check for a pay-to-script-hash locking script.
    pub fn is_p2sh(&self) -> bool {
        self.0.len() == 23
            && self.0[0] == OP_HASH160
            && self.0[1] == OP_DATA_20
            && self.0[22] == OP_EQUAL
    }

    /// The pubkey hash embedded in a P2PKH locking script.
    pub fn public_key_hash(&self) -> Result<[u8; 20], ScriptError> {
        if !self.is_p2pkh() {
            return Err(ScriptError::NotP2pkh);
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&self.0[3..23]);
        Ok(hash)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl Serialize for Script {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Script {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
