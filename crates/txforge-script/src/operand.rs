//! Script decomposition into operands.
//!
//! An [`Operand`] is one opcode together with the payload it pushes, if any.
//! Decomposition is lazy and total: iterating a malformed script never
//! fails, it simply stops at the truncated push and records that the
//! script is invalid.

use crate::opcodes::*;

/// A single decoded script element: an opcode plus its push payload.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Operand {
    /// The opcode byte.
    pub opcode: u8,
    /// Payload for push opcodes, `None` for everything else.
    pub data: Option<Vec<u8>>,
}

impl Operand {
    /// An operand with no payload.
    pub fn op(opcode: u8) -> Self {
        Operand { opcode, data: None }
    }

    /// Length of the payload, zero when there is none.
    pub fn data_len(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.len())
    }

    /// True if this operand pushes data onto the stack, including the
    /// constant pushes OP_0, OP_1NEGATE, and OP_1..OP_16.
    pub fn is_push(&self) -> bool {
        self.opcode <= OP_16
    }

    /// Re-encode the operand into script bytes.
    ///
    /// The original prefix form is preserved: a payload decoded from a
    /// PUSHDATA1/2/4 prefix re-encodes with that same prefix even when a
    /// shorter one would fit.
    pub fn to_bytes(&self) -> Vec<u8> {
        let data = match &self.data {
            None => return vec![self.opcode],
            Some(data) => data,
        };
        let mut out = Vec::with_capacity(data.len() + 5);
        match self.opcode {
            OP_PUSHDATA1 => {
                out.push(OP_PUSHDATA1);
                out.push(data.len() as u8);
            }
            OP_PUSHDATA2 => {
                out.push(OP_PUSHDATA2);
                out.extend_from_slice(&(data.len() as u16).to_le_bytes());
            }
            OP_PUSHDATA4 => {
                out.push(OP_PUSHDATA4);
                out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            }
            // Direct push: the opcode byte is the length itself.
            _ => out.push(self.opcode),
        }
        out.extend_from_slice(data);
        out
    }

    /// Render one disassembly token (or token pair for data pushes).
    ///
    /// Constant pushes render as their decimal value, data pushes as
    /// `<length> 0x<hex>`, named opcodes by mnemonic, and anything
    /// unnamed as `OP_UNKNOWN`.
    pub fn to_asm_string(&self) -> String {
        if let Some(rendered) = small_int_string(self.opcode) {
            return rendered;
        }
        match &self.data {
            Some(data) => format!("{} 0x{}", data.len(), hex::encode(data)),
            None => opcode_to_string(self.opcode).to_string(),
        }
    }
}

/// Encode a data push with the minimal length prefix.
pub fn encode_push_data(data: &[u8]) -> Vec<u8> {
    let len = data.len();
    let mut out = Vec::with_capacity(len + 5);
    if len <= OP_DATA_75 as usize {
        out.push(len as u8);
    } else if len <= u8::MAX as usize {
        out.push(OP_PUSHDATA1);
        out.push(len as u8);
    } else if len <= u16::MAX as usize {
        out.push(OP_PUSHDATA2);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(OP_PUSHDATA4);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
    out.extend_from_slice(data);
    out
}

/// Restartable lazy iterator over a script's operands.
///
/// Obtained from [`Script::operands`](crate::Script::operands). The
/// iterator never panics or errors on malformed input; a push whose
/// declared length runs past the end of the script terminates iteration
/// and sets [`Operands::is_malformed`].
pub struct Operands<'a> {
    bytes: &'a [u8],
    pos: usize,
    malformed: bool,
}

impl<'a> Operands<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Operands {
            bytes,
            pos: 0,
            malformed: false,
        }
    }

    /// True once iteration has hit a truncated push.
    ///
    /// Only meaningful after the iterator has been driven to completion.
    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    fn read_push_len(&mut self, opcode: u8) -> Option<usize> {
        let prefix_len = match opcode {
            OP_PUSHDATA1 => 1,
            OP_PUSHDATA2 => 2,
            OP_PUSHDATA4 => 4,
            _ => return Some(opcode as usize),
        };
        if self.pos + prefix_len > self.bytes.len() {
            return None;
        }
        let prefix = &self.bytes[self.pos..self.pos + prefix_len];
        self.pos += prefix_len;
        let len = match opcode {
            OP_PUSHDATA1 => prefix[0] as usize,
            OP_PUSHDATA2 => u16::from_le_bytes([prefix[0], prefix[1]]) as usize,
            _ => u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize,
        };
        Some(len)
    }
}

impl Iterator for Operands<'_> {
    type Item = Operand;

    fn next(&mut self) -> Option<Operand> {
        if self.malformed || self.pos >= self.bytes.len() {
            return None;
        }
        let opcode = self.bytes[self.pos];
        self.pos += 1;

        if opcode == OP_0 || opcode > OP_PUSHDATA4 {
            return Some(Operand::op(opcode));
        }

        let len = match self.read_push_len(opcode) {
            Some(len) => len,
            None => {
                self.malformed = true;
                return None;
            }
        };
        if self.pos + len > self.bytes.len() {
            self.malformed = true;
            return None;
        }
        let data = self.bytes[self.pos..self.pos + len].to_vec();
        self.pos += len;
        Some(Operand {
            opcode,
            data: Some(data),
        })
    }
}
