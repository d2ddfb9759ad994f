//! Eagerly parsed script form.
//!
//! The interpreter parses each script up front instead of using the
//! lazy operand iterator: execution needs random access for the P2SH
//! redeem pass, subscript construction, and conditional skipping.

use super::error::{InterpreterError, InterpreterErrorCode};
use crate::opcodes::*;
use crate::Script;

/// One executable unit: an opcode and the payload it pushes, empty for
/// non-push opcodes.
#[derive(Debug, Clone)]
pub struct ParsedOpcode {
    pub opcode: u8,
    pub data: Vec<u8>,
}

impl ParsedOpcode {
    pub fn name(&self) -> &'static str {
        opcode_to_string(self.opcode)
    }

    /// Opcodes that are never executable.
    pub fn is_disabled(&self) -> bool {
        matches!(self.opcode, OP_2MUL | OP_2DIV)
    }

    /// Opcodes gated behind the extended opcode set.
    pub fn is_extended(&self) -> bool {
        matches!(
            self.opcode,
            OP_CAT
                | OP_SPLIT
                | OP_NUM2BIN
                | OP_BIN2NUM
                | OP_INVERT
                | OP_AND
                | OP_OR
                | OP_XOR
                | OP_MUL
                | OP_DIV
                | OP_MOD
                | OP_LSHIFT
                | OP_RSHIFT
        )
    }

    /// OP_VERIF and OP_VERNOTIF fail the script even unexecuted.
    pub fn always_illegal(&self) -> bool {
        matches!(self.opcode, OP_VERIF | OP_VERNOTIF)
    }

    /// Opcodes processed even inside a skipped branch.
    pub fn is_conditional(&self) -> bool {
        matches!(
            self.opcode,
            OP_IF | OP_NOTIF | OP_ELSE | OP_ENDIF | OP_VERIF | OP_VERNOTIF
        )
    }

    /// Opcodes that cannot run without a [`SignatureChecker`](super::SignatureChecker).
    pub fn requires_sig_checker(&self) -> bool {
        matches!(
            self.opcode,
            OP_CHECKSIG
                | OP_CHECKSIGVERIFY
                | OP_CHECKMULTISIG
                | OP_CHECKMULTISIGVERIFY
                | OP_CHECKSEQUENCEVERIFY
        )
    }

    /// Fail unless this push uses the shortest opcode able to express it.
    pub fn enforce_minimum_data_push(&self) -> Result<(), InterpreterError> {
        let reject = |wanted: String| {
            Err(InterpreterError::new(
                InterpreterErrorCode::MinimalData,
                format!(
                    "data push of {} bytes encoded with opcode {} instead of {}",
                    self.data.len(),
                    self.name(),
                    wanted
                ),
            ))
        };

        // Small constants have dedicated opcodes.
        match self.data.as_slice() {
            [] => {
                if self.opcode != OP_0 {
                    return reject("OP_0".to_string());
                }
                return Ok(());
            }
            [v @ 1..=16] => {
                if self.opcode != OP_1 + v - 1 {
                    return reject(format!("OP_{}", v));
                }
            }
            [0x81] => {
                if self.opcode != OP_1NEGATE {
                    return reject("OP_1NEGATE".to_string());
                }
            }
            _ => {}
        }

        // Otherwise the shortest length prefix is required.
        let len = self.data.len();
        if len <= 75 {
            if self.opcode as usize != len {
                return reject(format!("OP_DATA_{}", len));
            }
        } else if len <= 0xff {
            if self.opcode != OP_PUSHDATA1 {
                return reject("OP_PUSHDATA1".to_string());
            }
        } else if len <= 0xffff && self.opcode != OP_PUSHDATA2 {
            return reject("OP_PUSHDATA2".to_string());
        }
        Ok(())
    }

    /// True when the opcode is either not a push or is the smallest
    /// push form for its payload. Signature blanking only strips
    /// canonical pushes.
    pub fn canonical_push(&self) -> bool {
        let len = self.data.len();
        match self.opcode {
            op if op > OP_16 => true,
            op if op > OP_0 && op < OP_PUSHDATA1 => !(len == 1 && self.data[0] <= 16),
            OP_PUSHDATA1 => len >= OP_PUSHDATA1 as usize,
            OP_PUSHDATA2 => len > 0xff,
            OP_PUSHDATA4 => len > 0xffff,
            _ => true,
        }
    }

    /// Serialize back to script bytes in the original prefix form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 4 + self.data.len());
        out.push(self.opcode);
        match self.opcode {
            OP_PUSHDATA1 => out.push(self.data.len() as u8),
            OP_PUSHDATA2 => out.extend_from_slice(&(self.data.len() as u16).to_le_bytes()),
            OP_PUSHDATA4 => out.extend_from_slice(&(self.data.len() as u32).to_le_bytes()),
            op if (OP_DATA_1..=OP_DATA_75).contains(&op) => {}
            // Constant pushes and plain opcodes carry no payload bytes.
            _ => return out,
        }
        out.extend_from_slice(&self.data);
        out
    }
}

pub type ParsedScript = Vec<ParsedOpcode>;

/// True when every opcode pushes data, including the constant pushes.
pub fn is_push_only(script: &ParsedScript) -> bool {
    script.iter().all(|op| op.opcode <= OP_16)
}

/// Drop every canonical push whose payload contains `data`.
pub fn remove_opcode_by_data(script: &ParsedScript, data: &[u8]) -> ParsedScript {
    script
        .iter()
        .filter(|pop| !pop.canonical_push() || !pop.data.windows(data.len()).any(|w| w == data))
        .cloned()
        .collect()
}

/// Drop every occurrence of `opcode`.
pub fn remove_opcode(script: &ParsedScript, opcode: u8) -> ParsedScript {
    script
        .iter()
        .filter(|pop| pop.opcode != opcode)
        .cloned()
        .collect()
}

/// Reassemble a parsed script into wire bytes.
pub fn unparse(pscript: &ParsedScript) -> Script {
    let bytes = pscript.iter().flat_map(|pop| pop.to_bytes()).collect();
    Script::from_bytes(bytes)
}

/// Consume `n` bytes or fail with `MalformedPush`.
fn read_bytes<'s>(
    scr: &'s [u8],
    pos: &mut usize,
    n: usize,
    context: &str,
) -> Result<&'s [u8], InterpreterError> {
    if *pos + n > scr.len() {
        return Err(InterpreterError::new(
            InterpreterErrorCode::MalformedPush,
            context.to_string(),
        ));
    }
    let taken = &scr[*pos..*pos + n];
    *pos += n;
    Ok(taken)
}

/// Parse a script into executable form.
///
/// With `error_on_checksig` set, any opcode that would need a
/// signature checker fails the parse; callers set it when no checker
/// was supplied.
pub fn parse_script(
    script: &Script,
    error_on_checksig: bool,
) -> Result<ParsedScript, InterpreterError> {
    let scr = script.to_bytes();
    let mut parsed = Vec::new();
    let mut pos = 0;

    while pos < scr.len() {
        let opcode = scr[pos];
        pos += 1;

        let data = match opcode {
            op if (OP_DATA_1..=OP_DATA_75).contains(&op) => {
                read_bytes(&scr, &mut pos, op as usize, "script truncated")?.to_vec()
            }
            OP_PUSHDATA1 => {
                let len = read_bytes(&scr, &mut pos, 1, "script truncated")?[0] as usize;
                read_bytes(&scr, &mut pos, len, "push data exceeds script length")?.to_vec()
            }
            OP_PUSHDATA2 => {
                let prefix = read_bytes(&scr, &mut pos, 2, "script truncated")?;
                let len = u16::from_le_bytes([prefix[0], prefix[1]]) as usize;
                read_bytes(&scr, &mut pos, len, "push data exceeds script length")?.to_vec()
            }
            OP_PUSHDATA4 => {
                let prefix = read_bytes(&scr, &mut pos, 4, "script truncated")?;
                let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
                read_bytes(&scr, &mut pos, len, "push data exceeds script length")?.to_vec()
            }
            _ => Vec::new(),
        };

        let pop = ParsedOpcode { opcode, data };
        if error_on_checksig && pop.requires_sig_checker() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "a signature checker must be supplied for checksig".to_string(),
            ));
        }
        parsed.push(pop);
    }

    Ok(parsed)
}
