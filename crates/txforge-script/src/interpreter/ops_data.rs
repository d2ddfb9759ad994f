//! Byte-array opcodes: concatenation, splitting, width conversion,
//! bitwise logic, and equality.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::{minimally_encode, ScriptNumber};
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_cat(&mut self) -> Result<(), InterpreterError> {
        let tail = self.dstack.pop_byte_array()?;
        let mut joined = self.dstack.pop_byte_array()?;
        joined.extend_from_slice(&tail);
        if joined.len() > self.cfg.max_script_element_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "concatenated size {} exceeds max allowed size {}",
                    joined.len(),
                    self.cfg.max_script_element_size
                ),
            ));
        }
        self.dstack.push_byte_array(joined);
        Ok(())
    }

    pub(crate) fn op_split(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_int()?;
        let elem = self.dstack.pop_byte_array()?;
        if n.greater_than_int(elem.len() as i64) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                "n is larger than length of array".to_string(),
            ));
        }
        if n.less_than_int(0) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooSmall,
                "n is negative".to_string(),
            ));
        }
        let (head, tail) = elem.split_at(n.to_int() as usize);
        self.dstack.push_byte_array(head.to_vec());
        self.dstack.push_byte_array(tail.to_vec());
        Ok(())
    }

    /// OP_NUM2BIN widens a number to an exact byte width, moving the
    /// sign bit into the final padding byte.
    pub(crate) fn op_num2bin(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_int()?;
        let elem = self.dstack.pop_byte_array()?;

        if n.greater_than_int(self.cfg.max_script_element_size as i64) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "n is larger than the max of {}",
                    self.cfg.max_script_element_size
                ),
            ));
        }

        let mut bytes = ScriptNumber::from_bytes(&elem, elem.len(), false)?.to_bytes();
        if n.less_than_int(bytes.len() as i64) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooSmall,
                "cannot fit it into n sized array".to_string(),
            ));
        }
        let width = n.to_int() as usize;
        if width == bytes.len() {
            self.dstack.push_byte_array(bytes);
            return Ok(());
        }

        let sign_bit = match bytes.last_mut() {
            Some(last) => {
                let bit = *last & 0x80;
                *last &= 0x7f;
                bit
            }
            None => 0x00,
        };
        bytes.resize(width - 1, 0x00);
        bytes.push(sign_bit);
        self.dstack.push_byte_array(bytes);
        Ok(())
    }

    /// OP_BIN2NUM reduces arbitrary bytes to the minimal numeric
    /// encoding of the same value.
    pub(crate) fn op_bin2num(&mut self) -> Result<(), InterpreterError> {
        let elem = self.dstack.pop_byte_array()?;
        let minimal = minimally_encode(&elem);
        if minimal.len() > self.max_script_number_length {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "script numbers are limited to {} bytes",
                    self.max_script_number_length
                ),
            ));
        }
        self.dstack.push_byte_array(minimal);
        Ok(())
    }

    pub(crate) fn op_size(&mut self) -> Result<(), InterpreterError> {
        let len = self.dstack.peek_byte_array(0)?.len();
        self.dstack.push_int(&ScriptNumber::new(len as i64));
        Ok(())
    }

    pub(crate) fn op_invert(&mut self) -> Result<(), InterpreterError> {
        let elem = self.dstack.pop_byte_array()?;
        let flipped: Vec<u8> = elem.iter().map(|&b| !b).collect();
        self.dstack.push_byte_array(flipped);
        Ok(())
    }

    /// Shared body for OP_AND, OP_OR, and OP_XOR; operands must have
    /// equal length.
    pub(crate) fn op_bitwise(&mut self, f: fn(u8, u8) -> u8) -> Result<(), InterpreterError> {
        let rhs = self.dstack.pop_byte_array()?;
        let lhs = self.dstack.pop_byte_array()?;
        if lhs.len() != rhs.len() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidInputLength,
                "byte arrays are not the same length".to_string(),
            ));
        }
        let combined: Vec<u8> = lhs.iter().zip(&rhs).map(|(&x, &y)| f(x, y)).collect();
        self.dstack.push_byte_array(combined);
        Ok(())
    }

    pub(crate) fn op_equal(&mut self) -> Result<(), InterpreterError> {
        let a = self.dstack.pop_byte_array()?;
        let b = self.dstack.pop_byte_array()?;
        self.dstack.push_bool(a == b);
        Ok(())
    }

    pub(crate) fn op_equalverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_equal()?;
        self.abstract_verify(pop, InterpreterErrorCode::EqualVerify)
    }
}
