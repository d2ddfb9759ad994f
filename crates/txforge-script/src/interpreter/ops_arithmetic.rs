//! Numeric opcodes.
//!
//! Operands are read back as script numbers at the configured width;
//! results are exact and may serialize wider than the operand limit.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::thread::Thread;

/// Shift a big-endian bit string toward its first byte. The result has
/// the same length; bits shifted past the front are lost.
fn shift_left(x: &[u8], n: usize) -> Vec<u8> {
    let byte_shift = n / 8;
    let bit_shift = n % 8;
    let mut out = vec![0u8; x.len()];
    for (j, slot) in out.iter_mut().enumerate() {
        let src = j + byte_shift;
        if src >= x.len() {
            break;
        }
        // 16-bit window over the source byte and its successor.
        let mut window = (x[src] as u32) << 8;
        if src + 1 < x.len() {
            window |= x[src + 1] as u32;
        }
        *slot = ((window << bit_shift) >> 8) as u8;
    }
    out
}

/// Shift a big-endian bit string toward its last byte.
fn shift_right(x: &[u8], n: usize) -> Vec<u8> {
    let byte_shift = n / 8;
    let bit_shift = n % 8;
    let mut out = vec![0u8; x.len()];
    for (j, slot) in out.iter_mut().enumerate() {
        let src = match j.checked_sub(byte_shift) {
            Some(src) => src,
            None => continue,
        };
        let mut window = x[src] as u32;
        if src > 0 {
            window |= (x[src - 1] as u32) << 8;
        }
        *slot = (window >> bit_shift) as u8;
    }
    out
}

impl<'a> Thread<'a> {
    /// Pop one number, transform it in place, push it back.
    pub(crate) fn op_unary_int(
        &mut self,
        f: impl FnOnce(&mut ScriptNumber),
    ) -> Result<(), InterpreterError> {
        let mut n = self.dstack.pop_int()?;
        f(&mut n);
        self.dstack.push_int(&n);
        Ok(())
    }

    /// Pop two numbers, fold the top into the one beneath, push the result.
    fn op_binary_int(
        &mut self,
        f: impl FnOnce(&mut ScriptNumber, &ScriptNumber),
    ) -> Result<(), InterpreterError> {
        let top = self.dstack.pop_int()?;
        let mut lhs = self.dstack.pop_int()?;
        f(&mut lhs, &top);
        self.dstack.push_int(&lhs);
        Ok(())
    }

    pub(crate) fn op_not(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_int()?;
        self.dstack.push_int(&ScriptNumber::new(n.is_zero() as i64));
        Ok(())
    }

    pub(crate) fn op_0notequal(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_int()?;
        self.dstack
            .push_int(&ScriptNumber::new(!n.is_zero() as i64));
        Ok(())
    }

    pub(crate) fn op_add(&mut self) -> Result<(), InterpreterError> {
        self.op_binary_int(|lhs, rhs| {
            lhs.add(rhs);
        })
    }

    pub(crate) fn op_sub(&mut self) -> Result<(), InterpreterError> {
        self.op_binary_int(|lhs, rhs| {
            lhs.sub(rhs);
        })
    }

    pub(crate) fn op_mul(&mut self) -> Result<(), InterpreterError> {
        self.op_binary_int(|lhs, rhs| {
            lhs.mul(rhs);
        })
    }

    pub(crate) fn op_div(&mut self) -> Result<(), InterpreterError> {
        let divisor = self.dstack.pop_int()?;
        let mut dividend = self.dstack.pop_int()?;
        if divisor.is_zero() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DivideByZero,
                "divide by zero".to_string(),
            ));
        }
        dividend.div(&divisor);
        self.dstack.push_int(&dividend);
        Ok(())
    }

    pub(crate) fn op_mod(&mut self) -> Result<(), InterpreterError> {
        let divisor = self.dstack.pop_int()?;
        let mut dividend = self.dstack.pop_int()?;
        if divisor.is_zero() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DivideByZero,
                "mod by zero".to_string(),
            ));
        }
        dividend.modulo(&divisor);
        self.dstack.push_int(&dividend);
        Ok(())
    }

    fn pop_shift_amount(&mut self) -> Result<usize, InterpreterError> {
        let n = self.dstack.pop_int()?;
        if n.less_than_int(0) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooSmall,
                "n less than 0".to_string(),
            ));
        }
        Ok(n.to_int() as usize)
    }

    pub(crate) fn op_lshift(&mut self) -> Result<(), InterpreterError> {
        let n = self.pop_shift_amount()?;
        let elem = self.dstack.pop_byte_array()?;
        self.dstack.push_byte_array(shift_left(&elem, n));
        Ok(())
    }

    pub(crate) fn op_rshift(&mut self) -> Result<(), InterpreterError> {
        let n = self.pop_shift_amount()?;
        let elem = self.dstack.pop_byte_array()?;
        self.dstack.push_byte_array(shift_right(&elem, n));
        Ok(())
    }

    /// Shared body for the numeric comparison opcodes. `f` receives the
    /// operands in push order.
    pub(crate) fn op_bool_binop(
        &mut self,
        f: impl FnOnce(&ScriptNumber, &ScriptNumber) -> bool,
    ) -> Result<(), InterpreterError> {
        let rhs = self.dstack.pop_int()?;
        let lhs = self.dstack.pop_int()?;
        self.dstack
            .push_int(&ScriptNumber::new(f(&lhs, &rhs) as i64));
        Ok(())
    }

    pub(crate) fn op_numequalverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_bool_binop(|a, b| a.equal(b))?;
        self.abstract_verify(pop, InterpreterErrorCode::NumEqualVerify)
    }

    pub(crate) fn op_min(&mut self) -> Result<(), InterpreterError> {
        self.op_binary_int(|lhs, rhs| {
            if rhs.less_than(lhs) {
                lhs.val = rhs.val.clone();
            }
        })
    }

    pub(crate) fn op_max(&mut self) -> Result<(), InterpreterError> {
        self.op_binary_int(|lhs, rhs| {
            if rhs.greater_than(lhs) {
                lhs.val = rhs.val.clone();
            }
        })
    }

    /// OP_WITHIN tests min <= x < max.
    pub(crate) fn op_within(&mut self) -> Result<(), InterpreterError> {
        let max_val = self.dstack.pop_int()?;
        let min_val = self.dstack.pop_int()?;
        let x = self.dstack.pop_int()?;
        let inside = min_val.less_than_or_equal(&x) && x.less_than(&max_val);
        self.dstack.push_int(&ScriptNumber::new(inside as i64));
        Ok(())
    }
}
