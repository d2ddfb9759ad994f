//! Conditionals, verify-family plumbing, and the time-lock opcodes.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::stack::as_bool;
use super::thread::Thread;

/// States a conditional frame can be in. SKIP marks frames opened
/// inside an unexecuted branch; they stay dormant until their OP_ENDIF.
pub(crate) const OP_COND_FALSE: i32 = 0;
pub(crate) const OP_COND_TRUE: i32 = 1;
pub(crate) const OP_COND_SKIP: i32 = 2;

/// Lock times below this are block heights, at or above it timestamps.
const LOCK_TIME_THRESHOLD: i64 = 500_000_000;

const FINAL_SEQUENCE: u32 = 0xffff_ffff;
const SEQUENCE_LOCK_TIME_DISABLED: i64 = 1 << 31;
const SEQUENCE_LOCK_TIME_IS_SECONDS: i64 = 1 << 22;
const SEQUENCE_LOCK_TIME_MASK: i64 = 0x0000_ffff;

impl<'a> Thread<'a> {
    pub(crate) fn op_reserved(&self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::ReservedOpcode,
            format!("attempt to execute reserved opcode {}", pop.name()),
        ))
    }

    /// Pop the argument of OP_IF/OP_NOTIF. Under VERIFY_MINIMAL_IF only
    /// the empty array and the single byte 0x01 are accepted.
    pub(crate) fn pop_if_bool(&mut self) -> Result<bool, InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_MINIMAL_IF) {
            return self.dstack.pop_bool();
        }
        let arg = self.dstack.pop_byte_array()?;
        match arg.as_slice() {
            [] | [1] => Ok(as_bool(&arg)),
            [_] => Err(InterpreterError::new(
                InterpreterErrorCode::MinimalIf,
                "conditional failed".to_string(),
            )),
            _ => Err(InterpreterError::new(
                InterpreterErrorCode::MinimalIf,
                format!("conditional has data of length {}", arg.len()),
            )),
        }
    }

    /// Open a conditional frame. `execute_on` is the branch argument
    /// value that makes the taken side execute.
    fn begin_conditional(&mut self, execute_on: bool) -> Result<(), InterpreterError> {
        let state = if !self.is_branch_executing() {
            OP_COND_SKIP
        } else if self.pop_if_bool()? == execute_on {
            OP_COND_TRUE
        } else {
            OP_COND_FALSE
        };
        self.cond_stack.push(state);
        self.else_stack.push_bool(false);
        Ok(())
    }

    pub(crate) fn op_if(&mut self) -> Result<(), InterpreterError> {
        self.begin_conditional(true)
    }

    pub(crate) fn op_notif(&mut self) -> Result<(), InterpreterError> {
        self.begin_conditional(false)
    }

    fn unbalanced(pop: &ParsedOpcode) -> InterpreterError {
        InterpreterError::new(
            InterpreterErrorCode::UnbalancedConditional,
            format!(
                "encountered opcode {} with no matching opcode to begin conditional execution",
                pop.name()
            ),
        )
    }

    pub(crate) fn op_else(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.cond_stack.is_empty() {
            return Err(Self::unbalanced(pop));
        }
        // A second OP_ELSE in the same frame is unbalanced.
        if self.else_stack.pop_bool()? {
            return Err(Self::unbalanced(pop));
        }

        if let Some(state) = self.cond_stack.last_mut() {
            match *state {
                OP_COND_TRUE => *state = OP_COND_FALSE,
                OP_COND_FALSE => *state = OP_COND_TRUE,
                _ => {}
            }
        }
        self.else_stack.push_bool(true);
        Ok(())
    }

    pub(crate) fn op_endif(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.cond_stack.pop().is_none() {
            return Err(Self::unbalanced(pop));
        }
        self.else_stack.pop_bool()?;
        Ok(())
    }

    pub(crate) fn op_verify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.abstract_verify(pop, InterpreterErrorCode::Verify)
    }

    /// Shared tail of every *VERIFY opcode: pop the result and fail
    /// with `code` when it is false.
    pub(crate) fn abstract_verify(
        &mut self,
        pop: &ParsedOpcode,
        code: InterpreterErrorCode,
    ) -> Result<(), InterpreterError> {
        if self.dstack.pop_bool()? {
            Ok(())
        } else {
            Err(InterpreterError::new(code, format!("{} failed", pop.name())))
        }
    }

    /// OP_RETURN unconditionally terminates the script as a failure.
    pub(crate) fn op_return(&mut self) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::EarlyReturn,
            "script returned early".to_string(),
        ))
    }

    /// Peek the top element as a 5-byte lock value, rejecting negatives.
    fn peek_lock_value(&self, what: &str) -> Result<i64, InterpreterError> {
        let elem = self.dstack.peek_byte_array(0)?;
        let value = ScriptNumber::from_bytes(&elem, 5, self.dstack.verify_minimal_data)?;
        if value.less_than_int(0) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                format!("negative {}: {}", what, value.to_i64()),
            ));
        }
        Ok(value.to_i64())
    }

    fn discourage_nop(&self, nop_name: &str) -> Result<(), InterpreterError> {
        if self.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DiscourageUpgradableNOPs,
                format!("{} reserved for soft-fork upgrades", nop_name),
            ));
        }
        Ok(())
    }

    fn lock_checker(
        &self,
        op_name: &str,
    ) -> Result<&'a dyn super::SignatureChecker, InterpreterError> {
        self.checker.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                format!("no signature checker for {}", op_name),
            )
        })
    }

    pub(crate) fn op_check_locktime_verify(&mut self) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_CHECKLOCKTIMEVERIFY) {
            return self.discourage_nop("OP_NOP2");
        }
        let checker = self.lock_checker("CHECKLOCKTIMEVERIFY")?;
        let stack_lock_time = self.peek_lock_value("lock time")?;

        verify_lock_time(
            checker.lock_time() as i64,
            LOCK_TIME_THRESHOLD,
            stack_lock_time,
        )?;

        // A final sequence opts the input out of lock-time semantics.
        if checker.sequence() == FINAL_SEQUENCE {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                "transaction input is finalized".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn op_check_sequence_verify(&mut self) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_CHECKSEQUENCEVERIFY) {
            return self.discourage_nop("OP_NOP3");
        }
        let checker = self.lock_checker("CHECKSEQUENCEVERIFY")?;
        let stack_sequence = self.peek_lock_value("sequence")?;

        // With the disabled bit set the stack value imposes nothing.
        if stack_sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Ok(());
        }

        if checker.tx_version() < 2 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!("invalid transaction version: {}", checker.tx_version()),
            ));
        }
        let tx_sequence = checker.sequence() as i64;
        if tx_sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!(
                    "transaction sequence has sequence locktime disabled bit set: 0x{:x}",
                    tx_sequence
                ),
            ));
        }

        let mask = SEQUENCE_LOCK_TIME_IS_SECONDS | SEQUENCE_LOCK_TIME_MASK;
        verify_lock_time(
            tx_sequence & mask,
            SEQUENCE_LOCK_TIME_IS_SECONDS,
            stack_sequence & mask,
        )
    }
}

/// Compare a required lock value against the transaction's. Both must
/// be on the same side of `threshold` (same units), and the required
/// value must not exceed the transaction's.
pub(crate) fn verify_lock_time(
    tx_lock_time: i64,
    threshold: i64,
    lock_time: i64,
) -> Result<(), InterpreterError> {
    if (tx_lock_time < threshold) != (lock_time < threshold) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!(
                "mismatched locktime types -- tx locktime {}, stack locktime {}",
                tx_lock_time, lock_time
            ),
        ));
    }
    if lock_time > tx_lock_time {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!(
                "locktime requirement not satisfied -- locktime is greater than the transaction locktime: {} > {}",
                lock_time, tx_lock_time
            ),
        ));
    }
    Ok(())
}
