//! Alt-stack and positional stack opcodes.

use super::error::InterpreterError;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_to_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let elem = self.dstack.pop_byte_array()?;
        self.astack.push_byte_array(elem);
        Ok(())
    }

    pub(crate) fn op_from_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let elem = self.astack.pop_byte_array()?;
        self.dstack.push_byte_array(elem);
        Ok(())
    }

    /// OP_IFDUP duplicates the top element only when it is truthy.
    pub(crate) fn op_ifdup(&mut self) -> Result<(), InterpreterError> {
        if self.dstack.peek_bool(0)? {
            let top = self.dstack.peek_byte_array(0)?;
            self.dstack.push_byte_array(top);
        }
        Ok(())
    }

    pub(crate) fn op_pick(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_int()?.to_i32();
        self.dstack.pick_n(n)
    }

    pub(crate) fn op_roll(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_int()?.to_i32();
        self.dstack.roll_n(n)
    }
}
