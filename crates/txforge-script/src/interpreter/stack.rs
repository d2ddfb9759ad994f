//! Data and alt stacks for script execution.
//!
//! Stack elements are raw byte arrays; numeric and boolean views are
//! applied at pop time. Indices count down from the top, so index 0 is
//! the element the next pop would remove.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;

/// Truthiness of a stack element: false is any encoding of zero,
/// including negative zero such as `[0x00, 0x80]`.
pub fn as_bool(t: &[u8]) -> bool {
    match t.split_last() {
        None => false,
        Some((last, rest)) => rest.iter().any(|&b| b != 0) || (*last != 0 && *last != 0x80),
    }
}

/// The canonical encoding of a boolean result.
pub fn from_bool(v: bool) -> Vec<u8> {
    if v {
        vec![1]
    } else {
        vec![]
    }
}

/// One execution stack. The numeric width and minimal-data policy are
/// fixed at construction and applied whenever an element is read back
/// as a number.
pub struct Stack {
    stk: Vec<Vec<u8>>,
    max_num_length: usize,
    pub verify_minimal_data: bool,
}

impl Stack {
    pub fn new(max_num_length: usize, verify_minimal_data: bool) -> Self {
        Stack {
            stk: Vec::new(),
            max_num_length,
            verify_minimal_data,
        }
    }

    pub fn depth(&self) -> i32 {
        self.stk.len() as i32
    }

    /// Translate a from-the-top index into a vector position.
    fn position(&self, idx: i32) -> Result<usize, InterpreterError> {
        let sz = self.stk.len() as i32;
        if idx < 0 || idx >= sz {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("index {} is invalid for stack size {}", idx, sz),
            ));
        }
        Ok((sz - idx - 1) as usize)
    }

    pub fn push_byte_array(&mut self, data: Vec<u8>) {
        self.stk.push(data);
    }

    pub fn push_int(&mut self, n: &ScriptNumber) {
        self.push_byte_array(n.to_bytes());
    }

    pub fn push_bool(&mut self, val: bool) {
        self.push_byte_array(from_bool(val));
    }

    pub fn pop_byte_array(&mut self) -> Result<Vec<u8>, InterpreterError> {
        self.nip_n(0)
    }

    pub fn pop_int(&mut self) -> Result<ScriptNumber, InterpreterError> {
        let data = self.pop_byte_array()?;
        ScriptNumber::from_bytes(&data, self.max_num_length, self.verify_minimal_data)
    }

    pub fn pop_bool(&mut self) -> Result<bool, InterpreterError> {
        Ok(as_bool(&self.pop_byte_array()?))
    }

    pub fn peek_byte_array(&self, idx: i32) -> Result<Vec<u8>, InterpreterError> {
        let pos = self.position(idx)?;
        Ok(self.stk[pos].clone())
    }

    pub fn peek_int(&self, idx: i32) -> Result<ScriptNumber, InterpreterError> {
        let data = self.peek_byte_array(idx)?;
        ScriptNumber::from_bytes(&data, self.max_num_length, self.verify_minimal_data)
    }

    pub fn peek_bool(&self, idx: i32) -> Result<bool, InterpreterError> {
        Ok(as_bool(&self.peek_byte_array(idx)?))
    }

    /// Remove and return the element `idx` places below the top.
    fn nip_n(&mut self, idx: i32) -> Result<Vec<u8>, InterpreterError> {
        let pos = self.position(idx)?;
        Ok(self.stk.remove(pos))
    }

    pub fn nip_n_discard(&mut self, idx: i32) -> Result<(), InterpreterError> {
        self.nip_n(idx).map(|_| ())
    }

    /// OP_TUCK: copy the top element below the second.
    pub fn tuck(&mut self) -> Result<(), InterpreterError> {
        let top = self.pop_byte_array()?;
        let second = self.pop_byte_array()?;
        self.push_byte_array(top.clone());
        self.push_byte_array(second);
        self.push_byte_array(top);
        Ok(())
    }

    fn require_positive(n: i32, what: &str) -> Result<(), InterpreterError> {
        if n < 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("attempt to {} {} stack items", what, n),
            ));
        }
        Ok(())
    }

    pub fn drop_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        Self::require_positive(n, "drop")?;
        for _ in 0..n {
            self.pop_byte_array()?;
        }
        Ok(())
    }

    /// Duplicate the top `n` elements in order.
    pub fn dup_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        Self::require_positive(n, "dup")?;
        for _ in 0..n {
            let elem = self.peek_byte_array(n - 1)?;
            self.push_byte_array(elem);
        }
        Ok(())
    }

    /// Rotate the third group of `n` elements to the top.
    pub fn rot_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        Self::require_positive(n, "rotate")?;
        for _ in 0..n {
            let elem = self.nip_n(3 * n - 1)?;
            self.push_byte_array(elem);
        }
        Ok(())
    }

    /// Swap the top group of `n` elements with the group below it.
    pub fn swap_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        Self::require_positive(n, "swap")?;
        for _ in 0..n {
            let elem = self.nip_n(2 * n - 1)?;
            self.push_byte_array(elem);
        }
        Ok(())
    }

    /// Copy the second group of `n` elements over the top group.
    pub fn over_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        Self::require_positive(n, "copy over")?;
        for _ in 0..n {
            let elem = self.peek_byte_array(2 * n - 1)?;
            self.push_byte_array(elem);
        }
        Ok(())
    }

    pub fn pick_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        let elem = self.peek_byte_array(n)?;
        self.push_byte_array(elem);
        Ok(())
    }

    pub fn roll_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        let elem = self.nip_n(n)?;
        self.push_byte_array(elem);
        Ok(())
    }

    /// Snapshot the contents, bottom first.
    pub fn get_stack(&self) -> Vec<Vec<u8>> {
        self.stk.clone()
    }

    /// Replace the contents; the last element becomes the top.
    pub fn set_stack(&mut self, data: Vec<Vec<u8>>) {
        self.stk = data;
    }

    pub fn clear(&mut self) {
        self.stk.clear();
    }
}

/// Tracks nested OP_IF/OP_ELSE state during execution.
pub struct BoolStack {
    stk: Vec<bool>,
}

impl BoolStack {
    pub fn new() -> Self {
        BoolStack { stk: Vec::new() }
    }

    pub fn push_bool(&mut self, b: bool) {
        self.stk.push(b);
    }

    pub fn pop_bool(&mut self) -> Result<bool, InterpreterError> {
        self.stk.pop().ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                "bool stack empty".to_string(),
            )
        })
    }

    pub fn depth(&self) -> i32 {
        self.stk.len() as i32
    }
}

impl Default for BoolStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_of(elems: &[&[u8]]) -> Stack {
        let mut s = Stack::new(4, false);
        for e in elems {
            s.push_byte_array(e.to_vec());
        }
        s
    }

    fn drain(s: &mut Stack) -> Vec<Vec<u8>> {
        let mut out = s.get_stack();
        out.reverse();
        s.clear();
        out
    }

    #[test]
    fn test_as_bool() {
        assert!(!as_bool(&[]));
        assert!(!as_bool(&[0x00]));
        assert!(!as_bool(&[0x00, 0x00]));
        // Negative zero in any width is false.
        assert!(!as_bool(&[0x80]));
        assert!(!as_bool(&[0x00, 0x80]));
        assert!(as_bool(&[0x01]));
        assert!(as_bool(&[0x00, 0x01]));
        assert!(as_bool(&[0x80, 0x00]));
    }

    #[test]
    fn test_push_pop_views() {
        let mut s = Stack::new(4, false);
        s.push_int(&ScriptNumber::new(-5));
        s.push_bool(true);
        s.push_bool(false);
        assert_eq!(s.depth(), 3);
        assert!(!s.pop_bool().unwrap());
        assert!(s.pop_bool().unwrap());
        assert_eq!(s.pop_int().unwrap().to_int(), -5);
        assert!(s.pop_byte_array().is_err());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let s = stack_of(&[b"bottom", b"top"]);
        assert_eq!(s.peek_byte_array(0).unwrap(), b"top");
        assert_eq!(s.peek_byte_array(1).unwrap(), b"bottom");
        assert!(s.peek_byte_array(2).is_err());
        assert!(s.peek_byte_array(-1).is_err());
        assert_eq!(s.depth(), 2);
    }

    #[test]
    fn test_grouped_shuffles() {
        // swap_n(2): [a b c d] -> [c d a b]
        let mut s = stack_of(&[b"a", b"b", b"c", b"d"]);
        s.swap_n(2).unwrap();
        assert_eq!(drain(&mut s), [b"b", b"a", b"d", b"c"]);

        // rot_n(1): [a b c] -> [b c a]
        let mut s = stack_of(&[b"a", b"b", b"c"]);
        s.rot_n(1).unwrap();
        assert_eq!(drain(&mut s), [b"a", b"c", b"b"]);

        // over_n(1): [a b] -> [a b a]
        let mut s = stack_of(&[b"a", b"b"]);
        s.over_n(1).unwrap();
        assert_eq!(drain(&mut s), [b"a", b"b", b"a"]);

        // dup_n(2): [a b] -> [a b a b]
        let mut s = stack_of(&[b"a", b"b"]);
        s.dup_n(2).unwrap();
        assert_eq!(drain(&mut s), [b"b", b"a", b"b", b"a"]);

        assert!(stack_of(&[b"a"]).swap_n(0).is_err());
        assert!(stack_of(&[b"a"]).swap_n(1).is_err());
    }

    #[test]
    fn test_tuck_pick_roll() {
        let mut s = stack_of(&[b"a", b"b"]);
        s.tuck().unwrap();
        assert_eq!(drain(&mut s), [b"b", b"a", b"b"]);

        let mut s = stack_of(&[b"a", b"b", b"c"]);
        s.pick_n(2).unwrap();
        assert_eq!(s.depth(), 4);
        assert_eq!(s.peek_byte_array(0).unwrap(), b"a");

        let mut s = stack_of(&[b"a", b"b", b"c"]);
        s.roll_n(2).unwrap();
        assert_eq!(drain(&mut s), [b"a", b"c", b"b"]);
    }

    #[test]
    fn test_minimal_data_policy_applies_on_pop() {
        let mut s = Stack::new(4, true);
        s.push_byte_array(vec![0x01, 0x00]);
        assert!(s.pop_int().is_err());

        let mut s = Stack::new(4, false);
        s.push_byte_array(vec![0x01, 0x00]);
        assert_eq!(s.pop_int().unwrap().to_int(), 1);
    }
}
