//! Script number arithmetic.
//!
//! Stack numbers are little-endian magnitudes with a sign bit in the
//! high bit of the final byte, so 0x81 is -1 and the empty array is 0.
//! Numeric opcodes bound their operands to the configured width (4
//! bytes, or 8 under the extended opcode set) but results are exact
//! big-integer values and may serialize wider; they stay valid on the
//! stack until something reinterprets them as numbers.

use std::cmp::Ordering;

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};

use super::error::{InterpreterError, InterpreterErrorCode};

/// An exact integer as the numeric opcodes see it.
#[derive(Debug, Clone)]
pub struct ScriptNumber {
    pub val: BigInt,
}

impl ScriptNumber {
    pub fn new(val: i64) -> Self {
        ScriptNumber {
            val: BigInt::from(val),
        }
    }

    /// Decode a stack element as a number.
    ///
    /// Fails with `NumberTooBig` when the encoding exceeds
    /// `script_num_len` bytes, and with `MinimalData` when
    /// `require_minimal` is set and a shorter encoding exists.
    pub fn from_bytes(
        bb: &[u8],
        script_num_len: usize,
        require_minimal: bool,
    ) -> Result<Self, InterpreterError> {
        if bb.len() > script_num_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "numeric value encoded as {:02x?} is {} bytes which exceeds the max allowed of {}",
                    bb, bb.len(), script_num_len
                ),
            ));
        }
        if require_minimal {
            reject_non_minimal(bb)?;
        }

        let (last, rest) = match bb.split_last() {
            Some(split) => split,
            None => return Ok(ScriptNumber { val: BigInt::zero() }),
        };

        // Separate the sign bit from the magnitude before decoding.
        let mut magnitude = rest.to_vec();
        magnitude.push(last & 0x7f);
        let val = BigInt::from_bytes_le(
            if last & 0x80 != 0 { Sign::Minus } else { Sign::Plus },
            &magnitude,
        );
        Ok(ScriptNumber { val })
    }

    /// Serialize with the sign-bit convention; zero is the empty array.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.val.is_zero() {
            return vec![];
        }
        let (sign, mut bytes) = self.val.to_bytes_le();
        let sign_bit = if sign == Sign::Minus { 0x80 } else { 0x00 };

        // The magnitude's own top bit would be read back as a sign, so
        // a padding byte is appended when it is set.
        if bytes[bytes.len() - 1] & 0x80 != 0 {
            bytes.push(sign_bit);
        } else {
            let last = bytes.len() - 1;
            bytes[last] |= sign_bit;
        }
        bytes
    }

    // Mutating arithmetic, each returning self for chaining.

    pub fn add(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val += &other.val;
        self
    }

    pub fn sub(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val -= &other.val;
        self
    }

    pub fn mul(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val *= &other.val;
        self
    }

    /// Quotient of truncated division, as OP_DIV defines it.
    pub fn div(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val = &self.val / &other.val;
        self
    }

    /// Remainder of truncated division; takes the sign of the dividend.
    pub fn modulo(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val = &self.val % &other.val;
        self
    }

    pub fn incr(&mut self) -> &mut Self {
        self.val += 1;
        self
    }

    pub fn decr(&mut self) -> &mut Self {
        self.val -= 1;
        self
    }

    pub fn neg(&mut self) -> &mut Self {
        self.val = -std::mem::take(&mut self.val);
        self
    }

    pub fn abs(&mut self) -> &mut Self {
        if self.val.is_negative() {
            self.neg();
        }
        self
    }

    pub fn set(&mut self, i: i64) -> &mut Self {
        self.val = BigInt::from(i);
        self
    }

    // Comparisons.

    fn order(&self, other: &ScriptNumber) -> Ordering {
        self.val.cmp(&other.val)
    }

    fn order_int(&self, i: i64) -> Ordering {
        self.val.cmp(&BigInt::from(i))
    }

    pub fn is_zero(&self) -> bool {
        self.val.is_zero()
    }

    pub fn less_than(&self, other: &ScriptNumber) -> bool {
        self.order(other) == Ordering::Less
    }

    pub fn less_than_int(&self, i: i64) -> bool {
        self.order_int(i) == Ordering::Less
    }

    pub fn less_than_or_equal(&self, other: &ScriptNumber) -> bool {
        self.order(other) != Ordering::Greater
    }

    pub fn greater_than(&self, other: &ScriptNumber) -> bool {
        self.order(other) == Ordering::Greater
    }

    pub fn greater_than_int(&self, i: i64) -> bool {
        self.order_int(i) == Ordering::Greater
    }

    pub fn greater_than_or_equal(&self, other: &ScriptNumber) -> bool {
        self.order(other) != Ordering::Less
    }

    pub fn equal(&self, other: &ScriptNumber) -> bool {
        self.order(other) == Ordering::Equal
    }

    pub fn equal_int(&self, i: i64) -> bool {
        self.order_int(i) == Ordering::Equal
    }

    // Narrowing conversions.

    /// Saturating conversion to i32.
    pub fn to_i32(&self) -> i32 {
        match self.val.to_i64() {
            Some(v) => v.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
            None if self.val.is_negative() => i32::MIN,
            None => i32::MAX,
        }
    }

    /// Saturating conversion to i64.
    pub fn to_i64(&self) -> i64 {
        match self.val.to_i64() {
            Some(v) => v,
            None if self.val.is_negative() => i64::MIN,
            None => i64::MAX,
        }
    }

    /// Conversion to i64, zero when the value does not fit.
    pub fn to_int(&self) -> i64 {
        self.val.to_i64().unwrap_or(0)
    }
}

/// Shorten a byte array to the minimal numeric encoding of the same
/// value. OP_BIN2NUM applies this to arbitrary stack data.
pub fn minimally_encode(data: &[u8]) -> Vec<u8> {
    let (last, rest) = match data.split_last() {
        Some(split) => split,
        None => return vec![],
    };
    // Anything but 0x00 or 0x80 in the final byte is already minimal.
    if last & 0x7f != 0 {
        return data.to_vec();
    }

    let sign_bit = last & 0x80;
    let mut out = rest.to_vec();
    while out.last() == Some(&0) {
        out.pop();
    }
    match out.last_mut() {
        // Only zero bytes under the sign: the value is zero.
        None => vec![],
        Some(top) if *top & 0x80 != 0 => {
            // The top magnitude bit is taken, keep a separate sign byte.
            out.push(sign_bit);
            out
        }
        Some(top) => {
            *top |= sign_bit;
            out
        }
    }
}

/// Fail when a shorter encoding of the same value exists.
fn reject_non_minimal(v: &[u8]) -> Result<(), InterpreterError> {
    let (last, rest) = match v.split_last() {
        Some(split) => split,
        None => return Ok(()),
    };
    // A final 0x00/0x80 is only justified by a preceding byte whose
    // high bit would otherwise read as the sign.
    if last & 0x7f == 0 && rest.last().map_or(true, |b| b & 0x80 == 0) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::MinimalData,
            format!("numeric value encoded as {:02x?} is not minimally encoded", v),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_of(i: i64) -> Vec<u8> {
        ScriptNumber::new(i).to_bytes()
    }

    fn decode(hex_str: &str, max_len: usize, minimal: bool) -> Result<i64, InterpreterError> {
        let bytes = hex::decode(hex_str).unwrap();
        ScriptNumber::from_bytes(&bytes, max_len, minimal).map(|n| n.to_int())
    }

    #[test]
    fn test_encoding_vectors() {
        assert_eq!(bytes_of(0), Vec::<u8>::new());
        assert_eq!(bytes_of(1), vec![0x01]);
        assert_eq!(bytes_of(-1), vec![0x81]);
        assert_eq!(bytes_of(127), vec![0x7f]);
        assert_eq!(bytes_of(-127), vec![0xff]);
        // 128 sets the high bit, forcing a padding byte.
        assert_eq!(bytes_of(128), vec![0x80, 0x00]);
        assert_eq!(bytes_of(-128), vec![0x80, 0x80]);
        assert_eq!(bytes_of(256), vec![0x00, 0x01]);
        assert_eq!(bytes_of(-256), vec![0x00, 0x81]);
        assert_eq!(bytes_of(32767), vec![0xff, 0x7f]);
        assert_eq!(bytes_of(-32768), vec![0x00, 0x80, 0x80]);
        assert_eq!(bytes_of(2147483647), vec![0xff, 0xff, 0xff, 0x7f]);
        assert_eq!(bytes_of(-2147483647), vec![0xff, 0xff, 0xff, 0xff]);
        // Results beyond the 4-byte operand width still serialize.
        assert_eq!(bytes_of(2147483648), vec![0x00, 0x00, 0x00, 0x80, 0x00]);
        assert_eq!(bytes_of(-2147483648), vec![0x00, 0x00, 0x00, 0x80, 0x80]);
        assert_eq!(
            bytes_of(i64::MAX),
            vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f]
        );
    }

    /// Every encoded value decodes back to itself.
    #[test]
    fn test_encode_decode_identity() {
        for i in [0i64, 1, -1, 127, -128, 255, 256, -129, 32768, -65535, 2147483647] {
            let bytes = bytes_of(i);
            let back = ScriptNumber::from_bytes(&bytes, 8, true).unwrap();
            assert_eq!(back.to_int(), i, "value {}", i);
        }
    }

    #[test]
    fn test_decode_enforces_width() {
        assert_eq!(decode("ffffff7f", 4, true).unwrap(), 2147483647);
        // A 5-byte encoding is rejected at the 4-byte width but decodes
        // under the extended 8-byte width.
        assert!(decode("0000008000", 4, true).is_err());
        assert_eq!(decode("0000008000", 8, true).unwrap(), 2147483648);
        assert_eq!(decode("ffffffffffffff7f", 8, true).unwrap(), i64::MAX);
        assert_eq!(decode("ffffffffffffffff", 8, true).unwrap(), -(i64::MAX));
    }

    #[test]
    fn test_decode_minimal_encoding() {
        // Negative zero, lone zero, and padded values all have shorter forms.
        assert!(decode("80", 4, true).is_err());
        assert!(decode("00", 4, true).is_err());
        assert!(decode("0100", 4, true).is_err());
        // The padding byte after a set high bit is the minimal form.
        assert_eq!(decode("8000", 4, true).unwrap(), 128);
        assert_eq!(decode("ff00", 4, true).unwrap(), 255);
        // Without the flag the same encodings decode fine.
        assert_eq!(decode("00", 4, false).unwrap(), 0);
        assert_eq!(decode("0100", 4, false).unwrap(), 1);
        assert_eq!(decode("80", 4, false).unwrap(), 0);
    }

    /// OP_DIV and OP_MOD truncate toward zero.
    #[test]
    fn test_truncated_division() {
        let two = ScriptNumber::new(2);
        assert_eq!(ScriptNumber::new(-7).div(&two).to_int(), -3);
        assert_eq!(ScriptNumber::new(7).div(&two).to_int(), 3);
        assert_eq!(ScriptNumber::new(-7).modulo(&two).to_int(), -1);
        assert_eq!(ScriptNumber::new(7).modulo(&ScriptNumber::new(-2)).to_int(), 1);
    }

    #[test]
    fn test_chained_arithmetic() {
        let mut n = ScriptNumber::new(10);
        n.add(&ScriptNumber::new(5)).sub(&ScriptNumber::new(3)).incr();
        assert_eq!(n.to_int(), 13);
        n.neg();
        assert_eq!(n.to_int(), -13);
        n.abs();
        assert_eq!(n.to_int(), 13);
        n.set(-4).mul(&ScriptNumber::new(6));
        assert_eq!(n.to_int(), -24);
    }

    #[test]
    fn test_narrowing_saturates() {
        assert_eq!(ScriptNumber::new(2147483648).to_i32(), i32::MAX);
        assert_eq!(ScriptNumber::new(-2147483649).to_i32(), i32::MIN);
        assert_eq!(ScriptNumber::new(42).to_i32(), 42);

        let mut huge = ScriptNumber::new(i64::MAX);
        huge.mul(&ScriptNumber::new(2));
        assert_eq!(huge.to_i64(), i64::MAX);
        assert_eq!(huge.to_int(), 0);
        huge.neg();
        assert_eq!(huge.to_i64(), i64::MIN);
    }

    #[test]
    fn test_minimally_encode() {
        assert_eq!(minimally_encode(&[]), Vec::<u8>::new());
        assert_eq!(minimally_encode(&[0x7f]), vec![0x7f]);
        assert_eq!(minimally_encode(&[0x00]), Vec::<u8>::new());
        assert_eq!(minimally_encode(&[0x80]), Vec::<u8>::new());
        assert_eq!(minimally_encode(&[0x00, 0x00, 0x80]), Vec::<u8>::new());
        // Trailing zeros collapse into the nearest payload byte.
        assert_eq!(minimally_encode(&[0x01, 0x00, 0x00]), vec![0x01]);
        assert_eq!(minimally_encode(&[0x01, 0x00, 0x80]), vec![0x81]);
        // A set high bit keeps its padding byte.
        assert_eq!(minimally_encode(&[0xff, 0x00, 0x80]), vec![0xff, 0x80]);
        assert_eq!(minimally_encode(&[0xff, 0x00]), vec![0xff, 0x00]);
    }
}
