//! Byte-level wire codecs.
//!
//! Provides the Bitcoin variable-length integer (`VarInt`) and cursor-style
//! little-endian reader/writer helpers used by the transaction and script
//! serializers.

use crate::PrimitivesError;

/// A Bitcoin variable-length integer.
///
/// Values below 0xfd serialize as a single byte; larger values carry a
/// one-byte marker followed by a 2, 4, or 8 byte little-endian integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarInt(pub u64);

impl VarInt {
    /// The serialized length in bytes of this value.
    pub fn length(&self) -> usize {
        match self.0 {
            0..=0xfc => 1,
            0xfd..=0xffff => 3,
            0x10000..=0xffff_ffff => 5,
            _ => 9,
        }
    }

    /// The wrapped value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.0 {
            0..=0xfc => vec![self.0 as u8],
            0xfd..=0xffff => {
                let mut out = vec![0xfd];
                out.extend_from_slice(&(self.0 as u16).to_le_bytes());
                out
            }
            0x10000..=0xffff_ffff => {
                let mut out = vec![0xfe];
                out.extend_from_slice(&(self.0 as u32).to_le_bytes());
                out
            }
            _ => {
                let mut out = vec![0xff];
                out.extend_from_slice(&self.0.to_le_bytes());
                out
            }
        }
    }

    /// Parse a VarInt from the front of a byte slice.
    ///
    /// # Arguments
    /// * `bytes` - Buffer beginning with a serialized varint.
    ///
    /// # Returns
    /// The parsed value and the number of bytes consumed.
    pub fn from_bytes(bytes: &[u8]) -> Result<(VarInt, usize), PrimitivesError> {
        let first = *bytes.first().ok_or(PrimitivesError::UnexpectedEof)?;
        match first {
            0xfd => {
                if bytes.len() < 3 {
                    return Err(PrimitivesError::UnexpectedEof);
                }
                let v = u16::from_le_bytes([bytes[1], bytes[2]]);
                Ok((VarInt(v as u64), 3))
            }
            0xfe => {
                if bytes.len() < 5 {
                    return Err(PrimitivesError::UnexpectedEof);
                }
                let v = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
                Ok((VarInt(v as u64), 5))
            }
            0xff => {
                if bytes.len() < 9 {
                    return Err(PrimitivesError::UnexpectedEof);
                }
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&bytes[1..9]);
                Ok((VarInt(u64::from_le_bytes(arr)), 9))
            }
            v => Ok((VarInt(v as u64), 1)),
        }
    }
}

/// Cursor over a byte slice with little-endian integer accessors.
///
/// Every read advances the cursor; reading past the end returns
/// `PrimitivesError::UnexpectedEof` rather than panicking.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True when every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], PrimitivesError> {
        if self.remaining() < n {
            return Err(PrimitivesError::UnexpectedEof);
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, PrimitivesError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a little-endian u16.
    pub fn read_u16_le(&mut self) -> Result<u16, PrimitivesError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a little-endian u32.
    pub fn read_u32_le(&mut self) -> Result<u32, PrimitivesError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a little-endian u64.
    pub fn read_u64_le(&mut self) -> Result<u64, PrimitivesError> {
        let b = self.read_bytes(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_le_bytes(arr))
    }

    /// Read a little-endian i64.
    pub fn read_i64_le(&mut self) -> Result<i64, PrimitivesError> {
        Ok(self.read_u64_le()? as i64)
    }

    /// Read a variable-length integer.
    pub fn read_varint(&mut self) -> Result<u64, PrimitivesError> {
        let (v, consumed) = VarInt::from_bytes(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(v.0)
    }
}

/// Growable buffer with little-endian integer writers.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        ByteWriter { buf: Vec::new() }
    }

    /// Create a writer with reserved capacity.
    pub fn with_capacity(cap: usize) -> Self {
        ByteWriter { buf: Vec::with_capacity(cap) }
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a single byte.
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Append a little-endian u16.
    pub fn write_u16_le(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Append a little-endian u32.
    pub fn write_u32_le(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Append a little-endian u64.
    pub fn write_u64_le(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Append a little-endian i64.
    pub fn write_i64_le(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Append a variable-length integer.
    pub fn write_varint(&mut self, v: u64) {
        self.buf.extend_from_slice(&VarInt(v).to_bytes());
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrow the accumulated bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer, returning the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Boundary values for each varint width.
    #[test]
    fn test_varint_encoding_widths() {
        let cases: &[(u64, Vec<u8>)] = &[
            (0, vec![0x00]),
            (0xfc, vec![0xfc]),
            (0xfd, vec![0xfd, 0xfd, 0x00]),
            (0xffff, vec![0xfd, 0xff, 0xff]),
            (0x10000, vec![0xfe, 0x00, 0x00, 0x01, 0x00]),
            (0xffff_ffff, vec![0xfe, 0xff, 0xff, 0xff, 0xff]),
            (
                0x1_0000_0000,
                vec![0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00],
            ),
            (
                u64::MAX,
                vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
            ),
        ];

        for (value, encoded) in cases {
            let v = VarInt(*value);
            assert_eq!(&v.to_bytes(), encoded, "encode {}", value);
            assert_eq!(v.length(), encoded.len(), "length {}", value);

            let (decoded, consumed) = VarInt::from_bytes(encoded).unwrap();
            assert_eq!(decoded.0, *value, "decode {}", value);
            assert_eq!(consumed, encoded.len(), "consumed {}", value);
        }
    }

    /// Truncated varint buffers are rejected.
    #[test]
    fn test_varint_truncated() {
        assert!(VarInt::from_bytes(&[]).is_err());
        assert!(VarInt::from_bytes(&[0xfd, 0x01]).is_err());
        assert!(VarInt::from_bytes(&[0xfe, 0x01, 0x02, 0x03]).is_err());
        assert!(VarInt::from_bytes(&[0xff, 0x01]).is_err());
    }

    /// Writer output parses back field by field.
    #[test]
    fn test_reader_writer_roundtrip() {
        let mut w = ByteWriter::new();
        w.write_u8(0xab);
        w.write_u16_le(0x1234);
        w.write_u32_le(0xdead_beef);
        w.write_u64_le(0x0102_0304_0506_0708);
        w.write_i64_le(-1);
        w.write_varint(70015);
        w.write_bytes(b"payload");

        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 0xab);
        assert_eq!(r.read_u16_le().unwrap(), 0x1234);
        assert_eq!(r.read_u32_le().unwrap(), 0xdead_beef);
        assert_eq!(r.read_u64_le().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(r.read_i64_le().unwrap(), -1);
        assert_eq!(r.read_varint().unwrap(), 70015);
        assert_eq!(r.read_bytes(7).unwrap(), b"payload");
        assert!(r.is_empty());
    }

    /// Reads past the end of the buffer fail rather than panic.
    #[test]
    fn test_reader_eof() {
        let mut r = ByteReader::new(&[0x01, 0x02]);
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert!(r.read_u32_le().is_err());
        // A failed read does not consume.
        assert_eq!(r.remaining(), 1);
        assert_eq!(r.read_u8().unwrap(), 0x02);
        assert!(r.read_u8().is_err());
    }

    proptest! {
        /// Any u64 survives a varint encode/decode cycle.
        #[test]
        fn prop_varint_roundtrip(value in any::<u64>()) {
            let encoded = VarInt(value).to_bytes();
            let (decoded, consumed) = VarInt::from_bytes(&encoded).unwrap();
            prop_assert_eq!(decoded.0, value);
            prop_assert_eq!(consumed, encoded.len());
        }
    }
}
