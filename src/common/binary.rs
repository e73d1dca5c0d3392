//! Binary data parsing utilities shared across the decoder.
//!
//! [`ByteCursor`] is the bounded reader every layer decodes through. A read
//! either returns exactly the requested number of bytes or fails with
//! [`BinaryError::InsufficientData`]; nothing is zero-padded.

use zerocopy::{F64, FromBytes, I16, I32, LE, U16, U32};

/// Binary parsing error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BinaryError {
    /// Not enough data to read the requested type
    #[error("Insufficient data: expected {expected}, got {available}")]
    InsufficientData { expected: usize, available: usize },
    /// Failed to parse the data
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for binary operations
pub type BinaryResult<T> = Result<T, BinaryError>;

/// Read a little-endian u16 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use longan::common::binary::read_u16_le;
/// let data = [0x34, 0x12, 0x78, 0x56];
/// assert_eq!(read_u16_le(&data, 0).unwrap(), 0x1234);
/// assert_eq!(read_u16_le(&data, 2).unwrap(), 0x5678);
/// ```
#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> BinaryResult<u16> {
    let bytes = slice_at(data, offset, 2)?;
    U16::<LE>::read_from_bytes(bytes)
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read u16".to_string()))
}

/// Read a little-endian u32 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use longan::common::binary::read_u32_le;
/// let data = [0x78, 0x56, 0x34, 0x12];
/// assert_eq!(read_u32_le(&data, 0).unwrap(), 0x12345678);
/// ```
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> BinaryResult<u32> {
    let bytes = slice_at(data, offset, 4)?;
    U32::<LE>::read_from_bytes(bytes)
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read u32".to_string()))
}

#[inline]
fn slice_at(data: &[u8], offset: usize, len: usize) -> BinaryResult<&[u8]> {
    let end = offset.checked_add(len).ok_or(BinaryError::InsufficientData {
        expected: usize::MAX,
        available: data.len(),
    })?;
    data.get(offset..end).ok_or(BinaryError::InsufficientData {
        expected: end,
        available: data.len(),
    })
}

/// Decode UTF-16LE bytes into a `String`, replacing unpaired surrogates.
///
/// A trailing odd byte is ignored.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let even = bytes.len() & !1;
    let (text, _) = encoding_rs::UTF_16LE.decode_without_bom_handling(&bytes[..even]);
    text.into_owned()
}

/// A bounded, forward-only reader over a byte slice.
///
/// The cursor owns its position exclusively; cloning it produces an
/// independent cursor at the same position.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at the start of `data`.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read offset from the start of the underlying slice.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move back to an earlier position, e.g. to retain bytes of a value
    /// that failed to decode.
    #[inline]
    pub fn rewind_to(&mut self, pos: usize) {
        self.pos = pos.min(self.pos);
    }

    /// Number of bytes left before the bound.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether the cursor sits exactly at its bound.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Read exactly `n` bytes, failing without consuming anything if fewer remain.
    #[inline]
    pub fn readn(&mut self, n: usize) -> BinaryResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(BinaryError::InsufficientData {
                expected: n,
                available: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..self.pos])
    }

    /// Like [`readn`](Self::readn), but reports a clean end of input as `Ok(None)`.
    ///
    /// Running out of data part-way through the value is still an error.
    #[inline]
    pub fn try_readn(&mut self, n: usize) -> BinaryResult<Option<&'a [u8]>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.readn(n).map(Some)
    }

    /// Consume and return everything up to the bound.
    #[inline]
    pub fn rest(&mut self) -> &'a [u8] {
        let start = self.pos;
        self.pos = self.data.len();
        &self.data[start..]
    }

    /// Peek at the unread bytes without consuming them.
    #[inline]
    pub fn peek_rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    #[inline]
    pub fn read_u8(&mut self) -> BinaryResult<u8> {
        Ok(self.readn(1)?[0])
    }

    #[inline]
    pub fn read_i8(&mut self) -> BinaryResult<i8> {
        Ok(self.readn(1)?[0] as i8)
    }

    #[inline]
    pub fn read_u16(&mut self) -> BinaryResult<u16> {
        let bytes = self.readn(2)?;
        Ok(U16::<LE>::read_from_bytes(bytes)
            .map(|v| v.get())
            .unwrap_or_default())
    }

    #[inline]
    pub fn read_i16(&mut self) -> BinaryResult<i16> {
        let bytes = self.readn(2)?;
        Ok(I16::<LE>::read_from_bytes(bytes)
            .map(|v| v.get())
            .unwrap_or_default())
    }

    #[inline]
    pub fn read_u32(&mut self) -> BinaryResult<u32> {
        let bytes = self.readn(4)?;
        Ok(U32::<LE>::read_from_bytes(bytes)
            .map(|v| v.get())
            .unwrap_or_default())
    }

    #[inline]
    pub fn read_i32(&mut self) -> BinaryResult<i32> {
        let bytes = self.readn(4)?;
        Ok(I32::<LE>::read_from_bytes(bytes)
            .map(|v| v.get())
            .unwrap_or_default())
    }

    #[inline]
    pub fn read_f64(&mut self) -> BinaryResult<f64> {
        let bytes = self.readn(8)?;
        Ok(F64::<LE>::read_from_bytes(bytes)
            .map(|v| v.get())
            .unwrap_or_default())
    }

    /// Read `chars` UTF-16LE code units and decode them.
    pub fn read_utf16(&mut self, chars: usize) -> BinaryResult<String> {
        let byte_len = chars.checked_mul(2).ok_or(BinaryError::InsufficientData {
            expected: usize::MAX,
            available: self.remaining(),
        })?;
        Ok(decode_utf16le(self.readn(byte_len)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u16_le() {
        let data = [0x34, 0x12, 0x78, 0x56];
        assert!(read_u16_le(&data, 0).is_ok_and(|v| v == 0x1234));
        assert!(read_u16_le(&data, 2).is_ok_and(|v| v == 0x5678));
        assert!(read_u16_le(&data, 3).is_err());
    }

    #[test]
    fn test_read_u32_le() {
        let data = [0x78, 0x56, 0x34, 0x12];
        assert!(read_u32_le(&data, 0).is_ok_and(|v| v == 0x12345678));
        assert!(read_u32_le(&data, 1).is_err());
        assert!(read_u32_le(&data, usize::MAX).is_err());
    }

    #[test]
    fn test_cursor_sequential_reads() {
        let data = [0x01, 0xFF, 0xFF, 0x78, 0x56, 0x34, 0x12];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u8().unwrap(), 1);
        assert_eq!(cursor.read_i16().unwrap(), -1);
        assert_eq!(cursor.read_u32().unwrap(), 0x12345678);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_cursor_truncation_does_not_consume() {
        let data = [0x01, 0x02];
        let mut cursor = ByteCursor::new(&data);
        let err = cursor.read_u32().unwrap_err();
        assert_eq!(
            err,
            BinaryError::InsufficientData {
                expected: 4,
                available: 2
            }
        );
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_u16().unwrap(), 0x0201);
    }

    #[test]
    fn test_try_readn_distinguishes_clean_end() {
        let data = [0xAA, 0xBB, 0xCC];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.try_readn(2).unwrap(), Some(&data[..2]));
        assert!(cursor.try_readn(2).is_err());
        cursor.readn(1).unwrap();
        assert_eq!(cursor.try_readn(2).unwrap(), None);
    }

    #[test]
    fn test_read_f64() {
        let data = 1.5f64.to_le_bytes();
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_f64().unwrap().to_bits(), 1.5f64.to_bits());
    }

    #[test]
    fn test_decode_utf16le() {
        let data = [0x48, 0x00, 0x69, 0x00, 0x5C, 0xD5];
        assert_eq!(decode_utf16le(&data), "Hi\u{D55C}");
        assert_eq!(decode_utf16le(&data[..5]), "Hi");
    }

    #[test]
    fn test_read_utf16() {
        let data = [0x41, 0x00, 0x42, 0x00];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_utf16(2).unwrap(), "AB");
        assert!(ByteCursor::new(&data).read_utf16(3).is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn short_buffers_never_yield_values(
                data in proptest::collection::vec(any::<u8>(), 0..4)
            ) {
                let mut cursor = ByteCursor::new(&data);
                prop_assert!(cursor.read_u32().is_err());
                prop_assert!(cursor.read_f64().is_err());
                prop_assert_eq!(cursor.position(), 0);
            }

            #[test]
            fn reads_consume_exact_widths(data in proptest::collection::vec(any::<u8>(), 8..32)) {
                let mut cursor = ByteCursor::new(&data);
                let value = cursor.read_u32().unwrap();
                prop_assert_eq!(value.to_le_bytes(), [data[0], data[1], data[2], data[3]]);
                prop_assert_eq!(cursor.remaining(), data.len() - 4);
            }
        }
    }
}
