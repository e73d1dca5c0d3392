//! Record framing.
//!
//! Every record starts with a 32-bit little-endian header:
//!
//! ```text
//!  31        20 19        10 9         0
//! +------------+------------+-----------+
//! |    size    |   level    |    tag    |
//! +------------+------------+-----------+
//! ```
//!
//! A size of `0xFFF` means the real size follows as another u32.

use super::consts::tag_name;
use bytes::Bytes;
use std::borrow::Cow;
use std::io::{self, Read};

pub const EXTENDED_SIZE: u32 = 0xFFF;

/// Default ceiling for a single record payload.
pub const DEFAULT_MAX_RECORD_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize)]
pub enum FramingError {
    #[error("record {seqno}: header truncated at offset {offset}")]
    TruncatedHeader { seqno: usize, offset: u64 },
    #[error("record {seqno}: payload of {expected} bytes truncated to {available}")]
    TruncatedPayload {
        seqno: usize,
        expected: usize,
        available: usize,
    },
    #[error("record {seqno}: size {size} exceeds limit {limit}")]
    RecordTooLarge { seqno: usize, size: usize, limit: usize },
    #[error(
        "record {seqno}: level {level} nests more than one level under previous level {previous}"
    )]
    LevelJump { seqno: usize, level: u16, previous: u16 },
    #[error("record {seqno}: level {level} is below base level {base}")]
    LevelBelowBase { seqno: usize, level: u16, base: u16 },
    #[error("record {seqno}: read failed: {message}")]
    Io { seqno: usize, message: String },
}

/// Split a record header word into `(tag, level, size)`.
#[inline]
pub fn decode_header(word: u32) -> (u16, u16, u32) {
    let tag = (word & 0x3FF) as u16;
    let level = ((word >> 10) & 0x3FF) as u16;
    let size = word >> 20;
    (tag, level, size)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub tag: u16,
    pub level: u16,
    pub payload: Bytes,
    /// Position within the stream, starting at 0
    pub seqno: usize,
}

impl RawRecord {
    pub fn tag_name(&self) -> Cow<'static, str> {
        tag_name(self.tag)
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// Forward-only reader producing one [`RawRecord`] per header.
///
/// Ends with `None` at a clean end of stream. After the first error the
/// reader is exhausted.
pub struct RecordReader<R> {
    reader: R,
    offset: u64,
    seqno: usize,
    max_record_size: usize,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            seqno: 0,
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
            done: false,
        }
    }

    pub fn with_max_record_size(mut self, limit: usize) -> Self {
        self.max_record_size = limit;
        self
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn io_error(&self, err: io::Error) -> FramingError {
        FramingError::Io {
            seqno: self.seqno,
            message: err.to_string(),
        }
    }

    fn truncated_header(&self) -> FramingError {
        FramingError::TruncatedHeader {
            seqno: self.seqno,
            offset: self.offset,
        }
    }

    /// Read a u32 header word. `Ok(None)` only when no byte at all was left.
    fn read_word(&mut self) -> Result<Option<u32>, FramingError> {
        let mut buf = [0u8; 4];
        let read = read_up_to(&mut self.reader, &mut buf).map_err(|e| self.io_error(e))?;
        match read {
            4 => {
                self.offset += 4;
                Ok(Some(u32::from_le_bytes(buf)))
            },
            0 => Ok(None),
            _ => Err(self.truncated_header()),
        }
    }

    fn read_record(&mut self) -> Result<Option<RawRecord>, FramingError> {
        let Some(word) = self.read_word()? else {
            return Ok(None);
        };
        let (tag, level, size) = decode_header(word);
        let size = if size == EXTENDED_SIZE {
            self.read_word()?.ok_or_else(|| self.truncated_header())?
        } else {
            size
        } as usize;

        if size > self.max_record_size {
            return Err(FramingError::RecordTooLarge {
                seqno: self.seqno,
                size,
                limit: self.max_record_size,
            });
        }

        let mut payload = vec![0u8; size];
        let read = read_up_to(&mut self.reader, &mut payload).map_err(|e| self.io_error(e))?;
        self.offset += read as u64;
        if read < size {
            return Err(FramingError::TruncatedPayload {
                seqno: self.seqno,
                expected: size,
                available: read,
            });
        }

        let record = RawRecord {
            tag,
            level,
            payload: Bytes::from(payload),
            seqno: self.seqno,
        };
        self.seqno += 1;
        Ok(Some(record))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<RawRecord, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            },
            Err(e) => {
                self.done = true;
                Some(Err(e))
            },
        }
    }
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Serialize one record, choosing the extended size form when needed.
#[cfg(test)]
pub(crate) fn encode_record(tag: u16, level: u16, payload: &[u8]) -> Vec<u8> {
    let size = payload.len() as u32;
    let short = if size >= EXTENDED_SIZE { EXTENDED_SIZE } else { size };
    let word = (tag as u32 & 0x3FF) | ((level as u32 & 0x3FF) << 10) | (short << 20);
    let mut out = word.to_le_bytes().to_vec();
    if short == EXTENDED_SIZE {
        out.extend_from_slice(&size.to_le_bytes());
    }
    out.extend_from_slice(payload);
    out
}
