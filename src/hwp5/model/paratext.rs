//! `PARA_TEXT` payloads: UTF-16 text interleaved with control characters.
//!
//! Code units below 32 are controls. Plain controls occupy one unit; inline
//! and extended controls occupy eight, with the code repeated in the last
//! unit. Extended controls carry the id of the control record they anchor.

use crate::common::binary::decode_utf16le;
use crate::hwp5::consts::Chid;
use bytes::Bytes;
use serde::Serialize;

/// Size in bytes of an inline or extended control.
const WIDE_CONTROL_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControlKind {
    /// Occupies one code unit
    Char,
    /// Eight units with an inline parameter
    Inline,
    /// Eight units pointing at a control record
    Extended,
}

impl ControlKind {
    pub fn of(code: u16) -> Option<Self> {
        match code {
            0 | 10 | 13 | 24..=31 => Some(ControlKind::Char),
            4..=9 | 19 | 20 => Some(ControlKind::Inline),
            1..=3 | 11 | 12 | 14..=18 | 21..=23 => Some(ControlKind::Extended),
            _ => None,
        }
    }

    pub fn size(self) -> usize {
        match self {
            ControlKind::Char => 2,
            ControlKind::Inline | ControlKind::Extended => WIDE_CONTROL_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TextChunk {
    Text(String),
    Control {
        code: u16,
        kind: ControlKind,
        /// Anchored control id, for extended controls
        chid: Option<Chid>,
        /// The twelve parameter bytes of inline and extended controls
        param: Bytes,
    },
}

impl TextChunk {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TextChunk::Text(s) => Some(s),
            TextChunk::Control { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParaTextError {
    #[error("odd byte count {0}")]
    OddLength(usize),
    #[error("control {code} at byte {offset} needs {expected} bytes, {available} remain")]
    TruncatedControl {
        code: u16,
        offset: usize,
        expected: usize,
        available: usize,
    },
}

/// Split a `PARA_TEXT` payload into text runs and controls.
pub fn decode_paratext(data: &[u8]) -> Result<Vec<TextChunk>, ParaTextError> {
    if data.len() % 2 != 0 {
        return Err(ParaTextError::OddLength(data.len()));
    }

    let mut chunks = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;
    while pos < data.len() {
        let code = u16::from_le_bytes([data[pos], data[pos + 1]]);
        let Some(kind) = ControlKind::of(code) else {
            pos += 2;
            continue;
        };

        if text_start < pos {
            chunks.push(TextChunk::Text(decode_utf16le(&data[text_start..pos])));
        }
        let size = kind.size();
        let raw = data
            .get(pos..pos + size)
            .ok_or(ParaTextError::TruncatedControl {
                code,
                offset: pos,
                expected: size,
                available: data.len() - pos,
            })?;
        let param = if size == WIDE_CONTROL_SIZE {
            Bytes::copy_from_slice(&raw[2..14])
        } else {
            Bytes::new()
        };
        let chid = (kind == ControlKind::Extended)
            .then(|| Chid::from_raw(u32::from_le_bytes([raw[2], raw[3], raw[4], raw[5]])));
        chunks.push(TextChunk::Control {
            code,
            kind,
            chid,
            param,
        });

        pos += size;
        text_start = pos;
    }
    if text_start < data.len() {
        chunks.push(TextChunk::Text(decode_utf16le(&data[text_start..])));
    }
    Ok(chunks)
}

/// Plain text of decoded chunks. Tabs and line breaks become `\t` and `\n`;
/// the paragraph break is dropped.
pub fn chunks_to_text(chunks: &[TextChunk]) -> String {
    let mut text = String::new();
    for chunk in chunks {
        match chunk {
            TextChunk::Text(s) => text.push_str(s),
            TextChunk::Control { code: 9, .. } => text.push('\t'),
            TextChunk::Control { code: 10, .. } => text.push('\n'),
            TextChunk::Control { .. } => {},
        }
    }
    text
}

#[cfg(test)]
pub(crate) fn encode_units(units: &[u16]) -> Vec<u8> {
    units.iter().flat_map(|u| u.to_le_bytes()).collect()
}

#[cfg(test)]
pub(crate) fn extended_control(code: u16, chid: Chid) -> Vec<u16> {
    let raw = chid.to_raw();
    vec![code, raw as u16, (raw >> 16) as u16, 0, 0, 0, 0, code]
}
