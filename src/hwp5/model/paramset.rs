//! Parameter sets, the self-describing key/value blobs found in `DOC_DATA`
//! and `CTRL_DATA` records.

use crate::common::binary::{BinaryError, ByteCursor};
use serde::Serialize;

const PIT_NULL: u16 = 0;
const PIT_BSTR: u16 = 1;
const PIT_I1: u16 = 2;
const PIT_I2: u16 = 3;
const PIT_I4: u16 = 4;
const PIT_I: u16 = 5;
const PIT_UI1: u16 = 6;
const PIT_UI2: u16 = 7;
const PIT_UI4: u16 = 8;
const PIT_UI: u16 = 9;
const PIT_SET: u16 = 0x8000;
const PIT_ARRAY: u16 = 0x8001;
const PIT_BINDATA: u16 = 0x8002;

/// Nesting limit for sets inside sets.
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSet {
    pub id: u16,
    pub items: Vec<ParameterItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterItem {
    pub id: u16,
    pub value: ParameterValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParameterValue {
    Null,
    Str(String),
    I8(i8),
    I16(i16),
    I32(i32),
    U8(u8),
    U16(u16),
    U32(u32),
    Set(ParameterSet),
    Array(Vec<ParameterSet>),
    /// BinData id
    BinData(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamSetError {
    #[error(transparent)]
    Truncated(#[from] BinaryError),
    #[error("item {item} has unknown type {kind:#06x}")]
    UnknownType { item: u16, kind: u16 },
    #[error("negative count {0}")]
    NegativeCount(i16),
    #[error("nested deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

impl ParameterSet {
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, ParamSetError> {
        decode_set(cursor, 0)
    }

    pub fn get(&self, id: u16) -> Option<&ParameterValue> {
        self.items.iter().find(|item| item.id == id).map(|item| &item.value)
    }
}

fn read_count(cursor: &mut ByteCursor<'_>) -> Result<usize, ParamSetError> {
    let count = cursor.read_i16()?;
    usize::try_from(count).map_err(|_| ParamSetError::NegativeCount(count))
}

fn decode_set(cursor: &mut ByteCursor<'_>, depth: usize) -> Result<ParameterSet, ParamSetError> {
    if depth > MAX_DEPTH {
        return Err(ParamSetError::TooDeep);
    }
    let id = cursor.read_u16()?;
    let count = read_count(cursor)?;
    let _dummy = cursor.read_u16()?;

    let mut items = Vec::with_capacity(count.min(256));
    for _ in 0..count {
        let item = cursor.read_u16()?;
        let kind = cursor.read_u16()?;
        let value = match kind {
            PIT_NULL => ParameterValue::Null,
            PIT_BSTR => {
                let chars = cursor.read_u16()? as usize;
                ParameterValue::Str(cursor.read_utf16(chars)?)
            },
            PIT_I1 => ParameterValue::I8(cursor.read_i8()?),
            PIT_I2 => ParameterValue::I16(cursor.read_i16()?),
            PIT_I4 | PIT_I => ParameterValue::I32(cursor.read_i32()?),
            PIT_UI1 => ParameterValue::U8(cursor.read_u8()?),
            PIT_UI2 => ParameterValue::U16(cursor.read_u16()?),
            PIT_UI4 | PIT_UI => ParameterValue::U32(cursor.read_u32()?),
            PIT_SET => ParameterValue::Set(decode_set(cursor, depth + 1)?),
            PIT_ARRAY => {
                let len = read_count(cursor)?;
                let _array_id = cursor.read_u16()?;
                let mut sets = Vec::with_capacity(len.min(256));
                for _ in 0..len {
                    sets.push(decode_set(cursor, depth + 1)?);
                }
                ParameterValue::Array(sets)
            },
            PIT_BINDATA => ParameterValue::BinData(cursor.read_u16()?),
            kind => return Err(ParamSetError::UnknownType { item, kind }),
        };
        items.push(ParameterItem { id: item, value });
    }
    Ok(ParameterSet { id, items })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(id: u16, count: i16) -> Vec<u8> {
        let mut out = id.to_le_bytes().to_vec();
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    fn item(id: u16, kind: u16, value: &[u8]) -> Vec<u8> {
        let mut out = id.to_le_bytes().to_vec();
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(value);
        out
    }

    #[test]
    fn test_nested_set() {
        let mut inner = header(0x20, 1);
        inner.extend(item(1, PIT_BINDATA, &7u16.to_le_bytes()));

        let mut data = header(0x10, 3);
        let mut text = 2u16.to_le_bytes().to_vec();
        text.extend([b'h', 0, b'i', 0]);
        data.extend(item(1, PIT_BSTR, &text));
        data.extend(item(2, PIT_I4, &(-5i32).to_le_bytes()));
        data.extend(item(3, PIT_SET, &inner));

        let set = ParameterSet::decode(&mut ByteCursor::new(&data)).unwrap();
        assert_eq!(set.id, 0x10);
        assert_eq!(set.get(1), Some(&ParameterValue::Str("hi".to_string())));
        assert_eq!(set.get(2), Some(&ParameterValue::I32(-5)));
        match set.get(3) {
            Some(ParameterValue::Set(inner)) => {
                assert_eq!(inner.get(1), Some(&ParameterValue::BinData(7)))
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_array_of_sets() {
        let mut value = 2i16.to_le_bytes().to_vec();
        value.extend(0x30u16.to_le_bytes());
        value.extend(header(0x31, 0));
        value.extend(header(0x32, 0));
        let mut data = header(0x10, 1);
        data.extend(item(9, PIT_ARRAY, &value));

        let set = ParameterSet::decode(&mut ByteCursor::new(&data)).unwrap();
        match set.get(9) {
            Some(ParameterValue::Array(sets)) => {
                assert_eq!(sets.iter().map(|s| s.id).collect::<Vec<_>>(), vec![0x31, 0x32])
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_errors() {
        let mut data = header(1, 1);
        data.extend(item(4, 0x7777, &[]));
        assert_eq!(
            ParameterSet::decode(&mut ByteCursor::new(&data)),
            Err(ParamSetError::UnknownType { item: 4, kind: 0x7777 })
        );

        let mut data = header(1, 1);
        data.extend(item(4, PIT_UI4, &[1, 2]));
        assert!(matches!(
            ParameterSet::decode(&mut ByteCursor::new(&data)),
            Err(ParamSetError::Truncated(_))
        ));

        assert_eq!(
            ParameterSet::decode(&mut ByteCursor::new(&header(1, -1))),
            Err(ParamSetError::NegativeCount(-1))
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut data = Vec::new();
        for _ in 0..=MAX_DEPTH + 1 {
            data.extend(header(1, 1));
            data.extend(1u16.to_le_bytes());
            data.extend(PIT_SET.to_le_bytes());
        }
        assert_eq!(
            ParameterSet::decode(&mut ByteCursor::new(&data)),
            Err(ParamSetError::TooDeep)
        );
    }
}
