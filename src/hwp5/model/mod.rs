//! Typed record model and the schema-driven decoder that produces it.

mod bodytext;
mod codec;
mod controls;
mod decoder;
mod docinfo;
pub mod paramset;
pub mod paratext;
pub mod schema;
mod shapes;

use super::consts::Chid;
use super::tree::RecordTree;
use bytes::Bytes;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

pub use decoder::{Decoder, RecordContext};
pub use paramset::{ParameterItem, ParameterSet, ParameterValue};
pub use paratext::{ControlKind, TextChunk};
pub use schema::{Cond, CountRef, Extension, Field, Kind, Schema, SchemaRegistry};

/// Decoded records of one stream.
pub type ModelTree = RecordTree<ModelRecord>;

/// `COLORREF` packed as `0x00BBGGRR`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ColorRef(pub u32);

impl ColorRef {
    pub fn red(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub fn green(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    pub fn blue(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub fn alpha(self) -> u8 {
        ((self.0 >> 24) & 0xFF) as u8
    }
}

impl fmt::Debug for ColorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red(), self.green(), self.blue())?;
        if self.alpha() != 0 {
            write!(f, "/{:02x}", self.alpha())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    F64(f64),
    Color(ColorRef),
    Chid(Chid),
    Text(String),
    Bytes(Bytes),
    Enum { value: u32, name: &'static str },
    Array(Vec<Value>),
    Struct(Fields),
    ParaText(Vec<TextChunk>),
    ParameterSet(ParameterSet),
}

impl Value {
    /// Integer view used for counts and flag tests. Negative values yield `None`.
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Value::U8(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::U32(v) => Some(v),
            Value::I8(v) => u32::try_from(v).ok(),
            Value::I16(v) => u32::try_from(v).ok(),
            Value::I32(v) => u32::try_from(v).ok(),
            Value::Enum { value, .. } => Some(value),
            Value::Color(c) => Some(c.0),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v.into()),
            Value::I16(v) => Some(v.into()),
            Value::I32(v) => Some(v.into()),
            _ => self.as_u32().map(i64::from),
        }
    }

    pub fn as_chid(&self) -> Option<Chid> {
        match self {
            Value::Chid(chid) => Some(*chid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Fields> {
        match self {
            Value::Struct(fields) => Some(fields),
            _ => None,
        }
    }
}

/// Decoded fields in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(&'static str, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, value: Value) {
        self.0.push((name, value));
    }

    /// Latest value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().rev().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(n, _)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.0.iter().map(|(n, v)| (*n, v))
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum FieldError {
    #[error("{model}.{field}: needs {expected} bytes but {available} remain")]
    Truncated {
        model: &'static str,
        field: &'static str,
        expected: usize,
        available: usize,
    },
    #[error("{model}.{field}: value {value} is not a member of the enumeration")]
    InvalidEnum {
        model: &'static str,
        field: &'static str,
        value: u32,
    },
    #[error("{model}.{field}: {reason}")]
    Invalid {
        model: &'static str,
        field: &'static str,
        reason: String,
    },
}

/// Why a record kept undecoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PartialReason {
    /// The schema was satisfied before the payload ended.
    TrailingBytes,
    /// No extension schema is registered for the discriminant.
    UnknownDiscriminant(Chid),
    /// A field could not be decoded; later fields were skipped.
    Field(FieldError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DecodeStatus {
    Complete,
    Partial(PartialReason),
    /// No schema for the tag; the whole payload is in the tail.
    Unknown,
}

/// One decoded record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRecord {
    pub tag: u16,
    pub tag_name: Cow<'static, str>,
    pub level: u16,
    pub seqno: usize,
    /// Name of the schema (or extension schema) that decoded the record.
    pub model: &'static str,
    pub fields: Fields,
    /// Selector of the extension schema, for records that have one.
    pub discriminant: Option<Chid>,
    /// Payload bytes left after the last decoded field.
    pub tail: Option<Bytes>,
    pub status: DecodeStatus,
}

impl ModelRecord {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn is_complete(&self) -> bool {
        self.status == DecodeStatus::Complete
    }

    /// Control id of a `CTRL_HEADER` or `SHAPE_COMPONENT` record.
    pub fn chid(&self) -> Option<Chid> {
        self.fields.get("chid").and_then(Value::as_chid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorref_channels() {
        let color = ColorRef(0x80_33_22_11);
        assert_eq!(
            (color.red(), color.green(), color.blue(), color.alpha()),
            (0x11, 0x22, 0x33, 0x80)
        );
        assert_eq!(format!("{:?}", ColorRef(0x00FF_0000)), "#0000ff");
    }

    #[test]
    fn test_fields_keep_order_and_latest_wins() {
        let mut fields = Fields::new();
        fields.push("b", Value::U8(1));
        fields.push("a", Value::U8(2));
        fields.push("b", Value::U8(3));
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["b", "a", "b"]);
        assert_eq!(fields.get("b"), Some(&Value::U8(3)));
        assert!(!fields.contains("c"));
    }

    #[test]
    fn test_value_integer_views() {
        assert_eq!(Value::I16(-1).as_u32(), None);
        assert_eq!(Value::I16(-1).as_i64(), Some(-1));
        assert_eq!(Value::Enum { value: 3, name: "x" }.as_u32(), Some(3));
        assert_eq!(Value::Text("t".into()).as_u32(), None);
    }
}
