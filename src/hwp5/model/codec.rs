//! Interprets [`Kind`] descriptors against a payload cursor.

use super::decoder::RecordContext;
use super::paramset::{ParamSetError, ParameterSet};
use super::paratext::decode_paratext;
use super::schema::{Cond, CountRef, Field, Kind};
use super::{ColorRef, FieldError, Fields, Value};
use crate::common::binary::{BinaryError, ByteCursor};
use crate::hwp5::consts::Chid;
use bytes::Bytes;

/// Upper bound on any element count.
const MAX_ELEMENTS: usize = 1 << 20;

/// Fields visible to conditions and counts: the structure being decoded,
/// then the structures enclosing it.
#[derive(Clone, Copy)]
struct Scope<'a> {
    fields: &'a Fields,
    outer: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    fn lookup(&self, name: &str) -> Option<&'a Value> {
        self.fields
            .get(name)
            .or_else(|| self.outer.and_then(|outer| outer.lookup(name)))
    }
}

pub(super) struct FieldCodec<'r, 'c> {
    model: &'static str,
    ctx: &'r RecordContext<'c>,
}

impl<'r, 'c> FieldCodec<'r, 'c> {
    pub(super) fn new(model: &'static str, ctx: &'r RecordContext<'c>) -> Self {
        Self { model, ctx }
    }

    /// Decode `fields` in order, appending to `out`.
    ///
    /// On failure `out` keeps the fields decoded so far and the cursor is left
    /// at the start of the failing field.
    pub(super) fn decode_fields(
        &self,
        cursor: &mut ByteCursor<'_>,
        fields: &'static [Field],
        out: &mut Fields,
    ) -> Result<(), FieldError> {
        self.decode_scoped(cursor, fields, out, None)
    }

    fn decode_scoped(
        &self,
        cursor: &mut ByteCursor<'_>,
        fields: &'static [Field],
        out: &mut Fields,
        outer: Option<&Scope<'_>>,
    ) -> Result<(), FieldError> {
        for field in fields {
            let start = cursor.position();
            let value = {
                let scope = Scope { fields: out, outer };
                if !self.holds(&field.cond, &scope, field.name)? {
                    continue;
                }
                self.decode_kind(cursor, &field.kind, &scope, field.name)
            };
            match value {
                Ok(value) => out.push(field.name, value),
                Err(e) => {
                    cursor.rewind_to(start);
                    return Err(e);
                },
            }
        }
        Ok(())
    }

    fn holds(
        &self,
        cond: &Cond,
        scope: &Scope<'_>,
        field: &'static str,
    ) -> Result<bool, FieldError> {
        Ok(match *cond {
            Cond::Always => true,
            Cond::Since(version) => self.ctx.version >= version,
            Cond::FlagSet(name, mask) => self.scope_u32(scope, name, field)? & mask == mask,
            Cond::FlagClear(name, mask) => self.scope_u32(scope, name, field)? & mask == 0,
            Cond::Masked { field: name, mask, value } => {
                self.scope_u32(scope, name, field)? & mask == value
            },
            Cond::ParentChid(chid) => self.ctx.parent().and_then(|p| p.chid()) == Some(chid),
        })
    }

    fn invalid(&self, field: &'static str, reason: String) -> FieldError {
        FieldError::Invalid {
            model: self.model,
            field,
            reason,
        }
    }

    fn binary(&self, field: &'static str, err: BinaryError) -> FieldError {
        match err {
            BinaryError::InsufficientData { expected, available } => FieldError::Truncated {
                model: self.model,
                field,
                expected,
                available,
            },
            BinaryError::ParseError(reason) => self.invalid(field, reason),
        }
    }

    fn scope_u32(
        &self,
        scope: &Scope<'_>,
        name: &str,
        field: &'static str,
    ) -> Result<u32, FieldError> {
        scope
            .lookup(name)
            .and_then(Value::as_u32)
            .ok_or_else(|| self.invalid(field, format!("depends on missing field `{name}`")))
    }

    fn count(
        &self,
        source: &CountRef,
        scope: &Scope<'_>,
        field: &'static str,
    ) -> Result<usize, FieldError> {
        let count = match *source {
            CountRef::Field(name) => self.count_of(scope.lookup(name), name, field)?,
            CountRef::Bits { field: name, shift, mask } => {
                ((self.scope_u32(scope, name, field)? >> shift) & mask) as usize
            },
            CountRef::MinusOne(name) => {
                self.count_of(scope.lookup(name), name, field)?.saturating_sub(1)
            },
            CountRef::Parent(name) => {
                let value = self.ctx.parent().and_then(|p| p.get(name));
                self.count_of(value, name, field)?
            },
        };
        if count > MAX_ELEMENTS {
            return Err(self.invalid(field, format!("element count {count} is implausible")));
        }
        Ok(count)
    }

    /// Integers count as themselves, arrays by their length.
    fn count_of(
        &self,
        value: Option<&Value>,
        name: &str,
        field: &'static str,
    ) -> Result<usize, FieldError> {
        match value {
            Some(Value::Array(items)) => Ok(items.len()),
            Some(value) => value
                .as_u32()
                .map(|v| v as usize)
                .ok_or_else(|| self.invalid(field, format!("`{name}` is not a count"))),
            None => Err(self.invalid(field, format!("depends on missing field `{name}`"))),
        }
    }

    fn elements(
        &self,
        cursor: &mut ByteCursor<'_>,
        count: usize,
        kind: &Kind,
        scope: &Scope<'_>,
        field: &'static str,
    ) -> Result<Value, FieldError> {
        let mut items = Vec::with_capacity(count.min(cursor.remaining()));
        for _ in 0..count {
            items.push(self.decode_kind(cursor, kind, scope, field)?);
        }
        Ok(Value::Array(items))
    }

    fn decode_kind(
        &self,
        cursor: &mut ByteCursor<'_>,
        kind: &Kind,
        scope: &Scope<'_>,
        field: &'static str,
    ) -> Result<Value, FieldError> {
        let bin = |e| self.binary(field, e);
        let value = match *kind {
            Kind::U8 => Value::U8(cursor.read_u8().map_err(bin)?),
            Kind::I8 => Value::I8(cursor.read_i8().map_err(bin)?),
            Kind::U16 | Kind::WChar => Value::U16(cursor.read_u16().map_err(bin)?),
            Kind::I16 | Kind::HwpUnit16 => Value::I16(cursor.read_i16().map_err(bin)?),
            Kind::U32 | Kind::HwpUnit => Value::U32(cursor.read_u32().map_err(bin)?),
            Kind::I32 | Kind::SHwpUnit => Value::I32(cursor.read_i32().map_err(bin)?),
            Kind::F64 => Value::F64(cursor.read_f64().map_err(bin)?),
            Kind::Color => Value::Color(ColorRef(cursor.read_u32().map_err(bin)?)),
            Kind::Chid => Value::Chid(Chid::from_raw(cursor.read_u32().map_err(bin)?)),
            Kind::BStr => {
                let chars = cursor.read_u16().map_err(bin)? as usize;
                Value::Text(cursor.read_utf16(chars).map_err(bin)?)
            },
            Kind::WChars(chars) => {
                let text = cursor.read_utf16(chars).map_err(bin)?;
                Value::Text(text.trim_end_matches('\0').to_string())
            },
            Kind::Bytes(n) => Value::Bytes(Bytes::copy_from_slice(cursor.readn(n).map_err(bin)?)),
            Kind::Rest => Value::Bytes(Bytes::copy_from_slice(cursor.rest())),
            Kind::Array(count, element) => self.elements(cursor, count, element, scope, field)?,
            Kind::Counted(count_kind, element) => {
                let count = self.decode_kind(cursor, count_kind, scope, field)?;
                let count = self.count_of(Some(&count), field, field)?;
                if count > MAX_ELEMENTS {
                    let reason = format!("element count {count} is implausible");
                    return Err(self.invalid(field, reason));
                }
                self.elements(cursor, count, element, scope, field)?
            },
            Kind::Ref(source, element) => {
                let count = self.count(&source, scope, field)?;
                self.elements(cursor, count, element, scope, field)?
            },
            Kind::Repeat(element) => {
                let mut items = Vec::new();
                while !cursor.is_empty() {
                    let start = cursor.position();
                    items.push(self.decode_kind(cursor, element, scope, field)?);
                    if cursor.position() == start {
                        let reason = "repeated element consumed no bytes".to_string();
                        return Err(self.invalid(field, reason));
                    }
                }
                Value::Array(items)
            },
            Kind::Enum(base, members) => {
                let raw = self.decode_kind(cursor, base, scope, field)?;
                let value = raw
                    .as_u32()
                    .ok_or_else(|| {
                        self.invalid(field, "enumeration base is not an integer".into())
                    })?;
                match members.iter().find(|(v, _)| *v == value) {
                    Some(&(value, name)) => Value::Enum { value, name },
                    None => {
                        return Err(FieldError::InvalidEnum {
                            model: self.model,
                            field,
                            value,
                        });
                    },
                }
            },
            Kind::Struct(fields) => {
                let mut inner = Fields::new();
                self.decode_scoped(cursor, fields, &mut inner, Some(scope))?;
                Value::Struct(inner)
            },
            Kind::ParaText => {
                let chunks = decode_paratext(cursor.peek_rest())
                    .map_err(|e| self.invalid(field, e.to_string()))?;
                cursor.rest();
                Value::ParaText(chunks)
            },
            Kind::ParameterSet => match ParameterSet::decode(cursor) {
                Ok(set) => Value::ParameterSet(set),
                Err(ParamSetError::Truncated(e)) => return Err(self.binary(field, e)),
                Err(e) => return Err(self.invalid(field, e.to_string())),
            },
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwp5::header::Version;

    fn decode(fields: &'static [Field], data: &[u8]) -> (Fields, Result<(), FieldError>, usize) {
        let ctx = RecordContext::detached(Version::new(5, 0, 2, 0));
        let codec = FieldCodec::new("Test", &ctx);
        let mut cursor = ByteCursor::new(data);
        let mut out = Fields::new();
        let result = codec.decode_fields(&mut cursor, fields, &mut out);
        (out, result, cursor.position())
    }

    const PAIR: &[Field] = &[Field::new("a", Kind::U16), Field::new("b", Kind::I8)];

    const LAYOUT: &[Field] = &[
        Field::new("flags", Kind::U16),
        Field::new("n", Kind::U8),
        Field::new("items", Kind::Ref(CountRef::Field("n"), &Kind::Struct(PAIR))),
        Field::new(
            "packed",
            Kind::Ref(CountRef::Bits { field: "flags", shift: 4, mask: 0x3 }, &Kind::U8),
        ),
        Field::new("optional", Kind::U32).when(Cond::FlagSet("flags", 0x100)),
        Field::new("newer", Kind::U32).since(5, 0, 3, 0),
        Field::new("color", Kind::Color),
        Field::new("name", Kind::BStr),
    ];

    #[test]
    fn test_counts_conditions_and_versions() {
        let mut data = vec![0x20, 0x00, 2];
        data.extend([1, 0, 0xFF, 2, 0, 0x01]);
        data.extend([7, 8]);
        data.extend([0x11, 0x22, 0x33, 0x00]);
        data.extend([1, 0, b'x', 0]);

        let (fields, result, pos) = decode(LAYOUT, &data);
        result.unwrap();
        assert_eq!(pos, data.len());
        let items = fields.get("items").and_then(Value::as_array).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_struct().and_then(|s| s.get("b")), Some(&Value::I8(-1)));
        assert_eq!(fields.get("packed"), Some(&Value::Array(vec![Value::U8(7), Value::U8(8)])));
        assert!(!fields.contains("optional"));
        assert!(!fields.contains("newer"));
        match fields.get("color") {
            Some(Value::Color(c)) => assert_eq!((c.red(), c.green(), c.blue()), (0x11, 0x22, 0x33)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fields.get("name").and_then(Value::as_str), Some("x"));
    }

    #[test]
    fn test_truncation_names_field_and_rewinds() {
        let data = [0x00, 0x01, 0, 0xAA, 0xBB];
        let (fields, result, pos) = decode(LAYOUT, &data);
        assert_eq!(
            result,
            Err(FieldError::Truncated {
                model: "Test",
                field: "optional",
                expected: 4,
                available: 2
            })
        );
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["flags", "n", "items", "packed"]);
        assert_eq!(pos, 3);
    }

    #[test]
    fn test_four_byte_int_from_two_bytes_fails() {
        const ONE: &[Field] = &[Field::new("v", Kind::U32)];
        let (fields, result, _) = decode(ONE, &[1, 2]);
        assert!(matches!(result, Err(FieldError::Truncated { expected: 4, available: 2, .. })));
        assert!(fields.is_empty());
    }

    #[test]
    fn test_enum_membership() {
        const E: &[Field] = &[Field::new("e", Kind::Enum(&Kind::U8, &[(0, "zero"), (2, "two")]))];
        let (fields, result, _) = decode(E, &[2]);
        result.unwrap();
        assert_eq!(fields.get("e"), Some(&Value::Enum { value: 2, name: "two" }));

        let (_, result, _) = decode(E, &[1]);
        assert_eq!(
            result,
            Err(FieldError::InvalidEnum {
                model: "Test",
                field: "e",
                value: 1
            })
        );
    }

    #[test]
    fn test_minus_one_and_repeat() {
        const CURVE: &[Field] = &[
            Field::new("points", Kind::Counted(&Kind::U16, &Kind::I16)),
            Field::new("segments", Kind::Ref(CountRef::MinusOne("points"), &Kind::U8)),
            Field::new("rest", Kind::Repeat(&Kind::U16)),
        ];
        let data = [3, 0, 1, 0, 2, 0, 3, 0, 9, 9, 4, 0, 5, 0];
        let (fields, result, _) = decode(CURVE, &data);
        result.unwrap();
        assert_eq!(fields.get("segments").and_then(Value::as_array).map(<[Value]>::len), Some(2));
        assert_eq!(fields.get("rest"), Some(&Value::Array(vec![Value::U16(4), Value::U16(5)])));
    }

    #[test]
    fn test_repeat_of_empty_element_is_invalid() {
        const EMPTY: &[Field] = &[Field::new("items", Kind::Repeat(&Kind::Struct(&[])))];
        let (_, result, position) = decode(EMPTY, &[1, 2, 3]);
        assert!(matches!(result, Err(FieldError::Invalid { field: "items", .. })));
        assert_eq!(position, 0);
    }

    #[test]
    fn test_fixed_width_values_round_trip_exactly() {
        const FIXED: &[Field] = &[
            Field::new("unit", Kind::HwpUnit),
            Field::new("signed", Kind::SHwpUnit),
            Field::new("short", Kind::HwpUnit16),
            Field::new("ratio", Kind::F64),
        ];
        let mut data = 0xFFFF_FFFEu32.to_le_bytes().to_vec();
        data.extend((-7200i32).to_le_bytes());
        data.extend((-1i16).to_le_bytes());
        data.extend(0.1f64.to_le_bytes());

        let (fields, result, _) = decode(FIXED, &data);
        result.unwrap();
        let mut encoded = Vec::new();
        for (_, value) in fields.iter() {
            match value {
                Value::U32(v) => encoded.extend(v.to_le_bytes()),
                Value::I32(v) => encoded.extend(v.to_le_bytes()),
                Value::I16(v) => encoded.extend(v.to_le_bytes()),
                Value::F64(v) => encoded.extend(v.to_le_bytes()),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(encoded, data);
    }
}
