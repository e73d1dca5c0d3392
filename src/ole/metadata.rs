use super::consts::*;
use super::file::OleError;
use crate::common::binary::{decode_utf16le, read_u16_le, read_u32_le};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Upper bound on properties read from one section
const MAX_PROPERTIES: u32 = 1000;

/// Properties from an HWP summary-information property set
/// (`\u{5}HwpSummaryInformation`).
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize)]
pub struct SummaryInformation {
    pub codepage: Option<u16>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub keywords: Option<String>,
    pub comments: Option<String>,
    pub last_saved_by: Option<String>,
    pub revision_number: Option<String>,
    pub last_printed: Option<DateTime<Utc>>,
    pub create_time: Option<DateTime<Utc>>,
    pub last_saved_time: Option<DateTime<Utc>>,
    pub num_pages: Option<u32>,
    /// Free-form date string written by the word processor
    pub date_string: Option<String>,
}

/// Property value types
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    I2(i16),
    I4(i32),
    UI2(u16),
    UI4(u32),
    Bool(bool),
    Lpstr(String),
    Lpwstr(String),
    Filetime(u64),
    Blob(Vec<u8>),
    Empty,
}

impl SummaryInformation {
    /// Parse a summary-information property stream.
    pub fn parse(data: &[u8]) -> Result<Self, OleError> {
        let props = parse_property_stream(data)?;
        let mut info = SummaryInformation::default();

        if let Some(PropertyValue::UI2(v)) = props.get(&1) {
            info.codepage = Some(*v);
        }
        info.title = props.get(&2).and_then(extract_string);
        info.subject = props.get(&3).and_then(extract_string);
        info.author = props.get(&4).and_then(extract_string);
        info.keywords = props.get(&5).and_then(extract_string);
        info.comments = props.get(&6).and_then(extract_string);
        info.last_saved_by = props.get(&8).and_then(extract_string);
        info.revision_number = props.get(&9).and_then(extract_string);
        info.last_printed = props.get(&11).and_then(extract_time);
        info.create_time = props.get(&12).and_then(extract_time);
        info.last_saved_time = props.get(&13).and_then(extract_time);
        info.num_pages = match props.get(&14) {
            Some(PropertyValue::I4(v)) => u32::try_from(*v).ok(),
            Some(PropertyValue::UI4(v)) => Some(*v),
            _ => None,
        };
        info.date_string = props.get(&20).and_then(extract_string);

        Ok(info)
    }
}

/// Parse the first section of a property stream into id -> value.
///
/// Property streams follow the [MS-OLEPS] layout: a 28-byte header, one
/// 20-byte FMTID/offset pair per section, then each section's
/// (id, offset) table followed by typed values.
pub fn parse_property_stream(data: &[u8]) -> Result<HashMap<u32, PropertyValue>, OleError> {
    if data.len() < 48 {
        return Err(OleError::InvalidFormat(
            "Property stream too short".to_string(),
        ));
    }

    let section_offset = read_u32_le(data, 44)? as usize;
    let num_props = read_u32_le(data, section_offset + 4)
        .map_err(|_| OleError::InvalidFormat("Invalid section offset".to_string()))?
        .min(MAX_PROPERTIES);

    let mut properties = HashMap::new();
    for i in 0..num_props as usize {
        let entry = section_offset + 8 + i * 8;
        let (Ok(prop_id), Ok(value_offset)) =
            (read_u32_le(data, entry), read_u32_le(data, entry + 4))
        else {
            break;
        };
        let value_offset = section_offset + value_offset as usize;
        let Ok(prop_type) = read_u16_le(data, value_offset) else {
            continue;
        };
        if let Ok(value) = parse_property_value(data, value_offset + 4, prop_type) {
            properties.insert(prop_id, value);
        }
    }

    Ok(properties)
}

/// Parse a single property value based on its type
fn parse_property_value(
    data: &[u8],
    offset: usize,
    prop_type: u16,
) -> Result<PropertyValue, OleError> {
    let overflow = || OleError::InvalidFormat("Property value overflow".to_string());
    let value = match prop_type {
        VT_I2 => PropertyValue::I2(read_u16_le(data, offset)? as i16),
        VT_I4 | VT_INT | VT_ERROR => PropertyValue::I4(read_u32_le(data, offset)? as i32),
        VT_UI2 => PropertyValue::UI2(read_u16_le(data, offset)?),
        VT_UI4 | VT_UINT => PropertyValue::UI4(read_u32_le(data, offset)?),
        VT_BOOL => PropertyValue::Bool(read_u16_le(data, offset)? != 0),
        VT_LPSTR | VT_BSTR => {
            let len = read_u32_le(data, offset)? as usize;
            let bytes = data.get(offset + 4..offset + 4 + len).ok_or_else(overflow)?;
            PropertyValue::Lpstr(
                String::from_utf8_lossy(bytes)
                    .trim_end_matches('\0')
                    .to_string(),
            )
        },
        VT_LPWSTR => {
            let chars = read_u32_le(data, offset)? as usize;
            let bytes = data
                .get(offset + 4..offset + 4 + chars * 2)
                .ok_or_else(overflow)?;
            let text = decode_utf16le(bytes);
            let text = match text.find('\0') {
                Some(end) => text[..end].to_string(),
                None => text,
            };
            PropertyValue::Lpwstr(text)
        },
        VT_FILETIME => {
            let low = read_u32_le(data, offset)? as u64;
            let high = read_u32_le(data, offset + 4)? as u64;
            PropertyValue::Filetime(low | (high << 32))
        },
        VT_BLOB => {
            let len = read_u32_le(data, offset)? as usize;
            let bytes = data.get(offset + 4..offset + 4 + len).ok_or_else(overflow)?;
            PropertyValue::Blob(bytes.to_vec())
        },
        VT_EMPTY | VT_NULL => PropertyValue::Empty,
        _ => PropertyValue::Empty,
    };
    Ok(value)
}

/// Convert a Windows FILETIME (100ns ticks since 1601) to UTC.
pub fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }
    let since_unix = filetime.checked_sub(FILETIME_UNIX_EPOCH_DIFF)?;
    let secs = (since_unix / 10_000_000) as i64;
    let nanos = ((since_unix % 10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

fn extract_time(value: &PropertyValue) -> Option<DateTime<Utc>> {
    match value {
        PropertyValue::Filetime(v) => filetime_to_datetime(*v),
        _ => None,
    }
}

/// Extract string from property value
fn extract_string(value: &PropertyValue) -> Option<String> {
    match value {
        PropertyValue::Lpstr(s) | PropertyValue::Lpwstr(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
