//! Record tag ids, the closed tag-name table, and control ids.

use phf::phf_map;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

pub const HWPTAG_BEGIN: u16 = 0x010;

pub const HWPTAG_DOCUMENT_PROPERTIES: u16 = HWPTAG_BEGIN;
pub const HWPTAG_ID_MAPPINGS: u16 = HWPTAG_BEGIN + 1;
pub const HWPTAG_BIN_DATA: u16 = HWPTAG_BEGIN + 2;
pub const HWPTAG_FACE_NAME: u16 = HWPTAG_BEGIN + 3;
pub const HWPTAG_BORDER_FILL: u16 = HWPTAG_BEGIN + 4;
pub const HWPTAG_CHAR_SHAPE: u16 = HWPTAG_BEGIN + 5;
pub const HWPTAG_TAB_DEF: u16 = HWPTAG_BEGIN + 6;
pub const HWPTAG_NUMBERING: u16 = HWPTAG_BEGIN + 7;
pub const HWPTAG_BULLET: u16 = HWPTAG_BEGIN + 8;
pub const HWPTAG_PARA_SHAPE: u16 = HWPTAG_BEGIN + 9;
pub const HWPTAG_STYLE: u16 = HWPTAG_BEGIN + 10;
pub const HWPTAG_DOC_DATA: u16 = HWPTAG_BEGIN + 11;
pub const HWPTAG_DISTRIBUTE_DOC_DATA: u16 = HWPTAG_BEGIN + 12;
pub const HWPTAG_COMPATIBLE_DOCUMENT: u16 = HWPTAG_BEGIN + 14;
pub const HWPTAG_LAYOUT_COMPATIBILITY: u16 = HWPTAG_BEGIN + 15;
pub const HWPTAG_TRACKCHANGE: u16 = HWPTAG_BEGIN + 16;

pub const HWPTAG_PARA_HEADER: u16 = HWPTAG_BEGIN + 50;
pub const HWPTAG_PARA_TEXT: u16 = HWPTAG_BEGIN + 51;
pub const HWPTAG_PARA_CHAR_SHAPE: u16 = HWPTAG_BEGIN + 52;
pub const HWPTAG_PARA_LINE_SEG: u16 = HWPTAG_BEGIN + 53;
pub const HWPTAG_PARA_RANGE_TAG: u16 = HWPTAG_BEGIN + 54;
pub const HWPTAG_CTRL_HEADER: u16 = HWPTAG_BEGIN + 55;
pub const HWPTAG_LIST_HEADER: u16 = HWPTAG_BEGIN + 56;
pub const HWPTAG_PAGE_DEF: u16 = HWPTAG_BEGIN + 57;
pub const HWPTAG_FOOTNOTE_SHAPE: u16 = HWPTAG_BEGIN + 58;
pub const HWPTAG_PAGE_BORDER_FILL: u16 = HWPTAG_BEGIN + 59;
pub const HWPTAG_SHAPE_COMPONENT: u16 = HWPTAG_BEGIN + 60;
pub const HWPTAG_TABLE: u16 = HWPTAG_BEGIN + 61;
pub const HWPTAG_SHAPE_COMPONENT_LINE: u16 = HWPTAG_BEGIN + 62;
pub const HWPTAG_SHAPE_COMPONENT_RECTANGLE: u16 = HWPTAG_BEGIN + 63;
pub const HWPTAG_SHAPE_COMPONENT_ELLIPSE: u16 = HWPTAG_BEGIN + 64;
pub const HWPTAG_SHAPE_COMPONENT_ARC: u16 = HWPTAG_BEGIN + 65;
pub const HWPTAG_SHAPE_COMPONENT_POLYGON: u16 = HWPTAG_BEGIN + 66;
pub const HWPTAG_SHAPE_COMPONENT_CURVE: u16 = HWPTAG_BEGIN + 67;
pub const HWPTAG_SHAPE_COMPONENT_OLE: u16 = HWPTAG_BEGIN + 68;
pub const HWPTAG_SHAPE_COMPONENT_PICTURE: u16 = HWPTAG_BEGIN + 69;
pub const HWPTAG_SHAPE_COMPONENT_CONTAINER: u16 = HWPTAG_BEGIN + 70;
pub const HWPTAG_CTRL_DATA: u16 = HWPTAG_BEGIN + 71;
pub const HWPTAG_EQEDIT: u16 = HWPTAG_BEGIN + 72;
pub const HWPTAG_SHAPE_COMPONENT_TEXTART: u16 = HWPTAG_BEGIN + 74;
pub const HWPTAG_FORM_OBJECT: u16 = HWPTAG_BEGIN + 75;
pub const HWPTAG_MEMO_SHAPE: u16 = HWPTAG_BEGIN + 76;
pub const HWPTAG_MEMO_LIST: u16 = HWPTAG_BEGIN + 77;
pub const HWPTAG_FORBIDDEN_CHAR: u16 = HWPTAG_BEGIN + 78;
pub const HWPTAG_CHART_DATA: u16 = HWPTAG_BEGIN + 79;
pub const HWPTAG_TRACK_CHANGE: u16 = HWPTAG_BEGIN + 80;
pub const HWPTAG_TRACK_CHANGE_AUTHOR: u16 = HWPTAG_BEGIN + 81;
pub const HWPTAG_SHAPE_COMPONENT_UNKNOWN: u16 = HWPTAG_BEGIN + 99;

/// Closed table of every known tag id.
static TAG_NAMES: phf::Map<u16, &'static str> = phf_map! {
    0x010u16 => "HWPTAG_DOCUMENT_PROPERTIES",
    0x011u16 => "HWPTAG_ID_MAPPINGS",
    0x012u16 => "HWPTAG_BIN_DATA",
    0x013u16 => "HWPTAG_FACE_NAME",
    0x014u16 => "HWPTAG_BORDER_FILL",
    0x015u16 => "HWPTAG_CHAR_SHAPE",
    0x016u16 => "HWPTAG_TAB_DEF",
    0x017u16 => "HWPTAG_NUMBERING",
    0x018u16 => "HWPTAG_BULLET",
    0x019u16 => "HWPTAG_PARA_SHAPE",
    0x01Au16 => "HWPTAG_STYLE",
    0x01Bu16 => "HWPTAG_DOC_DATA",
    0x01Cu16 => "HWPTAG_DISTRIBUTE_DOC_DATA",
    0x01Eu16 => "HWPTAG_COMPATIBLE_DOCUMENT",
    0x01Fu16 => "HWPTAG_LAYOUT_COMPATIBILITY",
    0x020u16 => "HWPTAG_TRACKCHANGE",
    0x042u16 => "HWPTAG_PARA_HEADER",
    0x043u16 => "HWPTAG_PARA_TEXT",
    0x044u16 => "HWPTAG_PARA_CHAR_SHAPE",
    0x045u16 => "HWPTAG_PARA_LINE_SEG",
    0x046u16 => "HWPTAG_PARA_RANGE_TAG",
    0x047u16 => "HWPTAG_CTRL_HEADER",
    0x048u16 => "HWPTAG_LIST_HEADER",
    0x049u16 => "HWPTAG_PAGE_DEF",
    0x04Au16 => "HWPTAG_FOOTNOTE_SHAPE",
    0x04Bu16 => "HWPTAG_PAGE_BORDER_FILL",
    0x04Cu16 => "HWPTAG_SHAPE_COMPONENT",
    0x04Du16 => "HWPTAG_TABLE",
    0x04Eu16 => "HWPTAG_SHAPE_COMPONENT_LINE",
    0x04Fu16 => "HWPTAG_SHAPE_COMPONENT_RECTANGLE",
    0x050u16 => "HWPTAG_SHAPE_COMPONENT_ELLIPSE",
    0x051u16 => "HWPTAG_SHAPE_COMPONENT_ARC",
    0x052u16 => "HWPTAG_SHAPE_COMPONENT_POLYGON",
    0x053u16 => "HWPTAG_SHAPE_COMPONENT_CURVE",
    0x054u16 => "HWPTAG_SHAPE_COMPONENT_OLE",
    0x055u16 => "HWPTAG_SHAPE_COMPONENT_PICTURE",
    0x056u16 => "HWPTAG_SHAPE_COMPONENT_CONTAINER",
    0x057u16 => "HWPTAG_CTRL_DATA",
    0x058u16 => "HWPTAG_EQEDIT",
    0x05Au16 => "HWPTAG_SHAPE_COMPONENT_TEXTART",
    0x05Bu16 => "HWPTAG_FORM_OBJECT",
    0x05Cu16 => "HWPTAG_MEMO_SHAPE",
    0x05Du16 => "HWPTAG_MEMO_LIST",
    0x05Eu16 => "HWPTAG_FORBIDDEN_CHAR",
    0x05Fu16 => "HWPTAG_CHART_DATA",
    0x060u16 => "HWPTAG_TRACK_CHANGE",
    0x061u16 => "HWPTAG_TRACK_CHANGE_AUTHOR",
    0x073u16 => "HWPTAG_SHAPE_COMPONENT_UNKNOWN",
};

/// Name of a tag id; unknown ids render as `HWPTAG_<id>`.
pub fn tag_name(tag: u16) -> Cow<'static, str> {
    match TAG_NAMES.get(&tag) {
        Some(name) => Cow::Borrowed(name),
        None => Cow::Owned(format!("HWPTAG_{tag}")),
    }
}

pub fn is_known_tag(tag: u16) -> bool {
    TAG_NAMES.contains_key(&tag)
}

/// Four-character control id.
///
/// Stored on disk as a little-endian u32 whose big-endian bytes spell the id,
/// so `tbl ` is written as `20 6C 62 74`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Chid(pub [u8; 4]);

impl Chid {
    pub const fn new(id: &[u8; 4]) -> Self {
        Chid(*id)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Chid(raw.to_be_bytes())
    }

    pub const fn to_raw(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Field controls all start with `%`.
    pub fn is_field(&self) -> bool {
        self.0[0] == b'%'
    }
}

impl fmt::Display for Chid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Chid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chid({self})")
    }
}

impl Serialize for Chid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub mod chid {
    use super::Chid;

    pub const SECTION_DEF: Chid = Chid::new(b"secd");
    pub const COLUMNS_DEF: Chid = Chid::new(b"cold");
    pub const TABLE: Chid = Chid::new(b"tbl ");
    pub const GSO: Chid = Chid::new(b"gso ");
    pub const EQEDIT: Chid = Chid::new(b"eqed");
    pub const HEADER: Chid = Chid::new(b"head");
    pub const FOOTER: Chid = Chid::new(b"foot");
    pub const FOOTNOTE: Chid = Chid::new(b"fn  ");
    pub const ENDNOTE: Chid = Chid::new(b"en  ");
    pub const AUTO_NUMBER: Chid = Chid::new(b"atno");
    pub const NEW_NUMBER: Chid = Chid::new(b"nwno");
    pub const PAGE_HIDE: Chid = Chid::new(b"pghd");
    pub const PAGE_ODD_EVEN: Chid = Chid::new(b"pgct");
    pub const PAGE_NUMBER_POSITION: Chid = Chid::new(b"pgnp");
    pub const INDEX_MARKER: Chid = Chid::new(b"idxm");
    pub const BOOKMARK: Chid = Chid::new(b"bokm");
    pub const OVERLAP: Chid = Chid::new(b"tcps");
    pub const DUTMAL: Chid = Chid::new(b"tdut");
    pub const HIDDEN_COMMENT: Chid = Chid::new(b"tcmt");

    pub const SHAPE_CONTAINER: Chid = Chid::new(b"$con");
    pub const SHAPE_LINE: Chid = Chid::new(b"$lin");
    pub const SHAPE_RECTANGLE: Chid = Chid::new(b"$rec");
    pub const SHAPE_ELLIPSE: Chid = Chid::new(b"$ell");
    pub const SHAPE_ARC: Chid = Chid::new(b"$arc");
    pub const SHAPE_POLYGON: Chid = Chid::new(b"$pol");
    pub const SHAPE_CURVE: Chid = Chid::new(b"$cur");
    pub const SHAPE_PICTURE: Chid = Chid::new(b"$pic");
    pub const SHAPE_OLE: Chid = Chid::new(b"$ole");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names() {
        assert_eq!(tag_name(HWPTAG_PARA_HEADER), "HWPTAG_PARA_HEADER");
        assert_eq!(tag_name(HWPTAG_SHAPE_COMPONENT_UNKNOWN), "HWPTAG_SHAPE_COMPONENT_UNKNOWN");
        assert_eq!(tag_name(0x3FF), "HWPTAG_1023");
        assert!(is_known_tag(HWPTAG_TRACKCHANGE));
        assert!(!is_known_tag(0x01D));
    }

    #[test]
    fn test_chid_byte_order() {
        let raw = u32::from_le_bytes([b' ', b'l', b'b', b't']);
        let id = Chid::from_raw(raw);
        assert_eq!(id, chid::TABLE);
        assert_eq!(id.to_string(), "tbl ");
        assert_eq!(id.to_raw(), raw);
        assert!(Chid::new(b"%hlk").is_field());
        assert_eq!(Chid::new(b"ab\x01c").to_string(), "ab\\x01c");
    }
}
