//! Layouts of the `DocInfo` stream records.

use super::schema::{Cond, Field, Kind, Schema, TagEntry};
use crate::hwp5::consts::*;

const STARTING_NUMBERS: &[Field] = &[
    Field::new("page", Kind::U16),
    Field::new("footnote", Kind::U16),
    Field::new("endnote", Kind::U16),
    Field::new("picture", Kind::U16),
    Field::new("table", Kind::U16),
    Field::new("math", Kind::U16),
];

const CARET_POSITION: &[Field] = &[
    Field::new("list_id", Kind::U32),
    Field::new("paragraph_id", Kind::U32),
    Field::new("char_pos", Kind::U32),
];

static DOCUMENT_PROPERTIES: Schema = Schema::new(
    "DocumentProperties",
    &[
        Field::new("section_count", Kind::U16),
        Field::new("starting_numbers", Kind::Struct(STARTING_NUMBERS)),
        Field::new("caret", Kind::Struct(CARET_POSITION)),
    ],
);

static ID_MAPPINGS: Schema = Schema::new(
    "IdMappings",
    &[
        Field::new("bindata", Kind::U32),
        Field::new("ko_fonts", Kind::U32),
        Field::new("en_fonts", Kind::U32),
        Field::new("cn_fonts", Kind::U32),
        Field::new("jp_fonts", Kind::U32),
        Field::new("other_fonts", Kind::U32),
        Field::new("symbol_fonts", Kind::U32),
        Field::new("user_fonts", Kind::U32),
        Field::new("borderfills", Kind::U32),
        Field::new("charshapes", Kind::U32),
        Field::new("tabdefs", Kind::U32),
        Field::new("numberings", Kind::U32),
        Field::new("bullets", Kind::U32),
        Field::new("parashapes", Kind::U32),
        Field::new("styles", Kind::U32),
        Field::new("memoshapes", Kind::U32).since(5, 0, 1, 7),
        Field::new("trackchanges", Kind::U32).since(5, 0, 3, 2),
        Field::new("trackchange_authors", Kind::U32).since(5, 0, 3, 2),
    ],
);

const BINDATA_LINK: Cond = Cond::Masked {
    field: "flags",
    mask: 0xF,
    value: 0,
};
const BINDATA_EMBEDDING: Cond = Cond::Masked {
    field: "flags",
    mask: 0xF,
    value: 1,
};
const BINDATA_STORAGE: Cond = Cond::Masked {
    field: "flags",
    mask: 0xF,
    value: 2,
};

static BIN_DATA: Schema = Schema::new(
    "BinData",
    &[
        Field::new("flags", Kind::U16),
        Field::new("abspath", Kind::BStr).when(BINDATA_LINK),
        Field::new("relpath", Kind::BStr).when(BINDATA_LINK),
        Field::new("storage_id", Kind::U16).when(BINDATA_EMBEDDING),
        Field::new("ext", Kind::BStr).when(BINDATA_EMBEDDING),
        Field::new("storage_id", Kind::U16).when(BINDATA_STORAGE),
    ],
);

const ALTERNATE_FONT: &[Field] = &[
    Field::new(
        "kind",
        Kind::Enum(&Kind::U8, &[(0, "unknown"), (1, "ttf"), (2, "hft")]),
    ),
    Field::new("name", Kind::BStr),
];

const PANOSE: &[Field] = &[
    Field::new("family_type", Kind::U8),
    Field::new("serif_style", Kind::U8),
    Field::new("weight", Kind::U8),
    Field::new("proportion", Kind::U8),
    Field::new("contrast", Kind::U8),
    Field::new("stroke_variation", Kind::U8),
    Field::new("arm_style", Kind::U8),
    Field::new("letterform", Kind::U8),
    Field::new("midline", Kind::U8),
    Field::new("x_height", Kind::U8),
];

static FACE_NAME: Schema = Schema::new(
    "FaceName",
    &[
        Field::new("flags", Kind::U8),
        Field::new("name", Kind::BStr),
        Field::new("alternate", Kind::Struct(ALTERNATE_FONT)).when(Cond::FlagSet("flags", 0x80)),
        Field::new("panose", Kind::Struct(PANOSE)).when(Cond::FlagSet("flags", 0x40)),
        Field::new("default_font", Kind::BStr).when(Cond::FlagSet("flags", 0x20)),
    ],
);

const BORDER_LINE: &[Field] = &[
    Field::new("stroke", Kind::U8),
    Field::new("width", Kind::U8),
    Field::new("color", Kind::Color),
];

pub(super) const COLOR_PATTERN: &[Field] = &[
    Field::new("background", Kind::Color),
    Field::new("pattern_color", Kind::Color),
    Field::new("pattern", Kind::I32),
];

pub(super) const GRADATION: &[Field] = &[
    Field::new("kind", Kind::U8),
    Field::new("shear", Kind::U32),
    Field::new("center_x", Kind::U32),
    Field::new("center_y", Kind::U32),
    Field::new("blur", Kind::U32),
    Field::new("colors", Kind::Counted(&Kind::U32, &Kind::Color)),
    Field::new("shape", Kind::U32),
    Field::new("blur_center", Kind::U8),
];

pub(super) const IMAGE_FILL: &[Field] = &[
    Field::new("mode", Kind::U8),
    Field::new("brightness", Kind::I8),
    Field::new("contrast", Kind::I8),
    Field::new("effect", Kind::U8),
    Field::new("bindata_id", Kind::U16),
];

static BORDER_FILL: Schema = Schema::new(
    "BorderFill",
    &[
        Field::new("borderflags", Kind::U16),
        Field::new("left", Kind::Struct(BORDER_LINE)),
        Field::new("right", Kind::Struct(BORDER_LINE)),
        Field::new("top", Kind::Struct(BORDER_LINE)),
        Field::new("bottom", Kind::Struct(BORDER_LINE)),
        Field::new("diagonal", Kind::Struct(BORDER_LINE)),
        Field::new("fillflags", Kind::U32),
        Field::new("colorpattern", Kind::Struct(COLOR_PATTERN))
            .when(Cond::FlagSet("fillflags", 0x1)),
        Field::new("gradation", Kind::Struct(GRADATION)).when(Cond::FlagSet("fillflags", 0x4)),
        Field::new("image", Kind::Struct(IMAGE_FILL)).when(Cond::FlagSet("fillflags", 0x2)),
    ],
);

/// One entry per language slot: ko, en, cn, jp, other, symbol, user.
const LANGUAGES: usize = 7;

static CHAR_SHAPE: Schema = Schema::new(
    "CharShape",
    &[
        Field::new("font_ids", Kind::Array(LANGUAGES, &Kind::U16)),
        Field::new("letter_widths", Kind::Array(LANGUAGES, &Kind::U8)),
        Field::new("letter_spacings", Kind::Array(LANGUAGES, &Kind::I8)),
        Field::new("relative_sizes", Kind::Array(LANGUAGES, &Kind::U8)),
        Field::new("positions", Kind::Array(LANGUAGES, &Kind::I8)),
        Field::new("basesize", Kind::I32),
        Field::new("flags", Kind::U32),
        Field::new("shadow_space", Kind::Array(2, &Kind::I8)),
        Field::new("text_color", Kind::Color),
        Field::new("underline_color", Kind::Color),
        Field::new("shade_color", Kind::Color),
        Field::new("shadow_color", Kind::Color),
        Field::new("borderfill_id", Kind::U16).since(5, 0, 2, 1),
        Field::new("strikeoff_color", Kind::Color).since(5, 0, 3, 0),
    ],
);

const TAB: &[Field] = &[
    Field::new("pos", Kind::HwpUnit),
    Field::new(
        "kind",
        Kind::Enum(&Kind::U8, &[(0, "left"), (1, "right"), (2, "center"), (3, "decimal")]),
    ),
    Field::new("fill", Kind::U8),
    Field::new("reserved", Kind::U16),
];

static TAB_DEF: Schema = Schema::new(
    "TabDef",
    &[
        Field::new("flags", Kind::U32),
        Field::new("tabs", Kind::Counted(&Kind::I32, &Kind::Struct(TAB))),
    ],
);

const NUMBERING_LEVEL: &[Field] = &[
    Field::new("flags", Kind::U32),
    Field::new("width_correction", Kind::HwpUnit16),
    Field::new("distance_to_body", Kind::HwpUnit16),
    Field::new("charshape_id", Kind::U32),
    Field::new("format", Kind::BStr),
];

static NUMBERING: Schema = Schema::new(
    "Numbering",
    &[
        Field::new("levels", Kind::Array(7, &Kind::Struct(NUMBERING_LEVEL))),
        Field::new("starting_number", Kind::U16),
        Field::new("level_starting_numbers", Kind::Array(7, &Kind::U32)).since(5, 0, 2, 5),
    ],
);

static BULLET: Schema = Schema::new(
    "Bullet",
    &[
        Field::new("flags", Kind::U32),
        Field::new("width_correction", Kind::HwpUnit16),
        Field::new("distance_to_body", Kind::HwpUnit16),
        Field::new("charshape_id", Kind::U32),
        Field::new("bullet_char", Kind::WChar),
    ],
);

static PARA_SHAPE: Schema = Schema::new(
    "ParaShape",
    &[
        Field::new("flags", Kind::U32),
        Field::new("doubled_margin_left", Kind::I32),
        Field::new("doubled_margin_right", Kind::I32),
        Field::new("indent", Kind::I32),
        Field::new("doubled_margin_top", Kind::I32),
        Field::new("doubled_margin_bottom", Kind::I32),
        Field::new("linespacing_before_2007", Kind::I32),
        Field::new("tabdef_id", Kind::U16),
        Field::new("numbering_bullet_id", Kind::U16),
        Field::new("borderfill_id", Kind::U16),
        Field::new("border_left", Kind::I16),
        Field::new("border_right", Kind::I16),
        Field::new("border_top", Kind::I16),
        Field::new("border_bottom", Kind::I16),
        Field::new("flags2", Kind::U32).since(5, 0, 1, 7),
        Field::new("flags3", Kind::U32).since(5, 0, 2, 5),
        Field::new("linespacing", Kind::U32).since(5, 0, 2, 5),
    ],
);

static STYLE: Schema = Schema::new(
    "Style",
    &[
        Field::new("local_name", Kind::BStr),
        Field::new("name", Kind::BStr),
        Field::new("flags", Kind::U8),
        Field::new("next_style_id", Kind::U8),
        Field::new("lang_id", Kind::I16),
        Field::new("parashape_id", Kind::U16),
        Field::new("charshape_id", Kind::U16),
    ],
);

static DOC_DATA: Schema = Schema::new("DocData", &[Field::new("params", Kind::ParameterSet)]);

static DISTRIBUTE_DOC_DATA: Schema = Schema::new(
    "DistributeDocData",
    &[Field::new("data", Kind::Bytes(256))],
);

static COMPATIBLE_DOCUMENT: Schema = Schema::new(
    "CompatibleDocument",
    &[Field::new(
        "target",
        Kind::Enum(&Kind::U32, &[(0, "default"), (1, "hwp2007"), (2, "msword")]),
    )],
);

static LAYOUT_COMPATIBILITY: Schema = Schema::new(
    "LayoutCompatibility",
    &[
        Field::new("char", Kind::U32),
        Field::new("paragraph", Kind::U32),
        Field::new("section", Kind::U32),
        Field::new("object", Kind::U32),
        Field::new("field", Kind::U32),
    ],
);

static MEMO_SHAPE: Schema = Schema::new(
    "MemoShape",
    &[
        Field::new("width", Kind::HwpUnit),
        Field::new("line_kind", Kind::U8),
        Field::new("line_width", Kind::U8),
        Field::new("line_color", Kind::Color),
        Field::new("fill_color", Kind::Color),
        Field::new("active_color", Kind::Color),
        Field::new("memo_kind", Kind::U32),
    ],
);

static FORBIDDEN_CHAR: Schema = Schema::new(
    "ForbiddenChar",
    &[
        Field::new("leading", Kind::BStr),
        Field::new("trailing", Kind::BStr),
    ],
);

static TRACK_CHANGE_AUTHOR: Schema = Schema::new(
    "TrackChangeAuthor",
    &[Field::new("name", Kind::BStr)],
);

pub(super) static SCHEMAS: &[TagEntry] = &[
    TagEntry { since: (5, 0), tag: HWPTAG_DOCUMENT_PROPERTIES, schema: &DOCUMENT_PROPERTIES },
    TagEntry { since: (5, 0), tag: HWPTAG_ID_MAPPINGS, schema: &ID_MAPPINGS },
    TagEntry { since: (5, 0), tag: HWPTAG_BIN_DATA, schema: &BIN_DATA },
    TagEntry { since: (5, 0), tag: HWPTAG_FACE_NAME, schema: &FACE_NAME },
    TagEntry { since: (5, 0), tag: HWPTAG_BORDER_FILL, schema: &BORDER_FILL },
    TagEntry { since: (5, 0), tag: HWPTAG_CHAR_SHAPE, schema: &CHAR_SHAPE },
    TagEntry { since: (5, 0), tag: HWPTAG_TAB_DEF, schema: &TAB_DEF },
    TagEntry { since: (5, 0), tag: HWPTAG_NUMBERING, schema: &NUMBERING },
    TagEntry { since: (5, 0), tag: HWPTAG_BULLET, schema: &BULLET },
    TagEntry { since: (5, 0), tag: HWPTAG_PARA_SHAPE, schema: &PARA_SHAPE },
    TagEntry { since: (5, 0), tag: HWPTAG_STYLE, schema: &STYLE },
    TagEntry { since: (5, 0), tag: HWPTAG_DOC_DATA, schema: &DOC_DATA },
    TagEntry { since: (5, 0), tag: HWPTAG_DISTRIBUTE_DOC_DATA, schema: &DISTRIBUTE_DOC_DATA },
    TagEntry { since: (5, 0), tag: HWPTAG_COMPATIBLE_DOCUMENT, schema: &COMPATIBLE_DOCUMENT },
    TagEntry { since: (5, 0), tag: HWPTAG_LAYOUT_COMPATIBILITY, schema: &LAYOUT_COMPATIBILITY },
    TagEntry { since: (5, 0), tag: HWPTAG_MEMO_SHAPE, schema: &MEMO_SHAPE },
    TagEntry { since: (5, 0), tag: HWPTAG_FORBIDDEN_CHAR, schema: &FORBIDDEN_CHAR },
    TagEntry { since: (5, 0), tag: HWPTAG_TRACK_CHANGE_AUTHOR, schema: &TRACK_CHANGE_AUTHOR },
];

#[cfg(test)]
mod tests {
    use crate::hwp5::consts::*;
    use crate::hwp5::header::Version;
    use crate::hwp5::model::{Decoder, DecodeStatus, ModelRecord, RecordContext, Value};
    use crate::hwp5::record::RawRecord;
    use bytes::Bytes;

    fn decode(version: Version, tag: u16, payload: Vec<u8>) -> ModelRecord {
        let raw = RawRecord {
            tag,
            level: 0,
            payload: Bytes::from(payload),
            seqno: 0,
        };
        Decoder::for_version(version).decode_record(&raw, &RecordContext::detached(version))
    }

    fn bstr(s: &str) -> Vec<u8> {
        let units: Vec<u16> = s.encode_utf16().collect();
        let mut out = (units.len() as u16).to_le_bytes().to_vec();
        out.extend(units.iter().flat_map(|u| u.to_le_bytes()));
        out
    }

    #[test]
    fn test_id_mappings_grow_with_version() {
        let payload: Vec<u8> = (0u32..18).flat_map(|i| i.to_le_bytes()).collect();

        let old = decode(Version::new(5, 0, 1, 0), HWPTAG_ID_MAPPINGS, payload[..60].to_vec());
        assert!(old.is_complete(), "{:?}", old.status);
        assert!(old.get("memoshapes").is_none());

        let new = decode(Version::new(5, 0, 3, 2), HWPTAG_ID_MAPPINGS, payload);
        assert!(new.is_complete(), "{:?}", new.status);
        assert_eq!(new.get("trackchange_authors"), Some(&Value::U32(17)));
    }

    #[test]
    fn test_bindata_variants() {
        let mut link = 0u16.to_le_bytes().to_vec();
        link.extend(bstr("C:\\a.png"));
        link.extend(bstr("a.png"));
        let record = decode(Version::default(), HWPTAG_BIN_DATA, link);
        assert!(record.is_complete(), "{:?}", record.status);
        assert_eq!(record.get("relpath").and_then(Value::as_str), Some("a.png"));
        assert!(record.get("storage_id").is_none());

        let mut embedded = 1u16.to_le_bytes().to_vec();
        embedded.extend(3u16.to_le_bytes());
        embedded.extend(bstr("jpg"));
        let record = decode(Version::default(), HWPTAG_BIN_DATA, embedded);
        assert!(record.is_complete(), "{:?}", record.status);
        assert_eq!(record.get("storage_id"), Some(&Value::U16(3)));
        assert_eq!(record.get("ext").and_then(Value::as_str), Some("jpg"));
    }

    #[test]
    fn test_face_name_optional_parts() {
        let mut payload = vec![0x80 | 0x20];
        payload.extend(bstr("바탕"));
        payload.push(1);
        payload.extend(bstr("Batang"));
        payload.extend(bstr("Serif"));
        let record = decode(Version::default(), HWPTAG_FACE_NAME, payload);
        assert!(record.is_complete(), "{:?}", record.status);
        assert_eq!(record.get("name").and_then(Value::as_str), Some("바탕"));
        let alternate = record.get("alternate").and_then(Value::as_struct).unwrap();
        assert_eq!(alternate.get("kind"), Some(&Value::Enum { value: 1, name: "ttf" }));
        assert!(record.get("panose").is_none());
        assert_eq!(record.get("default_font").and_then(Value::as_str), Some("Serif"));
    }

    #[test]
    fn test_compatible_document_rejects_unknown_target() {
        let record = decode(
            Version::default(),
            HWPTAG_COMPATIBLE_DOCUMENT,
            9u32.to_le_bytes().to_vec(),
        );
        assert!(matches!(record.status, DecodeStatus::Partial(_)));
        assert_eq!(record.tail.as_deref(), Some(&9u32.to_le_bytes()[..]));
    }
}
