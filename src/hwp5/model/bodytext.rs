//! Layouts of the section stream records: paragraphs, lists, page setup and
//! tables.

use super::decoder::RecordContext;
use super::schema::{CountRef, Extension, Field, Kind, Schema, TagEntry};
use crate::hwp5::consts::*;

static PARA_HEADER: Schema = Schema::new(
    "ParaHeader",
    &[
        Field::new("text", Kind::U32),
        Field::new("controlmask", Kind::U32),
        Field::new("parashape_id", Kind::U16),
        Field::new("style_id", Kind::U8),
        Field::new("split", Kind::U8),
        Field::new("charshapes", Kind::U16),
        Field::new("rangetags", Kind::U16),
        Field::new("linesegs", Kind::U16),
        Field::new("instance_id", Kind::U32),
        Field::new("change_tracking", Kind::U16).since(5, 0, 3, 2),
    ],
);

static PARA_TEXT: Schema = Schema::new("ParaText", &[Field::new("chunks", Kind::ParaText)]);

const CHAR_SHAPE_RUN: &[Field] = &[
    Field::new("pos", Kind::U32),
    Field::new("charshape_id", Kind::U32),
];

static PARA_CHAR_SHAPE: Schema = Schema::new(
    "ParaCharShape",
    &[Field::new(
        "runs",
        Kind::Ref(CountRef::Parent("charshapes"), &Kind::Struct(CHAR_SHAPE_RUN)),
    )],
);

const LINE_SEG: &[Field] = &[
    Field::new("chpos", Kind::U32),
    Field::new("y", Kind::SHwpUnit),
    Field::new("height", Kind::SHwpUnit),
    Field::new("height_text", Kind::SHwpUnit),
    Field::new("height_baseline", Kind::SHwpUnit),
    Field::new("space_below", Kind::SHwpUnit),
    Field::new("x", Kind::SHwpUnit),
    Field::new("width", Kind::SHwpUnit),
    Field::new("flags", Kind::U32),
];

static PARA_LINE_SEG: Schema = Schema::new(
    "ParaLineSeg",
    &[Field::new(
        "segments",
        Kind::Ref(CountRef::Parent("linesegs"), &Kind::Struct(LINE_SEG)),
    )],
);

const RANGE_TAG: &[Field] = &[
    Field::new("start", Kind::U32),
    Field::new("end", Kind::U32),
    Field::new("tag", Kind::U32),
];

static PARA_RANGE_TAG: Schema = Schema::new(
    "ParaRangeTag",
    &[Field::new(
        "ranges",
        Kind::Ref(CountRef::Parent("rangetags"), &Kind::Struct(RANGE_TAG)),
    )],
);

static CTRL_HEADER: Schema =
    Schema::new("CtrlHeader", &[Field::new("chid", Kind::Chid)])
        .extended(Extension::ByChid("chid"));

const PADDING: &[Field] = &[
    Field::new("left", Kind::HwpUnit16),
    Field::new("right", Kind::HwpUnit16),
    Field::new("top", Kind::HwpUnit16),
    Field::new("bottom", Kind::HwpUnit16),
];

static LIST_HEADER: Schema = Schema::new(
    "ListHeader",
    &[
        Field::new("paragraphs", Kind::I16),
        Field::new("unknown1", Kind::I16),
        Field::new("listflags", Kind::U32),
    ],
)
.extended(Extension::ByContext(list_extension));

static TABLE_CAPTION: Schema = Schema::new(
    "TableCaption",
    &[
        Field::new("flags", Kind::U32),
        Field::new("width", Kind::HwpUnit),
        Field::new("separation", Kind::HwpUnit16),
        Field::new("max_width", Kind::HwpUnit),
    ],
);

static TABLE_CELL: Schema = Schema::new(
    "TableCell",
    &[
        Field::new("col", Kind::U16),
        Field::new("row", Kind::U16),
        Field::new("colspan", Kind::U16),
        Field::new("rowspan", Kind::U16),
        Field::new("width", Kind::SHwpUnit),
        Field::new("height", Kind::SHwpUnit),
        Field::new("padding", Kind::Struct(PADDING)),
        Field::new("borderfill_id", Kind::U16),
        Field::new("unknown_width", Kind::SHwpUnit),
    ],
);

static HEADER_FOOTER_LIST: Schema = Schema::new(
    "HeaderParagraphList",
    &[
        Field::new("width", Kind::HwpUnit),
        Field::new("height", Kind::HwpUnit),
        Field::new("textrefs", Kind::U8),
        Field::new("numberrefs", Kind::U8),
    ],
);

static TEXTBOX_LIST: Schema = Schema::new(
    "TextboxParagraphList",
    &[
        Field::new("padding", Kind::Struct(PADDING)),
        Field::new("max_width", Kind::HwpUnit),
    ],
);

/// The layout of a list header depends on what owns the list.
///
/// Under a table control, lists ahead of the table body are captions and
/// the rest are cells.
fn list_extension(ctx: &RecordContext<'_>) -> Option<(Chid, &'static Schema)> {
    let parent = ctx.parent()?;
    let id = parent.chid()?;
    match parent.tag {
        HWPTAG_CTRL_HEADER => match id {
            chid::TABLE if ctx.preceding_siblings().any(|r| r.tag == HWPTAG_TABLE) => {
                Some((id, &TABLE_CELL))
            },
            chid::TABLE | chid::GSO | chid::EQEDIT => Some((id, &TABLE_CAPTION)),
            chid::HEADER | chid::FOOTER => Some((id, &HEADER_FOOTER_LIST)),
            _ => None,
        },
        HWPTAG_SHAPE_COMPONENT => Some((id, &TEXTBOX_LIST)),
        _ => None,
    }
}

static PAGE_DEF: Schema = Schema::new(
    "PageDef",
    &[
        Field::new("width", Kind::HwpUnit),
        Field::new("height", Kind::HwpUnit),
        Field::new("left_margin", Kind::HwpUnit),
        Field::new("right_margin", Kind::HwpUnit),
        Field::new("top_margin", Kind::HwpUnit),
        Field::new("bottom_margin", Kind::HwpUnit),
        Field::new("header_offset", Kind::HwpUnit),
        Field::new("footer_offset", Kind::HwpUnit),
        Field::new("bookbinding_offset", Kind::HwpUnit),
        Field::new("flags", Kind::U32),
    ],
);

static FOOTNOTE_SHAPE: Schema = Schema::new(
    "FootnoteShape",
    &[
        Field::new("flags", Kind::U32),
        Field::new("usersymbol", Kind::WChar),
        Field::new("prefix", Kind::WChar),
        Field::new("suffix", Kind::WChar),
        Field::new("starting_number", Kind::U16),
        Field::new("splitter_length", Kind::HwpUnit16),
        Field::new("splitter_margin_top", Kind::HwpUnit16),
        Field::new("splitter_margin_bottom", Kind::HwpUnit16),
        Field::new("notes_spacing", Kind::HwpUnit16),
        Field::new("splitter_stroke", Kind::U8),
        Field::new("splitter_width", Kind::U8),
        Field::new("splitter_color", Kind::Color).since(5, 0, 0, 6),
    ],
);

static PAGE_BORDER_FILL: Schema = Schema::new(
    "PageBorderFill",
    &[
        Field::new("flags", Kind::U32),
        Field::new("margin", Kind::Struct(PADDING)),
        Field::new("borderfill_id", Kind::U16),
    ],
);

const ZONE: &[Field] = &[
    Field::new("starting_column", Kind::U16),
    Field::new("starting_row", Kind::U16),
    Field::new("end_column", Kind::U16),
    Field::new("end_row", Kind::U16),
    Field::new("borderfill_id", Kind::U16),
];

static TABLE_BODY: Schema = Schema::new(
    "TableBody",
    &[
        Field::new("flags", Kind::U32),
        Field::new("rows", Kind::U16),
        Field::new("cols", Kind::U16),
        Field::new("cellspacing", Kind::HwpUnit16),
        Field::new("padding", Kind::Struct(PADDING)),
        Field::new("rowcols", Kind::Ref(CountRef::Field("rows"), &Kind::U16)),
        Field::new("borderfill_id", Kind::U16),
        Field::new("valid_zones", Kind::Counted(&Kind::U16, &Kind::Struct(ZONE))).since(5, 0, 0, 7),
    ],
);

static CTRL_DATA: Schema = Schema::new("CtrlData", &[Field::new("params", Kind::ParameterSet)]);

static EQEDIT: Schema = Schema::new(
    "EqEdit",
    &[
        Field::new("flags", Kind::U32),
        Field::new("script", Kind::BStr),
        Field::new("font_size", Kind::HwpUnit),
        Field::new("color", Kind::Color),
        Field::new("baseline", Kind::I16),
    ],
);

static MEMO_LIST: Schema = Schema::new("MemoList", &[Field::new("memo_index", Kind::U32)]);

pub(super) static SCHEMAS: &[TagEntry] = &[
    TagEntry { since: (5, 0), tag: HWPTAG_PARA_HEADER, schema: &PARA_HEADER },
    TagEntry { since: (5, 0), tag: HWPTAG_PARA_TEXT, schema: &PARA_TEXT },
    TagEntry { since: (5, 0), tag: HWPTAG_PARA_CHAR_SHAPE, schema: &PARA_CHAR_SHAPE },
    TagEntry { since: (5, 0), tag: HWPTAG_PARA_LINE_SEG, schema: &PARA_LINE_SEG },
    TagEntry { since: (5, 0), tag: HWPTAG_PARA_RANGE_TAG, schema: &PARA_RANGE_TAG },
    TagEntry { since: (5, 0), tag: HWPTAG_CTRL_HEADER, schema: &CTRL_HEADER },
    TagEntry { since: (5, 0), tag: HWPTAG_LIST_HEADER, schema: &LIST_HEADER },
    TagEntry { since: (5, 0), tag: HWPTAG_PAGE_DEF, schema: &PAGE_DEF },
    TagEntry { since: (5, 0), tag: HWPTAG_FOOTNOTE_SHAPE, schema: &FOOTNOTE_SHAPE },
    TagEntry { since: (5, 0), tag: HWPTAG_PAGE_BORDER_FILL, schema: &PAGE_BORDER_FILL },
    TagEntry { since: (5, 0), tag: HWPTAG_TABLE, schema: &TABLE_BODY },
    TagEntry { since: (5, 0), tag: HWPTAG_CTRL_DATA, schema: &CTRL_DATA },
    TagEntry { since: (5, 0), tag: HWPTAG_EQEDIT, schema: &EQEDIT },
    TagEntry { since: (5, 0), tag: HWPTAG_MEMO_LIST, schema: &MEMO_LIST },
];
