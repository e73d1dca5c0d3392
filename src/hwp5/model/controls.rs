//! Bodies of `CTRL_HEADER` records, keyed by control id.

use super::schema::{Cond, CountRef, ExtensionEntry, ExtensionKey, Field, Kind, Schema};
use crate::hwp5::consts::{Chid, HWPTAG_CTRL_HEADER, chid};

static SECTION_DEF: Schema = Schema::new(
    "SectionDef",
    &[
        Field::new("flags", Kind::U32),
        Field::new("columnspacing", Kind::HwpUnit16),
        Field::new("grid_vertical", Kind::HwpUnit16),
        Field::new("grid_horizontal", Kind::HwpUnit16),
        Field::new("default_tab_stops", Kind::HwpUnit),
        Field::new("numbering_shape_id", Kind::U16),
        Field::new("starting_pagenum", Kind::U16),
        Field::new("starting_picturenum", Kind::U16),
        Field::new("starting_tablenum", Kind::U16),
        Field::new("starting_equationnum", Kind::U16),
    ],
);

static COLUMNS_DEF: Schema = Schema::new(
    "ColumnsDef",
    &[
        Field::new("flags", Kind::U16),
        Field::new("spacing", Kind::HwpUnit16),
        Field::new(
            "widths",
            Kind::Ref(
                CountRef::Bits {
                    field: "flags",
                    shift: 2,
                    mask: 0xFF,
                },
                &Kind::HwpUnit16,
            ),
        )
        .when(Cond::FlagClear("flags", 0x1000)),
        Field::new("attr2", Kind::U16),
        Field::new("splitter_stroke", Kind::U8),
        Field::new("splitter_width", Kind::U8),
        Field::new("splitter_color", Kind::Color),
    ],
);

/// Placement shared by tables, drawing objects and equations.
const COMMON_PROPERTIES: &[Field] = &[
    Field::new("flags", Kind::U32),
    Field::new("y", Kind::SHwpUnit),
    Field::new("x", Kind::SHwpUnit),
    Field::new("width", Kind::HwpUnit),
    Field::new("height", Kind::HwpUnit),
    Field::new("z_order", Kind::I16),
    Field::new("unknown1", Kind::I16),
    Field::new("margin_left", Kind::HwpUnit16),
    Field::new("margin_right", Kind::HwpUnit16),
    Field::new("margin_top", Kind::HwpUnit16),
    Field::new("margin_bottom", Kind::HwpUnit16),
    Field::new("instance_id", Kind::U32),
    Field::new("unknown2", Kind::I32).since(5, 0, 0, 5),
    Field::new("description", Kind::BStr).since(5, 0, 0, 5),
];

static TABLE_CONTROL: Schema = Schema::new("TableControl", COMMON_PROPERTIES);
static GSHAPE_OBJECT_CONTROL: Schema = Schema::new("GShapeObjectControl", COMMON_PROPERTIES);
static EQEDIT_CONTROL: Schema = Schema::new("EqEditControl", COMMON_PROPERTIES);

const FLAGS_ONLY: &[Field] = &[Field::new("flags", Kind::U32)];

static HEADER: Schema = Schema::new("Header", FLAGS_ONLY);
static FOOTER: Schema = Schema::new("Footer", FLAGS_ONLY);

const NOTE: &[Field] = &[Field::new("data", Kind::Rest)];

static FOOTNOTE: Schema = Schema::new("Footnote", NOTE);
static ENDNOTE: Schema = Schema::new("Endnote", NOTE);

static AUTO_NUMBERING: Schema = Schema::new(
    "AutoNumbering",
    &[
        Field::new("flags", Kind::U32),
        Field::new("number", Kind::U16),
        Field::new("usersymbol", Kind::WChar),
        Field::new("prefix", Kind::WChar),
        Field::new("suffix", Kind::WChar),
    ],
);

static NEW_NUMBERING: Schema = Schema::new(
    "NewNumbering",
    &[
        Field::new("flags", Kind::U32),
        Field::new("number", Kind::U16),
    ],
);

static PAGE_HIDE: Schema = Schema::new("PageHide", FLAGS_ONLY);
static PAGE_ODD_EVEN: Schema = Schema::new("PageOddEven", FLAGS_ONLY);

static PAGE_NUMBER_POSITION: Schema = Schema::new(
    "PageNumberPosition",
    &[
        Field::new("flags", Kind::U32),
        Field::new("usersymbol", Kind::WChar),
        Field::new("prefix", Kind::WChar),
        Field::new("suffix", Kind::WChar),
        Field::new("dash", Kind::WChar),
    ],
);

static INDEX_MARKER: Schema = Schema::new(
    "IndexMarker",
    &[
        Field::new("keyword1", Kind::BStr),
        Field::new("keyword2", Kind::BStr),
        Field::new("dummy", Kind::U16),
    ],
);

static BOOKMARK: Schema = Schema::new("Bookmark", &[]);

static DUTMAL: Schema = Schema::new(
    "Dutmal",
    &[
        Field::new("maintext", Kind::BStr),
        Field::new("subtext", Kind::BStr),
        Field::new("position", Kind::U32),
        Field::new("fsizeratio", Kind::U32),
        Field::new("option", Kind::U32),
        Field::new("stylenumber", Kind::U32),
        Field::new("align", Kind::U32),
    ],
);

static HIDDEN_COMMENT: Schema = Schema::new("HiddenComment", &[]);

static OVERLAP: Schema = Schema::new(
    "Overlap",
    &[
        Field::new("chars", Kind::BStr),
        Field::new("border_kind", Kind::U8),
        Field::new("inner_size", Kind::I8),
        Field::new("expansion", Kind::U8),
        Field::new("charshape_ids", Kind::Counted(&Kind::U8, &Kind::U32)),
    ],
);

/// Fields (`%hlk`, `%clk`, ...) share one layout.
static FIELD: Schema = Schema::new(
    "Field",
    &[
        Field::new("flags", Kind::U32),
        Field::new("extra_flags", Kind::U8),
        Field::new("command", Kind::BStr),
        Field::new("id", Kind::U32),
    ],
);

const fn control(id: Chid, schema: &'static Schema) -> ExtensionEntry {
    ExtensionEntry {
        tag: HWPTAG_CTRL_HEADER,
        key: ExtensionKey::Exact(id),
        schema,
    }
}

pub(super) static EXTENSIONS: &[ExtensionEntry] = &[
    control(chid::SECTION_DEF, &SECTION_DEF),
    control(chid::COLUMNS_DEF, &COLUMNS_DEF),
    control(chid::TABLE, &TABLE_CONTROL),
    control(chid::GSO, &GSHAPE_OBJECT_CONTROL),
    control(chid::EQEDIT, &EQEDIT_CONTROL),
    control(chid::HEADER, &HEADER),
    control(chid::FOOTER, &FOOTER),
    control(chid::FOOTNOTE, &FOOTNOTE),
    control(chid::ENDNOTE, &ENDNOTE),
    control(chid::AUTO_NUMBER, &AUTO_NUMBERING),
    control(chid::NEW_NUMBER, &NEW_NUMBERING),
    control(chid::PAGE_HIDE, &PAGE_HIDE),
    control(chid::PAGE_ODD_EVEN, &PAGE_ODD_EVEN),
    control(chid::PAGE_NUMBER_POSITION, &PAGE_NUMBER_POSITION),
    control(chid::INDEX_MARKER, &INDEX_MARKER),
    control(chid::BOOKMARK, &BOOKMARK),
    control(chid::DUTMAL, &DUTMAL),
    control(chid::HIDDEN_COMMENT, &HIDDEN_COMMENT),
    control(chid::OVERLAP, &OVERLAP),
    ExtensionEntry {
        tag: HWPTAG_CTRL_HEADER,
        key: ExtensionKey::Family(b'%'),
        schema: &FIELD,
    },
];
