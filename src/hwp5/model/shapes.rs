//! Drawing objects: the shared `SHAPE_COMPONENT` header, its per-shape
//! bodies, and the geometry records that follow it.

use super::docinfo::{COLOR_PATTERN, GRADATION, IMAGE_FILL};
use super::schema::{
    Cond, CountRef, Extension, ExtensionEntry, ExtensionKey, Field, Kind, Schema, TagEntry,
};
use crate::hwp5::consts::*;

const MATRIX: Kind = Kind::Array(6, &Kind::F64);

const SCALE_ROTATION: &[Field] = &[
    Field::new("scaling", MATRIX),
    Field::new("rotation", MATRIX),
];

static SHAPE_COMPONENT: Schema = Schema::new(
    "ShapeComponent",
    &[
        // top-level components repeat their id
        Field::new("chid0", Kind::Chid).when(Cond::ParentChid(chid::GSO)),
        Field::new("chid", Kind::Chid),
        Field::new("x_in_group", Kind::SHwpUnit),
        Field::new("y_in_group", Kind::SHwpUnit),
        Field::new("level_in_group", Kind::U16),
        Field::new("local_version", Kind::U16),
        Field::new("initial_width", Kind::HwpUnit),
        Field::new("initial_height", Kind::HwpUnit),
        Field::new("width", Kind::HwpUnit),
        Field::new("height", Kind::HwpUnit),
        Field::new("flags", Kind::U32),
        Field::new("angle", Kind::U16),
        Field::new("rotation_center_x", Kind::SHwpUnit),
        Field::new("rotation_center_y", Kind::SHwpUnit),
        Field::new("scalerotations_count", Kind::U16),
        Field::new("translation", MATRIX),
        Field::new(
            "scalerotations",
            Kind::Ref(CountRef::Field("scalerotations_count"), &Kind::Struct(SCALE_ROTATION)),
        ),
    ],
)
.extended(Extension::ByChid("chid"));

static SHAPE_CONTAINER: Schema = Schema::new(
    "ShapeContainer",
    &[Field::new("controls", Kind::Counted(&Kind::U16, &Kind::Chid))],
);

const LINE: &[Field] = &[
    Field::new("color", Kind::Color),
    Field::new("width", Kind::SHwpUnit),
    Field::new("flags", Kind::U32),
    Field::new("outline_style", Kind::U8),
];

const LINE_AND_FILL: &[Field] = &[
    Field::new("line", Kind::Struct(LINE)),
    Field::new("fillflags", Kind::U32),
    Field::new("colorpattern", Kind::Struct(COLOR_PATTERN)).when(Cond::FlagSet("fillflags", 0x1)),
    Field::new("gradation", Kind::Struct(GRADATION)).when(Cond::FlagSet("fillflags", 0x4)),
    Field::new("image", Kind::Struct(IMAGE_FILL)).when(Cond::FlagSet("fillflags", 0x2)),
];

const LINE_ONLY: &[Field] = &[Field::new("line", Kind::Struct(LINE))];

static LINE_COMPONENT: Schema = Schema::new("ShapeLineComponent", LINE_AND_FILL);
static RECTANGLE_COMPONENT: Schema = Schema::new("ShapeRectangleComponent", LINE_AND_FILL);
static ELLIPSE_COMPONENT: Schema = Schema::new("ShapeEllipseComponent", LINE_AND_FILL);
static ARC_COMPONENT: Schema = Schema::new("ShapeArcComponent", LINE_AND_FILL);
static POLYGON_COMPONENT: Schema = Schema::new("ShapePolygonComponent", LINE_AND_FILL);
static CURVE_COMPONENT: Schema = Schema::new("ShapeCurveComponent", LINE_AND_FILL);
static PICTURE_COMPONENT: Schema = Schema::new("ShapePictureComponent", LINE_ONLY);
static OLE_COMPONENT: Schema = Schema::new("ShapeOLEComponent", LINE_ONLY);

const fn shape(id: Chid, schema: &'static Schema) -> ExtensionEntry {
    ExtensionEntry {
        tag: HWPTAG_SHAPE_COMPONENT,
        key: ExtensionKey::Exact(id),
        schema,
    }
}

pub(super) static EXTENSIONS: &[ExtensionEntry] = &[
    shape(chid::SHAPE_CONTAINER, &SHAPE_CONTAINER),
    shape(chid::SHAPE_LINE, &LINE_COMPONENT),
    shape(chid::SHAPE_RECTANGLE, &RECTANGLE_COMPONENT),
    shape(chid::SHAPE_ELLIPSE, &ELLIPSE_COMPONENT),
    shape(chid::SHAPE_ARC, &ARC_COMPONENT),
    shape(chid::SHAPE_POLYGON, &POLYGON_COMPONENT),
    shape(chid::SHAPE_CURVE, &CURVE_COMPONENT),
    shape(chid::SHAPE_PICTURE, &PICTURE_COMPONENT),
    shape(chid::SHAPE_OLE, &OLE_COMPONENT),
];

const COORD: &[Field] = &[Field::new("x", Kind::SHwpUnit), Field::new("y", Kind::SHwpUnit)];
const POINT: Kind = Kind::Struct(COORD);

static SHAPE_LINE: Schema = Schema::new(
    "ShapeLine",
    &[
        Field::new("p0", POINT),
        Field::new("p1", POINT),
        Field::new("attr", Kind::U16),
    ],
);

static SHAPE_RECTANGLE: Schema = Schema::new(
    "ShapeRectangle",
    &[
        Field::new("round", Kind::U8),
        Field::new("p0", POINT),
        Field::new("p1", POINT),
        Field::new("p2", POINT),
        Field::new("p3", POINT),
    ],
);

static SHAPE_ELLIPSE: Schema = Schema::new(
    "ShapeEllipse",
    &[
        Field::new("flags", Kind::U32),
        Field::new("center", POINT),
        Field::new("axis1", POINT),
        Field::new("axis2", POINT),
        Field::new("start", POINT),
        Field::new("end", POINT),
        Field::new("start2", POINT),
        Field::new("end2", POINT),
    ],
);

static SHAPE_ARC: Schema = Schema::new(
    "ShapeArc",
    &[
        Field::new("arc_kind", Kind::U8),
        Field::new("center", POINT),
        Field::new("axis1", POINT),
        Field::new("axis2", POINT),
    ],
);

static SHAPE_POLYGON: Schema = Schema::new(
    "ShapePolygon",
    &[Field::new("points", Kind::Counted(&Kind::I16, &POINT))],
);

static SHAPE_CURVE: Schema = Schema::new(
    "ShapeCurve",
    &[
        Field::new("points", Kind::Counted(&Kind::I16, &POINT)),
        Field::new("segments", Kind::Ref(CountRef::MinusOne("points"), &Kind::U8)),
    ],
);

static SHAPE_OLE: Schema = Schema::new(
    "ShapeOLE",
    &[
        Field::new("flags", Kind::U32),
        Field::new("extent_x", Kind::SHwpUnit),
        Field::new("extent_y", Kind::SHwpUnit),
        Field::new("storage_id", Kind::U16),
        Field::new("border_color", Kind::Color),
        Field::new("border_width", Kind::SHwpUnit),
        Field::new("border_flags", Kind::U32),
    ],
);

const CROP: &[Field] = &[
    Field::new("left", Kind::SHwpUnit),
    Field::new("top", Kind::SHwpUnit),
    Field::new("right", Kind::SHwpUnit),
    Field::new("bottom", Kind::SHwpUnit),
];

const PADDING: &[Field] = &[
    Field::new("left", Kind::HwpUnit16),
    Field::new("right", Kind::HwpUnit16),
    Field::new("top", Kind::HwpUnit16),
    Field::new("bottom", Kind::HwpUnit16),
];

const PICTURE_INFO: &[Field] = &[
    Field::new("brightness", Kind::I8),
    Field::new("contrast", Kind::I8),
    Field::new("effect", Kind::U8),
    Field::new("bindata_id", Kind::U16),
];

static SHAPE_PICTURE: Schema = Schema::new(
    "ShapePicture",
    &[
        Field::new("border_color", Kind::Color),
        Field::new("border_width", Kind::SHwpUnit),
        Field::new("border_flags", Kind::U32),
        Field::new("rect", Kind::Array(4, &POINT)),
        Field::new("crop", Kind::Struct(CROP)),
        Field::new("padding", Kind::Struct(PADDING)),
        Field::new("picture", Kind::Struct(PICTURE_INFO)),
        Field::new("border_alpha", Kind::U8),
    ],
);

static SHAPE_CONTAINER_DATA: Schema =
    Schema::new("ShapeContainerData", &[Field::new("data", Kind::Rest)]);

pub(super) static SCHEMAS: &[TagEntry] = &[
    TagEntry { since: (5, 0), tag: HWPTAG_SHAPE_COMPONENT, schema: &SHAPE_COMPONENT },
    TagEntry { since: (5, 0), tag: HWPTAG_SHAPE_COMPONENT_LINE, schema: &SHAPE_LINE },
    TagEntry { since: (5, 0), tag: HWPTAG_SHAPE_COMPONENT_RECTANGLE, schema: &SHAPE_RECTANGLE },
    TagEntry { since: (5, 0), tag: HWPTAG_SHAPE_COMPONENT_ELLIPSE, schema: &SHAPE_ELLIPSE },
    TagEntry { since: (5, 0), tag: HWPTAG_SHAPE_COMPONENT_ARC, schema: &SHAPE_ARC },
    TagEntry { since: (5, 0), tag: HWPTAG_SHAPE_COMPONENT_POLYGON, schema: &SHAPE_POLYGON },
    TagEntry { since: (5, 0), tag: HWPTAG_SHAPE_COMPONENT_CURVE, schema: &SHAPE_CURVE },
    TagEntry { since: (5, 0), tag: HWPTAG_SHAPE_COMPONENT_OLE, schema: &SHAPE_OLE },
    TagEntry { since: (5, 0), tag: HWPTAG_SHAPE_COMPONENT_PICTURE, schema: &SHAPE_PICTURE },
    TagEntry {
        since: (5, 0),
        tag: HWPTAG_SHAPE_COMPONENT_CONTAINER,
        schema: &SHAPE_CONTAINER_DATA,
    },
];

#[cfg(test)]
mod tests {
    use crate::hwp5::consts::*;
    use crate::hwp5::header::Version;
    use crate::hwp5::model::{Decoder, ModelTree, Value};
    use crate::hwp5::record::{RecordReader, encode_record};
    use crate::hwp5::tree::RecordTree;
    use std::io::Cursor;

    fn decode(data: Vec<u8>) -> ModelTree {
        let (tree, err) = RecordTree::from_records(RecordReader::new(Cursor::new(data)), true);
        assert!(err.is_none());
        Decoder::for_version(Version::default()).decode_tree(tree)
    }

    /// Shape component header after the id(s), without scale/rotation pairs.
    fn component_header() -> Vec<u8> {
        let mut p = vec![0; 4 + 4 + 2 + 2 + 16 + 4 + 2 + 8];
        p.extend(0u16.to_le_bytes());
        for v in [1.0f64, 0.0, 0.0, 0.0, 1.0, 0.0] {
            p.extend(v.to_le_bytes());
        }
        p
    }

    fn line_and_no_fill() -> Vec<u8> {
        let mut p = 0u32.to_le_bytes().to_vec();
        p.extend(33i32.to_le_bytes());
        p.extend(0u32.to_le_bytes());
        p.push(0);
        p.extend(0u32.to_le_bytes());
        p
    }

    #[test]
    fn test_rectangle_under_drawing_object() {
        let mut control = chid::GSO.to_raw().to_le_bytes().to_vec();
        control.extend([0; 42]);
        let mut data = encode_record(HWPTAG_CTRL_HEADER, 0, &control);

        let mut component = chid::SHAPE_RECTANGLE.to_raw().to_le_bytes().to_vec();
        component.extend(chid::SHAPE_RECTANGLE.to_raw().to_le_bytes());
        component.extend(component_header());
        component.extend(line_and_no_fill());
        data.extend(encode_record(HWPTAG_SHAPE_COMPONENT, 1, &component));

        let mut rect = vec![20];
        rect.extend([0; 32]);
        data.extend(encode_record(HWPTAG_SHAPE_COMPONENT_RECTANGLE, 2, &rect));

        let mut textbox = 1i16.to_le_bytes().to_vec();
        textbox.extend([0; 2 + 4 + 8 + 4]);
        data.extend(encode_record(HWPTAG_LIST_HEADER, 2, &textbox));
        let tree = decode(data);

        let gso = tree.roots()[0];
        assert_eq!(tree.get(gso).map(|r| r.model), Some("GShapeObjectControl"));
        let shape_id = tree.children(gso)[0];
        let shape = tree.get(shape_id).unwrap();
        assert!(shape.is_complete(), "{:?}", shape.status);
        assert_eq!(shape.model, "ShapeRectangleComponent");
        assert_eq!(shape.chid(), Some(chid::SHAPE_RECTANGLE));
        let line = shape.get("line").and_then(Value::as_struct).unwrap();
        assert_eq!(line.get("width"), Some(&Value::I32(33)));

        let children: Vec<_> = tree
            .children(shape_id)
            .iter()
            .filter_map(|&id| tree.get(id))
            .map(|r| (r.model, r.is_complete()))
            .collect();
        assert_eq!(
            children,
            vec![("ShapeRectangle", true), ("TextboxParagraphList", true)]
        );
        let rect = tree.get(tree.children(shape_id)[0]).unwrap();
        assert_eq!(rect.get("round"), Some(&Value::U8(20)));
    }

    #[test]
    fn test_nested_component_has_single_id() {
        let mut component = chid::SHAPE_CONTAINER.to_raw().to_le_bytes().to_vec();
        component.extend(component_header());
        component.extend(1u16.to_le_bytes());
        component.extend(chid::SHAPE_LINE.to_raw().to_le_bytes());
        let tree = decode(encode_record(HWPTAG_SHAPE_COMPONENT, 0, &component));

        let shape = tree.get(tree.roots()[0]).unwrap();
        assert!(shape.is_complete(), "{:?}", shape.status);
        assert!(shape.get("chid0").is_none());
        assert_eq!(
            shape.get("controls"),
            Some(&Value::Array(vec![Value::Chid(chid::SHAPE_LINE)]))
        );
    }

    #[test]
    fn test_curve_segments_follow_point_count() {
        let mut payload = 3i16.to_le_bytes().to_vec();
        payload.extend([0; 3 * 8]);
        payload.extend([0, 1]);
        let tree = decode(encode_record(HWPTAG_SHAPE_COMPONENT_CURVE, 0, &payload));
        let curve = tree.get(tree.roots()[0]).unwrap();
        assert!(curve.is_complete(), "{:?}", curve.status);
        assert_eq!(curve.get("segments"), Some(&Value::Array(vec![Value::U8(0), Value::U8(1)])));
    }
}
