//! Turns raw records into [`ModelRecord`]s.

use super::codec::FieldCodec;
use super::schema::{Extension, Schema, SchemaRegistry};
use super::{DecodeStatus, FieldError, Fields, ModelRecord, ModelTree, PartialReason};
use crate::common::binary::ByteCursor;
use crate::hwp5::consts::Chid;
use crate::hwp5::header::Version;
use crate::hwp5::record::RawRecord;
use crate::hwp5::tree::{NodeId, RecordTree};
use tracing::{debug, warn};

/// Where a record sits while it is decoded.
///
/// Within a tree, the parent and every preceding sibling have already been
/// decoded and can be consulted.
pub struct RecordContext<'a> {
    pub version: Version,
    tree: Option<&'a ModelTree>,
    parent: Option<NodeId>,
}

impl<'a> RecordContext<'a> {
    /// A record decoded on its own, with no surrounding records.
    pub fn detached(version: Version) -> Self {
        Self {
            version,
            tree: None,
            parent: None,
        }
    }

    pub fn in_tree(version: Version, tree: &'a ModelTree, parent: Option<NodeId>) -> Self {
        Self {
            version,
            tree: Some(tree),
            parent,
        }
    }

    pub fn parent(&self) -> Option<&'a ModelRecord> {
        let tree = self.tree?;
        tree.get(self.parent?)
    }

    /// Already decoded siblings, in stream order.
    pub fn preceding_siblings(&self) -> impl Iterator<Item = &'a ModelRecord> {
        let parent = self.parent;
        self.tree.into_iter().flat_map(move |tree| {
            tree.children_of(parent)
                .iter()
                .filter_map(move |&id| tree.get(id))
        })
    }
}

enum Selected {
    None,
    Schema(Chid, &'static Schema),
    Unknown(Chid),
}

/// Schema-driven record decoder for one document.
#[derive(Debug, Clone)]
pub struct Decoder {
    registry: SchemaRegistry,
}

impl Decoder {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn for_version(version: Version) -> Self {
        Self::new(SchemaRegistry::for_version(version))
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn version(&self) -> Version {
        self.registry.version()
    }

    /// Decode every record of a tree. Parents are decoded before children.
    pub fn decode_tree(&self, tree: RecordTree<RawRecord>) -> ModelTree {
        let version = self.version();
        tree.into_map(|decoded, _, parent, raw| {
            let ctx = RecordContext::in_tree(version, decoded, parent);
            self.decode_record(&raw, &ctx)
        })
    }

    /// Decode one record. Never fails: problems are reported through
    /// [`ModelRecord::status`] with the undecoded bytes kept in the tail.
    pub fn decode_record(&self, raw: &RawRecord, ctx: &RecordContext<'_>) -> ModelRecord {
        let Some(schema) = self.registry.schema(raw.tag) else {
            debug!(tag = raw.tag, seqno = raw.seqno, size = raw.size(), "no schema for tag");
            return ModelRecord {
                tag: raw.tag,
                tag_name: raw.tag_name(),
                level: raw.level,
                seqno: raw.seqno,
                model: "UnknownRecord",
                fields: Fields::new(),
                discriminant: None,
                tail: Some(raw.payload.clone()),
                status: DecodeStatus::Unknown,
            };
        };

        let mut cursor = ByteCursor::new(&raw.payload);
        let mut fields = Fields::new();
        let mut model = schema.name;
        let mut discriminant = None;

        let mut status = match FieldCodec::new(schema.name, ctx).decode_fields(
            &mut cursor,
            schema.fields,
            &mut fields,
        ) {
            Err(e) => degraded(raw, e),
            Ok(()) => match self.select_extension(raw.tag, schema, &fields, ctx) {
                Selected::None => DecodeStatus::Complete,
                Selected::Schema(chid, extension) => {
                    discriminant = Some(chid);
                    model = extension.name;
                    match FieldCodec::new(extension.name, ctx).decode_fields(
                        &mut cursor,
                        extension.fields,
                        &mut fields,
                    ) {
                        Ok(()) => DecodeStatus::Complete,
                        Err(e) => degraded(raw, e),
                    }
                },
                Selected::Unknown(chid) => {
                    debug!(tag = raw.tag, seqno = raw.seqno, %chid, "no extension schema");
                    discriminant = Some(chid);
                    DecodeStatus::Partial(PartialReason::UnknownDiscriminant(chid))
                },
            },
        };

        let tail = (!cursor.is_empty()).then(|| raw.payload.slice(cursor.position()..));
        if tail.is_some() && status == DecodeStatus::Complete {
            status = DecodeStatus::Partial(PartialReason::TrailingBytes);
        }

        ModelRecord {
            tag: raw.tag,
            tag_name: raw.tag_name(),
            level: raw.level,
            seqno: raw.seqno,
            model,
            fields,
            discriminant,
            tail,
            status,
        }
    }

    fn select_extension(
        &self,
        tag: u16,
        schema: &'static Schema,
        fields: &Fields,
        ctx: &RecordContext<'_>,
    ) -> Selected {
        match schema.extension {
            Extension::None => Selected::None,
            Extension::ByChid(name) => match fields.get(name).and_then(|v| v.as_chid()) {
                Some(chid) => match self.registry.extension(tag, chid) {
                    Some(extension) => Selected::Schema(chid, extension),
                    None => Selected::Unknown(chid),
                },
                None => Selected::None,
            },
            Extension::ByContext(select) => match select(ctx) {
                Some((chid, extension)) => Selected::Schema(chid, extension),
                None => Selected::None,
            },
        }
    }
}

fn degraded(raw: &RawRecord, error: FieldError) -> DecodeStatus {
    warn!(tag = raw.tag, seqno = raw.seqno, %error, "record decoded partially");
    DecodeStatus::Partial(PartialReason::Field(error))
}
