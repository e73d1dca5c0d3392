//! Declarative record layouts and the per-document schema registry.
//!
//! Layouts are static tables of [`Field`]s. The registry is built once per
//! document from those tables, keyed by the `(major, minor)` format
//! generation; finer build-level differences are expressed inside a schema
//! with [`Cond::Since`].

use super::decoder::RecordContext;
use crate::hwp5::consts::{Chid, HWPTAG_CTRL_HEADER, HWPTAG_SHAPE_COMPONENT};
use crate::hwp5::header::Version;
use std::collections::HashMap;

/// How to decode one value.
#[derive(Debug, Clone, Copy)]
pub enum Kind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F64,
    /// Unsigned length in 1/7200 inch
    HwpUnit,
    /// Signed length in 1/7200 inch
    SHwpUnit,
    /// 16-bit signed length in 1/7200 inch
    HwpUnit16,
    /// One UTF-16 code unit
    WChar,
    Color,
    Chid,
    /// u16 character count followed by UTF-16LE text
    BStr,
    /// Fixed number of UTF-16 code units, NULs trimmed
    WChars(usize),
    /// Fixed-size opaque bytes
    Bytes(usize),
    /// Everything left in the record
    Rest,
    /// Fixed element count
    Array(usize, &'static Kind),
    /// Count primitive followed by that many elements
    Counted(&'static Kind, &'static Kind),
    /// Element count taken from an already decoded value
    Ref(CountRef, &'static Kind),
    /// Elements until the record is exhausted
    Repeat(&'static Kind),
    /// Integer that must be one of the listed values
    Enum(&'static Kind, &'static [(u32, &'static str)]),
    Struct(&'static [Field]),
    ParaText,
    ParameterSet,
}

/// Where a context-bound element count comes from.
#[derive(Debug, Clone, Copy)]
pub enum CountRef {
    /// An earlier field of the same structure
    Field(&'static str),
    /// `(field >> shift) & mask`
    Bits {
        field: &'static str,
        shift: u32,
        mask: u32,
    },
    /// An earlier field minus one, floored at zero
    MinusOne(&'static str),
    /// A field of the parent record
    Parent(&'static str),
}

/// Presence condition of a field.
#[derive(Debug, Clone, Copy)]
pub enum Cond {
    Always,
    /// Document version is at least this one
    Since(Version),
    /// All bits of `mask` set in an earlier field
    FlagSet(&'static str, u32),
    /// No bit of `mask` set in an earlier field
    FlagClear(&'static str, u32),
    /// `field & mask == value`
    Masked {
        field: &'static str,
        mask: u32,
        value: u32,
    },
    /// The parent record is a control with this id
    ParentChid(Chid),
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub cond: Cond,
}

impl Field {
    pub const fn new(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            cond: Cond::Always,
        }
    }

    pub const fn when(self, cond: Cond) -> Self {
        Self { cond, ..self }
    }

    pub const fn since(self, major: u8, minor: u8, build: u8, revision: u8) -> Self {
        self.when(Cond::Since(Version::new(major, minor, build, revision)))
    }
}

/// Picks an extension schema after the header fields are decoded.
#[derive(Debug, Clone, Copy)]
pub enum Extension {
    None,
    /// The named field holds a control id looked up in the registry
    ByChid(&'static str),
    /// Selected from the surrounding records
    ByContext(fn(&RecordContext<'_>) -> Option<(Chid, &'static Schema)>),
}

#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [Field],
    pub extension: Extension,
}

impl Schema {
    pub const fn new(name: &'static str, fields: &'static [Field]) -> Self {
        Self {
            name,
            fields,
            extension: Extension::None,
        }
    }

    pub const fn extended(self, extension: Extension) -> Self {
        Self { extension, ..self }
    }
}

/// A tag layout introduced in format generation `since`.
#[derive(Debug, Clone, Copy)]
pub struct TagEntry {
    pub since: (u8, u8),
    pub tag: u16,
    pub schema: &'static Schema,
}

#[derive(Debug, Clone, Copy)]
pub enum ExtensionKey {
    Exact(Chid),
    /// Any control id starting with this byte
    Family(u8),
}

#[derive(Debug, Clone, Copy)]
pub struct ExtensionEntry {
    pub tag: u16,
    pub key: ExtensionKey,
    pub schema: &'static Schema,
}

/// Schemas in effect for one document.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    version: Version,
    tags: HashMap<u16, ((u8, u8), &'static Schema)>,
    extensions: HashMap<(u16, Chid), &'static Schema>,
    families: Vec<(u16, u8, &'static Schema)>,
}

impl SchemaRegistry {
    /// Registry of the built-in tables for a document of `version`.
    pub fn for_version(version: Version) -> Self {
        let mut registry = Self::from_tables(version, super::docinfo::SCHEMAS, &[]);
        registry.add_tables(super::bodytext::SCHEMAS, &[]);
        registry.add_tables(&[], super::controls::EXTENSIONS);
        registry.add_tables(super::shapes::SCHEMAS, super::shapes::EXTENSIONS);
        registry
    }

    pub fn from_tables(version: Version, tags: &[TagEntry], extensions: &[ExtensionEntry]) -> Self {
        let mut registry = Self {
            version,
            tags: HashMap::new(),
            extensions: HashMap::new(),
            families: Vec::new(),
        };
        registry.add_tables(tags, extensions);
        registry
    }

    /// Merge more tables. For each tag the newest generation not later than
    /// the document's wins.
    pub fn add_tables(&mut self, tags: &[TagEntry], extensions: &[ExtensionEntry]) {
        let generation = self.version.generation();
        for entry in tags.iter().filter(|e| e.since <= generation) {
            match self.tags.get(&entry.tag) {
                Some((since, _)) if *since > entry.since => {},
                _ => {
                    self.tags.insert(entry.tag, (entry.since, entry.schema));
                },
            }
        }
        for entry in extensions {
            match entry.key {
                ExtensionKey::Exact(chid) => {
                    self.extensions.insert((entry.tag, chid), entry.schema);
                },
                ExtensionKey::Family(prefix) => {
                    self.families.push((entry.tag, prefix, entry.schema));
                },
            }
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn schema(&self, tag: u16) -> Option<&'static Schema> {
        self.tags.get(&tag).map(|(_, schema)| *schema)
    }

    pub fn extension(&self, tag: u16, chid: Chid) -> Option<&'static Schema> {
        self.extensions.get(&(tag, chid)).copied().or_else(|| {
            self.families
                .iter()
                .find(|(t, prefix, _)| *t == tag && chid.0[0] == *prefix)
                .map(|(_, _, schema)| *schema)
        })
    }

    /// Control ids with a registered extension schema.
    pub fn control_ids(&self) -> Vec<Chid> {
        let mut ids: Vec<Chid> = self
            .extensions
            .keys()
            .filter(|(tag, _)| *tag == HWPTAG_CTRL_HEADER)
            .map(|(_, chid)| *chid)
            .collect();
        ids.sort();
        ids
    }

    /// Shape component ids with a registered extension schema.
    pub fn shape_ids(&self) -> Vec<Chid> {
        let mut ids: Vec<Chid> = self
            .extensions
            .keys()
            .filter(|(tag, _)| *tag == HWPTAG_SHAPE_COMPONENT)
            .map(|(_, chid)| *chid)
            .collect();
        ids.sort();
        ids
    }
}
