//! HWP5 binary documents.
//!
//! Decoding runs in layers, each usable on its own:
//!
//! - [`header`]: the `FileHeader` stream (version and protection flags)
//! - [`transform`]: decryption and raw-deflate inflation of record streams
//! - [`record`]: framing a byte stream into `(tag, level, payload)` records
//! - [`tree`] and [`treeop`]: nesting records by level
//! - [`model`]: versioned, schema-driven decoding of record payloads
//!
//! [`Hwp5File`] drives all of them over a [`Storage`](crate::storage::Storage).
//!
//! # Examples
//!
//! ```no_run
//! use longan::hwp5::{DecodeOptions, Hwp5File};
//!
//! let options = DecodeOptions::new().with_strict_levels(false);
//! let file = Hwp5File::open_with_options("report.hwp", options)?;
//! let document = file.decode()?;
//! for record in document.docinfo.records.values() {
//!     println!("{} {}", record.tag_name, record.model);
//! }
//! # Ok::<(), longan::Error>(())
//! ```

pub mod consts;
pub mod header;
pub mod model;
mod options;
mod package;
pub mod record;
pub mod transform;
pub mod tree;
pub mod treeop;

pub use consts::{Chid, tag_name};
pub use header::{FileHeader, HeaderFlags, Version};
pub use model::{DecodeStatus, Decoder, ModelRecord, ModelTree, PartialReason, Value};
pub use options::DecodeOptions;
pub use package::{BinDataStream, Diagnostic, Document, Hwp5File, StreamOutcome};
pub use record::{FramingError, RawRecord, RecordReader};
pub use transform::{DistributionKeyProvider, KeyProvider, StaticKeyProvider, TransformError};
pub use tree::{NodeId, RecordTree};
pub use treeop::Event;
