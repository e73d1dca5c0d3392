//! Longan - A Rust library for decoding HWP5 binary documents
//!
//! HWP5 is the binary format of the Hangul word processor. A document is an
//! OLE compound file (or, from some producers, a Zip archive) holding a
//! `FileHeader`, a `DocInfo` stream of shared definitions, section streams
//! with the body text, and embedded binaries. This library turns those into
//! a tree of typed records.
//!
//! # Features
//!
//! - **Containers**: OLE2 compound files and Zip archives behind one [`storage::Storage`] view
//! - **Stream transforms**: raw deflate and AES-128 decryption of distribution documents
//! - **Record trees**: level-nested records with START/END event streams
//! - **Versioned model**: per-version schemas, control-id dispatch, and partial
//!   decoding that keeps every undecoded byte
//!
//! # Example - Reading an HWP5 file
//!
//! ```no_run
//! use longan::Hwp5File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = Hwp5File::open("document.hwp")?;
//! println!("Version: {}", file.version());
//!
//! for section in file.sections()? {
//!     if let Some(diagnostic) = &section.diagnostic {
//!         eprintln!("{}: {}", section.name, diagnostic);
//!     }
//!     print!("{}", section.text());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Low-level record access
//!
//! ```no_run
//! use longan::hwp5::{RecordReader, RecordTree};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("DocInfo.bin")?;
//! let (tree, error) = RecordTree::from_records(RecordReader::new(&data[..]), true);
//! for (event, _, record) in tree.events() {
//!     println!("{:?} {}", event, record.tag_name());
//! }
//! if let Some(error) = error {
//!     eprintln!("stopped early: {}", error);
//! }
//! # Ok(())
//! # }
//! ```

/// Errors and byte-level helpers shared by every layer
pub mod common;

/// HWP5 headers, stream transforms, record framing and the record model
pub mod hwp5;

/// OLE2 compound file reader
///
/// Reads the directory tree and streams of the compound files HWP5 documents
/// are stored in, plus the summary-information property set.
pub mod ole;

/// Container-independent directory and stream access
pub mod storage;

pub use common::{Error, Result};
pub use hwp5::{DecodeOptions, Document, Hwp5File, StreamOutcome};
