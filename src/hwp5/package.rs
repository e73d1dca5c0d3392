//! Entry point tying the pipeline together: container, header, streams,
//! records and model.

use super::consts::HWPTAG_BIN_DATA;
use super::header::{FileHeader, Version};
use super::model::{Decoder, ModelRecord, ModelTree, TextChunk, Value, paratext::chunks_to_text};
use super::options::DecodeOptions;
use super::record::{FramingError, RecordReader};
use super::transform::{TransformError, decode_stream};
use super::tree::{NodeId, RecordTree};
use super::treeop::Event;
use crate::common::binary::decode_utf16le;
use crate::common::{Error, Result};
use crate::ole::SummaryInformation;
use crate::storage::{Storage, StorageError, StorageNode, Stream, open_storage};
use flate2::read::DeflateDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use tracing::{debug, warn};

const FILE_HEADER: &str = "FileHeader";
const DOC_INFO: &str = "DocInfo";
const SUMMARY_INFORMATION: &str = "\u{5}HwpSummaryInformation";
const PREVIEW_TEXT: &str = "PrvText";
const BIN_DATA: &str = "BinData";

/// Why a stream produced fewer records than it holds.
#[derive(Debug, thiserror::Error)]
pub enum Diagnostic {
    #[error("stream unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    /// Records before the failure point are kept.
    #[error(transparent)]
    Framing(#[from] FramingError),
}

/// Decoded records of one stream, with the reason decoding stopped early.
#[derive(Debug)]
pub struct StreamOutcome {
    pub name: String,
    pub records: ModelTree,
    pub diagnostic: Option<Diagnostic>,
}

impl StreamOutcome {
    fn failed(name: &str, diagnostic: Diagnostic) -> Self {
        warn!(stream = name, error = %diagnostic, "stream not decoded");
        Self {
            name: name.to_string(),
            records: ModelTree::new(),
            diagnostic: Some(diagnostic),
        }
    }

    /// No stream-level problem and every record fully decoded.
    pub fn is_complete(&self) -> bool {
        self.diagnostic.is_none() && self.records.values().all(ModelRecord::is_complete)
    }

    /// Depth-first START/END events over the records.
    pub fn events(&self) -> impl Iterator<Item = (Event, NodeId, &ModelRecord)> {
        self.records.events()
    }

    /// Records with the given tag, in stream order.
    pub fn records_with_tag(&self, tag: u16) -> impl Iterator<Item = &ModelRecord> {
        self.records.values().filter(move |r| r.tag == tag)
    }

    /// Plain text of every paragraph, one line each.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for record in self.records.values() {
            if let Some(Value::ParaText(chunks)) = record.get("chunks") {
                out.push_str(&chunks_to_text(chunks));
                if chunks.iter().any(is_paragraph_end) {
                    out.push('\n');
                }
            }
        }
        out
    }
}

fn is_paragraph_end(chunk: &TextChunk) -> bool {
    matches!(chunk, TextChunk::Control { code: 13, .. })
}

/// Everything decoded from one document.
#[derive(Debug)]
pub struct Document {
    pub header: FileHeader,
    pub docinfo: StreamOutcome,
    /// One entry per section, in section order
    pub sections: Vec<StreamOutcome>,
}

/// An embedded binary, opened only on request.
pub struct BinDataStream<'f> {
    stream: Stream<'f>,
    /// Id used by `BinData` records to refer to this stream
    pub storage_id: Option<u16>,
    /// Whether the stream is raw-deflate compressed
    pub compressed: bool,
}

impl<'f> BinDataStream<'f> {
    pub fn name(&self) -> &str {
        self.stream.path().last().map(String::as_str).unwrap_or_default()
    }

    /// Stored size, before decompression.
    pub fn stored_len(&self) -> Option<u64> {
        self.stream.len()
    }

    pub fn open(&self) -> Result<Box<dyn Read + 'f>> {
        let reader = self.stream.open()?;
        if self.compressed {
            Ok(Box::new(DeflateDecoder::new(reader)))
        } else {
            Ok(reader)
        }
    }

    pub fn read_all(&self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.open()?.read_to_end(&mut data)?;
        Ok(data)
    }
}

/// `BIN0001.png` -> `1`
fn storage_id_of(name: &str) -> Option<u16> {
    let stem = name.split('.').next()?;
    let hex = stem.strip_prefix("BIN")?;
    u16::from_str_radix(hex, 16).ok()
}

/// An opened HWP5 document.
///
/// # Examples
///
/// ```no_run
/// use longan::hwp5::Hwp5File;
///
/// let file = Hwp5File::open("report.hwp")?;
/// println!("format {}", file.header().version);
/// for section in file.sections()? {
///     print!("{}", section.text());
/// }
/// # Ok::<(), longan::Error>(())
/// ```
pub struct Hwp5File {
    storage: Box<dyn Storage>,
    header: FileHeader,
    decoder: Decoder,
    options: DecodeOptions,
}

impl std::fmt::Debug for Hwp5File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hwp5File")
            .field("header", &self.header)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Hwp5File {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, DecodeOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: DecodeOptions) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), options)
    }

    /// Open a document held in memory.
    pub fn from_bytes(bytes: Vec<u8>, options: DecodeOptions) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes), options)
    }

    pub fn from_reader<R>(reader: R, options: DecodeOptions) -> Result<Self>
    where
        R: Read + Seek + Send + 'static,
    {
        Self::from_storage(open_storage(reader)?, options)
    }

    /// Use an already opened container. Fails when it has no valid
    /// `FileHeader` stream.
    pub fn from_storage(storage: Box<dyn Storage>, options: DecodeOptions) -> Result<Self> {
        let data = match storage.read_stream(FILE_HEADER) {
            Ok(data) => data,
            Err(StorageError::NotFound(_) | StorageError::NotAStream(_)) => {
                return Err(Error::NotHwp5File("no FileHeader stream".to_string()));
            },
            Err(e) => return Err(e.into()),
        };
        let header = FileHeader::parse(&data)?;
        debug!(version = %header.version, flags = ?header.flags, "opened document");

        Ok(Self {
            decoder: Decoder::for_version(header.version),
            storage,
            header,
            options,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn version(&self) -> Version {
        self.header.version
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// The underlying container.
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Bytes of a DocInfo or section stream after decryption and inflation.
    pub fn stream_bytes(&self, name: &str) -> Result<Vec<u8>> {
        let raw = self.storage.read_stream(name)?;
        Ok(decode_stream(name, raw, &self.header, self.options.key_provider.as_ref())?)
    }

    /// Decode any record stream. Problems become the outcome's diagnostic.
    pub fn decode_stream(&self, name: &str) -> StreamOutcome {
        let raw = match self.storage.read_stream(name) {
            Ok(raw) => raw,
            Err(e) => return StreamOutcome::failed(name, e.into()),
        };
        let keys = self.options.key_provider.as_ref();
        let data = match decode_stream(name, raw, &self.header, keys) {
            Ok(data) => data,
            Err(e) => return StreamOutcome::failed(name, e.into()),
        };

        let reader = RecordReader::new(Cursor::new(data))
            .with_max_record_size(self.options.max_record_size);
        let (tree, framing) = RecordTree::from_records(reader, self.options.strict_levels);
        if let Some(e) = &framing {
            warn!(stream = name, records = tree.len(), error = %e, "record stream cut short");
        }
        debug!(stream = name, records = tree.len(), "framed stream");

        StreamOutcome {
            name: name.to_string(),
            records: self.decoder.decode_tree(tree),
            diagnostic: framing.map(Diagnostic::Framing),
        }
    }

    pub fn docinfo(&self) -> StreamOutcome {
        self.decode_stream(DOC_INFO)
    }

    /// Directory holding the sections: `ViewText` for distribution
    /// documents, `BodyText` otherwise.
    pub fn section_directory(&self) -> &'static str {
        if self.header.distributable() {
            "ViewText"
        } else {
            "BodyText"
        }
    }

    /// Section stream paths ordered by section index.
    pub fn section_names(&self) -> Result<Vec<String>> {
        Ok(self.list_sections()?)
    }

    fn list_sections(&self) -> std::result::Result<Vec<String>, StorageError> {
        let directory = self.section_directory();
        let names = self.storage.resolve(directory)?.into_directory()?.names()?;
        let mut sections: Vec<(u32, String)> = names
            .into_iter()
            .filter_map(|name| {
                let index = name.strip_prefix("Section")?.parse().ok()?;
                Some((index, format!("{directory}/{name}")))
            })
            .collect();
        sections.sort();
        Ok(sections.into_iter().map(|(_, path)| path).collect())
    }

    pub fn section_count(&self) -> Result<usize> {
        Ok(self.section_names()?.len())
    }

    pub fn section(&self, index: usize) -> Result<StreamOutcome> {
        let name = self
            .section_names()?
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::ComponentNotFound(format!("section {index}")))?;
        Ok(self.decode_stream(&name))
    }

    /// Every section. A broken section does not affect the others.
    pub fn sections(&self) -> Result<Vec<StreamOutcome>> {
        Ok(self
            .section_names()?
            .iter()
            .map(|name| self.decode_stream(name))
            .collect())
    }

    /// Decode `DocInfo` and, unless disabled in the options, every section.
    ///
    /// The container was opened with the file, so nothing fails here: stream
    /// problems, including an unreadable section directory, are reported in
    /// each [`StreamOutcome`].
    pub fn decode(&self) -> Result<Document> {
        let docinfo = self.docinfo();
        let sections = if self.options.include_sections {
            match self.list_sections() {
                Ok(names) => names.iter().map(|name| self.decode_stream(name)).collect(),
                Err(e) => vec![StreamOutcome::failed(self.section_directory(), e.into())],
            }
        } else {
            Vec::new()
        };
        Ok(Document {
            header: self.header.clone(),
            docinfo,
            sections,
        })
    }

    /// Embedded binaries under `BinData`, not yet read.
    ///
    /// Compression follows each item's `BinData` record in `DocInfo`, falling
    /// back to the document default.
    pub fn bindata(&self) -> Result<Vec<BinDataStream<'_>>> {
        let directory = match self.storage.resolve(BIN_DATA) {
            Ok(node) => node.into_directory()?,
            Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let policies = self.bindata_compression();

        let mut streams = Vec::new();
        for node in directory.children()? {
            let StorageNode::Stream(stream) = node else {
                continue;
            };
            let storage_id = stream.path().last().and_then(|name| storage_id_of(name));
            let compressed = match storage_id.and_then(|id| policies.get(&id)) {
                Some(1) => true,
                Some(2) => false,
                _ => self.header.compressed(),
            };
            streams.push(BinDataStream {
                stream,
                storage_id,
                compressed,
            });
        }
        Ok(streams)
    }

    /// storage id -> compression bits of the `BinData` records.
    fn bindata_compression(&self) -> HashMap<u16, u32> {
        self.docinfo()
            .records_with_tag(HWPTAG_BIN_DATA)
            .filter_map(|record| {
                let id = record.get("storage_id")?.as_u32()?;
                let flags = record.get("flags")?.as_u32()?;
                Some((u16::try_from(id).ok()?, (flags >> 4) & 0x3))
            })
            .collect()
    }

    /// Document summary properties, when the document carries them.
    pub fn summary_information(&self) -> Result<Option<SummaryInformation>> {
        match self.storage.read_stream(SUMMARY_INFORMATION) {
            Ok(data) => Ok(Some(SummaryInformation::parse(&data)?)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The plain-text preview saved next to the document.
    pub fn preview_text(&self) -> Result<Option<String>> {
        match self.storage.read_stream(PREVIEW_TEXT) {
            Ok(data) => Ok(Some(decode_utf16le(&data).trim_end_matches('\0').to_string())),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
