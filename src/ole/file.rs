use super::consts::*;
use fixedbitset::FixedBitSet;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Raw OLE directory entry structure (128 bytes)
///
/// This represents the on-disk format of a directory entry.
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    name_len: U16<LE>,
    /// Entry type (1 = storage, 2 = stream, 5 = root)
    entry_type: u8,
    /// Node color (0 = red, 1 = black)
    node_color: u8,
    sid_left: U32<LE>,
    sid_right: U32<LE>,
    sid_child: U32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    creation_time: U64<LE>,
    modified_time: U64<LE>,
    start_sector: U32<LE>,
    stream_size: U64<LE>,
}

/// Error types for OLE file parsing
#[derive(Debug, thiserror::Error)]
pub enum OleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Not an OLE file")]
    NotOleFile,
    #[error("Corrupted file: {0}")]
    CorruptedFile(String),
    #[error("Stream not found: {0}")]
    StreamNotFound(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<crate::common::binary::BinaryError> for OleError {
    fn from(err: crate::common::binary::BinaryError) -> Self {
        OleError::InvalidData(err.to_string())
    }
}

/// Represents an OLE directory entry (stream or storage)
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Storage ID (index in directory)
    pub sid: u32,
    /// Entry name (UTF-16 decoded to UTF-8)
    pub name: String,
    /// Entry type (stream, storage, root)
    pub entry_type: u8,
    /// Index of left sibling in red-black tree
    pub sid_left: u32,
    /// Index of right sibling in red-black tree
    pub sid_right: u32,
    /// Index of child node in red-black tree
    pub sid_child: u32,
    /// First sector of the stream
    pub start_sector: u32,
    /// Size of the stream in bytes
    pub size: u64,
    /// Whether this stream is in MiniFAT
    pub is_minifat: bool,
}

impl DirectoryEntry {
    #[inline]
    pub fn is_stream(&self) -> bool {
        self.entry_type == STGTY_STREAM
    }

    #[inline]
    pub fn is_storage(&self) -> bool {
        self.entry_type == STGTY_STORAGE || self.entry_type == STGTY_ROOT
    }
}

/// OLE2 compound file reader.
///
/// The reader is held behind a mutex so that streams can be opened through a
/// shared reference; every open stream reads its sectors on demand.
#[derive(Debug)]
pub struct OleFile<R: Read + Seek> {
    reader: Mutex<R>,
    file_size: u64,
    /// Sector size (512 or 4096 bytes)
    sector_size: usize,
    /// Mini sector size (typically 64 bytes)
    mini_sector_size: usize,
    /// Mini stream cutoff size (typically 4096 bytes)
    mini_stream_cutoff: u32,
    /// File Allocation Table - maps sector to next sector in chain
    fat: Vec<u32>,
    /// Mini FAT - for streams smaller than cutoff size
    minifat: Vec<u32>,
    /// All reachable directory entries indexed by SID
    dir_entries: Vec<Option<DirectoryEntry>>,
    /// Mini stream data, loaded on first use
    ministream: OnceCell<Vec<u8>>,
}

impl<R: Read + Seek> OleFile<R> {
    /// Open and parse an OLE file from a reader
    pub fn open(mut reader: R) -> Result<Self, OleError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if file_size < MINIMAL_OLEFILE_SIZE as u64 {
            return Err(OleError::NotOleFile);
        }

        let mut header = [0u8; 512];
        reader.read_exact(&mut header)?;

        if &header[0..8] != MAGIC {
            return Err(OleError::NotOleFile);
        }

        let u16_at = |offset: usize| {
            U16::<LE>::read_from_bytes(&header[offset..offset + 2])
                .map(|v| v.get())
                .unwrap_or(0)
        };
        let u32_at = |offset: usize| {
            U32::<LE>::read_from_bytes(&header[offset..offset + 4])
                .map(|v| v.get())
                .unwrap_or(0)
        };

        let dll_version = u16_at(0x1A);
        let byte_order = u16_at(0x1C);
        let sector_shift = u16_at(0x1E);
        let mini_sector_shift = u16_at(0x20);
        let first_dir_sector = u32_at(0x30);
        let mini_stream_cutoff = u32_at(0x38);
        let first_minifat_sector = u32_at(0x3C);
        let num_minifat_sectors = u32_at(0x40);
        let first_difat_sector = u32_at(0x44);
        let num_difat_sectors = u32_at(0x48);

        if byte_order != 0xFFFE {
            return Err(OleError::InvalidFormat("Invalid byte order".to_string()));
        }
        if !(7..=16).contains(&sector_shift) || mini_sector_shift > sector_shift {
            return Err(OleError::InvalidFormat(format!(
                "Unsupported sector shift {sector_shift}/{mini_sector_shift}"
            )));
        }

        let sector_size = 1usize << sector_shift;
        let mini_sector_size = 1usize << mini_sector_shift;

        // Old writers leave the DLL version inconsistent with the sector size.
        if (dll_version == 3 && sector_size != 512) || (dll_version == 4 && sector_size != 4096) {
            tracing::warn!(dll_version, sector_size, "OLE sector size does not match DLL version");
        }

        let mut ole = OleFile {
            reader: Mutex::new(reader),
            file_size,
            sector_size,
            mini_sector_size,
            mini_stream_cutoff,
            fat: Vec::new(),
            minifat: Vec::new(),
            dir_entries: Vec::new(),
            ministream: OnceCell::new(),
        };

        ole.load_fat(&header, first_difat_sector, num_difat_sectors)?;
        ole.load_directory(first_dir_sector)?;
        if num_minifat_sectors > 0 && first_minifat_sector != ENDOFCHAIN {
            ole.load_minifat(first_minifat_sector)?;
        }

        Ok(ole)
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Load the File Allocation Table (FAT)
    ///
    /// The first 109 FAT sector indexes are stored in the header, additional
    /// indexes are stored in DIFAT sectors.
    fn load_fat(
        &mut self,
        header: &[u8; 512],
        first_difat_sector: u32,
        num_difat_sectors: u32,
    ) -> Result<(), OleError> {
        let mut fat_sectors = Vec::new();
        for i in 0..HEADER_DIFAT_ENTRIES {
            let offset = 0x4C + i * 4;
            let sector = U32::<LE>::read_from_bytes(&header[offset..offset + 4])
                .map(|v| v.get())
                .unwrap_or(FREESECT);
            if sector == FREESECT || sector == ENDOFCHAIN {
                break;
            }
            fat_sectors.push(sector);
        }

        if num_difat_sectors > 0 {
            let mut difat_sector = first_difat_sector;
            let entries_per_sector = (self.sector_size / 4) - 1;

            for _ in 0..num_difat_sectors {
                if difat_sector > MAXREGSECT {
                    break;
                }
                let sector_data = self.read_sector(difat_sector)?;
                for i in 0..entries_per_sector {
                    let sector = read_u32_entry(&sector_data, i);
                    if sector == FREESECT || sector == ENDOFCHAIN {
                        break;
                    }
                    fat_sectors.push(sector);
                }
                difat_sector = read_u32_entry(&sector_data, entries_per_sector);
            }
        }

        let entries_per_sector = self.sector_size / 4;
        self.fat.reserve(fat_sectors.len() * entries_per_sector);
        for &sector_id in &fat_sectors {
            let sector_data = self.read_sector(sector_id)?;
            self.fat
                .extend((0..entries_per_sector).map(|i| read_u32_entry(&sector_data, i)));
        }

        Ok(())
    }

    /// Load the Mini FAT (for small streams)
    fn load_minifat(&mut self, first_minifat_sector: u32) -> Result<(), OleError> {
        let minifat_data = self.read_chain_fully(first_minifat_sector)?;
        self.minifat = (0..minifat_data.len() / 4)
            .map(|i| read_u32_entry(&minifat_data, i))
            .collect();
        Ok(())
    }

    /// Load every directory entry reachable from the root.
    fn load_directory(&mut self, first_dir_sector: u32) -> Result<(), OleError> {
        let dir_data = self.read_chain_fully(first_dir_sector)?;
        let num_entries = dir_data.len() / DIRENTRY_SIZE;
        if num_entries == 0 {
            return Err(OleError::CorruptedFile("Empty directory".to_string()));
        }
        self.dir_entries = vec![None; num_entries];

        let root = self.parse_directory_entry(&dir_data[0..DIRENTRY_SIZE], 0)?;
        if root.entry_type != STGTY_ROOT {
            return Err(OleError::CorruptedFile(
                "First directory entry is not the root".to_string(),
            ));
        }
        let root_child = root.sid_child;
        self.dir_entries[0] = Some(root);

        let mut visited = FixedBitSet::with_capacity(num_entries);
        visited.insert(0);
        self.build_storage_tree(root_child, &dir_data, &mut visited)
    }

    /// Parse a single directory entry from 128 bytes
    fn parse_directory_entry(&self, data: &[u8], sid: u32) -> Result<DirectoryEntry, OleError> {
        let raw = RawDirectoryEntry::read_from_bytes(data)
            .map_err(|_| OleError::InvalidFormat("Failed to parse directory entry".to_string()))?;

        let name_len = raw.name_len.get() as usize;
        let name_bytes = &raw.name[0..name_len.saturating_sub(2).min(64)];
        let name = crate::common::binary::decode_utf16le(name_bytes)
            .trim_end_matches('\0')
            .to_string();

        // 512-byte sector files only use the low 32 bits of the size
        let size = if self.sector_size == 512 {
            raw.stream_size.get() & 0xFFFFFFFF
        } else {
            raw.stream_size.get()
        };

        let is_minifat = size < self.mini_stream_cutoff as u64 && raw.entry_type == STGTY_STREAM;

        Ok(DirectoryEntry {
            sid,
            name,
            entry_type: raw.entry_type,
            sid_left: raw.sid_left.get(),
            sid_right: raw.sid_right.get(),
            sid_child: raw.sid_child.get(),
            start_sector: raw.start_sector.get(),
            size,
            is_minifat,
        })
    }

    /// Walk the sibling/child links from `sid`.
    ///
    /// Stale references (out of range, revisits) are logged and dropped instead
    /// of failing the whole container. Free entries are kept so their sibling
    /// links still reach live entries, but they are never listed.
    fn build_storage_tree(
        &mut self,
        sid: u32,
        dir_data: &[u8],
        visited: &mut FixedBitSet,
    ) -> Result<(), OleError> {
        let mut pending = vec![sid];
        while let Some(sid) = pending.pop() {
            if sid == NOSTREAM {
                continue;
            }
            let index = sid as usize;
            if index >= self.dir_entries.len() {
                tracing::warn!(sid, "OLE directory references an out-of-range entry");
                continue;
            }
            if visited.contains(index) {
                tracing::warn!(sid, "OLE directory entry visited twice");
                continue;
            }
            visited.insert(index);

            let offset = index * DIRENTRY_SIZE;
            let entry = self.parse_directory_entry(&dir_data[offset..offset + DIRENTRY_SIZE], sid)?;
            pending.push(entry.sid_left);
            pending.push(entry.sid_right);

            if entry.entry_type == STGTY_EMPTY {
                tracing::warn!(sid, "OLE directory references a free entry");
            } else if entry.is_storage() {
                pending.push(entry.sid_child);
            }
            self.dir_entries[index] = Some(entry);
        }
        Ok(())
    }

    /// Read a single sector from the file
    fn read_sector(&self, sector_id: u32) -> Result<Vec<u8>, OleError> {
        let mut buffer = vec![0u8; self.sector_size];
        self.read_sector_into(sector_id, &mut buffer)?;
        Ok(buffer)
    }

    fn read_sector_into(&self, sector_id: u32, buffer: &mut [u8]) -> Result<(), OleError> {
        // Sector position in file: (sector_id + 1) * sector_size
        let position = ((sector_id as u64) + 1) * (self.sector_size as u64);
        if position + buffer.len() as u64 > self.file_size {
            return Err(OleError::CorruptedFile(format!(
                "Sector {sector_id} lies beyond the end of the file"
            )));
        }
        let mut reader = self.reader.lock();
        reader.seek(SeekFrom::Start(position))?;
        reader.read_exact(buffer)?;
        Ok(())
    }

    /// Resolve a FAT chain into the ordered list of its sectors.
    fn fat_chain(&self, start_sector: u32) -> Result<Vec<u32>, OleError> {
        follow_chain(&self.fat, start_sector, "FAT")
    }

    /// Read a whole FAT chain into memory.
    fn read_chain_fully(&self, start_sector: u32) -> Result<Vec<u8>, OleError> {
        let chain = self.fat_chain(start_sector)?;
        let mut data = vec![0u8; chain.len() * self.sector_size];
        for (i, &sector) in chain.iter().enumerate() {
            let start = i * self.sector_size;
            self.read_sector_into(sector, &mut data[start..start + self.sector_size])?;
        }
        Ok(data)
    }

    fn ministream(&self) -> Result<&[u8], OleError> {
        self.ministream
            .get_or_try_init(|| {
                let root = self
                    .root()
                    .ok_or_else(|| OleError::CorruptedFile("No root entry".to_string()))?;
                self.read_chain_fully(root.start_sector)
            })
            .map(Vec::as_slice)
    }

    /// Read a stream by following the MiniFAT chain
    fn read_minifat_stream(&self, start_sector: u32, size: u64) -> Result<Vec<u8>, OleError> {
        let ministream = self.ministream()?;
        let chain = follow_chain(&self.minifat, start_sector, "MiniFAT")?;
        let mut data = Vec::with_capacity(chain.len() * self.mini_sector_size);
        for sector in chain {
            let position = (sector as usize) * self.mini_sector_size;
            let chunk = ministream
                .get(position..position + self.mini_sector_size)
                .ok_or_else(|| OleError::CorruptedFile("Mini sector out of bounds".to_string()))?;
            data.extend_from_slice(chunk);
        }
        data.truncate(size as usize);
        Ok(data)
    }

    /// The root storage entry.
    pub fn root(&self) -> Option<&DirectoryEntry> {
        self.dir_entries.first().and_then(Option::as_ref)
    }

    /// Get the root entry name
    pub fn get_root_name(&self) -> Option<&str> {
        self.root().map(|r| r.name.as_str())
    }

    /// List the immediate children of a storage, in directory-tree order.
    pub fn list_directory_entries(&self, path: &[&str]) -> Result<Vec<&DirectoryEntry>, OleError> {
        let dir_entry = self.find_entry(path)?;
        if !dir_entry.is_storage() {
            return Err(OleError::InvalidFormat(format!(
                "{} is not a storage",
                path.join("/")
            )));
        }
        let mut entries = Vec::new();
        self.collect_directory_children(dir_entry.sid_child, &mut entries);
        Ok(entries)
    }

    /// In-order walk of a sibling tree, skipping entries dropped while loading.
    fn collect_directory_children<'a>(&'a self, sid: u32, entries: &mut Vec<&'a DirectoryEntry>) {
        let mut stack = Vec::new();
        let mut seen = FixedBitSet::with_capacity(self.dir_entries.len());
        let mut current = sid;
        loop {
            while let Some(entry) = self.live_entry(current) {
                if seen.contains(current as usize) {
                    break;
                }
                seen.insert(current as usize);
                stack.push(entry);
                current = entry.sid_left;
            }
            let Some(entry) = stack.pop() else { break };
            if entry.entry_type != STGTY_EMPTY {
                entries.push(entry);
            }
            current = entry.sid_right;
        }
    }

    fn live_entry(&self, sid: u32) -> Option<&DirectoryEntry> {
        if sid == NOSTREAM {
            return None;
        }
        self.dir_entries.get(sid as usize).and_then(Option::as_ref)
    }

    /// List all streams in the OLE file as paths of storage/stream names.
    pub fn list_streams(&self) -> Vec<Vec<String>> {
        let mut streams = Vec::new();
        let mut pending = vec![(Vec::new(), 0u32)];
        while let Some((path, sid)) = pending.pop() {
            let Some(entry) = self.live_entry(sid) else { continue };
            let mut children = Vec::new();
            self.collect_directory_children(entry.sid_child, &mut children);
            for child in children {
                let mut child_path: Vec<String> = path.clone();
                child_path.push(child.name.clone());
                if child.is_stream() {
                    streams.push(child_path);
                } else if child.is_storage() {
                    pending.push((child_path, child.sid));
                }
            }
        }
        streams.sort();
        streams
    }

    /// Open a stream by path for sequential reading.
    ///
    /// Regular streams read their sectors lazily; mini streams are small by
    /// definition and are copied out of the mini stream up front.
    pub fn open_stream(&self, path: &[&str]) -> Result<OleStream<'_, R>, OleError> {
        let entry = self.find_entry(path)?;
        if !entry.is_stream() {
            return Err(OleError::InvalidFormat(format!(
                "{} is not a stream",
                path.join("/")
            )));
        }

        if entry.is_minifat {
            let data = self.read_minifat_stream(entry.start_sector, entry.size)?;
            return Ok(OleStream::Mini(Cursor::new(data)));
        }

        let chain = if entry.size == 0 {
            Vec::new()
        } else {
            self.fat_chain(entry.start_sector)?
        };
        let available = chain.len() as u64 * self.sector_size as u64;
        if available < entry.size {
            tracing::warn!(
                stream = %path.join("/"),
                declared = entry.size,
                available,
                "OLE stream chain shorter than its declared size"
            );
        }
        Ok(OleStream::Chained(ChainReader {
            ole: self,
            chain,
            index: 0,
            buffer: Vec::new(),
            buffer_pos: 0,
            remaining: entry.size.min(available),
        }))
    }

    /// Read a whole stream into memory.
    pub fn read_stream(&self, path: &[&str]) -> Result<Vec<u8>, OleError> {
        let mut stream = self.open_stream(path)?;
        let mut data = Vec::new();
        stream.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Find a directory entry by path
    pub fn find_entry(&self, path: &[&str]) -> Result<&DirectoryEntry, OleError> {
        let not_found = || OleError::StreamNotFound(path.join("/"));
        let mut current = self.root().ok_or_else(not_found)?;
        for &name in path {
            if !current.is_storage() {
                return Err(not_found());
            }
            let mut children = Vec::new();
            self.collect_directory_children(current.sid_child, &mut children);
            current = children
                .into_iter()
                .find(|child| child.name.eq_ignore_ascii_case(name))
                .ok_or_else(not_found)?;
        }
        Ok(current)
    }

    /// Check if a stream or storage exists
    pub fn exists(&self, path: &[&str]) -> bool {
        self.find_entry(path).is_ok()
    }
}

/// A readable OLE stream.
pub enum OleStream<'a, R: Read + Seek> {
    /// Stream stored in the mini stream
    Mini(Cursor<Vec<u8>>),
    /// Stream stored in regular sectors, read on demand
    Chained(ChainReader<'a, R>),
}

impl<R: Read + Seek> Read for OleStream<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            OleStream::Mini(cursor) => cursor.read(buf),
            OleStream::Chained(chain) => chain.read(buf),
        }
    }
}

/// Sequential reader over a resolved FAT sector chain.
pub struct ChainReader<'a, R: Read + Seek> {
    ole: &'a OleFile<R>,
    chain: Vec<u32>,
    index: usize,
    buffer: Vec<u8>,
    buffer_pos: usize,
    remaining: u64,
}

impl<R: Read + Seek> Read for ChainReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        if self.buffer_pos >= self.buffer.len() {
            let Some(&sector) = self.chain.get(self.index) else {
                return Ok(0);
            };
            self.index += 1;
            self.buffer = self
                .ole
                .read_sector(sector)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            self.buffer_pos = 0;
        }
        let available = (self.buffer.len() - self.buffer_pos).min(self.remaining as usize);
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&self.buffer[self.buffer_pos..self.buffer_pos + n]);
        self.buffer_pos += n;
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Follow an allocation-table chain, rejecting loops and dangling indexes.
fn follow_chain(table: &[u32], start: u32, label: &str) -> Result<Vec<u32>, OleError> {
    let mut chain = Vec::new();
    let mut seen = FixedBitSet::with_capacity(table.len());
    let mut sector = start;
    while sector != ENDOFCHAIN {
        // Some old producers terminate chains with FREESECT
        if sector == FREESECT {
            break;
        }
        let index = sector as usize;
        if index >= table.len() {
            return Err(OleError::CorruptedFile(format!(
                "Invalid sector index {sector} in {label}"
            )));
        }
        if seen.contains(index) {
            return Err(OleError::CorruptedFile(format!("Loop in {label} chain")));
        }
        seen.insert(index);
        chain.push(sector);
        sector = table[index];
    }
    Ok(chain)
}

#[inline]
fn read_u32_entry(data: &[u8], index: usize) -> u32 {
    let offset = index * 4;
    data.get(offset..offset + 4)
        .and_then(|bytes| U32::<LE>::read_from_bytes(bytes).ok())
        .map(|v| v.get())
        .unwrap_or(FREESECT)
}

/// Check if a file/data is an OLE file by checking magic bytes
pub fn is_ole_file(data: &[u8]) -> bool {
    data.len() >= 8 && &data[0..8] == MAGIC
}
