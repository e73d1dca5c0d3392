//! Minimal compound-file writer for tests.
//!
//! Produces version 3 files (512-byte sectors) with every stream stored in
//! regular sectors. Siblings are linked as a right-leaning chain, which is a
//! valid (if unbalanced) directory tree.

use super::consts::*;
use std::collections::BTreeMap;

const SECTOR: usize = 512;

#[derive(Default)]
struct Storage {
    storages: BTreeMap<String, Storage>,
    streams: BTreeMap<String, Vec<u8>>,
}

struct Entry {
    name: String,
    entry_type: u8,
    left: u32,
    right: u32,
    child: u32,
    start: u32,
    size: u32,
}

#[derive(Default)]
pub struct CfbBuilder {
    root: Storage,
    stale_entry: bool,
}

impl CfbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stream at a slash-separated path, creating storages as needed.
    pub fn stream(mut self, path: &str, data: Vec<u8>) -> Self {
        let mut parts: Vec<&str> = path.split('/').collect();
        let name = parts.pop().unwrap();
        let mut storage = &mut self.root;
        for part in parts {
            storage = storage.storages.entry(part.to_string()).or_default();
        }
        storage.streams.insert(name.to_string(), data);
        self
    }

    /// Splice a free directory entry between the first two root children.
    pub fn stale_entry(mut self) -> Self {
        self.stale_entry = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut entries = vec![Entry {
            name: "Root Entry".to_string(),
            entry_type: STGTY_ROOT,
            left: NOSTREAM,
            right: NOSTREAM,
            child: NOSTREAM,
            start: ENDOFCHAIN,
            size: 0,
        }];
        let mut payloads: Vec<(usize, Vec<u8>)> = Vec::new();
        let first_child = add_children(&self.root, &mut entries, &mut payloads);
        entries[0].child = first_child;

        if self.stale_entry && first_child != NOSTREAM {
            let free = entries.len() as u32;
            let first = first_child as usize;
            entries.push(Entry {
                name: String::new(),
                entry_type: STGTY_EMPTY,
                left: NOSTREAM,
                right: entries[first].right,
                child: NOSTREAM,
                start: 0,
                size: 0,
            });
            entries[first].right = free;
        }

        let dir_sectors = entries.len().div_ceil(SECTOR / DIRENTRY_SIZE);
        let mut fat: Vec<u32> = vec![0xFFFFFFFD]; // FAT sector marks itself
        for i in 0..dir_sectors {
            fat.push(if i + 1 == dir_sectors {
                ENDOFCHAIN
            } else {
                (fat.len() + 1) as u32
            });
        }

        let mut data_sectors = Vec::new();
        for (index, payload) in &payloads {
            if payload.is_empty() {
                continue;
            }
            let count = payload.len().div_ceil(SECTOR);
            let start = fat.len() as u32;
            entries[*index].start = start;
            for i in 0..count {
                fat.push(if i + 1 == count {
                    ENDOFCHAIN
                } else {
                    start + i as u32 + 1
                });
                let mut sector = payload[i * SECTOR..payload.len().min((i + 1) * SECTOR)].to_vec();
                sector.resize(SECTOR, 0);
                data_sectors.push(sector);
            }
        }
        assert!(fat.len() <= SECTOR / 4, "test container too large");
        fat.resize(SECTOR / 4, FREESECT);

        let mut out = vec![0u8; SECTOR];
        out[0..8].copy_from_slice(MAGIC);
        out[0x18..0x1A].copy_from_slice(&0x3Eu16.to_le_bytes());
        out[0x1A..0x1C].copy_from_slice(&3u16.to_le_bytes());
        out[0x1C..0x1E].copy_from_slice(&0xFFFEu16.to_le_bytes());
        out[0x1E..0x20].copy_from_slice(&9u16.to_le_bytes());
        out[0x20..0x22].copy_from_slice(&6u16.to_le_bytes());
        out[0x2C..0x30].copy_from_slice(&1u32.to_le_bytes());
        out[0x30..0x34].copy_from_slice(&1u32.to_le_bytes());
        // Cutoff of zero keeps every stream out of the mini stream
        out[0x38..0x3C].copy_from_slice(&0u32.to_le_bytes());
        out[0x3C..0x40].copy_from_slice(&ENDOFCHAIN.to_le_bytes());
        out[0x44..0x48].copy_from_slice(&ENDOFCHAIN.to_le_bytes());
        for i in 0..HEADER_DIFAT_ENTRIES {
            let offset = 0x4C + i * 4;
            let value = if i == 0 { 0 } else { FREESECT };
            out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }

        for value in &fat {
            out.extend_from_slice(&value.to_le_bytes());
        }

        let mut dir = Vec::with_capacity(dir_sectors * SECTOR);
        for entry in &entries {
            dir.extend_from_slice(&encode_entry(entry));
        }
        dir.resize(dir_sectors * SECTOR, 0);
        // Unused slots must read as free entries
        for slot in entries.len()..dir_sectors * (SECTOR / DIRENTRY_SIZE) {
            let offset = slot * DIRENTRY_SIZE;
            dir[offset + 0x44..offset + 0x50].fill(0xFF);
        }
        out.extend_from_slice(&dir);

        for sector in data_sectors {
            out.extend_from_slice(&sector);
        }
        if out.len() < MINIMAL_OLEFILE_SIZE {
            out.resize(MINIMAL_OLEFILE_SIZE, 0);
        }
        out
    }
}

fn add_children(
    storage: &Storage,
    entries: &mut Vec<Entry>,
    payloads: &mut Vec<(usize, Vec<u8>)>,
) -> u32 {
    let mut ids = Vec::new();
    for (name, child) in &storage.storages {
        let index = entries.len();
        entries.push(Entry {
            name: name.clone(),
            entry_type: STGTY_STORAGE,
            left: NOSTREAM,
            right: NOSTREAM,
            child: NOSTREAM,
            start: 0,
            size: 0,
        });
        let grandchild = add_children(child, entries, payloads);
        entries[index].child = grandchild;
        ids.push((name.clone(), index));
    }
    for (name, data) in &storage.streams {
        let index = entries.len();
        entries.push(Entry {
            name: name.clone(),
            entry_type: STGTY_STREAM,
            left: NOSTREAM,
            right: NOSTREAM,
            child: NOSTREAM,
            start: ENDOFCHAIN,
            size: data.len() as u32,
        });
        payloads.push((index, data.clone()));
        ids.push((name.clone(), index));
    }
    ids.sort();
    for pair in ids.windows(2) {
        entries[pair[0].1].right = pair[1].1 as u32;
    }
    ids.first().map_or(NOSTREAM, |(_, index)| *index as u32)
}

fn encode_entry(entry: &Entry) -> [u8; DIRENTRY_SIZE] {
    let mut raw = [0u8; DIRENTRY_SIZE];
    let units: Vec<u16> = entry.name.encode_utf16().collect();
    for (i, unit) in units.iter().take(31).enumerate() {
        raw[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    let name_len = if units.is_empty() {
        0
    } else {
        (units.len().min(31) as u16 + 1) * 2
    };
    raw[0x40..0x42].copy_from_slice(&name_len.to_le_bytes());
    raw[0x42] = entry.entry_type;
    raw[0x43] = 1;
    raw[0x44..0x48].copy_from_slice(&entry.left.to_le_bytes());
    raw[0x48..0x4C].copy_from_slice(&entry.right.to_le_bytes());
    raw[0x4C..0x50].copy_from_slice(&entry.child.to_le_bytes());
    raw[0x74..0x78].copy_from_slice(&entry.start.to_le_bytes());
    raw[0x78..0x7C].copy_from_slice(&entry.size.to_le_bytes());
    raw
}
