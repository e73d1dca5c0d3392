//! [`Storage`] backend for Zip archives.
//!
//! Zip has no real directories, so they are derived from the slash-separated
//! entry names. Opening a stream reads nothing; the entry is inflated into
//! memory on the first read of the returned reader, since the archive reader
//! is shared by every open stream.

use super::{NodeKind, Storage, StorageError, StreamReader};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor, Read, Seek};
use zip::ZipArchive;
use zip::result::ZipError;

pub struct ZipStorage<R: Read + Seek> {
    archive: Mutex<ZipArchive<R>>,
    /// Stream path -> uncompressed size
    streams: BTreeMap<String, u64>,
    /// Every directory path, including the root as ""
    directories: BTreeSet<String>,
}

impl<R: Read + Seek> ZipStorage<R> {
    pub fn open(reader: R) -> Result<Self, ZipError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut streams = BTreeMap::new();
        let mut directories = BTreeSet::from([String::new()]);

        for index in 0..archive.len() {
            let entry = archive.by_index(index)?;
            let name = entry.name().trim_matches('/').to_string();
            if name.is_empty() {
                continue;
            }
            if entry.is_dir() {
                add_with_parents(&mut directories, &name);
            } else {
                if let Some((parent, _)) = name.rsplit_once('/') {
                    add_with_parents(&mut directories, parent);
                }
                streams.insert(name, entry.size());
            }
        }

        Ok(Self {
            archive: Mutex::new(archive),
            streams,
            directories,
        })
    }
}

fn add_with_parents(directories: &mut BTreeSet<String>, path: &str) {
    let mut end = 0;
    for part in path.split('/') {
        end += part.len();
        directories.insert(path[..end].to_string());
        end += 1;
    }
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

fn leaf_of(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, leaf)| leaf)
}

impl<R: Read + Seek + Send> Storage for ZipStorage<R> {
    fn node_kind(&self, path: &[&str]) -> Option<NodeKind> {
        let key = path.join("/");
        if self.streams.contains_key(&key) {
            Some(NodeKind::Stream)
        } else if self.directories.contains(&key) {
            Some(NodeKind::Directory)
        } else {
            None
        }
    }

    fn child_names(&self, path: &[&str]) -> Result<Vec<String>, StorageError> {
        let key = path.join("/");
        match self.node_kind(path) {
            Some(NodeKind::Directory) => {},
            Some(NodeKind::Stream) => return Err(StorageError::NotADirectory(key)),
            None => return Err(StorageError::NotFound(key)),
        }
        let dirs = self
            .directories
            .iter()
            .filter(|dir| !dir.is_empty() && parent_of(dir) == key);
        let streams = self.streams.keys().filter(|stream| parent_of(stream) == key);
        Ok(dirs.chain(streams).map(|p| leaf_of(p).to_string()).collect())
    }

    fn open_stream(&self, path: &[&str]) -> Result<StreamReader<'_>, StorageError> {
        let key = path.join("/");
        match self.node_kind(path) {
            Some(NodeKind::Stream) => {},
            Some(NodeKind::Directory) => return Err(StorageError::NotAStream(key)),
            None => return Err(StorageError::NotFound(key)),
        }
        Ok(Box::new(EntryReader {
            storage: self,
            key,
            data: None,
        }))
    }

    fn stream_len(&self, path: &[&str]) -> Option<u64> {
        self.streams.get(&path.join("/")).copied()
    }
}

/// Reader over one entry, inflated on first use.
struct EntryReader<'a, R: Read + Seek> {
    storage: &'a ZipStorage<R>,
    key: String,
    data: Option<Cursor<Vec<u8>>>,
}

impl<R: Read + Seek> EntryReader<'_, R> {
    fn load(&self) -> io::Result<Cursor<Vec<u8>>> {
        let mut archive = self.storage.archive.lock();
        let mut entry = archive.by_name(&self.key).map_err(io::Error::other)?;
        let mut data = Vec::with_capacity(entry.size().min(1 << 20) as usize);
        entry.read_to_end(&mut data)?;
        Ok(Cursor::new(data))
    }
}

impl<R: Read + Seek> Read for EntryReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.data.is_none() {
            let loaded = self.load()?;
            self.data = Some(loaded);
        }
        match self.data.as_mut() {
            Some(data) => data.read(buf),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::open_storage;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_directories_derived_from_names() {
        let bytes = archive(&[
            ("FileHeader", b"hdr"),
            ("BodyText/Section0", b"s0"),
            ("BodyText/Section1", b"s1"),
        ]);
        let storage = open_storage(Cursor::new(bytes)).unwrap();
        assert_eq!(
            storage.root().names().unwrap(),
            vec!["BodyText".to_string(), "FileHeader".to_string()]
        );
        let body = storage.resolve("BodyText").unwrap().into_directory().unwrap();
        assert_eq!(body.names().unwrap(), vec!["Section0", "Section1"]);
        assert_eq!(storage.read_stream("BodyText/Section1").unwrap(), b"s1");
    }

    fn stored_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, data) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_open_defers_reading_the_entry() {
        let payload = b"BIN-PAYLOAD-0001";
        let mut bytes = stored_archive(&[("BinData/BIN0001.png", payload), ("FileHeader", b"hdr")]);
        let at = bytes
            .windows(payload.len())
            .position(|w| w == payload)
            .unwrap();
        bytes[at] ^= 0xFF;

        let storage = ZipStorage::open(Cursor::new(bytes)).unwrap();
        let mut corrupt = storage.open_stream(&["BinData", "BIN0001.png"]).unwrap();
        let mut header = storage.open_stream(&["FileHeader"]).unwrap();

        let mut data = Vec::new();
        header.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"hdr");
        assert!(corrupt.read_to_end(&mut Vec::new()).is_err());
    }

    #[test]
    fn test_interleaved_readers() {
        let bytes = archive(&[("a", b"0123456789"), ("b", b"abcdefghij")]);
        let storage = ZipStorage::open(Cursor::new(bytes)).unwrap();
        let mut a = storage.open_stream(&["a"]).unwrap();
        let mut b = storage.open_stream(&["b"]).unwrap();
        let (mut out_a, mut out_b) = (Vec::new(), Vec::new());
        let mut chunk = [0u8; 3];
        loop {
            let n = a.read(&mut chunk).unwrap();
            out_a.extend_from_slice(&chunk[..n]);
            let m = b.read(&mut chunk).unwrap();
            out_b.extend_from_slice(&chunk[..m]);
            if n == 0 && m == 0 {
                break;
            }
        }
        assert_eq!(out_a, b"0123456789");
        assert_eq!(out_b, b"abcdefghij");
    }

    #[test]
    fn test_missing_and_wrong_kind() {
        let storage = ZipStorage::open(Cursor::new(archive(&[("a/b", b"x")]))).unwrap();
        assert_eq!(storage.node_kind(&["a"]), Some(NodeKind::Directory));
        assert_eq!(storage.stream_len(&["a", "b"]), Some(1));
        assert!(matches!(storage.open_stream(&["a"]), Err(StorageError::NotAStream(_))));
        assert!(matches!(storage.open_stream(&["c"]), Err(StorageError::NotFound(_))));
        assert!(matches!(
            storage.child_names(&["a", "b"]),
            Err(StorageError::NotADirectory(_))
        ));
    }
}
