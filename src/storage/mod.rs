//! Uniform directory-of-streams view over HWP5 containers.
//!
//! HWP5 documents are either OLE compound files or, for some newer producers,
//! Zip archives. Both are exposed through the [`Storage`] trait, and callers
//! navigate them with [`StorageNode`], which is either a [`Directory`] or a
//! [`Stream`]. Directory iteration order is deterministic per container.

mod ole;
#[cfg(feature = "zip_storage")]
mod zip;

use crate::common::error::{Error, Result};
use crate::ole::{OleError, OleFile, is_ole_file};
use std::io::{self, Read, Seek, SeekFrom};

#[cfg(feature = "zip_storage")]
pub use self::zip::ZipStorage;

/// Errors raised while navigating a container.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("not a stream: {0}")]
    NotAStream(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error(transparent)]
    Ole(#[from] OleError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("container error: {0}")]
    Container(String),
}

/// What lives at a path inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    Stream,
}

/// Sequential reader over one stream, exclusively owned by the caller.
pub type StreamReader<'a> = Box<dyn Read + 'a>;

/// A container backend.
///
/// Paths are sequences of names relative to the root; the empty path is the
/// root directory itself.
pub trait Storage: Send + Sync {
    /// Kind of the node at `path`, or `None` if nothing lives there.
    fn node_kind(&self, path: &[&str]) -> Option<NodeKind>;

    /// Names of the immediate children of the directory at `path`.
    fn child_names(&self, path: &[&str]) -> std::result::Result<Vec<String>, StorageError>;

    /// Open the stream at `path` for reading.
    fn open_stream(&self, path: &[&str]) -> std::result::Result<StreamReader<'_>, StorageError>;

    /// Declared length of the stream at `path`, when the backend knows it.
    fn stream_len(&self, _path: &[&str]) -> Option<u64> {
        None
    }
}

impl dyn Storage + '_ {
    /// The root directory.
    pub fn root(&self) -> Directory<'_> {
        Directory {
            storage: self,
            path: Vec::new(),
        }
    }

    /// Resolve a slash-separated path to a node.
    pub fn resolve(&self, path: &str) -> std::result::Result<StorageNode<'_>, StorageError> {
        let parts: Vec<String> = split_path(path).map(str::to_string).collect();
        node_at(self, parts)
    }

    /// Read a whole stream into memory.
    pub fn read_stream(&self, path: &str) -> std::result::Result<Vec<u8>, StorageError> {
        self.resolve(path)?.into_stream()?.read_all()
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty())
}

fn as_strs(path: &[String]) -> Vec<&str> {
    path.iter().map(String::as_str).collect()
}

fn node_at(
    storage: &dyn Storage,
    path: Vec<String>,
) -> std::result::Result<StorageNode<'_>, StorageError> {
    match storage.node_kind(&as_strs(&path)) {
        Some(NodeKind::Directory) => Ok(StorageNode::Directory(Directory { storage, path })),
        Some(NodeKind::Stream) => Ok(StorageNode::Stream(Stream { storage, path })),
        None => Err(StorageError::NotFound(path.join("/"))),
    }
}

/// A node inside a container.
pub enum StorageNode<'s> {
    Directory(Directory<'s>),
    Stream(Stream<'s>),
}

impl<'s> StorageNode<'s> {
    /// Path components from the root.
    pub fn path(&self) -> &[String] {
        match self {
            StorageNode::Directory(dir) => &dir.path,
            StorageNode::Stream(stream) => &stream.path,
        }
    }

    /// Last path component; empty for the root.
    pub fn name(&self) -> &str {
        self.path().last().map(String::as_str).unwrap_or("")
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            StorageNode::Directory(_) => NodeKind::Directory,
            StorageNode::Stream(_) => NodeKind::Stream,
        }
    }

    pub fn into_stream(self) -> std::result::Result<Stream<'s>, StorageError> {
        match self {
            StorageNode::Stream(stream) => Ok(stream),
            StorageNode::Directory(dir) => Err(StorageError::NotAStream(dir.path.join("/"))),
        }
    }

    pub fn into_directory(self) -> std::result::Result<Directory<'s>, StorageError> {
        match self {
            StorageNode::Directory(dir) => Ok(dir),
            StorageNode::Stream(stream) => Err(StorageError::NotADirectory(stream.path.join("/"))),
        }
    }
}

/// Read-only view of a directory.
pub struct Directory<'s> {
    storage: &'s dyn Storage,
    path: Vec<String>,
}

impl<'s> Directory<'s> {
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Names of the children in container order.
    pub fn names(&self) -> std::result::Result<Vec<String>, StorageError> {
        self.storage.child_names(&as_strs(&self.path))
    }

    /// Fetch a child by name.
    pub fn child(&self, name: &str) -> std::result::Result<StorageNode<'s>, StorageError> {
        let mut path = self.path.clone();
        path.push(name.to_string());
        node_at(self.storage, path)
    }

    /// All children in container order.
    pub fn children(&self) -> std::result::Result<Vec<StorageNode<'s>>, StorageError> {
        self.names()?
            .into_iter()
            .map(|name| self.child(&name))
            .collect()
    }
}

/// Handle to a stream; nothing is read until [`open`](Self::open) is called.
pub struct Stream<'s> {
    storage: &'s dyn Storage,
    path: Vec<String>,
}

impl<'s> Stream<'s> {
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn len(&self) -> Option<u64> {
        self.storage.stream_len(&as_strs(&self.path))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    pub fn open(&self) -> std::result::Result<StreamReader<'s>, StorageError> {
        self.storage.open_stream(&as_strs(&self.path))
    }

    pub fn read_all(&self) -> std::result::Result<Vec<u8>, StorageError> {
        let mut data = Vec::new();
        self.open()?.read_to_end(&mut data)?;
        Ok(data)
    }
}

/// Container formats an HWP5 document may arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// OLE compound binary file
    Ole,
    /// Zip archive
    Zip,
}

/// Detect the container format from the leading bytes.
pub fn detect_container(header: &[u8]) -> Option<ContainerFormat> {
    if is_ole_file(header) {
        Some(ContainerFormat::Ole)
    } else if header.starts_with(b"PK\x03\x04") {
        Some(ContainerFormat::Zip)
    } else {
        None
    }
}

/// Open a container from any seekable reader.
pub fn open_storage<R>(mut reader: R) -> Result<Box<dyn Storage>>
where
    R: Read + Seek + Send + 'static,
{
    let mut magic = [0u8; 8];
    reader.seek(SeekFrom::Start(0))?;
    let read = read_up_to(&mut reader, &mut magic)?;
    reader.seek(SeekFrom::Start(0))?;

    match detect_container(&magic[..read]) {
        Some(ContainerFormat::Ole) => Ok(Box::new(OleFile::open(reader)?)),
        #[cfg(feature = "zip_storage")]
        Some(ContainerFormat::Zip) => Ok(Box::new(ZipStorage::open(reader)?)),
        #[cfg(not(feature = "zip_storage"))]
        Some(ContainerFormat::Zip) => Err(Error::Unsupported(
            "zip containers require the zip_storage feature".to_string(),
        )),
        None => Err(Error::Container("unrecognized container signature".to_string())),
    }
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::testutil::CfbBuilder;
    use std::io::Cursor;

    fn sample() -> Box<dyn Storage> {
        let bytes = CfbBuilder::new()
            .stream("FileHeader", vec![1, 2, 3])
            .stream("BodyText/Section0", vec![4, 5])
            .build();
        open_storage(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_detect_container() {
        assert_eq!(detect_container(crate::ole::consts::MAGIC), Some(ContainerFormat::Ole));
        assert_eq!(detect_container(b"PK\x03\x04rest"), Some(ContainerFormat::Zip));
        assert_eq!(detect_container(b"HWP"), None);
    }

    #[test]
    fn test_unrecognized_container_fails() {
        match open_storage(Cursor::new(b"not a container".to_vec())) {
            Err(err) => assert!(matches!(err, Error::Container(_))),
            Ok(_) => panic!("garbage opened as a container"),
        }
    }

    #[test]
    fn test_navigate_directories_and_streams() {
        let storage = sample();
        let root = storage.root();
        let mut names = root.names().unwrap();
        names.sort();
        assert_eq!(names, vec!["BodyText".to_string(), "FileHeader".to_string()]);

        let body = root.child("BodyText").unwrap();
        assert_eq!(body.kind(), NodeKind::Directory);
        let section = body.into_directory().unwrap().child("Section0").unwrap();
        assert_eq!(section.name(), "Section0");
        assert_eq!(section.into_stream().unwrap().read_all().unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_wrong_kind_and_missing_paths() {
        let storage = sample();
        assert!(matches!(
            storage.resolve("BodyText").unwrap().into_stream(),
            Err(StorageError::NotAStream(_))
        ));
        assert!(matches!(
            storage.resolve("FileHeader").unwrap().into_directory(),
            Err(StorageError::NotADirectory(_))
        ));
        assert!(matches!(storage.resolve("DocInfo"), Err(StorageError::NotFound(_))));
        assert_eq!(storage.read_stream("/FileHeader").unwrap(), vec![1, 2, 3]);
    }
}
