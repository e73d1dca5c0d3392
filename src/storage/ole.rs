//! [`Storage`] backend for OLE compound files.

use super::{NodeKind, Storage, StorageError, StreamReader};
use crate::ole::{OleError, OleFile};
use std::io::{Read, Seek};

impl<R: Read + Seek + Send> Storage for OleFile<R> {
    fn node_kind(&self, path: &[&str]) -> Option<NodeKind> {
        let entry = self.find_entry(path).ok()?;
        if entry.is_stream() {
            Some(NodeKind::Stream)
        } else if entry.is_storage() {
            Some(NodeKind::Directory)
        } else {
            None
        }
    }

    fn child_names(&self, path: &[&str]) -> Result<Vec<String>, StorageError> {
        match self.node_kind(path) {
            Some(NodeKind::Directory) => Ok(self
                .list_directory_entries(path)?
                .into_iter()
                .map(|entry| entry.name.clone())
                .collect()),
            Some(NodeKind::Stream) => Err(StorageError::NotADirectory(path.join("/"))),
            None => Err(StorageError::NotFound(path.join("/"))),
        }
    }

    fn open_stream(&self, path: &[&str]) -> Result<StreamReader<'_>, StorageError> {
        match self.node_kind(path) {
            Some(NodeKind::Stream) => match OleFile::open_stream(self, path) {
                Ok(stream) => Ok(Box::new(stream)),
                Err(OleError::StreamNotFound(p)) => Err(StorageError::NotFound(p)),
                Err(e) => Err(e.into()),
            },
            Some(NodeKind::Directory) => Err(StorageError::NotAStream(path.join("/"))),
            None => Err(StorageError::NotFound(path.join("/"))),
        }
    }

    fn stream_len(&self, path: &[&str]) -> Option<u64> {
        self.find_entry(path)
            .ok()
            .filter(|entry| entry.is_stream())
            .map(|entry| entry.size)
    }
}
