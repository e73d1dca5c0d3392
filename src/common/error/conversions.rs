//! Error conversion implementations.
//!
//! This module contains From trait implementations to convert from internal
//! error types to the unified Error type.

use super::types::Error;
use crate::common::binary::BinaryError;
use crate::ole::OleError;
use crate::storage::StorageError;

impl From<OleError> for Error {
    fn from(err: OleError) -> Self {
        match err {
            OleError::Io(e) => Error::Io(e),
            OleError::StreamNotFound(path) => Error::ComponentNotFound(path),
            other => Error::Container(other.to_string()),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => Error::ComponentNotFound(path),
            StorageError::NotAStream(path) => {
                Error::InvalidStorage(format!("{path} is not a stream"))
            },
            StorageError::NotADirectory(path) => {
                Error::InvalidStorage(format!("{path} is not a directory"))
            },
            StorageError::Ole(e) => Error::from(e),
            StorageError::Io(e) => Error::Io(e),
            StorageError::Container(s) => Error::Container(s),
        }
    }
}

impl From<BinaryError> for Error {
    fn from(err: BinaryError) -> Self {
        Error::Container(err.to_string())
    }
}

#[cfg(feature = "zip_storage")]
impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Container(err.to_string())
    }
}
