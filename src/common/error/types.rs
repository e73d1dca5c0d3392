//! Unified error types for the longan decoder.
//!
//! Each pipeline layer has its own error enum; this type wraps them for
//! callers that only care that a document could not be handled.
use thiserror::Error;

use crate::hwp5::model::FieldError;
use crate::hwp5::record::FramingError;
use crate::hwp5::transform::TransformError;

/// Main error type for longan operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The container (OLE compound file or Zip) could not be opened or parsed
    #[error("Container error: {0}")]
    Container(String),

    /// The container opened but is not an HWP5 document
    #[error("Not a valid HWP5 document: {0}")]
    NotHwp5File(String),

    /// Stream or storage not found
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    /// Storage operation applied to the wrong kind of node
    #[error("Invalid storage operation: {0}")]
    InvalidStorage(String),

    /// Decompression or decryption of a stream failed
    #[error("Stream transform error: {0}")]
    StreamTransform(#[from] TransformError),

    /// Record header, payload or level structure is invalid
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    /// A declared field could not be decoded
    #[error("Field decode error: {0}")]
    FieldDecode(#[from] FieldError),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),
}

/// Result type for longan operations.
pub type Result<T> = std::result::Result<T, Error>;
