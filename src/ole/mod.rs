/// Constants for OLE file format
pub mod consts;

/// Main OLE file parsing implementation
mod file;

/// Property-set parsing for summary-information streams
mod metadata;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export public types for convenient access
pub use file::{ChainReader, DirectoryEntry, OleError, OleFile, OleStream, is_ole_file};
pub use metadata::{PropertyValue, SummaryInformation, filetime_to_datetime, parse_property_stream};
