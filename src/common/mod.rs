//! Types and utilities shared by the container and record layers.

pub mod binary;
pub mod error;

pub use binary::{BinaryError, ByteCursor};
pub use error::{Error, Result};
