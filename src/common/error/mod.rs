//! Unified error types for longan.
//!
//! This module provides a unified error type that encompasses errors from the
//! container, transform, framing and model layers.

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{Error, Result};
