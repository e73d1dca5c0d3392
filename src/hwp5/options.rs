//! Options controlling how documents are opened and decoded.

use super::record::DEFAULT_MAX_RECORD_SIZE;
use super::transform::{DistributionKeyProvider, KeyProvider};
use std::sync::Arc;

/// Configuration options for decoding an HWP5 document.
///
/// # Examples
///
/// ```rust
/// use longan::hwp5::DecodeOptions;
///
/// // Create with defaults
/// let options = DecodeOptions::default();
///
/// // Or customize
/// let options = DecodeOptions::new()
///     .with_sections(false)
///     .with_strict_levels(false)
///     .with_max_record_size(1 << 20);
/// ```
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Source of AES keys for distribution documents
    pub key_provider: Arc<dyn KeyProvider>,
    /// Whether [`Hwp5File::decode`](super::Hwp5File::decode) decodes the
    /// section streams as well as `DocInfo`
    pub include_sections: bool,
    /// Records declaring a larger payload are framing errors
    pub max_record_size: usize,
    /// Whether illegal level transitions stop a stream. When disabled the
    /// levels are clamped into range instead.
    pub strict_levels: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            key_provider: Arc::new(DistributionKeyProvider),
            include_sections: true,
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
            strict_levels: true,
        }
    }
}

impl DecodeOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `provider` instead of deriving keys from the document.
    #[inline]
    pub fn with_key_provider(mut self, provider: Arc<dyn KeyProvider>) -> Self {
        self.key_provider = provider;
        self
    }

    #[inline]
    pub fn with_sections(mut self, include: bool) -> Self {
        self.include_sections = include;
        self
    }

    #[inline]
    pub fn with_max_record_size(mut self, size: usize) -> Self {
        self.max_record_size = size;
        self
    }

    #[inline]
    pub fn with_strict_levels(mut self, strict: bool) -> Self {
        self.strict_levels = strict;
        self
    }
}
