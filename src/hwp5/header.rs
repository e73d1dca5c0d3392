//! The `FileHeader` stream.

use crate::common::error::{Error, Result};
use bitflags::bitflags;
use serde::Serialize;
use std::fmt;
use zerocopy::{FromBytes, LE, U32};
use zerocopy_derive::FromBytes as DeriveFromBytes;

pub const FILE_HEADER_SIZE: usize = 256;
pub const SIGNATURE: &[u8] = b"HWP Document File";

#[derive(DeriveFromBytes)]
#[repr(C)]
struct RawFileHeader {
    signature: [u8; 32],
    version: U32<LE>,
    flags: U32<LE>,
    license: U32<LE>,
    encrypt_version: U32<LE>,
    kogl_country: u8,
    reserved: [u8; 207],
}

/// Format version `major.minor.build.revision`, packed as `0xMMnnPPrr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
    pub revision: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8, build: u8, revision: u8) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    pub const fn from_u32(raw: u32) -> Self {
        let [major, minor, build, revision] = raw.to_be_bytes();
        Self::new(major, minor, build, revision)
    }

    pub const fn to_u32(self) -> u32 {
        u32::from_be_bytes([self.major, self.minor, self.build, self.revision])
    }

    /// The `(major, minor)` pair schema lookups are keyed on.
    pub const fn generation(self) -> (u8, u8) {
        (self.major, self.minor)
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::new(5, 0, 3, 4)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
    }
}

bitflags! {
    /// Document property bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct HeaderFlags: u32 {
        const COMPRESSED = 1 << 0;
        const PASSWORD = 1 << 1;
        const DISTRIBUTABLE = 1 << 2;
        const SCRIPT = 1 << 3;
        const DRM = 1 << 4;
        const XML_TEMPLATE_STORAGE = 1 << 5;
        const HISTORY = 1 << 6;
        const CERT_SIGNED = 1 << 7;
        const CERT_ENCRYPTED = 1 << 8;
        const CERT_SIGNATURE_EXTRA = 1 << 9;
        const CERT_DRM = 1 << 10;
        const CCL = 1 << 11;
        const MOBILE_OPTIMIZED = 1 << 12;
        const PRIVACY_SECURITY = 1 << 13;
        const TRACK_CHANGE = 1 << 14;
        const KOGL = 1 << 15;
        const HAS_VIDEO_CONTROL = 1 << 16;
        const HAS_ORDER_FIELD = 1 << 17;

        const _ = !0;
    }
}

bitflags! {
    /// Copyright / license bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct LicenseFlags: u32 {
        const CCL = 1 << 0;
        const COPY_LIMITED = 1 << 1;
        const COPY_SAME = 1 << 2;

        const _ = !0;
    }
}

/// Parsed `FileHeader` stream. Unknown flag bits are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    pub version: Version,
    pub flags: HeaderFlags,
    pub license: LicenseFlags,
    pub encrypt_version: u32,
    /// KOGL license country code
    pub kogl_country: u8,
}

impl FileHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let bytes = data.get(..FILE_HEADER_SIZE).ok_or_else(|| {
            Error::NotHwp5File(format!(
                "FileHeader is {} bytes, expected {FILE_HEADER_SIZE}",
                data.len()
            ))
        })?;
        let raw = RawFileHeader::read_from_bytes(bytes)
            .map_err(|_| Error::NotHwp5File("unreadable FileHeader".to_string()))?;
        if !raw.signature.starts_with(SIGNATURE) {
            return Err(Error::NotHwp5File("bad FileHeader signature".to_string()));
        }

        Ok(Self {
            version: Version::from_u32(raw.version.get()),
            flags: HeaderFlags::from_bits_retain(raw.flags.get()),
            license: LicenseFlags::from_bits_retain(raw.license.get()),
            encrypt_version: raw.encrypt_version.get(),
            kogl_country: raw.kogl_country,
        })
    }

    pub fn compressed(&self) -> bool {
        self.flags.contains(HeaderFlags::COMPRESSED)
    }

    pub fn password(&self) -> bool {
        self.flags.contains(HeaderFlags::PASSWORD)
    }

    pub fn distributable(&self) -> bool {
        self.flags.contains(HeaderFlags::DISTRIBUTABLE)
    }
}

#[cfg(test)]
pub(crate) fn encode_file_header(version: Version, flags: HeaderFlags) -> Vec<u8> {
    let mut data = vec![0u8; FILE_HEADER_SIZE];
    data[..SIGNATURE.len()].copy_from_slice(SIGNATURE);
    data[32..36].copy_from_slice(&version.to_u32().to_le_bytes());
    data[36..40].copy_from_slice(&flags.bits().to_le_bytes());
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let mut data = encode_file_header(
            Version::new(5, 0, 3, 2),
            HeaderFlags::COMPRESSED | HeaderFlags::DISTRIBUTABLE,
        );
        data[40..44].copy_from_slice(&5u32.to_le_bytes());
        data[48] = 6;

        let header = FileHeader::parse(&data).unwrap();
        assert_eq!(header.version.to_string(), "5.0.3.2");
        assert_eq!(header.version.generation(), (5, 0));
        assert!(header.compressed());
        assert!(header.distributable());
        assert!(!header.password());
        assert_eq!(header.license, LicenseFlags::CCL | LicenseFlags::COPY_SAME);
        assert_eq!(header.kogl_country, 6);
    }

    #[test]
    fn test_unknown_flag_bits_kept() {
        let data = encode_file_header(Version::default(), HeaderFlags::from_bits_retain(1 << 30));
        let header = FileHeader::parse(&data).unwrap();
        assert_eq!(header.flags.bits(), 1 << 30);
    }

    #[test]
    fn test_rejects_bad_signature_and_short_data() {
        let mut data = encode_file_header(Version::default(), HeaderFlags::empty());
        data[0] = b'X';
        assert!(matches!(FileHeader::parse(&data), Err(Error::NotHwp5File(_))));
        assert!(matches!(FileHeader::parse(&data[..100]), Err(Error::NotHwp5File(_))));
    }

    #[test]
    fn test_version_ordering() {
        assert!(Version::new(5, 0, 2, 5) > Version::new(5, 0, 1, 7));
        assert_eq!(Version::from_u32(0x0500_0302), Version::new(5, 0, 3, 2));
    }
}
