//! Decryption and decompression applied to DocInfo and section streams
//! before they are framed into records.

use super::consts::HWPTAG_DISTRIBUTE_DOC_DATA;
use super::header::FileHeader;
use flate2::read::DeflateDecoder;
use std::fmt;
use std::io::{self, Read};
use tracing::debug;

/// Size of the `DISTRIBUTE_DOC_DATA` payload that leads every encrypted stream.
pub const DISTRIBUTE_DOC_DATA_SIZE: usize = 256;
const AES_BLOCK_SIZE: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("inflate failed: {0}")]
    Inflate(#[source] io::Error),
    #[error("decryption failed: {0}")]
    Decrypt(String),
    #[error("no key for stream {0}")]
    MissingKey(String),
    #[error("unsupported stream protection: {0}")]
    Unsupported(String),
}

/// Supplies AES keys for distribution-document streams.
pub trait KeyProvider: Send + Sync + fmt::Debug {
    /// Key for `stream`, given the 256-byte `DISTRIBUTE_DOC_DATA` payload that
    /// precedes its ciphertext.
    fn stream_key(&self, stream: &str, doc_data: &[u8]) -> Result<[u8; 16], TransformError>;
}

/// Derives the key from the scrambled `DISTRIBUTE_DOC_DATA` payload itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct DistributionKeyProvider;

impl KeyProvider for DistributionKeyProvider {
    fn stream_key(&self, stream: &str, doc_data: &[u8]) -> Result<[u8; 16], TransformError> {
        let payload: &[u8; DISTRIBUTE_DOC_DATA_SIZE] = doc_data
            .get(..DISTRIBUTE_DOC_DATA_SIZE)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| TransformError::MissingKey(stream.to_string()))?;
        Ok(derive_distribution_key(payload))
    }
}

/// Always hands out the same key.
#[derive(Clone, Copy)]
pub struct StaticKeyProvider(pub [u8; 16]);

impl fmt::Debug for StaticKeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticKeyProvider(..)")
    }
}

impl KeyProvider for StaticKeyProvider {
    fn stream_key(&self, _stream: &str, _doc_data: &[u8]) -> Result<[u8; 16], TransformError> {
        Ok(self.0)
    }
}

/// Linear congruential generator of the MSVC C runtime `rand()`.
struct MsvcRand(u32);

impl MsvcRand {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(214_013).wrapping_add(2_531_011);
        (self.0 >> 16) & 0x7FFF
    }
}

/// Apply the keystream that scrambles bytes 4.. of a `DISTRIBUTE_DOC_DATA`
/// payload. The first four bytes are the seed and stay in clear.
fn unscramble(data: &mut [u8; DISTRIBUTE_DOC_DATA_SIZE]) {
    let seed = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let mut rand = MsvcRand(seed);
    let mut key = 0u8;
    let mut run = 0u32;
    for (i, byte) in data.iter_mut().enumerate() {
        if run == 0 {
            key = (rand.next() & 0xFF) as u8;
            run = (rand.next() & 0xF) + 1;
        }
        if i >= 4 {
            *byte ^= key;
        }
        run -= 1;
    }
}

/// AES key hidden in a `DISTRIBUTE_DOC_DATA` payload.
pub fn derive_distribution_key(doc_data: &[u8; DISTRIBUTE_DOC_DATA_SIZE]) -> [u8; 16] {
    let mut data = *doc_data;
    unscramble(&mut data);
    let offset = 4 + (data[0] & 0xF) as usize;
    let mut key = [0u8; 16];
    key.copy_from_slice(&data[offset..offset + 16]);
    key
}

/// Inflate a raw deflate stream. Bytes after the final block are ignored.
pub fn inflate_raw(data: &[u8]) -> Result<Vec<u8>, TransformError> {
    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::with_capacity(data.len().saturating_mul(4));
    decoder
        .read_to_end(&mut out)
        .map_err(TransformError::Inflate)?;
    Ok(out)
}

/// Split an encrypted stream into its key material and ciphertext, then
/// decrypt the ciphertext. A partial trailing block is dropped.
pub fn decrypt_distribution(
    stream: &str,
    data: &[u8],
    keys: &dyn KeyProvider,
) -> Result<Vec<u8>, TransformError> {
    let header = data
        .get(..4)
        .map(|h| u32::from_le_bytes([h[0], h[1], h[2], h[3]]))
        .ok_or_else(|| TransformError::Decrypt(format!("{stream}: missing key record")))?;
    let tag = (header & 0x3FF) as u16;
    let size = (header >> 20) as usize;
    if tag != HWPTAG_DISTRIBUTE_DOC_DATA || size != DISTRIBUTE_DOC_DATA_SIZE {
        return Err(TransformError::Decrypt(format!(
            "{stream}: expected DISTRIBUTE_DOC_DATA record, found tag {tag:#x} size {size}"
        )));
    }
    let doc_data = data
        .get(4..4 + DISTRIBUTE_DOC_DATA_SIZE)
        .ok_or_else(|| TransformError::Decrypt(format!("{stream}: truncated key record")))?;
    let key = keys.stream_key(stream, doc_data)?;

    let ciphertext = &data[4 + DISTRIBUTE_DOC_DATA_SIZE..];
    let usable = ciphertext.len() - ciphertext.len() % AES_BLOCK_SIZE;
    let mut plain = ciphertext[..usable].to_vec();
    aes_ecb_decrypt(&key, &mut plain)?;
    Ok(plain)
}

#[cfg(feature = "distribution")]
fn aes_ecb_decrypt(key: &[u8; 16], data: &mut [u8]) -> Result<(), TransformError> {
    use aes::Aes128;
    use aes::cipher::{BlockDecrypt, KeyInit, generic_array::GenericArray};

    let cipher = Aes128::new_from_slice(key)
        .map_err(|_| TransformError::Decrypt("invalid AES-128 key length".to_string()))?;
    for chunk in data.chunks_exact_mut(AES_BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
    }
    Ok(())
}

#[cfg(not(feature = "distribution"))]
fn aes_ecb_decrypt(_key: &[u8; 16], _data: &mut [u8]) -> Result<(), TransformError> {
    Err(TransformError::Unsupported(
        "distribution documents require the distribution feature".to_string(),
    ))
}

/// Whether `stream` is encrypted in a document with `header`. Distribution
/// documents encrypt only the `ViewText` sections.
pub fn is_encrypted(stream: &str, header: &FileHeader) -> bool {
    header.distributable() && stream.starts_with("ViewText/")
}

/// Undo the protections `header` declares for a DocInfo or section stream:
/// decrypt first, then inflate.
pub fn decode_stream(
    stream: &str,
    raw: Vec<u8>,
    header: &FileHeader,
    keys: &dyn KeyProvider,
) -> Result<Vec<u8>, TransformError> {
    if header.password() && !header.distributable() {
        return Err(TransformError::Unsupported(format!(
            "{stream}: password-protected documents are not supported"
        )));
    }

    let raw_len = raw.len();
    let data = if is_encrypted(stream, header) {
        let plain = decrypt_distribution(stream, &raw, keys)?;
        debug!(stream, encrypted = raw_len, decrypted = plain.len(), "decrypted stream");
        plain
    } else {
        raw
    };

    if header.compressed() {
        let inflated = inflate_raw(&data)?;
        debug!(stream, compressed = data.len(), inflated = inflated.len(), "inflated stream");
        Ok(inflated)
    } else {
        Ok(data)
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    pub fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// Build a `DISTRIBUTE_DOC_DATA` payload that hides `key`.
    pub fn scrambled_doc_data(seed: u32, key: [u8; 16]) -> [u8; DISTRIBUTE_DOC_DATA_SIZE] {
        let mut data = [0u8; DISTRIBUTE_DOC_DATA_SIZE];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = (i * 7) as u8;
        }
        data[..4].copy_from_slice(&seed.to_le_bytes());
        let offset = 4 + (seed & 0xF) as usize;
        data[offset..offset + 16].copy_from_slice(&key);
        // The mask is an XOR, so applying it scrambles as well as unscrambles
        unscramble(&mut data);
        data
    }

    /// Encrypt `plain` the way a distribution document stores it.
    #[cfg(feature = "distribution")]
    pub fn encrypt_distribution(seed: u32, key: [u8; 16], plain: &[u8]) -> Vec<u8> {
        use aes::Aes128;
        use aes::cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};

        let header =
            (HWPTAG_DISTRIBUTE_DOC_DATA as u32) | ((DISTRIBUTE_DOC_DATA_SIZE as u32) << 20);
        let mut out = header.to_le_bytes().to_vec();
        out.extend_from_slice(&scrambled_doc_data(seed, key));

        let mut body = plain.to_vec();
        body.resize(plain.len().div_ceil(AES_BLOCK_SIZE) * AES_BLOCK_SIZE, 0);
        let cipher = Aes128::new_from_slice(&key).unwrap();
        for chunk in body.chunks_exact_mut(AES_BLOCK_SIZE) {
            cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
        }
        out.extend_from_slice(&body);
        out
    }
}
