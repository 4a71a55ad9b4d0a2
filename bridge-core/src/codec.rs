/*!
Binary codec turning a state blob into a string for the persistent store and back.

An encoded entry is `base64(compress(header_json + "\n" + blob_json))`. The header
is an [`EntryMetadata`] whose content hash covers the exact blob bytes, so a
truncated or tampered entry is detected on the way back in.
*/

use base64::{engine::general_purpose, Engine as _};

use crate::compression::{CompressionAdapter, GzipCompressor};
use crate::identity::Token;
use crate::metadata::{EntryMetadata, ENTRY_FORMAT_VERSION};
use crate::{BridgeError, Result, StateBlob};

const FRAME_SEPARATOR: u8 = b'\n';

/// Encoding of state blobs to store-safe text
#[cfg_attr(test, mockall::automock)]
pub trait BlobCodec: Send + Sync {
    /// Encode `blob`, saved for `token`, into a text-safe string
    fn encode(&self, token: &Token, blob: &StateBlob) -> Result<String>;

    /// Decode a string previously produced by [`BlobCodec::encode`] for `token`
    ///
    /// # Errors
    /// Any malformed, mismatched or tampered input is an error; callers treat it as
    /// a corrupt entry.
    fn decode(&self, token: &Token, encoded: &str) -> Result<StateBlob>;
}

/// Default codec: JSON body, metadata header, pluggable compression, base64 text
///
/// # Example
/// ```rust
/// use bridge_core::{BlobCodec, EnvelopeCodec, StateBlob, Token};
///
/// let codec = EnvelopeCodec::gzip();
/// let token = Token::generate();
/// let mut blob = StateBlob::new();
/// blob.put("x", 1)?;
///
/// let encoded = codec.encode(&token, &blob)?;
/// assert_eq!(codec.decode(&token, &encoded)?, blob);
/// # Ok::<(), bridge_core::BridgeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeCodec<C> {
    compressor: C,
}

impl<C: CompressionAdapter> EnvelopeCodec<C> {
    pub fn new(compressor: C) -> Self {
        Self { compressor }
    }

    pub fn compressor(&self) -> &C {
        &self.compressor
    }

    /// Decode an entry, returning its header together with the blob
    pub fn decode_entry(&self, token: &Token, encoded: &str) -> Result<(EntryMetadata, StateBlob)> {
        let (metadata, body) = self.open_frame(encoded)?;

        if metadata.token != *token {
            return Err(BridgeError::invalid_format(format!(
                "entry belongs to token {}, expected {token}",
                metadata.token
            )));
        }
        metadata.verify_integrity(&body)?;

        let blob: StateBlob = serde_json::from_slice(&body)?;
        Ok((metadata, blob))
    }

    /// Read an entry's header without verifying or parsing the blob
    pub fn inspect(&self, encoded: &str) -> Result<EntryMetadata> {
        let (metadata, _) = self.open_frame(encoded)?;
        Ok(metadata)
    }

    fn open_frame(&self, encoded: &str) -> Result<(EntryMetadata, Vec<u8>)> {
        let compressed = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| BridgeError::encoding(format!("Invalid base64 entry: {e}")))?;
        let frame = self.compressor.decompress(&compressed)?;

        let split = frame
            .iter()
            .position(|byte| *byte == FRAME_SEPARATOR)
            .ok_or_else(|| BridgeError::invalid_format("missing header separator"))?;
        let (header, body) = frame.split_at(split);

        let metadata: EntryMetadata = serde_json::from_slice(header)?;
        if !metadata.is_compatible() {
            return Err(BridgeError::invalid_format(format!(
                "Incompatible entry format version: {} (current: {})",
                metadata.format_version, ENTRY_FORMAT_VERSION
            )));
        }

        Ok((
            metadata.with_compressed_size(compressed.len()),
            body[1..].to_vec(),
        ))
    }
}

impl EnvelopeCodec<GzipCompressor> {
    pub fn gzip() -> Self {
        Self::new(GzipCompressor::new())
    }
}

impl Default for EnvelopeCodec<GzipCompressor> {
    fn default() -> Self {
        Self::gzip()
    }
}

impl<C: CompressionAdapter> BlobCodec for EnvelopeCodec<C> {
    fn encode(&self, token: &Token, blob: &StateBlob) -> Result<String> {
        let body = serde_json::to_vec(blob)?;
        let metadata = EntryMetadata::new(token.clone())
            .with_content_hash(&body)
            .with_entry_count(blob.len())
            .with_compression_algorithm(self.compressor.algorithm_name());
        metadata.validate()?;

        let mut frame = serde_json::to_vec(&metadata)?;
        frame.push(FRAME_SEPARATOR);
        frame.extend_from_slice(&body);

        let compressed = self.compressor.compress(&frame)?;
        Ok(general_purpose::STANDARD.encode(compressed))
    }

    fn decode(&self, token: &Token, encoded: &str) -> Result<StateBlob> {
        self.decode_entry(token, encoded).map(|(_, blob)| blob)
    }
}
