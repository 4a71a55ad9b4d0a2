/*!
Metadata stored alongside every persisted state entry.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::identity::Token;
use crate::{BridgeError, Result};

/// Current entry format version
pub const ENTRY_FORMAT_VERSION: u8 = 1;

/// Header describing one persisted state blob
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EntryMetadata {
    /// Token of the logical object the entry belongs to
    pub token: Token,

    /// When the entry was written
    pub saved_at: DateTime<Utc>,

    /// SHA-256 of the serialized blob entries
    pub content_hash: String,

    /// Number of named values in the blob
    pub entry_count: usize,

    /// Size of the serialized blob in bytes
    pub uncompressed_size: usize,

    /// Size of the compressed envelope in bytes, when known
    pub compressed_size: Option<usize>,

    pub compression_algorithm: String,

    pub format_version: u8,
}

impl EntryMetadata {
    pub fn new(token: Token) -> Self {
        Self {
            token,
            saved_at: Utc::now(),
            content_hash: String::new(),
            entry_count: 0,
            uncompressed_size: 0,
            compressed_size: None,
            compression_algorithm: "none".to_string(),
            format_version: ENTRY_FORMAT_VERSION,
        }
    }

    /// Record the hash and size of the serialized blob
    pub fn with_content_hash(mut self, blob_bytes: &[u8]) -> Self {
        self.content_hash = Self::compute_hash(blob_bytes);
        self.uncompressed_size = blob_bytes.len();
        self
    }

    pub fn with_entry_count(mut self, entry_count: usize) -> Self {
        self.entry_count = entry_count;
        self
    }

    pub fn with_compressed_size(mut self, compressed_size: usize) -> Self {
        self.compressed_size = Some(compressed_size);
        self
    }

    pub fn with_compression_algorithm<S: Into<String>>(mut self, algorithm: S) -> Self {
        self.compression_algorithm = algorithm.into();
        self
    }

    /// Hex-encoded SHA-256 of `data`
    pub fn compute_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    /// Check `blob_bytes` against the recorded hash
    pub fn verify_integrity(&self, blob_bytes: &[u8]) -> Result<()> {
        let computed_hash = Self::compute_hash(blob_bytes);
        if computed_hash == self.content_hash {
            Ok(())
        } else {
            Err(BridgeError::IntegrityCheckFailed {
                expected: self.content_hash.clone(),
                actual: computed_hash,
            })
        }
    }

    /// Entries written by a newer build are not readable
    pub fn is_compatible(&self) -> bool {
        self.format_version <= ENTRY_FORMAT_VERSION
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.as_str().is_empty() {
            return Err(BridgeError::validation("token cannot be empty"));
        }
        if self.content_hash.is_empty() {
            return Err(BridgeError::validation("content_hash cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_creation() {
        let metadata = EntryMetadata::new(Token::from("t1"));
        assert_eq!(metadata.token, Token::from("t1"));
        assert_eq!(metadata.format_version, ENTRY_FORMAT_VERSION);
        assert!(metadata.compressed_size.is_none());
    }

    #[test]
    fn test_content_hash() {
        // SHA-256 of "test data"
        assert_eq!(
            EntryMetadata::compute_hash(b"test data"),
            "916f0027a575074ce72a331777c3478d6513f786a591bd892da1a577bf2335f9"
        );
    }

    #[test]
    fn test_integrity_verification() {
        let metadata = EntryMetadata::new(Token::from("t1")).with_content_hash(b"{\"x\":1}");

        assert!(metadata.verify_integrity(b"{\"x\":1}").is_ok());
        assert!(matches!(
            metadata.verify_integrity(b"{\"x\":2}"),
            Err(BridgeError::IntegrityCheckFailed { .. })
        ));
    }

    #[test]
    fn test_validation() {
        let metadata = EntryMetadata::new(Token::from("t1"));
        assert!(metadata.validate().is_err());

        let metadata = metadata.with_content_hash(b"{}");
        assert!(metadata.validate().is_ok());

        let metadata = EntryMetadata::new(Token::from("")).with_content_hash(b"{}");
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn test_newer_format_is_incompatible() {
        let mut metadata = EntryMetadata::new(Token::from("t1"));
        assert!(metadata.is_compatible());

        metadata.format_version = ENTRY_FORMAT_VERSION + 1;
        assert!(!metadata.is_compatible());
    }
}
