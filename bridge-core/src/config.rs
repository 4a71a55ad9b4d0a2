//! Configuration for the bridge's persistent tier
//!
//! Selects where persisted state lives (a directory on disk, or memory only)
//! and how entries are compressed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec::EnvelopeCodec;
use crate::compression::{CompressionAdapter, GzipCompressor, NoCompression};
use crate::storage::{LocalFileStore, MemoryStore, PreferenceStore};
use crate::{BridgeError, Result};

/// Default namespace for persisted entries
pub const DEFAULT_NAMESPACE: &str = "bridge";

const MEMORY_URI_SCHEME: &str = "memory://";

/// Supported persistent tier backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    /// One file per entry under `<local_base_path>/<namespace>`
    Local,
    /// Nothing survives the process
    Memory,
}

/// Compression applied to persisted entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionKind {
    Gzip,
    None,
}

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub backend: StorageBackend,
    pub namespace: String,
    /// Parent directory of the namespace directory (defaults to the working directory)
    pub local_base_path: Option<PathBuf>,
    pub compression: CompressionKind,
    /// Gzip level 0-9; defaults to 6
    pub compression_level: Option<u32>,
}

impl BridgeConfig {
    /// Local storage under `base_path/<namespace>`
    pub fn local<P: AsRef<Path>>(base_path: P) -> Self {
        BridgeConfig {
            backend: StorageBackend::Local,
            namespace: DEFAULT_NAMESPACE.to_string(),
            local_base_path: Some(base_path.as_ref().to_path_buf()),
            compression: CompressionKind::Gzip,
            compression_level: None,
        }
    }

    /// Memory-only storage
    pub fn in_memory<S: Into<String>>(namespace: S) -> Self {
        BridgeConfig {
            backend: StorageBackend::Memory,
            namespace: namespace.into(),
            local_base_path: None,
            compression: CompressionKind::Gzip,
            compression_level: None,
        }
    }

    pub fn with_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_compression(mut self, compression: CompressionKind) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Parse a storage URI
    ///
    /// Supports formats:
    /// - `memory://namespace` for memory-only storage
    /// - `/var/lib/app/bridge` or `./bridge` for local storage, where the final
    ///   path component is the namespace
    pub fn from_uri(uri: &str) -> Result<BridgeConfig> {
        if let Some(namespace) = uri.strip_prefix(MEMORY_URI_SCHEME) {
            if namespace.is_empty() {
                return Err(BridgeError::validation(
                    "Invalid memory URI: missing namespace",
                ));
            }
            return Ok(BridgeConfig::in_memory(namespace));
        }

        let path = Path::new(uri);
        let namespace = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                BridgeError::validation(format!("Invalid storage path {uri:?}: missing namespace"))
            })?;
        let base = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(BridgeConfig::local(base).with_namespace(namespace))
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(BridgeError::validation("namespace cannot be empty"));
        }
        if self.namespace.contains(['/', '\\']) || self.namespace == ".." {
            return Err(BridgeError::validation(format!(
                "namespace {:?} must be a single path component",
                self.namespace
            )));
        }
        if let Some(level) = self.compression_level {
            if level > 9 {
                return Err(BridgeError::validation(format!(
                    "compression level must be 0-9, got {level}"
                )));
            }
        }
        Ok(())
    }

    /// Open the persistent tier described by this configuration
    pub fn open_store(&self) -> Result<Arc<dyn PreferenceStore>> {
        self.validate()?;

        match self.backend {
            StorageBackend::Local => {
                let base = self
                    .local_base_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("."));
                Ok(Arc::new(LocalFileStore::open(base, self.namespace.clone())?))
            }
            StorageBackend::Memory => Ok(Arc::new(MemoryStore::new(self.namespace.clone()))),
        }
    }

    /// Build the entry codec described by this configuration
    pub fn build_codec(&self) -> Result<EnvelopeCodec<Box<dyn CompressionAdapter>>> {
        self.validate()?;

        let compressor: Box<dyn CompressionAdapter> = match self.compression {
            CompressionKind::Gzip => match self.compression_level {
                Some(level) => Box::new(GzipCompressor::with_level(level)),
                None => Box::new(GzipCompressor::new()),
            },
            CompressionKind::None => Box::new(NoCompression::new()),
        };
        Ok(EnvelopeCodec::new(compressor))
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::local(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BlobCodec;
    use crate::identity::Token;
    use crate::StateBlob;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.backend, StorageBackend::Local);
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.compression, CompressionKind::Gzip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_uri_memory() {
        let config = BridgeConfig::from_uri("memory://screens").unwrap();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.namespace, "screens");
    }

    #[test]
    fn test_from_uri_memory_without_namespace() {
        let result = BridgeConfig::from_uri("memory://");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("missing namespace"));
    }

    #[test]
    fn test_from_uri_local() {
        let config = BridgeConfig::from_uri("/var/lib/app/bridge").unwrap();
        assert_eq!(config.backend, StorageBackend::Local);
        assert_eq!(config.namespace, "bridge");
        assert_eq!(config.local_base_path, Some(PathBuf::from("/var/lib/app")));
    }

    #[test]
    fn test_from_uri_bare_name() {
        let config = BridgeConfig::from_uri("state").unwrap();
        assert_eq!(config.namespace, "state");
        assert_eq!(config.local_base_path, Some(PathBuf::from(".")));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(BridgeConfig::in_memory("").validate().is_err());
        assert!(BridgeConfig::in_memory("a/b").validate().is_err());
        assert!(BridgeConfig::in_memory("ok")
            .with_compression_level(10)
            .validate()
            .is_err());
    }

    #[test]
    fn test_open_local_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = BridgeConfig::local(temp_dir.path()).with_namespace("screens");

        let store = config.open_store().unwrap();

        assert_eq!(store.namespace(), "screens");
        assert!(temp_dir.path().join("screens").is_dir());
    }

    #[test]
    fn test_build_codec_honours_compression() {
        let token = Token::generate();
        let mut blob = StateBlob::new();
        blob.put("x", 1).unwrap();

        for kind in [CompressionKind::Gzip, CompressionKind::None] {
            let codec = BridgeConfig::in_memory("t")
                .with_compression(kind)
                .build_codec()
                .unwrap();
            let expected = match kind {
                CompressionKind::Gzip => "gzip",
                CompressionKind::None => "none",
            };
            assert_eq!(codec.compressor().algorithm_name(), expected);

            let encoded = codec.encode(&token, &blob).unwrap();
            assert_eq!(codec.decode(&token, &encoded).unwrap(), blob);
        }
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = BridgeConfig::local("/tmp/app").with_compression_level(9);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: BridgeConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.compression_level, Some(9));
        assert_eq!(parsed.local_base_path, config.local_base_path);
    }
}
