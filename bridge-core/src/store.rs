/*!
Two-tier state store.

Blobs live in memory for the lifetime of the process and are mirrored to a
[`PreferenceStore`] so they survive the process being killed. Reads consume:
a blob handed back by [`StateStore::take`] is gone from both tiers.

Disk failures never reach the caller. A failed write leaves the memory tier
authoritative and drops whatever an earlier save left under the same key; a
corrupt or unreadable entry reads as absent and is removed.
*/

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::BlobCodec;
use crate::identity::Token;
use crate::storage::PreferenceStore;
use crate::{BridgeError, StateBlob};

#[cfg(feature = "metrics")]
use crate::observability::BridgeMetrics;

/// Prefix of every persisted blob key
pub const BLOB_KEY_PREFIX: &str = "bundle_";

/// Persistent key for the blob saved under `token`
pub fn blob_key(token: &Token) -> String {
    format!("{BLOB_KEY_PREFIX}{token}")
}

/// Memory tier backed by a persistent tier
pub struct StateStore {
    memory: HashMap<Token, StateBlob>,
    disk: Arc<dyn PreferenceStore>,
    codec: Box<dyn BlobCodec>,
}

impl StateStore {
    pub fn new(disk: Arc<dyn PreferenceStore>, codec: Box<dyn BlobCodec>) -> Self {
        Self {
            memory: HashMap::new(),
            disk,
            codec,
        }
    }

    /// Save `blob` for `token` in both tiers. Empty blobs are not stored at all.
    pub fn put(&mut self, token: &Token, blob: StateBlob) {
        if blob.is_empty() {
            debug!(%token, "Skipping empty state blob");
            return;
        }

        match self.codec.encode(token, &blob) {
            Ok(encoded) => {
                #[cfg(feature = "metrics")]
                BridgeMetrics::global().record_blob_size(encoded.len());

                if let Err(error) = self.disk.put(&blob_key(token), &encoded) {
                    self.record_write_failure(token, &error);
                    self.remove_from_disk(token);
                }
            }
            Err(error) => {
                self.record_write_failure(token, &error);
                self.remove_from_disk(token);
            }
        }

        debug!(%token, entries = blob.len(), "Stored state blob");
        self.memory.insert(token.clone(), blob);
    }

    /// Remove and return the blob for `token`, preferring the memory tier
    pub fn take(&mut self, token: &Token) -> Option<StateBlob> {
        let blob = match self.memory.remove(token) {
            Some(blob) => Some(blob),
            None => self.read_from_disk(token),
        };
        self.remove_from_disk(token);
        blob
    }

    /// Remove the blob for `token` from both tiers
    pub fn clear(&mut self, token: &Token) {
        self.memory.remove(token);
        self.remove_from_disk(token);
        debug!(%token, "Cleared state blob");
    }

    /// Empty the memory tier and wipe the whole persistent namespace
    pub fn clear_all(&mut self) {
        let dropped = self.memory.len();
        self.memory.clear();
        if let Err(error) = self.disk.clear() {
            warn!(namespace = self.disk.namespace(), %error, "Failed to wipe persisted state");
        }
        debug!(dropped, "Cleared all state blobs");
    }

    pub fn contains_in_memory(&self, token: &Token) -> bool {
        self.memory.contains_key(token)
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    fn read_from_disk(&self, token: &Token) -> Option<StateBlob> {
        let key = blob_key(token);
        let encoded = match self.disk.get(&key) {
            Ok(Some(encoded)) => encoded,
            Ok(None) => return None,
            Err(error) => {
                warn!(%token, %error, "Failed to read persisted state");
                return None;
            }
        };

        match self.codec.decode(token, &encoded) {
            Ok(blob) => {
                debug!(%token, entries = blob.len(), "Recovered state blob from disk");
                Some(blob)
            }
            Err(error) => {
                #[cfg(feature = "metrics")]
                BridgeMetrics::global().record_corrupt_entry();

                warn!(%token, %error, corrupt = error.is_corruption(), "Discarding unreadable persisted state");
                None
            }
        }
    }

    fn remove_from_disk(&self, token: &Token) {
        if let Err(error) = self.disk.remove(&blob_key(token)) {
            warn!(%token, %error, "Failed to remove persisted state");
        }
    }

    fn record_write_failure(&self, token: &Token, error: &BridgeError) {
        #[cfg(feature = "metrics")]
        BridgeMetrics::global().record_disk_write_failure();

        warn!(%token, %error, "Failed to persist state blob, keeping it in memory only");
    }
}
