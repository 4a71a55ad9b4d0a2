/*!
Persistent key-value stores backing the disk tier.

The state store only needs a namespaced `key -> String` mapping. This module
defines that port ([`PreferenceStore`]) and two adapters: one file per key on the
local filesystem, and a shared in-memory map.
*/

pub mod local;
pub mod memory;

use crate::Result;

pub use local::LocalFileStore;
pub use memory::MemoryStore;

/// Namespaced string store used for the persistent tier
///
/// Implementations must treat removal of a missing key as success.
#[cfg_attr(test, mockall::automock)]
pub trait PreferenceStore: Send + Sync {
    /// Read the value stored under `key`
    ///
    /// # Returns
    /// `Ok(None)` when the key is not set
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key` from the namespace
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every key in the namespace, including keys this process never wrote
    fn clear(&self) -> Result<()>;

    /// All keys currently set, in no particular order
    fn keys(&self) -> Result<Vec<String>>;

    /// Name of the namespace this store is bound to
    fn namespace(&self) -> &str;
}
