/*!
In-memory preference store.
*/

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::PreferenceStore;
use crate::Result;

/// Preference store kept entirely in memory
///
/// Clones share the same map, which lets a test hand one handle to the bridge
/// and keep another to look at what was persisted.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    namespace: String,
    data: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new<S: Into<String>>(namespace: S) -> Self {
        Self {
            namespace: namespace.into(),
            data: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("bridge")
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_basic_operations() {
        let store = MemoryStore::new("test");

        store.put("bundle_a", "encoded").unwrap();
        assert_eq!(store.get("bundle_a").unwrap(), Some("encoded".to_string()));
        assert_eq!(store.keys().unwrap(), vec!["bundle_a".to_string()]);

        store.remove("bundle_a").unwrap();
        assert_eq!(store.get("bundle_a").unwrap(), None);
    }

    #[test]
    fn test_remove_missing_key_is_ok() {
        let store = MemoryStore::new("test");
        assert!(store.remove("missing").is_ok());
    }

    #[test]
    fn test_clones_share_data() {
        let store = MemoryStore::new("test");
        let observer = store.clone();

        store.put("k", "v").unwrap();
        assert!(observer.contains_key("k"));

        observer.clear().unwrap();
        assert!(store.is_empty());
    }
}
