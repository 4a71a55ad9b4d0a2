/*!
Local filesystem preference store.
*/

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::PreferenceStore;
use crate::{BridgeError, Result};

/// Preference store keeping one file per key inside a namespace directory
///
/// The directory is `<base_dir>/<namespace>` and is created on first write.
///
/// # Example
/// ```rust
/// use bridge_core::storage::{LocalFileStore, PreferenceStore};
///
/// # let temp = tempfile::TempDir::new()?;
/// let store = LocalFileStore::new(temp.path(), "bridge");
/// store.put("bundle_1234", "H4sIAAAA...")?;
/// assert!(store.get("bundle_1234")?.is_some());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    namespace: String,
    dir: PathBuf,
}

impl LocalFileStore {
    pub fn new<P: AsRef<Path>, S: Into<String>>(base_dir: P, namespace: S) -> Self {
        let namespace = namespace.into();
        let dir = base_dir.as_ref().join(&namespace);
        Self { namespace, dir }
    }

    /// Create the store and its namespace directory up front
    ///
    /// # Errors
    /// `BridgeError::Storage` if the directory cannot be created
    pub fn open<P: AsRef<Path>, S: Into<String>>(base_dir: P, namespace: S) -> Result<Self> {
        let store = Self::new(base_dir, namespace);
        store.ensure_dir()?;
        Ok(store)
    }

    /// Directory holding this namespace's files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve the file for `key`, rejecting keys that would escape the namespace
    fn resolve_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || key == "."
            || key == ".."
            || key.contains(['/', '\\'])
            || key.contains('\0')
        {
            return Err(BridgeError::validation(format!(
                "Invalid preference key: {key:?}"
            )));
        }
        Ok(self.dir.join(key))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                BridgeError::storage(format!(
                    "Failed to create directory {}: {}",
                    self.dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

impl PreferenceStore for LocalFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.resolve_path(key)?;

        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BridgeError::storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.resolve_path(key)?;
        self.ensure_dir()?;

        // Write beside the target and rename so a crash never leaves half an entry
        let staging = self.dir.join(format!(".{key}.tmp"));
        fs::write(&staging, value).map_err(|e| {
            BridgeError::storage(format!("Failed to write {}: {}", staging.display(), e))
        })?;
        fs::rename(&staging, &path).map_err(|e| {
            BridgeError::storage(format!("Failed to replace {}: {}", path.display(), e))
        })?;

        debug!(namespace = %self.namespace, key, bytes = value.len(), "Wrote preference");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.resolve_path(key)?;

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BridgeError::storage(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn clear(&self) -> Result<()> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0usize;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() {
                fs::remove_file(&path).map_err(|e| {
                    BridgeError::storage(format!("Failed to delete {}: {}", path.display(), e))
                })?;
                removed += 1;
            }
        }

        debug!(namespace = %self.namespace, removed, "Cleared preference namespace");
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    keys.push(name.to_string());
                }
            }
        }
        Ok(keys)
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}
