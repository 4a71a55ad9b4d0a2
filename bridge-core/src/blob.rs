/*!
The state blob handed to save and restore callbacks.
*/

use std::collections::btree_map::{self, BTreeMap};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// An ordered mapping of named values describing one object's transient state.
///
/// The bridge treats the contents as opaque. The only property it inspects is
/// emptiness: a blob with zero entries is never stored.
///
/// # Example
/// ```rust
/// use bridge_core::StateBlob;
///
/// let mut blob = StateBlob::new();
/// blob.put("scroll_offset", 120)?;
/// blob.put("query", "rust weak references")?;
///
/// assert_eq!(blob.get::<u32>("scroll_offset"), Some(120));
/// assert_eq!(blob.len(), 2);
/// # Ok::<(), bridge_core::BridgeError>(())
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct StateBlob {
    entries: BTreeMap<String, Value>,
}

impl StateBlob {
    /// Create an empty blob
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a serializable value under `key`, replacing any previous value
    pub fn put<K, V>(&mut self, key: K, value: V) -> Result<()>
    where
        K: Into<String>,
        V: Serialize,
    {
        let value = serde_json::to_value(value)?;
        self.entries.insert(key.into(), value);
        Ok(())
    }

    /// Store an already-built JSON value under `key`
    pub fn put_value<K: Into<String>>(&mut self, key: K, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Read the value under `key` as `V`
    ///
    /// Returns `None` when the key is missing or holds a value of another shape.
    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Option<V> {
        self.entries
            .get(key)
            .and_then(|value| V::deserialize(value).ok())
    }

    /// Borrow the raw JSON value under `key`
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// A blob is empty when it holds zero named entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for StateBlob {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl FromIterator<(String, Value)> for StateBlob {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a StateBlob {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct FormDraft {
        title: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_empty_blob() {
        let blob = StateBlob::new();
        assert!(blob.is_empty());
        assert_eq!(blob.len(), 0);
    }

    #[test]
    fn test_put_and_get_structured_value() {
        let mut blob = StateBlob::new();
        let draft = FormDraft {
            title: "Weekly report".to_string(),
            tags: vec!["work".to_string()],
        };
        blob.put("draft", &draft).unwrap();

        assert_eq!(blob.get::<FormDraft>("draft"), Some(draft));
        assert!(blob.contains_key("draft"));
    }

    #[test]
    fn test_get_with_wrong_shape_returns_none() {
        let mut blob = StateBlob::new();
        blob.put("count", "not a number").unwrap();

        assert_eq!(blob.get::<u64>("count"), None);
        assert_eq!(blob.get::<String>("missing"), None);
    }

    #[test]
    fn test_keys_are_ordered() {
        let mut blob = StateBlob::new();
        blob.put_value("zeta", json!(1));
        blob.put_value("alpha", json!(2));
        blob.put_value("mid", json!(3));

        let keys: Vec<&str> = blob.keys().collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_remove_entry() {
        let mut blob = StateBlob::new();
        blob.put("x", 1).unwrap();

        assert_eq!(blob.remove("x"), Some(json!(1)));
        assert!(blob.is_empty());
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut blob = StateBlob::new();
        blob.put("x", 1).unwrap();

        assert_eq!(serde_json::to_value(&blob).unwrap(), json!({"x": 1}));
    }
}
