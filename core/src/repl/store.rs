//! Bulk text payloads handed to every namespace

use std::collections::HashMap;
use std::sync::Arc;

/// Named text entries, shared cheaply between namespaces.
///
/// Each namespace receives a snapshot at construction. The evaluator exposes
/// the entries to scripts through `os.environ`; the host process environment
/// is never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataStore {
    entries: Arc<HashMap<String, String>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry. Existing snapshots are unaffected.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        Arc::make_mut(&mut self.entries).insert(key.into(), value.into());
    }

    pub fn with_entry<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &HashMap<String, String> {
        &self.entries
    }

    /// Total payload size in bytes
    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_isolated_from_later_inserts() {
        let mut store = DataStore::new().with_entry("HAYSTACK_DATA", "needle");
        let snapshot = store.clone();
        store.insert("HAYSTACK_DATA", "replaced");

        assert_eq!(snapshot.get("HAYSTACK_DATA"), Some("needle"));
        assert_eq!(store.get("HAYSTACK_DATA"), Some("replaced"));
    }

    #[test]
    fn test_total_bytes() {
        let store = DataStore::new().with_entry("A", "123").with_entry("BB", "4");
        assert_eq!(store.total_bytes(), 7);
        assert_eq!(store.len(), 2);
    }
}
