//! Mirrors selected state fields into a [`KeyValueStore`].
//!
//! Values are stored as JSON text under [`storage_key`] of the field path.
//! Loading skips values that fail to parse; updating removes the key when the
//! field is absent or `null`.

use crate::domain::error::Result;
use crate::storage::backend::KeyValueStore;
use crate::storage::path::{field_from_key, get_path, set_path, storage_key};
use crate::StateMap;
use serde_json::Value;

/// Persistence adapter for dot-addressed state fields.
#[derive(Debug, Clone)]
pub struct LocalStorageSync<K> {
    store: K,
}

impl<K: KeyValueStore> LocalStorageSync<K> {
    /// Wraps `store`.
    pub fn new(store: K) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &K {
        &self.store
    }

    /// Field paths that currently have a stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store's keys cannot be listed.
    pub fn stored_fields(&self) -> Result<Vec<String>> {
        Ok(self.store.keys()?.iter().map(|key| field_from_key(key)).collect())
    }

    /// Builds partial state from the stored fields.
    ///
    /// Read failures and unparsable values are logged and the field is skipped.
    pub fn load(&self, fields: &[impl AsRef<str>]) -> StateMap {
        let _span = tracing::debug_span!("local_storage_load", fields = fields.len()).entered();

        let mut partial = StateMap::new();
        for field in fields {
            let field = field.as_ref();
            let key = storage_key(field);
            let text = match self.store.get(&key) {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(field = %field, error = %e, "failed to read stored value");
                    continue;
                }
            };
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => set_path(&mut partial, field, value),
                Err(e) => tracing::error!(field = %field, error = %e, "error parsing stored value"),
            }
        }

        tracing::debug!(loaded = partial.len(), "loaded fields from storage");
        partial
    }

    /// Writes the current value of each field, removing absent or `null` ones.
    ///
    /// # Errors
    ///
    /// Returns the first store error; later fields are not written.
    pub fn update(&self, state: &StateMap, fields: &[impl AsRef<str>]) -> Result<()> {
        let _span = tracing::trace_span!("local_storage_update", fields = fields.len()).entered();

        for field in fields {
            let field = field.as_ref();
            let key = storage_key(field);
            match get_path(state, field) {
                Some(value) if !value.is_null() => self.store.set(&key, &value.to_string())?,
                _ => self.store.remove(&key)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::MemoryStore;
    use serde_json::json;

    fn state(value: Value) -> StateMap {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn update_then_load_round_trips() {
        let store = MemoryStore::new();
        let sync = LocalStorageSync::new(store.clone());
        let fields = ["assets", "search.q"];

        sync.update(&state(json!({ "assets": [{ "id": 1 }], "search": { "q": "rust" } })), &fields)
            .unwrap();

        assert_eq!(store.get("search__q").unwrap().as_deref(), Some("\"rust\""));
        assert_eq!(sync.stored_fields().unwrap(), vec!["assets", "search.q"]);
        assert_eq!(
            Value::Object(sync.load(&fields)),
            json!({ "assets": [{ "id": 1 }], "search": { "q": "rust" } })
        );
    }

    #[test]
    fn null_or_missing_fields_remove_keys() {
        let store = MemoryStore::new();
        store.set("assets", "[1]").unwrap();
        store.set("theme", "\"dark\"").unwrap();
        let sync = LocalStorageSync::new(store.clone());

        sync.update(&state(json!({ "assets": null })), &["assets", "theme"]).unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn unparsable_values_are_skipped() {
        let store = MemoryStore::new();
        store.set("assets", "{broken").unwrap();
        store.set("theme", "\"dark\"").unwrap();

        let loaded = LocalStorageSync::new(store).load(&["assets", "theme", "missing"]);

        assert_eq!(Value::Object(loaded), json!({ "theme": "dark" }));
    }
}
