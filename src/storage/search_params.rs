//! Mirrors selected state fields into the URL query string.
//!
//! Strings are written as they are and other values as their JSON text. Every
//! loaded value is a string, so `q=42` loads as `"42"` and a field written as the
//! number `2` reads back as `"2"`. Handlers that need numbers parse them. Parameters
//! not named by the field list are preserved, and the query is encoded the way
//! browsers encode form data (a space becomes `+`).

use crate::routing::location::Location;
use crate::storage::path::{get_path, set_path, storage_key};
use crate::StateMap;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use url::form_urlencoded;

/// Query-string adapter for dot-addressed state fields.
pub struct SearchParamSync<L: ?Sized> {
    location: Rc<L>,
}

impl<L: ?Sized> Clone for SearchParamSync<L> {
    fn clone(&self) -> Self {
        Self {
            location: Rc::clone(&self.location),
        }
    }
}

impl<L: ?Sized> fmt::Debug for SearchParamSync<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchParamSync").finish_non_exhaustive()
    }
}

impl<L: Location + ?Sized> SearchParamSync<L> {
    /// Wraps `location`.
    pub fn new(location: Rc<L>) -> Self {
        Self { location }
    }

    /// Builds partial state from the current query string. Values are strings.
    pub fn load(&self, fields: &[impl AsRef<str>]) -> StateMap {
        let params = parse_query(&self.location.search());

        let mut partial = StateMap::new();
        for field in fields {
            let field = field.as_ref();
            let key = storage_key(field);
            if let Some((_, raw)) = params.iter().find(|(name, _)| *name == key) {
                set_path(&mut partial, field, Value::String(raw.clone()));
            }
        }

        tracing::debug!(loaded = partial.len(), "loaded fields from search params");
        partial
    }

    /// Rewrites the query string from the current state without adding a
    /// history entry. Absent or `null` fields are removed.
    pub fn update(&self, state: &StateMap, fields: &[impl AsRef<str>]) {
        let mut params = parse_query(&self.location.search());

        for field in fields {
            let field = field.as_ref();
            let key = storage_key(field);
            let encoded = match get_path(state, field) {
                None | Some(Value::Null) => None,
                Some(Value::String(text)) => Some(text.clone()),
                Some(other) => Some(other.to_string()),
            };

            let first = params.iter().position(|(name, _)| *name == key);
            params.retain(|(name, _)| *name != key);
            if let Some(value) = encoded {
                params.insert(first.unwrap_or(params.len()), (key, value));
            }
        }

        let search = format_query(&params);
        if search != self.location.search() {
            tracing::trace!(search = %search, "replacing search params");
            self.location.replace_search(&search);
        }
    }
}

/// Decodes `a=1&b=two+words` into pairs, keeping their order.
fn parse_query(search: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(search.trim_start_matches('?').as_bytes())
        .into_owned()
        .collect()
}

fn format_query(params: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::location::MemoryHistory;
    use serde_json::json;

    fn state(value: Value) -> StateMap {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn loads_every_value_as_a_string() {
        let history = Rc::new(MemoryHistory::new("/search?search__q=hello+world&count=2&open=true&other=x"));
        let sync = SearchParamSync::new(history);

        let loaded = sync.load(&["search.q", "count", "open", "missing"]);

        assert_eq!(
            Value::Object(loaded),
            json!({ "search": { "q": "hello world" }, "count": "2", "open": "true" })
        );
    }

    #[test]
    fn update_rewrites_query_without_history_entry() {
        let history = Rc::new(MemoryHistory::new("/counter?keep=1&count=1"));
        let sync = SearchParamSync::new(Rc::clone(&history));

        sync.update(&state(json!({ "count": 2, "search": { "q": "a b&c" } })), &["count", "search.q"]);

        assert_eq!(history.url(), "/counter?keep=1&count=2&search__q=a+b%26c");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn null_fields_are_removed() {
        let history = Rc::new(MemoryHistory::new("/?fileId=7&tab=info"));
        let sync = SearchParamSync::new(Rc::clone(&history));

        sync.update(&state(json!({ "fileId": null })), &["fileId"]);

        assert_eq!(history.search(), "tab=info");
    }

    #[test]
    fn strings_that_look_like_json_keep_their_type() {
        let history = Rc::new(MemoryHistory::new("/"));
        let sync = SearchParamSync::new(Rc::clone(&history));
        let fields = ["search.q", "tab"];
        let written = json!({ "search": { "q": "42" }, "tab": "null" });

        sync.update(&state(written.clone()), &fields);

        assert_eq!(history.search(), "search__q=42&tab=null");
        assert_eq!(Value::Object(sync.load(&fields)), written);
    }

    #[test]
    fn repeated_keys_collapse_to_one() {
        let history = Rc::new(MemoryHistory::new("/?tab=a&x=1&tab=b"));
        let sync = SearchParamSync::new(Rc::clone(&history));

        assert_eq!(Value::Object(sync.load(&["tab"])), json!({ "tab": "a" }));

        sync.update(&state(json!({ "tab": "c" })), &["tab"]);
        assert_eq!(history.search(), "tab=c&x=1");
    }
}
