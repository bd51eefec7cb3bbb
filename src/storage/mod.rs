//! State persistence adapters.
//!
//! Adapters mirror selected dot-addressed state fields into an outside store and
//! read them back as partial state for an initializer. They are collaborators of
//! the core, wired in with [`SynapseBuilder::sync_local_storage`] and
//! [`SynapseBuilder::sync_search_params`].
//!
//! # Modules
//!
//! - `path`: Dot-path access into JSON state and storage key encoding
//! - `backend`: [`KeyValueStore`] trait and the in-memory store
//! - `json`: JSON file-backed store
//! - `local`: Key/value persistence adapter
//! - `search_params`: URL query string adapter
//!
//! [`SynapseBuilder::sync_local_storage`]: crate::SynapseBuilder::sync_local_storage
//! [`SynapseBuilder::sync_search_params`]: crate::SynapseBuilder::sync_search_params

pub mod backend;
pub mod json;
pub mod local;
pub mod path;
pub mod search_params;

pub use backend::{KeyValueStore, MemoryStore};
pub use json::FileStore;
pub use local::LocalStorageSync;
pub use path::{field_from_key, get_path, set_path, storage_key};
pub use search_params::SearchParamSync;
