//! Synapse: signal dispatch and state notification for reactive UIs.
//!
//! Synapse keeps one application state value, routes named *signals* to handlers
//! that mutate it, and notifies subscribers after every change. On top of that core
//! it provides:
//! - Automatic enter/leave signals when the current path changes
//! - Two-way sync of selected fields with the URL query string
//! - Two-way sync of selected fields with a persistent key/value store
//! - A dev tools handle for inspecting state and emitting signals from JSON

#![allow(clippy::multiple_crate_versions)]

//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  UI bindings (host)                                 │  ← emit / get / subscribe
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Application Layer (app/)                           │
//! │  - Synapse builder and instance                     │
//! │  - State container and listeners                    │
//! │  - Signal bus and processor                         │
//! │  - Scheduler, selectors, subscriptions              │
//! └─────────────────────────────────────────────────────┘
//!         │                    │                    │
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ Routing       │   │ Storage       │   │ Dev tools     │
//! │ (routing/)    │   │ (storage/)    │   │ (devtools)    │
//! │ - Patterns    │   │ - Dot paths   │   │ - Snapshots   │
//! │ - Route table │   │ - Key/value   │   │ - JSON emit   │
//! │ - Transitions │   │ - Query sync  │   │               │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!         │                    │                    │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain Layer (domain/)                             │
//! │  - Signal model                                     │
//! │  - Error types                                      │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Observability (observability/)                     │  ← Optional
//! │  - tracing-subscriber setup                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`app`]: State container, signal bus/processor and the composition entry point
//! - [`domain`]: Signal model and errors
//! - [`routing`]: Route patterns, tables and the transition engine
//! - [`storage`]: Query string and key/value persistence adapters
//! - [`devtools`]: Inspection handle
//! - [`observability`]: Tracing initialization
//!
//! # Threading
//!
//! Everything is single threaded and cooperative. Shared ownership uses `Rc`, so
//! none of the public types are `Send`. Deferred work (the initial route enter)
//! is queued on a [`Scheduler`] that the host drains with
//! [`Synapse::run_pending`].
//!
//! # Examples
//!
//! ```rust
//! use serde_json::{json, Value};
//! use synapse::{MemoryHistory, RouteSignals, RouteTable, Signal, SignalProcessor, StateMap, Synapse};
//!
//! let processor = SignalProcessor::<StateMap>::new()
//!     .on("nav.to", |state, signal, _| {
//!         let mut partial = StateMap::new();
//!         partial.insert("path".into(), signal.field("path").cloned().unwrap_or(Value::Null));
//!         state.merge(partial);
//!         Ok(())
//!     })
//!     .on("profile.start", |_, signal, _| {
//!         tracing::info!(payload = %signal.payload_or_null(), "profile subscription started");
//!         Ok(())
//!     });
//!
//! let routes = RouteTable::new().route(
//!     "/profile/:id",
//!     RouteSignals::new().enter(Signal::with_payload("profile.start", Value::Null)),
//! )?;
//!
//! let synapse = Synapse::builder()
//!     .signal_processor(processor)
//!     .route_signals(routes)
//!     .path_selector(|s: &StateMap| s.get("path").and_then(Value::as_str).map(String::from))
//!     .build();
//!
//! synapse.run_pending()?;
//! synapse.emit(Signal::with_payload("nav.to", json!({ "path": "/profile/7" })))?;
//! # Ok::<(), synapse::SynapseError>(())
//! ```

pub mod app;
pub mod devtools;
pub mod domain;
pub mod observability;
pub mod routing;
pub mod storage;

pub use app::{
    Merge, Scheduler, Selectors, SignalBatch, SignalBus, SignalHandler, SignalProcessor, State, Subscriptions,
    Synapse, SynapseBuilder, Unsubscribe,
};
pub use devtools::DevTools;
pub use domain::{NormalizedSignal, Result, Signal, Signals, SynapseError};
pub use routing::{
    inject_params, Location, MemoryHistory, PathParams, PathSource, RouteEngine, RoutePattern, RouteSignals,
    RouteTable, Transition,
};

use serde::Deserialize;
use std::collections::BTreeMap;
use storage::FileStore;

/// Dynamic application state: a JSON object with string keys.
pub type StateMap = serde_json::Map<String, serde_json::Value>;

/// Runtime options.
///
/// Can be built from a flat string map (environment, CLI flags, host plugin
/// settings) or a TOML document:
///
/// ```toml
/// trace_level = "debug"
/// enable_dev_tools = true
/// storage_file = "/tmp/synapse/state.json"
/// local_storage_fields = ["assets", "theme.mode"]
/// search_param_fields = ["search.q", "fileId"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracing filter directive.
    ///
    /// Options: `trace`, `debug`, `info`, `warn`, `error`, or any `EnvFilter`
    /// directive. Default: `"info"`
    pub trace_level: Option<String>,

    /// Whether [`Synapse::dev_tools`] returns an inspection handle. Default: `false`
    pub enable_dev_tools: bool,

    /// File backing [`FileStore`] for persisted fields.
    pub storage_file: Option<String>,

    /// Dot-addressed fields mirrored into the key/value store.
    pub local_storage_fields: Vec<String>,

    /// Dot-addressed fields mirrored into the URL query string.
    pub search_param_fields: Vec<String>,
}

impl Config {
    /// Parses configuration from a flat string map.
    ///
    /// # Parsing Rules
    ///
    /// - `trace_level`, `storage_file`: copied as is
    /// - `enable_dev_tools`: `true`/`1`/`yes` enable, anything else disables
    /// - `local_storage_fields`, `search_param_fields`: comma-separated lists
    ///   (empty items dropped)
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use synapse::Config;
    ///
    /// let mut map = BTreeMap::new();
    /// map.insert("enable_dev_tools".to_string(), "true".to_string());
    /// map.insert("search_param_fields".to_string(), "search.q, fileId".to_string());
    ///
    /// let config = Config::from_map(&map);
    /// assert!(config.enable_dev_tools);
    /// assert_eq!(config.search_param_fields, vec!["search.q", "fileId"]);
    /// ```
    #[must_use]
    pub fn from_map(config: &BTreeMap<String, String>) -> Self {
        let list = |key: &str| {
            config
                .get(key)
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(String::from)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        };

        let enable_dev_tools = config
            .get("enable_dev_tools")
            .is_some_and(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"));

        Self {
            trace_level: config.get("trace_level").cloned(),
            enable_dev_tools,
            storage_file: config.get("storage_file").cloned(),
            local_storage_fields: list("local_storage_fields"),
            search_param_fields: list("search_param_fields"),
        }
    }

    /// Parses configuration from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::Config`] if the document is not valid TOML or a
    /// value has the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| SynapseError::Config(format!("failed to parse config: {e}")))
    }

    /// Opens the configured [`FileStore`], or `None` if no file is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open_file_store(&self) -> Result<Option<FileStore>> {
        self.storage_file.as_deref().map(FileStore::open).transpose()
    }
}
