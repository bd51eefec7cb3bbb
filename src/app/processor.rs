//! Signal handler registry.
//!
//! A [`SignalProcessor`] maps signal names to handler functions operating on the
//! [`State`] container. Dispatch is by exact name. A name without a handler is a
//! programming error and fails with [`SynapseError::UnknownSignalType`].
//!
//! # Example
//!
//! ```rust
//! use serde_json::{json, Map, Value};
//! use synapse::{Signal, SignalProcessor, State};
//!
//! let processor = SignalProcessor::<Map<String, Value>>::new()
//!     .on("counter.increment", |state, _signal, _event| {
//!         let next = state.get().get("count").and_then(Value::as_i64).unwrap_or(0) + 1;
//!         let mut partial = Map::new();
//!         partial.insert("count".into(), json!(next));
//!         state.merge(partial);
//!         Ok(())
//!     });
//!
//! let state = State::new(Map::new());
//! processor.process(&state, &Signal::from("counter.increment").normalize(), None)?;
//! assert_eq!(state.get()["count"], json!(1));
//! # Ok::<(), synapse::SynapseError>(())
//! ```

use crate::app::state::{Merge, State};
use crate::domain::error::{Result, SynapseError};
use crate::domain::signal::NormalizedSignal;
use std::collections::HashMap;
use std::fmt;

/// A handler bound to one signal name.
pub type SignalHandler<S, E> = Box<dyn Fn(&State<S>, &NormalizedSignal, Option<&E>) -> Result<()>>;

/// Dispatches normalized signals to handlers by name.
pub struct SignalProcessor<S, E = ()> {
    handlers: HashMap<String, SignalHandler<S, E>>,
}

impl<S, E> Default for SignalProcessor<S, E> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<S, E> fmt::Debug for SignalProcessor<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalProcessor")
            .field("signals", &self.signal_names())
            .finish()
    }
}

impl<S, E> SignalProcessor<S, E> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for `name`, replacing any previous one.
    #[must_use]
    pub fn on<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&State<S>, &NormalizedSignal, Option<&E>) -> Result<()> + 'static,
    {
        self.insert(name, handler);
        self
    }

    /// Registers the handler for `name` on an existing registry.
    pub fn insert<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&State<S>, &NormalizedSignal, Option<&E>) -> Result<()> + 'static,
    {
        let name = name.into();
        if self.handlers.insert(name.clone(), Box::new(handler)).is_some() {
            tracing::debug!(signal = %name, "replaced signal handler");
        }
    }

    /// Whether a handler is registered for `name`.
    #[must_use]
    pub fn handles(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered signal names, sorted.
    #[must_use]
    pub fn signal_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<S: Merge, E> SignalProcessor<S, E> {
    /// Runs the handler registered for `signal.name`.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::UnknownSignalType`] when no handler is registered,
    /// or whatever the handler itself returns.
    pub fn process(&self, state: &State<S>, signal: &NormalizedSignal, event: Option<&E>) -> Result<()> {
        let _span = tracing::debug_span!("process_signal", signal = %signal.name).entered();

        let handler = self.handlers.get(&signal.name).ok_or_else(|| {
            tracing::error!(signal = %signal.name, "no handler registered");
            SynapseError::UnknownSignalType(signal.name.clone())
        })?;

        handler(state, signal, event)
    }
}
