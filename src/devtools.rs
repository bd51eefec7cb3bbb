//! Inspection handle for debugging consoles.
//!
//! [`DevTools`] exposes the live state and the emit path of a [`Synapse`] in a
//! text-friendly form: snapshots as JSON and signals parsed from JSON text. It
//! does not record history.
//!
//! [`Synapse`]: crate::Synapse

use crate::app::bus::{SignalBatch, SignalBus};
use crate::app::selectors::Selectors;
use crate::app::state::{Merge, State};
use crate::domain::error::Result;
use crate::domain::signal::Signals;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Live view of one instance's state, bus and named selectors.
pub struct DevTools<S, E> {
    state: State<S>,
    bus: Rc<SignalBus<E>>,
    selectors: Selectors<S>,
}

impl<S, E> fmt::Debug for DevTools<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevTools")
            .field("selectors", &self.selectors)
            .finish_non_exhaustive()
    }
}

impl<S: Merge + 'static, E> DevTools<S, E> {
    pub(crate) fn new(state: State<S>, bus: Rc<SignalBus<E>>, selectors: Selectors<S>) -> Self {
        Self { state, bus, selectors }
    }

    /// The current state snapshot.
    #[must_use]
    pub fn state(&self) -> Rc<S> {
        self.state.get()
    }

    /// Emits signals written as JSON: a bare `"NAME"` or a list such as
    /// `[["NAME", payload], "OTHER"]`.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::Json`](crate::SynapseError::Json) for malformed text,
    /// [`SynapseError::InvalidSignalShape`](crate::SynapseError::InvalidSignalShape)
    /// for values that are not signals, and any handler error.
    pub fn emit_json(&self, text: &str) -> Result<()> {
        let value: Value = serde_json::from_str(text)?;
        let signals = Signals::from_value(&value)?;
        tracing::debug!(signals = signals.len(), "dev tools emit");
        self.bus.dispatch(SignalBatch::new(signals))
    }

    /// Evaluates a named selector.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::SelectorNotFound`](crate::SynapseError::SelectorNotFound)
    /// for unknown names.
    pub fn select(&self, name: &str) -> Result<Value> {
        self.selectors.select(name, &self.state.get())
    }
}

impl<S: Merge + Serialize + 'static, E> DevTools<S, E> {
    /// The current state as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::Json`](crate::SynapseError::Json) if the state
    /// cannot be serialized.
    pub fn snapshot_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.state.get())?)
    }
}
