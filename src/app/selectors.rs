//! Named selector registry.
//!
//! UI bindings often want to read a derived value by name (for example from a
//! debugging console). Selectors are registered explicitly with the key they
//! answer for; nothing is inferred from closure bodies.

use crate::domain::error::{Result, SynapseError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

type Selector<S> = Rc<dyn Fn(&S) -> Value>;

/// Maps selector names to functions deriving a JSON value from state.
pub struct Selectors<S> {
    selectors: BTreeMap<String, Selector<S>>,
}

impl<S> Default for Selectors<S> {
    fn default() -> Self {
        Self {
            selectors: BTreeMap::new(),
        }
    }
}

impl<S> Clone for Selectors<S> {
    fn clone(&self) -> Self {
        Self {
            selectors: self.selectors.clone(),
        }
    }
}

impl<S> fmt::Debug for Selectors<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.selectors.keys()).finish()
    }
}

impl<S> Selectors<S> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `selector` under `name`, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, selector: impl Fn(&S) -> Value + 'static) -> Self {
        self.selectors.insert(name.into(), Rc::new(selector));
        self
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.selectors.contains_key(name)
    }

    /// Evaluates the selector registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::SelectorNotFound`] for unknown names.
    pub fn select(&self, name: &str, state: &S) -> Result<Value> {
        self.selectors
            .get(name)
            .map(|selector| selector(state))
            .ok_or_else(|| SynapseError::SelectorNotFound(name.to_string()))
    }
}
