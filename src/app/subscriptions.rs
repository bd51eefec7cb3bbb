//! Registry of long-running side effects started by signal handlers.
//!
//! Handlers that start polling timers or live queries register a cancel function
//! under a key (for example a collection name). A matching stop handler removes
//! it again, and [`Synapse::shutdown`](crate::Synapse::shutdown) cancels whatever
//! is left.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

type Cancel = Box<dyn FnOnce()>;

/// Keyed cancel handles. Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct Subscriptions {
    active: Rc<RefCell<BTreeMap<String, Cancel>>>,
}

impl fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

impl Subscriptions {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `cancel` under `key`.
    ///
    /// Returns `false` and leaves the existing entry untouched when `key` is
    /// already active; the new cancel function is dropped without being called.
    pub fn start(&self, key: impl Into<String>, cancel: impl FnOnce() + 'static) -> bool {
        let key = key.into();
        let mut active = self.active.borrow_mut();
        if active.contains_key(&key) {
            tracing::warn!(key = %key, "already subscribed, stop it first");
            return false;
        }
        tracing::debug!(key = %key, "subscription started");
        active.insert(key, Box::new(cancel));
        true
    }

    /// Cancels and removes the entry under `key`. Returns whether one existed.
    pub fn stop(&self, key: &str) -> bool {
        let cancel = self.active.borrow_mut().remove(key);
        match cancel {
            Some(cancel) => {
                cancel();
                tracing::debug!(key = %key, "subscription stopped");
                true
            }
            None => false,
        }
    }

    /// Whether `key` is active.
    #[must_use]
    pub fn is_active(&self, key: &str) -> bool {
        self.active.borrow().contains_key(key)
    }

    /// Active keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.active.borrow().keys().cloned().collect()
    }

    /// Cancels every active entry.
    pub fn stop_all(&self) {
        let drained = std::mem::take(&mut *self.active.borrow_mut());
        for (key, cancel) in drained {
            cancel();
            tracing::debug!(key = %key, "subscription stopped on shutdown");
        }
    }
}
