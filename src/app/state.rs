//! The state container.
//!
//! [`State`] holds the single application snapshot and notifies listeners after
//! every mutation. It is the only shared mutable resource of a synapse instance.
//!
//! # Notification Policy
//!
//! - `merge`, `reset` and `swap` update the snapshot first, then call every
//!   listener synchronously, in subscription order, before returning.
//! - Notification is unconditional: merging identical values still notifies.
//! - The listener list is captured when a pass starts. Listeners added or removed
//!   during a pass take effect from the next pass.
//! - Each listener is handed the latest snapshot at the moment it runs, so a
//!   mutation made by an earlier listener is visible to later ones.
//!
//! # Example
//!
//! ```rust
//! use serde_json::{json, Map, Value};
//! use synapse::State;
//!
//! let state: State<Map<String, Value>> = State::new(Map::new());
//! let unsubscribe = state.subscribe(|s| println!("count is now {}", s["count"]));
//!
//! let mut partial = Map::new();
//! partial.insert("count".into(), json!(1));
//! state.merge(partial);
//!
//! assert_eq!(state.get()["count"], json!(1));
//! unsubscribe.unsubscribe();
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

/// A state shape that supports shallow, partial-keys-win updates.
pub trait Merge: Clone {
    /// The partial update type accepted by [`State::merge`].
    type Partial;

    /// Applies `partial` on top of `self`; keys present in `partial` win.
    fn merge(&mut self, partial: Self::Partial);
}

impl Merge for serde_json::Map<String, serde_json::Value> {
    type Partial = Self;

    fn merge(&mut self, partial: Self::Partial) {
        for (key, value) in partial {
            self.insert(key, value);
        }
    }
}

impl<K: Ord + Clone, V: Clone> Merge for BTreeMap<K, V> {
    type Partial = Self;

    fn merge(&mut self, partial: Self::Partial) {
        self.extend(partial);
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Merge for HashMap<K, V> {
    type Partial = Self;

    fn merge(&mut self, partial: Self::Partial) {
        self.extend(partial);
    }
}

type Listener<S> = Rc<dyn Fn(&S)>;

struct Inner<S> {
    value: RefCell<Rc<S>>,
    listeners: RefCell<Vec<(u64, Listener<S>)>>,
    next_id: Cell<u64>,
}

/// The single mutable snapshot holder with subscribe/notify semantics.
///
/// Cloning a `State` yields another handle to the same container.
pub struct State<S> {
    inner: Rc<Inner<S>>,
}

impl<S> Clone for State<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for State<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("value", &self.inner.value.borrow())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

impl<S: Merge + 'static> State<S> {
    /// Creates a container holding `initial`.
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(Rc::new(initial)),
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Returns the latest committed snapshot.
    #[must_use]
    pub fn get(&self) -> Rc<S> {
        Rc::clone(&self.inner.value.borrow())
    }

    /// Shallow-merges `partial` into the current state, then notifies.
    pub fn merge(&self, partial: S::Partial) {
        {
            let mut value = self.inner.value.borrow_mut();
            Rc::make_mut(&mut value).merge(partial);
        }
        self.notify();
    }

    /// Replaces the whole snapshot, then notifies.
    pub fn reset(&self, new_state: S) {
        *self.inner.value.borrow_mut() = Rc::new(new_state);
        self.notify();
    }

    /// Replaces the snapshot with `f(current)`, then notifies.
    pub fn swap(&self, f: impl FnOnce(&S) -> S) {
        let current = self.get();
        let next = f(&current);
        self.reset(next);
    }

    /// Registers a listener invoked after every mutation.
    ///
    /// The returned handle removes exactly this listener. Dropping the handle
    /// without calling [`Unsubscribe::unsubscribe`] keeps the listener attached.
    pub fn subscribe(&self, listener: impl Fn(&S) + 'static) -> Unsubscribe {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));

        tracing::trace!(listener_id = id, "listener subscribed");

        let weak = Rc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().retain(|(other, _)| *other != id);
                tracing::trace!(listener_id = id, "listener unsubscribed");
            }
        })
    }

    /// Registers a listener that only fires when `selector`'s result changes.
    ///
    /// The selected value is compared against the value seen at the previous
    /// notification (initially the value at subscription time).
    pub fn watch<T, F, C>(&self, selector: F, on_change: C) -> Unsubscribe
    where
        T: PartialEq + 'static,
        F: Fn(&S) -> T + 'static,
        C: Fn(&T) + 'static,
    {
        let last = RefCell::new(selector(&self.get()));
        self.subscribe(move |state| {
            let next = selector(state);
            if *last.borrow() != next {
                on_change(&next);
                *last.borrow_mut() = next;
            }
        })
    }

    /// Number of currently registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Removes every listener.
    pub fn clear_listeners(&self) {
        self.inner.listeners.borrow_mut().clear();
    }

    fn notify(&self) {
        let listeners: Vec<Listener<S>> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        tracing::trace!(listeners = listeners.len(), "notifying state listeners");

        for listener in listeners {
            let snapshot = self.get();
            listener(&snapshot);
        }
    }
}

/// Handle returned by [`State::subscribe`].
///
/// Calling [`Unsubscribe::unsubscribe`] more than once is a no-op.
pub struct Unsubscribe {
    remove: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Unsubscribe {
    pub(crate) fn new(remove: impl FnOnce() + 'static) -> Self {
        Self {
            remove: RefCell::new(Some(Box::new(remove))),
        }
    }

    /// Removes the listener; later calls do nothing.
    pub fn unsubscribe(&self) {
        let remove = self.remove.borrow_mut().take();
        if let Some(remove) = remove {
            remove();
        }
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("active", &self.remove.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn merge_is_shallow_and_partial_wins() {
        let state = State::new(map(json!({ "a": 1, "b": { "x": 1 } })));
        state.merge(map(json!({ "b": { "y": 2 }, "c": 3 })));
        assert_eq!(Value::Object((*state.get()).clone()), json!({ "a": 1, "b": { "y": 2 }, "c": 3 }));
    }

    #[test]
    fn listeners_fire_in_order_after_update() {
        let state = State::new(map(json!({ "count": 0 })));
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Rc::clone(&seen);
            let handle = state.clone();
            state.subscribe(move |s| {
                assert_eq!(handle.get()["count"], s["count"]);
                seen.borrow_mut().push((tag, s["count"].clone()));
            });
        }

        state.merge(map(json!({ "count": 5 })));

        assert_eq!(
            *seen.borrow(),
            vec![("first", json!(5)), ("second", json!(5)), ("third", json!(5))]
        );
    }

    #[test]
    fn merge_notifies_even_without_changes() {
        let state = State::new(map(json!({ "a": 1 })));
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        state.subscribe(move |_| counter.set(counter.get() + 1));

        state.merge(map(json!({ "a": 1 })));
        state.merge(Map::new());

        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let state = State::new(map(json!({})));
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let handle = state.subscribe(move |_| counter.set(counter.get() + 1));
        let other_calls = Rc::new(Cell::new(0));
        let other = Rc::clone(&other_calls);
        state.subscribe(move |_| other.set(other.get() + 1));

        state.reset(Map::new());
        handle.unsubscribe();
        handle.unsubscribe();
        state.reset(Map::new());

        assert_eq!(calls.get(), 1);
        assert_eq!(other_calls.get(), 2);
        assert_eq!(state.listener_count(), 1);
    }

    #[test]
    fn subscribe_during_notification_waits_for_next_pass() {
        let state = State::new(map(json!({})));
        let late_calls = Rc::new(Cell::new(0));

        let handle = state.clone();
        let late = Rc::clone(&late_calls);
        let added = Cell::new(false);
        state.subscribe(move |_| {
            if !added.replace(true) {
                let late = Rc::clone(&late);
                handle.subscribe(move |_| late.set(late.get() + 1));
            }
        });

        state.merge(Map::new());
        assert_eq!(late_calls.get(), 0);

        state.merge(Map::new());
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn reentrant_merge_from_listener_is_visible_to_later_listeners() {
        let state = State::new(map(json!({ "n": 0, "derived": 0 })));

        let handle = state.clone();
        state.subscribe(move |s| {
            if s["derived"] != json!(s["n"].as_i64().unwrap_or(0) * 2) {
                let doubled = s["n"].as_i64().unwrap_or(0) * 2;
                handle.merge(map(json!({ "derived": doubled })));
            }
        });

        let observed = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&observed);
        state.subscribe(move |s| sink.borrow_mut().push(s["derived"].clone()));

        state.merge(map(json!({ "n": 4 })));

        assert_eq!(state.get()["derived"], json!(8));
        assert!(observed.borrow().iter().all(|v| *v == json!(8)));
    }

    #[test]
    fn swap_and_reset_replace_the_snapshot() {
        let state: State<BTreeMap<String, i64>> = State::new(BTreeMap::from([("count".to_string(), 1)]));
        state.swap(|s| {
            let mut next = s.clone();
            next.insert("count".into(), s["count"] + 10);
            next
        });
        assert_eq!(state.get()["count"], 11);

        state.reset(BTreeMap::new());
        assert!(state.get().is_empty());
    }

    #[test]
    fn watch_fires_only_on_selected_change() {
        let state = State::new(map(json!({ "theme": "light", "count": 0 })));
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        state.watch(|s| s["theme"].clone(), move |theme| sink.borrow_mut().push(theme.clone()));

        state.merge(map(json!({ "count": 1 })));
        state.merge(map(json!({ "theme": "dark" })));
        state.merge(map(json!({ "count": 2 })));

        assert_eq!(*changes.borrow(), vec![json!("dark")]);
    }
}
