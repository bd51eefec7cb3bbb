//! Host navigation abstraction.
//!
//! [`Location`] is the slice of a browser's `window.location` / `history` API the
//! engine needs: the current path, the query string, query rewriting without a
//! new history entry, and back/forward notifications. [`MemoryHistory`] is an
//! in-process implementation for native hosts and tests.

use crate::app::state::Unsubscribe;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Read/observe access to the host's current URL.
pub trait Location {
    /// The path component, e.g. `/w1/search`.
    fn pathname(&self) -> String;

    /// The query string without the leading `?`.
    fn search(&self) -> String;

    /// Rewrites the query string of the current entry without adding history.
    fn replace_search(&self, search: &str);

    /// Registers `callback` for back/forward navigation.
    fn on_popstate(&self, callback: Box<dyn Fn()>) -> Unsubscribe;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    path: String,
    search: String,
}

impl Entry {
    fn parse(url: &str) -> Self {
        let url = url.split_once('#').map_or(url, |(before, _)| before);
        let (path, search) = url.split_once('?').unwrap_or((url, ""));
        let path = if path.is_empty() { "/" } else { path };
        Self {
            path: path.to_string(),
            search: search.to_string(),
        }
    }
}

type PopListener = Rc<dyn Fn()>;

struct HistoryInner {
    entries: RefCell<Vec<Entry>>,
    index: Cell<usize>,
    listeners: RefCell<Vec<(u64, PopListener)>>,
    next_listener: Cell<u64>,
}

/// An in-memory session history.
///
/// Like a browser, `push` and `replace` do not fire popstate; `back`, `forward`
/// and `go` do. Cloning yields another handle to the same history.
#[derive(Clone)]
pub struct MemoryHistory {
    inner: Rc<HistoryInner>,
}

impl fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHistory")
            .field("entries", &self.inner.entries.borrow())
            .field("index", &self.inner.index.get())
            .finish()
    }
}

impl MemoryHistory {
    /// Creates a history with one entry for `url` (path plus optional `?query`).
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            inner: Rc::new(HistoryInner {
                entries: RefCell::new(vec![Entry::parse(url)]),
                index: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    /// Adds a new entry after the current one, discarding forward entries.
    pub fn push(&self, url: &str) {
        let index = self.inner.index.get();
        let mut entries = self.inner.entries.borrow_mut();
        entries.truncate(index + 1);
        entries.push(Entry::parse(url));
        self.inner.index.set(entries.len() - 1);
        tracing::trace!(url = %url, "history push");
    }

    /// Replaces the current entry.
    pub fn replace(&self, url: &str) {
        let index = self.inner.index.get();
        self.inner.entries.borrow_mut()[index] = Entry::parse(url);
        tracing::trace!(url = %url, "history replace");
    }

    /// Moves one entry back. Returns whether the position changed.
    pub fn back(&self) -> bool {
        self.go(-1)
    }

    /// Moves one entry forward. Returns whether the position changed.
    pub fn forward(&self) -> bool {
        self.go(1)
    }

    /// Moves `delta` entries and fires popstate. Out-of-range moves do nothing.
    pub fn go(&self, delta: isize) -> bool {
        let len = self.inner.entries.borrow().len();
        let Some(target) = self.inner.index.get().checked_add_signed(delta) else {
            return false;
        };
        if delta == 0 || target >= len {
            return false;
        }
        self.inner.index.set(target);

        let listeners: Vec<PopListener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener();
        }
        true
    }

    /// Number of history entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// Always `false`; a history has at least one entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The full URL of the current entry.
    #[must_use]
    pub fn url(&self) -> String {
        let entry = self.current();
        if entry.search.is_empty() {
            entry.path
        } else {
            format!("{}?{}", entry.path, entry.search)
        }
    }

    fn current(&self) -> Entry {
        self.inner.entries.borrow()[self.inner.index.get()].clone()
    }
}

impl Location for MemoryHistory {
    fn pathname(&self) -> String {
        self.current().path
    }

    fn search(&self) -> String {
        self.current().search
    }

    fn replace_search(&self, search: &str) {
        let index = self.inner.index.get();
        self.inner.entries.borrow_mut()[index].search = search.trim_start_matches('?').to_string();
    }

    fn on_popstate(&self, callback: Box<dyn Fn()>) -> Unsubscribe {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::from(callback)));

        let weak = Rc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().retain(|(other, _)| *other != id);
            }
        })
    }
}
