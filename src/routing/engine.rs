//! Route signal engine.
//!
//! Keeps signal traffic in sync with navigation: when the current path changes,
//! the leave signals of the old path fire, then the enter signals of the new
//! path, exactly once per transition.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──(deferred first turn: enter initial path)──▶ Active { current_path }
//!                                                                 │
//!                           path source notifies, path differs ───┘ leave(old) → enter(new)
//! ```
//!
//! The first enter is deferred through the [`Scheduler`] so handlers observe a
//! fully built instance with every listener attached. Notifications that arrive
//! before that turn are ignored; the deferred turn reads whatever path is current
//! by then.
//!
//! While route signals are being dispatched, notifications caused by their own
//! handlers are ignored, so a handler mutating state cannot re-trigger the engine.
//!
//! A transition triggered by a state notification has no caller to return its
//! error to. The first such error is kept until [`RouteEngine::take_error`]
//! collects it; [`Synapse`](crate::Synapse) does so after every emit.

use crate::app::bus::{SignalBatch, SignalBus};
use crate::app::scheduler::Scheduler;
use crate::app::state::{Merge, State, Unsubscribe};
use crate::domain::error::{Result, SynapseError};
use crate::routing::location::Location;
use crate::routing::table::{RouteTable, Transition};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Where the engine reads the current path from.
pub enum PathSource<S> {
    /// Derive the path from state; re-checked on every state notification.
    Selector(Rc<dyn Fn(&S) -> Option<String>>),
    /// Read the host location; re-checked on back/forward navigation.
    Location(Rc<dyn Location>),
}

impl<S> PathSource<S> {
    /// Builds a selector source.
    pub fn selector(selector: impl Fn(&S) -> Option<String> + 'static) -> Self {
        Self::Selector(Rc::new(selector))
    }
}

impl<S> Clone for PathSource<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Selector(selector) => Self::Selector(Rc::clone(selector)),
            Self::Location(location) => Self::Location(Rc::clone(location)),
        }
    }
}

impl<S> fmt::Debug for PathSource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selector(_) => f.write_str("PathSource::Selector"),
            Self::Location(_) => f.write_str("PathSource::Location"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Active { current_path: String },
}

struct EngineInner<S, E> {
    table: RouteTable,
    bus: Rc<SignalBus<E>>,
    state: State<S>,
    source: PathSource<S>,
    phase: RefCell<Phase>,
    handling: Cell<bool>,
    detach: RefCell<Option<Unsubscribe>>,
    failure: RefCell<Option<SynapseError>>,
}

struct HandlingGuard<'a>(&'a Cell<bool>);

impl Drop for HandlingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<S: Merge + 'static, E: 'static> EngineInner<S, E> {
    fn read_path(&self) -> Option<String> {
        match &self.source {
            PathSource::Selector(selector) => selector(&self.state.get()),
            PathSource::Location(location) => Some(location.pathname()),
        }
    }

    fn enter_initial(&self) -> Result<()> {
        if *self.phase.borrow() != Phase::Uninitialized {
            return Ok(());
        }
        let Some(path) = self.read_path() else {
            tracing::debug!("no initial path, route engine stays idle");
            return Ok(());
        };
        tracing::debug!(path = %path, "entering initial route");
        self.transition(None, path)
    }

    fn on_source_changed(&self) {
        if self.handling.get() {
            tracing::trace!("route transition in progress, ignoring notification");
            return;
        }
        if let Err(e) = self.check() {
            tracing::error!(error = %e, "route signal dispatch failed");
            let mut failure = self.failure.borrow_mut();
            if failure.is_none() {
                *failure = Some(e);
            }
        }
    }

    fn check(&self) -> Result<()> {
        let current = match &*self.phase.borrow() {
            Phase::Uninitialized => return Ok(()),
            Phase::Active { current_path } => current_path.clone(),
        };
        match self.read_path() {
            Some(path) if path != current => self.transition(Some(current), path),
            _ => Ok(()),
        }
    }

    fn transition(&self, old: Option<String>, new: String) -> Result<()> {
        let _span = tracing::debug_span!("route_transition", from = ?old, to = %new).entered();

        self.handling.set(true);
        let guard = HandlingGuard(&self.handling);

        let result = self.emit_transition(old.as_deref(), &new);

        *self.phase.borrow_mut() = Phase::Active { current_path: new };
        drop(guard);
        result
    }

    fn emit_transition(&self, old: Option<&str>, new: &str) -> Result<()> {
        if let Some(old) = old {
            if let Some(signals) = self.table.signals_for(old, Transition::Leave) {
                self.bus.dispatch(SignalBatch::new(signals))?;
            }
        }
        if let Some(signals) = self.table.signals_for(new, Transition::Enter) {
            self.bus.dispatch(SignalBatch::new(signals))?;
        }
        Ok(())
    }
}

/// Fires configured enter/leave signals on path transitions.
///
/// Cloning yields another handle to the same engine.
pub struct RouteEngine<S, E> {
    inner: Rc<EngineInner<S, E>>,
}

impl<S, E> Clone for RouteEngine<S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S, E> fmt::Debug for RouteEngine<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEngine")
            .field("routes", &self.inner.table.len())
            .field("source", &self.inner.source)
            .field("phase", &self.inner.phase.borrow())
            .finish()
    }
}

impl<S: Merge + 'static, E: 'static> RouteEngine<S, E> {
    /// Attaches to `source` and schedules the initial enter on `scheduler`.
    pub fn start(
        table: RouteTable,
        bus: Rc<SignalBus<E>>,
        state: State<S>,
        source: PathSource<S>,
        scheduler: &Scheduler,
    ) -> Self {
        let inner = Rc::new(EngineInner {
            table,
            bus,
            state,
            source,
            phase: RefCell::new(Phase::Uninitialized),
            handling: Cell::new(false),
            detach: RefCell::new(None),
            failure: RefCell::new(None),
        });

        let weak: Weak<EngineInner<S, E>> = Rc::downgrade(&inner);
        let detach = match &inner.source {
            PathSource::Selector(_) => inner.state.subscribe(move |_| {
                if let Some(engine) = weak.upgrade() {
                    engine.on_source_changed();
                }
            }),
            PathSource::Location(location) => location.on_popstate(Box::new(move || {
                if let Some(engine) = weak.upgrade() {
                    engine.on_source_changed();
                }
            })),
        };
        *inner.detach.borrow_mut() = Some(detach);

        let weak = Rc::downgrade(&inner);
        scheduler.defer(move || match weak.upgrade() {
            Some(engine) => engine.enter_initial(),
            None => Ok(()),
        });

        tracing::debug!(routes = inner.table.len(), source = ?inner.source, "route engine started");
        Self { inner }
    }

    /// The path of the last completed transition, `None` before the first one.
    #[must_use]
    pub fn current_path(&self) -> Option<String> {
        match &*self.inner.phase.borrow() {
            Phase::Uninitialized => None,
            Phase::Active { current_path } => Some(current_path.clone()),
        }
    }

    /// Re-reads the path source and fires signals if the path changed.
    ///
    /// Hosts whose navigation does not produce popstate (a `pushState` call, for
    /// instance) call this after navigating.
    ///
    /// # Errors
    ///
    /// Returns the first route signal handler error.
    pub fn check(&self) -> Result<()> {
        if self.inner.handling.get() {
            return Ok(());
        }
        self.inner.check()
    }

    /// Takes the first error raised by a notification-driven transition since
    /// the last call.
    #[must_use]
    pub fn take_error(&self) -> Option<SynapseError> {
        self.inner.failure.borrow_mut().take()
    }

    /// Detaches from the path source. Idempotent.
    pub fn stop(&self) {
        let detach = self.inner.detach.borrow_mut().take();
        if let Some(detach) = detach {
            detach.unsubscribe();
            tracing::debug!("route engine stopped");
        }
    }
}
