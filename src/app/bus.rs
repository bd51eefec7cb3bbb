//! Single-slot signal bus.
//!
//! The bus holds at most one handler. Dispatching a batch normalizes each signal
//! and hands it to that handler in order. It is deliberately not a multi-subscriber
//! pub/sub; fan-out to many observers happens on [`State`](crate::State) instead.

use crate::domain::error::{Result, SynapseError};
use crate::domain::signal::{NormalizedSignal, Signals};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Handler<E> = Rc<dyn Fn(&NormalizedSignal, Option<&E>) -> Result<()>>;

/// A batch of signals plus the UI event that triggered it, if any.
#[derive(Debug)]
pub struct SignalBatch<'a, E> {
    /// Signals in dispatch order.
    pub signals: Signals,
    /// Originating UI event forwarded to every handler call.
    pub event: Option<&'a E>,
}

impl<'a, E> SignalBatch<'a, E> {
    /// Creates a batch without an originating event.
    pub fn new(signals: impl Into<Signals>) -> Self {
        Self {
            signals: signals.into(),
            event: None,
        }
    }

    /// Attaches the originating event.
    #[must_use]
    pub fn with_event(mut self, event: &'a E) -> Self {
        self.event = Some(event);
        self
    }
}

/// Routes dispatched batches to the single installed handler.
pub struct SignalBus<E> {
    handler: RefCell<Option<Handler<E>>>,
}

impl<E> Default for SignalBus<E> {
    fn default() -> Self {
        Self {
            handler: RefCell::new(None),
        }
    }
}

impl<E> fmt::Debug for SignalBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

impl<E> SignalBus<E> {
    /// Creates a bus with no handler installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the dispatch handler, replacing any previous one.
    pub fn set_handler(&self, handler: impl Fn(&NormalizedSignal, Option<&E>) -> Result<()> + 'static) {
        *self.handler.borrow_mut() = Some(Rc::new(handler));
    }

    /// Removes the installed handler; later batches are dropped.
    pub fn clear_handler(&self) {
        self.handler.borrow_mut().take();
    }

    /// Whether a handler is installed.
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.borrow().is_some()
    }

    /// Dispatches every signal of `batch` in order.
    ///
    /// Without a handler the batch is dropped with a warning and `Ok(())` is
    /// returned. The handler is looked up again before each signal, so replacing
    /// it mid-batch affects the remaining signals.
    ///
    /// # Errors
    ///
    /// The first handler error stops the batch and is returned unchanged.
    pub fn dispatch(&self, batch: SignalBatch<'_, E>) -> Result<()> {
        if !self.has_handler() {
            tracing::warn!(
                error = %SynapseError::NoHandlerInstalled,
                dropped = batch.signals.len(),
                "dropping signals"
            );
            return Ok(());
        }

        for signal in batch.signals {
            let current = self.handler.borrow().clone();
            let Some(handler) = current else {
                tracing::warn!(signal = %signal.name(), "handler removed mid-batch, dropping signal");
                continue;
            };
            let normalized = signal.normalize();
            tracing::trace!(signal = %normalized.name, "dispatching signal");
            handler(&normalized, batch.event)?;
        }

        Ok(())
    }
}
