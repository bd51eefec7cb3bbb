//! Cooperative "next turn" task queue.
//!
//! Work that must not run inside the current call stack is queued here and run
//! when the host drains the queue from its event loop, the way a browser runs a
//! zero-delay timer after the current task finishes.

use crate::domain::error::Result;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

type Task = Box<dyn FnOnce() -> Result<()>>;

/// A FIFO queue of deferred tasks.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Rc<RefCell<VecDeque<Task>>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Scheduler {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task` for the next turn.
    pub fn defer(&self, task: impl FnOnce() -> Result<()> + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Runs queued tasks until the queue is empty, including tasks queued by
    /// the tasks themselves. Returns how many tasks ran.
    ///
    /// # Errors
    ///
    /// Stops at the first failing task and returns its error; later tasks stay
    /// queued.
    pub fn run_pending(&self) -> Result<usize> {
        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(task) = next else {
                break;
            };
            task()?;
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(ran, "ran deferred tasks");
        }
        Ok(ran)
    }

    /// Drops every queued task without running it.
    pub fn clear(&self) {
        self.queue.borrow_mut().clear();
    }
}
