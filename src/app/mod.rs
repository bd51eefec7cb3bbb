//! Application layer coordinating state, signals, and side effects.
//!
//! This layer sits between UI bindings (which emit signals and read state) and
//! the routing/storage layers. Data flows one way:
//!
//! ```text
//! UI event → Signals → SignalBus → SignalProcessor → State merge/reset
//!                ↑                                         ↓
//!                └──── RouteEngine / listeners ◄──── notifications
//! ```
//!
//! # Modules
//!
//! - [`state`]: Observable state container and the [`Merge`] trait
//! - [`bus`]: Single-handler signal dispatch
//! - [`processor`]: Name → handler table applied against state
//! - [`scheduler`]: Deferred work queue
//! - [`selectors`]: Named state projections
//! - [`subscriptions`]: Keyed registry of long-running side effects
//! - [`synapse`]: Builder that wires the above together

pub mod bus;
pub mod processor;
pub mod scheduler;
pub mod selectors;
pub mod state;
pub mod subscriptions;
pub mod synapse;

pub use bus::{SignalBatch, SignalBus};
pub use processor::{SignalHandler, SignalProcessor};
pub use scheduler::Scheduler;
pub use selectors::Selectors;
pub use state::{Merge, State, Unsubscribe};
pub use subscriptions::Subscriptions;
pub use synapse::{Synapse, SynapseBuilder};
