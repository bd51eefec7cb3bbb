//! Route-driven signal emission.
//!
//! # Modules
//!
//! - [`pattern`]: Path patterns with named parameters
//! - [`table`]: Ordered pattern → enter/leave signal tables
//! - [`engine`]: Transition detection and exactly-once firing
//! - [`location`]: Host location abstraction and in-memory history

pub mod engine;
pub mod location;
pub mod pattern;
pub mod table;

pub use engine::{PathSource, RouteEngine};
pub use location::{Location, MemoryHistory};
pub use pattern::{PathParams, RoutePattern};
pub use table::{inject_params, RouteSignals, RouteTable, Transition};
