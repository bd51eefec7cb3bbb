//! Domain layer for the synapse engine.
//!
//! This module contains the value types shared by every other layer: the signal
//! model and the error taxonomy. It has no knowledge of state containers, routing
//! or storage.
//!
//! # Organization
//!
//! - [`error`]: Error types and result aliases
//! - [`signal`]: Signal variants, normalization and batches
//!
//! # Examples
//!
//! ```
//! use synapse::domain::{Result, Signal};
//!
//! fn parse(raw: &str) -> Result<Signal> {
//!     Signal::from_value(&serde_json::from_str(raw)?)
//! }
//!
//! assert_eq!(parse(r#""theme.toggle""#).unwrap().name(), "theme.toggle");
//! ```

pub mod error;
pub mod signal;

pub use error::{Result, SynapseError};
pub use signal::{NormalizedSignal, Signal, Signals};
