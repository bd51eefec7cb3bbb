//! Tracing subscriber setup.
//!
//! The crate logs through `tracing` macros and spans (emit, dispatch, route
//! transitions, storage I/O). Nothing is printed until the host installs a
//! subscriber; [`init_tracing`] installs a formatted one.
//!
//! # Configuration
//!
//! Trace level is controlled via:
//! 1. `RUST_LOG` environment variable (highest priority)
//! 2. `trace_level` config option
//! 3. Default: `"info"`
//!
//! # Usage
//!
//! ```rust
//! use synapse::observability::init_tracing;
//! use synapse::Config;
//!
//! init_tracing(&Config::default());
//!
//! tracing::debug!("synapse initialized");
//! ```

mod init;

pub use init::init_tracing;
