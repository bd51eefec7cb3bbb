//! Error types for the synapse engine.
//!
//! This module defines the centralized error type [`SynapseError`] and a type alias
//! [`Result`] used throughout the crate. All errors are implemented using the
//! `thiserror` crate for automatic `Error` trait implementation.

use thiserror::Error;

/// The main error type for signal dispatch, routing and storage sync.
///
/// Failures raised inside user-supplied signal handlers are carried by the
/// [`SynapseError::Handler`] variant and propagate unchanged out of `emit`.
///
/// # Examples
///
/// ```
/// use synapse::SynapseError;
///
/// fn checked(name: &str) -> Result<(), SynapseError> {
///     Err(SynapseError::UnknownSignalType(name.to_string()))
/// }
///
/// assert!(checked("counter.explode").is_err());
/// ```
#[derive(Debug, Error)]
pub enum SynapseError {
    /// A raw value could not be interpreted as a signal.
    ///
    /// Signals are a bare name (string) or a `[name]` / `[name, payload]` pair.
    /// The string describes the rejected value.
    #[error("Invalid signal shape: {0}")]
    InvalidSignalShape(String),

    /// A dispatched signal has no registered handler.
    #[error("Unknown signal type: {0}")]
    UnknownSignalType(String),

    /// A batch was dispatched before a handler was installed on the bus.
    ///
    /// Never returned to callers; the bus logs it and drops the batch.
    #[error("No handler installed on signal bus")]
    NoHandlerInstalled,

    /// A named selector lookup failed.
    #[error("Selector not found: {0}")]
    SelectorNotFound(String),

    /// A route pattern could not be compiled.
    #[error("Invalid route pattern {pattern:?}: {reason}")]
    InvalidRoutePattern {
        /// The rejected pattern text.
        pattern: String,
        /// Why the pattern was rejected.
        reason: String,
    },

    /// A user-supplied signal handler failed.
    #[error("Signal handler failed: {0}")]
    Handler(String),

    /// Storage adapter operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem or I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration is invalid or malformed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SynapseError {
    /// Wraps any displayable failure from inside a signal handler.
    ///
    /// ```
    /// use synapse::SynapseError;
    ///
    /// let err = SynapseError::handler("search backend unavailable");
    /// assert_eq!(err.to_string(), "Signal handler failed: search backend unavailable");
    /// ```
    pub fn handler(error: impl std::fmt::Display) -> Self {
        Self::Handler(error.to_string())
    }
}

/// A specialized `Result` type for synapse operations.
pub type Result<T> = std::result::Result<T, SynapseError>;
