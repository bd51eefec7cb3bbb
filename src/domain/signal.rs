//! Signal values and their normalized form.
//!
//! A [`Signal`] is either a bare name or a name carrying a payload. Before a
//! handler sees it, every signal is normalized into a [`NormalizedSignal`]. Batches
//! are always wrapped in [`Signals`], so a tuple is never confused with a list of
//! signals.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use synapse::{Signal, Signals};
//!
//! let batch: Signals = vec![
//!     Signal::from("counter.increment"),
//!     Signal::from(("sys.log", json!({ "message": "incremented" }))),
//! ]
//! .into();
//!
//! assert_eq!(batch.len(), 2);
//! ```

use crate::domain::error::{Result, SynapseError};
use serde_json::Value;

/// A named instruction dispatched into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// A signal without payload, e.g. `"counter.increment"`.
    Bare(String),
    /// A signal with a payload, e.g. `["nav.to", { "path": "/profile" }]`.
    WithPayload(String, Value),
}

/// The canonical record handed to signal handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSignal {
    /// Signal name used for handler lookup.
    pub name: String,
    /// Payload, `None` for bare signals.
    pub payload: Option<Value>,
}

impl NormalizedSignal {
    /// Returns the payload or `Value::Null` when the signal was bare.
    #[must_use]
    pub fn payload_or_null(&self) -> &Value {
        static NULL: Value = Value::Null;
        self.payload.as_ref().unwrap_or(&NULL)
    }

    /// Looks up a top-level field of an object payload.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.as_ref().and_then(|p| p.get(key))
    }
}

impl Signal {
    /// Creates a signal carrying a payload.
    pub fn with_payload(name: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self::WithPayload(name.into(), payload.into())
    }

    /// Returns the signal name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Bare(name) | Self::WithPayload(name, _) => name,
        }
    }

    /// Converts the signal into the record handed to handlers.
    ///
    /// ```rust
    /// use synapse::Signal;
    ///
    /// let normalized = Signal::from("state.reset").normalize();
    /// assert_eq!(normalized.name, "state.reset");
    /// assert!(normalized.payload.is_none());
    /// ```
    #[must_use]
    pub fn normalize(self) -> NormalizedSignal {
        match self {
            Self::Bare(name) => NormalizedSignal { name, payload: None },
            Self::WithPayload(name, payload) => NormalizedSignal {
                name,
                payload: Some(payload),
            },
        }
    }

    /// Interprets a raw JSON value as a signal.
    ///
    /// Accepted shapes are a string (bare), `[name]` (payload `null`) and
    /// `[name, payload]`.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::InvalidSignalShape`] for any other shape.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(name) => Ok(Self::Bare(name.clone())),
            Value::Array(items) => match items.as_slice() {
                [Value::String(name)] => Ok(Self::WithPayload(name.clone(), Value::Null)),
                [Value::String(name), payload] => Ok(Self::WithPayload(name.clone(), payload.clone())),
                _ => Err(SynapseError::InvalidSignalShape(value.to_string())),
            },
            other => Err(SynapseError::InvalidSignalShape(other.to_string())),
        }
    }

    /// Returns the raw JSON form accepted by [`Signal::from_value`].
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Bare(name) => Value::String(name.clone()),
            Self::WithPayload(name, payload) => {
                Value::Array(vec![Value::String(name.clone()), payload.clone()])
            }
        }
    }
}

impl From<&str> for Signal {
    fn from(name: &str) -> Self {
        Self::Bare(name.to_string())
    }
}

impl From<String> for Signal {
    fn from(name: String) -> Self {
        Self::Bare(name)
    }
}

impl<N: Into<String>> From<(N, Value)> for Signal {
    fn from((name, payload): (N, Value)) -> Self {
        Self::WithPayload(name.into(), payload)
    }
}

impl<'de> serde::Deserialize<'de> for Signal {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

impl serde::Serialize for Signal {
    fn serialize<Ser: serde::Serializer>(&self, serializer: Ser) -> std::result::Result<Ser::Ok, Ser::Error> {
        self.to_value().serialize(serializer)
    }
}

/// An ordered batch of signals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signals(Vec<Signal>);

impl Signals {
    /// Creates an empty batch.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a signal, builder style.
    #[must_use]
    pub fn with(mut self, signal: impl Into<Signal>) -> Self {
        self.0.push(signal.into());
        self
    }

    /// Number of signals in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the signals in dispatch order.
    pub fn iter(&self) -> std::slice::Iter<'_, Signal> {
        self.0.iter()
    }

    /// Interprets a raw JSON value as a batch.
    ///
    /// A string is a batch of one bare signal. An array is always read as a list in
    /// which every element must itself be a signal, so `["a", "b"]` is two bare
    /// signals and a single tuple is written `[["nav.to", {...}]]`.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::InvalidSignalShape`] if any element is malformed.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(name) => Ok(Self(vec![Signal::Bare(name.clone())])),
            Value::Array(items) => items
                .iter()
                .map(Signal::from_value)
                .collect::<Result<Vec<_>>>()
                .map(Self),
            other => Err(SynapseError::InvalidSignalShape(other.to_string())),
        }
    }
}

impl From<Signal> for Signals {
    fn from(signal: Signal) -> Self {
        Self(vec![signal])
    }
}

impl From<&str> for Signals {
    fn from(name: &str) -> Self {
        Self(vec![Signal::from(name)])
    }
}

impl From<String> for Signals {
    fn from(name: String) -> Self {
        Self(vec![Signal::from(name)])
    }
}

impl<N: Into<String>> From<(N, Value)> for Signals {
    fn from(tuple: (N, Value)) -> Self {
        Self(vec![Signal::from(tuple)])
    }
}

impl From<Vec<Signal>> for Signals {
    fn from(signals: Vec<Signal>) -> Self {
        Self(signals)
    }
}

impl From<&[Signal]> for Signals {
    fn from(signals: &[Signal]) -> Self {
        Self(signals.to_vec())
    }
}

impl FromIterator<Signal> for Signals {
    fn from_iter<I: IntoIterator<Item = Signal>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Signals {
    type Item = Signal;
    type IntoIter = std::vec::IntoIter<Signal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Signals {
    type Item = &'a Signal;
    type IntoIter = std::slice::Iter<'a, Signal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
