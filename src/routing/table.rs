//! Route signal tables.
//!
//! A [`RouteTable`] maps path patterns to the signals fired when a path matching
//! the pattern is entered or left. Declaration order is significant: lookups walk
//! the table front to back.
//!
//! # TOML Format
//!
//! ```toml
//! [[routes]]
//! path = "/:workspaceId/search"
//! enter = [["sys.log", { message = "Entered search" }], ["subscribe_collection", { collectionName = "assets" }]]
//! leave = [["unsubscribe_collection", { collectionName = "assets" }]]
//!
//! [[routes]]
//! path = "/profile"
//! enter = ["profile.startSubscription"]
//! leave = ["profile.stopSubscription"]
//! ```
//!
//! # JSON Format
//!
//! ```json
//! { "/profile": { "enter": ["profile.startSubscription"], "leave": ["profile.stopSubscription"] } }
//! ```

use crate::domain::error::{Result, SynapseError};
use crate::domain::signal::{Signal, Signals};
use crate::routing::pattern::{PathParams, RoutePattern};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Which signal list of a route to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The route's path was just entered.
    Enter,
    /// The route's path was just left.
    Leave,
}

/// Enter/leave signal lists for one pattern.
///
/// `None` means the list is not defined, which lets a later pattern that also
/// matches supply it. `Some(vec![])` is defined and fires nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RouteSignals {
    /// Fired, in order, when a matching path is entered.
    #[serde(default)]
    pub enter: Option<Vec<Signal>>,
    /// Fired, in order, when a matching path is left.
    #[serde(default)]
    pub leave: Option<Vec<Signal>>,
}

impl RouteSignals {
    /// Creates a route with neither list defined.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an enter signal.
    #[must_use]
    pub fn enter(mut self, signal: impl Into<Signal>) -> Self {
        self.enter.get_or_insert_with(Vec::new).push(signal.into());
        self
    }

    /// Appends a leave signal.
    #[must_use]
    pub fn leave(mut self, signal: impl Into<Signal>) -> Self {
        self.leave.get_or_insert_with(Vec::new).push(signal.into());
        self
    }

    fn list(&self, transition: Transition) -> Option<&Vec<Signal>> {
        match transition {
            Transition::Enter => self.enter.as_ref(),
            Transition::Leave => self.leave.as_ref(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TomlRoutes {
    #[serde(default)]
    routes: Vec<TomlRoute>,
}

#[derive(Debug, Deserialize)]
struct TomlRoute {
    path: String,
    #[serde(flatten)]
    signals: RouteSignals,
}

/// Ordered pattern → signals table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<(RoutePattern, RouteSignals)>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route, builder style.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::InvalidRoutePattern`] if `pattern` does not compile.
    pub fn route(mut self, pattern: &str, signals: RouteSignals) -> Result<Self> {
        self.insert(pattern, signals)?;
        Ok(self)
    }

    /// Appends a route.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::InvalidRoutePattern`] if `pattern` does not compile.
    pub fn insert(&mut self, pattern: &str, signals: RouteSignals) -> Result<()> {
        self.routes.push((RoutePattern::parse(pattern)?, signals));
        Ok(())
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Parses the `[[routes]]` TOML format.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::Config`] for TOML errors, including malformed
    /// signals, and [`SynapseError::InvalidRoutePattern`] for bad patterns.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let parsed: TomlRoutes =
            toml::from_str(text).map_err(|e| SynapseError::Config(format!("failed to parse route table: {e}")))?;

        let mut table = Self::new();
        for route in parsed.routes {
            table.insert(&route.path, route.signals)?;
        }

        tracing::debug!(routes = table.len(), "loaded route table from TOML");
        Ok(table)
    }

    /// Parses the JSON object format, keeping key order.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::Json`] for malformed JSON or signals,
    /// [`SynapseError::Config`] if the top level is not an object, and
    /// [`SynapseError::InvalidRoutePattern`] for bad patterns.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(routes) = value else {
            return Err(SynapseError::Config("route table must be a JSON object".to_string()));
        };

        let mut table = Self::new();
        for (pattern, signals) in routes {
            table.insert(&pattern, serde_json::from_value(signals)?)?;
        }

        tracing::debug!(routes = table.len(), "loaded route table from JSON");
        Ok(table)
    }

    /// Finds the first route matching `path` that defines the `transition` list
    /// and returns its signals with path parameters injected.
    ///
    /// Returns `None` when no route applies, which is not an error.
    #[must_use]
    pub fn signals_for(&self, path: &str, transition: Transition) -> Option<Signals> {
        self.routes.iter().find_map(|(pattern, signals)| {
            let list = signals.list(transition)?;
            let params = pattern.matches(path)?;
            tracing::debug!(
                path = %path,
                pattern = %pattern,
                transition = ?transition,
                signals = list.len(),
                "route matched"
            );
            Some(list.iter().map(|signal| inject_params(signal, &params)).collect())
        })
    }
}

/// Merges matched path parameters into a signal's payload.
///
/// - bare signals are unchanged
/// - object payloads get a `params` field, replacing any existing one
/// - a `null` payload becomes `{ "params": ... }`
/// - string and other non-object payloads are passed through unchanged
#[must_use]
pub fn inject_params(signal: &Signal, params: &PathParams) -> Signal {
    let Signal::WithPayload(name, payload) = signal else {
        return signal.clone();
    };

    let params_value = Value::Object(
        params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    );

    let payload = match payload {
        Value::Object(fields) => {
            let mut fields = fields.clone();
            fields.insert("params".to_string(), params_value);
            Value::Object(fields)
        }
        Value::Null => {
            let mut fields = Map::new();
            fields.insert("params".to_string(), params_value);
            Value::Object(fields)
        }
        other => other.clone(),
    };

    Signal::WithPayload(name.clone(), payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(signals: &Signals) -> Vec<&str> {
        signals.iter().map(Signal::name).collect()
    }

    #[test]
    fn injects_params_into_object_payloads_only() {
        let params: PathParams = [("workspaceId".to_string(), "w1".to_string())].into();

        let object = inject_params(&Signal::with_payload("a", json!({ "collectionName": "assets" })), &params);
        assert_eq!(
            object,
            Signal::with_payload("a", json!({ "collectionName": "assets", "params": { "workspaceId": "w1" } }))
        );

        let text = inject_params(&Signal::with_payload("log", json!("Left search!")), &params);
        assert_eq!(text, Signal::with_payload("log", json!("Left search!")));

        let null = inject_params(&Signal::with_payload("start", Value::Null), &params);
        assert_eq!(null, Signal::with_payload("start", json!({ "params": { "workspaceId": "w1" } })));

        let bare = inject_params(&Signal::from("plain"), &params);
        assert_eq!(bare, Signal::from("plain"));
    }

    #[test]
    fn first_route_defining_the_list_wins() {
        let table = RouteTable::new()
            .route("/:section", RouteSignals::new().leave("generic.leave"))
            .unwrap()
            .route("/about", RouteSignals::new().enter("about.enter").leave("about.leave"))
            .unwrap()
            .route("/:page", RouteSignals::new().enter("page.enter"))
            .unwrap();

        let enter = table.signals_for("/about", Transition::Enter).unwrap();
        assert_eq!(names(&enter), vec!["about.enter"]);

        let leave = table.signals_for("/about", Transition::Leave).unwrap();
        assert_eq!(names(&leave), vec!["generic.leave"]);

        let other = table.signals_for("/contact", Transition::Enter).unwrap();
        assert_eq!(names(&other), vec!["page.enter"]);

        assert!(table.signals_for("/a/b", Transition::Enter).is_none());
    }

    #[test]
    fn loads_toml_tables_in_declaration_order() {
        let table = RouteTable::from_toml_str(
            r#"
            [[routes]]
            path = "/:workspaceId/search"
            enter = [["console_log", { text = "Entered search!" }], ["subscribe_collection", { collectionName = "assets" }]]
            leave = [["console_log", "Left search!"]]

            [[routes]]
            path = "/"
            enter = ["home.enter"]
            "#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        let enter = table.signals_for("/w1/search", Transition::Enter).unwrap();
        let signals: Vec<Signal> = enter.into_iter().collect();
        assert_eq!(
            signals[1],
            Signal::with_payload(
                "subscribe_collection",
                json!({ "collectionName": "assets", "params": { "workspaceId": "w1" } })
            )
        );
        assert!(table.signals_for("/", Transition::Leave).is_none());
    }

    #[test]
    fn loads_json_tables_in_key_order() {
        let table = RouteTable::from_json_str(
            r#"{ "/:any": { "enter": ["first"] }, "/fixed": { "enter": ["second"] } }"#,
        )
        .unwrap();

        let enter = table.signals_for("/fixed", Transition::Enter).unwrap();
        assert_eq!(names(&enter), vec!["first"]);
    }

    #[test]
    fn rejects_malformed_tables() {
        assert!(matches!(
            RouteTable::from_json_str(r#"{ "/a": { "enter": [42] } }"#),
            Err(SynapseError::Json(_))
        ));
        assert!(matches!(
            RouteTable::from_json_str(r#"["/a"]"#),
            Err(SynapseError::Config(_))
        ));
        assert!(matches!(
            RouteTable::from_toml_str("[[routes]]\npath = \"no-slash\""),
            Err(SynapseError::InvalidRoutePattern { .. })
        ));
    }
}
