//! Composition entry point.
//!
//! [`Synapse::builder`] folds state initializers into the starting snapshot,
//! installs the signal processor on the bus, attaches listeners and, when a route
//! table is configured, starts the [`RouteEngine`]. The resulting instance is the
//! only handle an application needs: it is passed by reference to UI bindings
//! instead of living in a module-level singleton.
//!
//! # Example
//!
//! ```rust
//! use serde_json::{json, Map, Value};
//! use synapse::{SignalProcessor, Synapse};
//!
//! type AppState = Map<String, Value>;
//!
//! let processor = SignalProcessor::<AppState>::new()
//!     .on("INCREMENT", |state, _, _| {
//!         let count = state.get().get("count").and_then(Value::as_i64).unwrap_or(0);
//!         let mut partial = Map::new();
//!         partial.insert("count".into(), json!(count + 1));
//!         state.merge(partial);
//!         Ok(())
//!     });
//!
//! let synapse = Synapse::builder()
//!     .initializer(|_| {
//!         let mut initial = Map::new();
//!         initial.insert("count".into(), json!(0));
//!         initial
//!     })
//!     .signal_processor(processor)
//!     .build();
//!
//! synapse.emit("INCREMENT")?;
//! assert_eq!(synapse.get()["count"], json!(1));
//! # Ok::<(), synapse::SynapseError>(())
//! ```

use crate::app::bus::{SignalBatch, SignalBus};
use crate::app::processor::SignalProcessor;
use crate::app::scheduler::Scheduler;
use crate::app::selectors::Selectors;
use crate::app::state::{Merge, State, Unsubscribe};
use crate::app::subscriptions::Subscriptions;
use crate::devtools::DevTools;
use crate::domain::error::Result;
use crate::domain::signal::Signals;
use crate::routing::engine::{PathSource, RouteEngine};
use crate::routing::location::Location;
use crate::routing::table::RouteTable;
use crate::storage::backend::KeyValueStore;
use crate::storage::local::LocalStorageSync;
use crate::storage::search_params::SearchParamSync;
use crate::{Config, StateMap};
use std::fmt;
use std::rc::Rc;

type Initializer<S> = Box<dyn FnOnce(&S) -> <S as Merge>::Partial>;
type Listener<S> = Box<dyn Fn(&S)>;

/// Collects the parts of a [`Synapse`] before wiring them together.
pub struct SynapseBuilder<S: Merge, E = ()> {
    initializers: Vec<Initializer<S>>,
    processor: Option<SignalProcessor<S, E>>,
    listeners: Vec<Listener<S>>,
    routes: Option<RouteTable>,
    path_source: Option<PathSource<S>>,
    scheduler: Scheduler,
    subscriptions: Subscriptions,
    selectors: Selectors<S>,
    dev_tools: bool,
}

impl<S: Merge, E> fmt::Debug for SynapseBuilder<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynapseBuilder")
            .field("initializers", &self.initializers.len())
            .field("processor", &self.processor)
            .field("listeners", &self.listeners.len())
            .field("routes", &self.routes.as_ref().map(RouteTable::len))
            .field("path_source", &self.path_source)
            .field("dev_tools", &self.dev_tools)
            .finish_non_exhaustive()
    }
}

impl<S: Merge + Default + 'static, E: 'static> SynapseBuilder<S, E> {
    fn new() -> Self {
        Self {
            initializers: Vec::new(),
            processor: None,
            listeners: Vec::new(),
            routes: None,
            path_source: None,
            scheduler: Scheduler::new(),
            subscriptions: Subscriptions::new(),
            selectors: Selectors::new(),
            dev_tools: false,
        }
    }

    /// Appends a state initializer.
    ///
    /// Initializers run left to right, each receiving the state accumulated so
    /// far (starting from `S::default()`); the partial state it returns is merged
    /// in, so later initializers win.
    #[must_use]
    pub fn initializer(mut self, initializer: impl FnOnce(&S) -> S::Partial + 'static) -> Self {
        self.initializers.push(Box::new(initializer));
        self
    }

    /// Sets the signal processor installed on the bus.
    #[must_use]
    pub fn signal_processor(mut self, processor: SignalProcessor<S, E>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Appends a state-change listener, called with the current state.
    #[must_use]
    pub fn listener(mut self, listener: impl Fn(&S) + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Sets the route signal table.
    #[must_use]
    pub fn route_signals(mut self, routes: RouteTable) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Reads the current path from state; preferred over [`location`](Self::location).
    #[must_use]
    pub fn path_selector(mut self, selector: impl Fn(&S) -> Option<String> + 'static) -> Self {
        self.path_source = Some(PathSource::selector(selector));
        self
    }

    /// Reads the current path from the host location.
    ///
    /// Ignored if a path selector is also configured.
    #[must_use]
    pub fn location(mut self, location: Rc<dyn Location>) -> Self {
        if self.path_source.is_none() {
            self.path_source = Some(PathSource::Location(location));
        }
        self
    }

    /// Uses `scheduler` for deferred work instead of a private queue.
    #[must_use]
    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Uses a registry that signal handlers already captured.
    #[must_use]
    pub fn subscriptions(mut self, subscriptions: Subscriptions) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    /// Sets the named selector registry.
    #[must_use]
    pub fn selectors(mut self, selectors: Selectors<S>) -> Self {
        self.selectors = selectors;
        self
    }

    /// Enables the [`DevTools`] inspection handle.
    #[must_use]
    pub fn dev_tools(mut self, enabled: bool) -> Self {
        self.dev_tools = enabled;
        self
    }

    /// Applies runtime options from `config`.
    #[must_use]
    pub fn config(self, config: &Config) -> Self {
        self.dev_tools(config.enable_dev_tools)
    }

    /// Wires everything together.
    ///
    /// Without a signal processor the bus has no handler and emitted signals are
    /// dropped with a warning. A route table without a path source is ignored with
    /// a warning.
    #[must_use]
    pub fn build(self) -> Synapse<S, E> {
        let _span = tracing::debug_span!(
            "build_synapse",
            initializers = self.initializers.len(),
            listeners = self.listeners.len()
        )
        .entered();

        let mut initial = S::default();
        for initializer in self.initializers {
            let partial = initializer(&initial);
            initial.merge(partial);
        }

        let state = State::new(initial);
        let bus = Rc::new(SignalBus::new());

        if let Some(processor) = self.processor {
            let handler_state = state.clone();
            bus.set_handler(move |signal, event| processor.process(&handler_state, signal, event));
        } else {
            tracing::warn!("no signal processor configured, emitted signals will be dropped");
        }

        let listener_handles: Vec<Unsubscribe> = self
            .listeners
            .into_iter()
            .map(|listener| state.subscribe(listener))
            .collect();

        let route_engine = match (self.routes, self.path_source) {
            (Some(routes), Some(source)) => Some(RouteEngine::start(
                routes,
                Rc::clone(&bus),
                state.clone(),
                source,
                &self.scheduler,
            )),
            (Some(_), None) => {
                tracing::warn!("route table configured without a path selector or location, ignoring");
                None
            }
            (None, _) => None,
        };

        let dev_tools = self.dev_tools.then(|| {
            tracing::info!("dev tools enabled");
            DevTools::new(state.clone(), Rc::clone(&bus), self.selectors.clone())
        });

        tracing::debug!(has_routes = route_engine.is_some(), "synapse built");

        Synapse {
            state,
            bus,
            scheduler: self.scheduler,
            subscriptions: self.subscriptions,
            selectors: self.selectors,
            route_engine,
            listener_handles,
            dev_tools,
        }
    }
}

impl<E: 'static> SynapseBuilder<StateMap, E> {
    /// Loads `fields` from `store` at startup and writes them back on every
    /// state change.
    ///
    /// Write failures are logged; they do not fail the mutation that caused them.
    #[must_use]
    pub fn sync_local_storage<K: KeyValueStore + 'static>(self, store: K, fields: &[impl AsRef<str>]) -> Self {
        let fields: Rc<[String]> = fields.iter().map(|f| f.as_ref().to_string()).collect();
        let sync = Rc::new(LocalStorageSync::new(store));

        let loader = Rc::clone(&sync);
        let load_fields = Rc::clone(&fields);
        self.initializer(move |_| loader.load(&load_fields[..]))
            .listener(move |state| {
                if let Err(e) = sync.update(state, &fields[..]) {
                    tracing::error!(error = %e, "failed to persist state fields");
                }
            })
    }

    /// Loads `fields` from the query string at startup and rewrites it on every
    /// state change. Loaded values are strings.
    #[must_use]
    pub fn sync_search_params<L: Location + ?Sized + 'static>(
        self,
        location: Rc<L>,
        fields: &[impl AsRef<str>],
    ) -> Self {
        let fields: Rc<[String]> = fields.iter().map(|f| f.as_ref().to_string()).collect();
        let sync = SearchParamSync::new(location);

        let loader = sync.clone();
        let load_fields = Rc::clone(&fields);
        self.initializer(move |_| loader.load(&load_fields[..]))
            .listener(move |state| sync.update(state, &fields[..]))
    }
}

/// A wired state container, signal bus and optional route engine.
pub struct Synapse<S, E = ()> {
    state: State<S>,
    bus: Rc<SignalBus<E>>,
    scheduler: Scheduler,
    subscriptions: Subscriptions,
    selectors: Selectors<S>,
    route_engine: Option<RouteEngine<S, E>>,
    listener_handles: Vec<Unsubscribe>,
    dev_tools: Option<DevTools<S, E>>,
}

impl<S: fmt::Debug, E> fmt::Debug for Synapse<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synapse")
            .field("state", &self.state)
            .field("bus", &self.bus)
            .field("scheduler", &self.scheduler)
            .field("subscriptions", &self.subscriptions)
            .field("selectors", &self.selectors)
            .field("route_engine", &self.route_engine)
            .field("listeners", &self.listener_handles.len())
            .field("dev_tools", &self.dev_tools.is_some())
            .finish()
    }
}

impl<S: Merge + Default + 'static, E: 'static> Synapse<S, E> {
    /// Starts building an instance.
    #[must_use]
    pub fn builder() -> SynapseBuilder<S, E> {
        SynapseBuilder::new()
    }
}

impl<S: Merge + 'static, E: 'static> Synapse<S, E> {
    /// Dispatches one signal or a batch, without an originating event.
    ///
    /// # Errors
    ///
    /// Returns the first handler error; remaining signals are not dispatched.
    /// Route signal errors raised by a navigation the batch caused are returned
    /// here too.
    pub fn emit(&self, signals: impl Into<Signals>) -> Result<()> {
        self.dispatch(SignalBatch::new(signals))
    }

    /// Dispatches one signal or a batch on behalf of a UI event.
    ///
    /// # Errors
    ///
    /// Returns the first handler error; remaining signals are not dispatched.
    pub fn emit_with_event(&self, signals: impl Into<Signals>, event: &E) -> Result<()> {
        self.dispatch(SignalBatch::new(signals).with_event(event))
    }

    fn dispatch(&self, batch: SignalBatch<'_, E>) -> Result<()> {
        let _span = tracing::debug_span!(
            "emit",
            signals = batch.signals.len(),
            has_event = batch.event.is_some()
        )
        .entered();
        let Some(engine) = &self.route_engine else {
            return self.bus.dispatch(batch);
        };
        if let Some(stale) = engine.take_error() {
            tracing::debug!(error = %stale, "dropping route error from an earlier state change");
        }
        let result = self.bus.dispatch(batch);
        let route_error = engine.take_error();
        result?;
        route_error.map_or(Ok(()), Err)
    }

    /// The state container.
    #[must_use]
    pub fn state(&self) -> &State<S> {
        &self.state
    }

    /// The latest state snapshot.
    #[must_use]
    pub fn get(&self) -> Rc<S> {
        self.state.get()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self, listener: impl Fn(&S) + 'static) -> Unsubscribe {
        self.state.subscribe(listener)
    }

    /// The named selector registry.
    #[must_use]
    pub fn selectors(&self) -> &Selectors<S> {
        &self.selectors
    }

    /// Evaluates a named selector against the current state.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::SelectorNotFound`](crate::SynapseError::SelectorNotFound)
    /// for unknown names.
    pub fn select(&self, name: &str) -> Result<serde_json::Value> {
        self.selectors.select(name, &self.state.get())
    }

    /// The deferred-work queue.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Runs deferred work, such as the initial route enter.
    ///
    /// # Errors
    ///
    /// Returns the first failing task's error.
    pub fn run_pending(&self) -> Result<usize> {
        self.scheduler.run_pending()
    }

    /// The long-running side effect registry.
    #[must_use]
    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    /// The route engine, if routes were configured.
    #[must_use]
    pub fn route_engine(&self) -> Option<&RouteEngine<S, E>> {
        self.route_engine.as_ref()
    }

    /// The inspection handle, if dev tools were enabled.
    #[must_use]
    pub fn dev_tools(&self) -> Option<&DevTools<S, E>> {
        self.dev_tools.as_ref()
    }

    /// Tears the instance down.
    ///
    /// Stops the route engine, drops pending deferred work, cancels registered
    /// subscriptions, removes every state listener and uninstalls the bus
    /// handler. Later emits are dropped with a warning.
    pub fn shutdown(&self) {
        let _span = tracing::debug_span!("shutdown").entered();

        if let Some(engine) = &self.route_engine {
            engine.stop();
        }
        self.scheduler.clear();
        self.subscriptions.stop_all();
        for handle in &self.listener_handles {
            handle.unsubscribe();
        }
        self.state.clear_listeners();
        self.bus.clear_handler();

        tracing::debug!("synapse shut down");
    }
}
