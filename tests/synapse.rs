use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use synapse::storage::KeyValueStore;
use synapse::{
    Config, Location, MemoryHistory, RouteSignals, RouteTable, Signal, SignalProcessor, StateMap, Synapse,
    SynapseError,
};
use tempfile::TempDir;

fn object(value: Value) -> StateMap {
    value.as_object().cloned().unwrap_or_default()
}

fn app_processor(log: Rc<RefCell<Vec<Value>>>) -> SignalProcessor<StateMap> {
    SignalProcessor::<StateMap>::new()
        .on("INCREMENT", |state, _, _| {
            let count = state.get().get("count").and_then(Value::as_i64).unwrap_or(0);
            state.merge(object(json!({ "count": count + 1 })));
            Ok(())
        })
        .on("RESET", |state, _, _| {
            state.merge(object(json!({ "count": 0 })));
            Ok(())
        })
        .on("nav.to", |state, signal, _| {
            let path = signal
                .field("path")
                .cloned()
                .ok_or_else(|| SynapseError::handler("nav.to needs a path"))?;
            state.merge(object(json!({ "path": path })));
            Ok(())
        })
        .on("search.set", |state, signal, _| {
            state.merge(object(json!({ "search": { "q": signal.payload_or_null() } })));
            Ok(())
        })
        .on("sys.log", move |_, signal, _| {
            log.borrow_mut().push(signal.payload_or_null().clone());
            Ok(())
        })
}

fn path_of(state: &StateMap) -> Option<String> {
    state.get("path").and_then(Value::as_str).map(String::from)
}

#[test]
fn counter_increments_and_resets() {
    let synapse = Synapse::builder()
        .initializer(|_| object(json!({ "count": 0 })))
        .signal_processor(app_processor(Rc::default()))
        .build();

    synapse.emit("INCREMENT").unwrap();
    assert_eq!(synapse.get()["count"], json!(1));
    synapse.emit("INCREMENT").unwrap();
    assert_eq!(synapse.get()["count"], json!(2));

    let reset = Signal::from_value(&json!(["RESET", null])).unwrap();
    synapse.emit(reset).unwrap();
    assert_eq!(synapse.get()["count"], json!(0));
}

#[test]
fn handler_errors_propagate_to_the_emitter() {
    let synapse = Synapse::builder()
        .initializer(|_| object(json!({ "count": 0 })))
        .signal_processor(app_processor(Rc::default()))
        .build();

    let result = synapse.emit(vec![Signal::from("INCREMENT"), Signal::from("nav.to"), Signal::from("INCREMENT")]);

    assert!(matches!(result, Err(SynapseError::Handler(_))));
    assert_eq!(synapse.get()["count"], json!(1));
}

#[test]
fn route_signals_fire_once_per_transition_with_params() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let routes = RouteTable::from_toml_str(
        r#"
        [[routes]]
        path = "/:workspaceId/search"
        enter = [["sys.log", { text = "entered search" }]]
        leave = [["sys.log", "left search"]]

        [[routes]]
        path = "/"
        enter = [["sys.log", { text = "home" }]]
        "#,
    )
    .unwrap();

    let synapse = Synapse::builder()
        .initializer(|_| object(json!({ "path": "/" })))
        .signal_processor(app_processor(Rc::clone(&log)))
        .route_signals(routes)
        .path_selector(path_of)
        .build();

    assert!(log.borrow().is_empty());
    assert_eq!(synapse.run_pending().unwrap(), 1);

    synapse.emit(Signal::with_payload("nav.to", json!({ "path": "/w1/search" }))).unwrap();
    synapse.emit(Signal::with_payload("nav.to", json!({ "path": "/w1/search" }))).unwrap();
    synapse.emit("INCREMENT").unwrap();
    synapse.emit(Signal::with_payload("nav.to", json!({ "path": "/" }))).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            json!({ "text": "home", "params": {} }),
            json!({ "text": "entered search", "params": { "workspaceId": "w1" } }),
            json!("left search"),
            json!({ "text": "home", "params": {} }),
        ]
    );
    assert_eq!(
        synapse.route_engine().and_then(|engine| engine.current_path()).as_deref(),
        Some("/")
    );
}

#[test]
fn location_driven_routes_follow_back_navigation() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let history = Rc::new(MemoryHistory::new("/profile"));
    let routes = RouteTable::new()
        .route(
            "/profile",
            RouteSignals::new()
                .enter(Signal::with_payload("sys.log", json!("profile on")))
                .leave(Signal::with_payload("sys.log", json!("profile off"))),
        )
        .unwrap();

    let synapse = Synapse::builder()
        .initializer(|_| object(json!({ "count": 0 })))
        .signal_processor(app_processor(Rc::clone(&log)))
        .route_signals(routes)
        .location(Rc::clone(&history) as Rc<dyn Location>)
        .build();
    synapse.run_pending().unwrap();

    history.push("/settings");
    synapse.route_engine().unwrap().check().unwrap();
    history.back();

    assert_eq!(*log.borrow(), vec![json!("profile on"), json!("profile off"), json!("profile on")]);
}

#[test]
fn persisted_fields_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let config = Config::from_toml_str(&format!(
        "storage_file = {:?}\nlocal_storage_fields = [\"count\", \"prefs.theme\"]",
        dir.path().join("state.json").display().to_string()
    ))
    .unwrap();

    {
        let store = config.open_file_store().unwrap().unwrap();
        let synapse = Synapse::builder()
            .initializer(|_| object(json!({ "count": 0, "prefs": { "theme": "dark" } })))
            .signal_processor(app_processor(Rc::default()))
            .sync_local_storage(store, &config.local_storage_fields)
            .build();
        synapse.emit(vec![Signal::from("INCREMENT"), Signal::from("INCREMENT")]).unwrap();
        synapse.shutdown();
    }

    let store = Rc::new(config.open_file_store().unwrap().unwrap());
    assert_eq!(store.get("prefs__theme").unwrap().as_deref(), Some("\"dark\""));

    let restored = Synapse::builder()
        .initializer(|_| object(json!({ "count": 0 })))
        .signal_processor(app_processor(Rc::default()))
        .sync_local_storage(Rc::clone(&store), &config.local_storage_fields)
        .build();
    assert_eq!(restored.get()["count"], json!(2));
    assert_eq!(restored.get()["prefs"], json!({ "theme": "dark" }));

    restored.state().merge(object(json!({ "count": null })));
    assert_eq!(store.get("count").unwrap(), None);
}

#[test]
fn search_params_mirror_state_without_new_history_entries() {
    let history = Rc::new(MemoryHistory::new("/search?search__q=42&utm=mail"));
    let synapse = Synapse::builder()
        .signal_processor(app_processor(Rc::default()))
        .sync_search_params(Rc::clone(&history), &["search.q"])
        .build();

    assert_eq!(synapse.get()["search"], json!({ "q": "42" }));
    synapse.emit(Signal::with_payload("search.set", json!("rust lang"))).unwrap();
    assert_eq!(history.url(), "/search?search__q=rust+lang&utm=mail");

    synapse.emit(Signal::with_payload("search.set", json!("null"))).unwrap();
    assert_eq!(history.url(), "/search?search__q=null&utm=mail");
    assert_eq!(history.len(), 1);
}

#[test]
fn misspelled_route_signals_fail_the_navigating_emit() {
    let routes = RouteTable::new().route("/a", RouteSignals::new().enter("typo.signal")).unwrap();
    let synapse = Synapse::builder()
        .initializer(|_| object(json!({ "path": "/" })))
        .signal_processor(app_processor(Rc::default()))
        .route_signals(routes)
        .path_selector(path_of)
        .build();
    synapse.run_pending().unwrap();

    let result = synapse.emit(Signal::with_payload("nav.to", json!({ "path": "/a" })));

    assert!(matches!(result, Err(SynapseError::UnknownSignalType(name)) if name == "typo.signal"));
}

#[test]
fn shutdown_stops_routes_and_listeners() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let routes = RouteTable::from_json_str(r#"{ "/a": { "enter": [["sys.log", "a"]] } }"#).unwrap();
    let synapse = Synapse::builder()
        .initializer(|_| object(json!({ "path": "/" })))
        .signal_processor(app_processor(Rc::clone(&log)))
        .route_signals(routes)
        .path_selector(path_of)
        .build();
    synapse.run_pending().unwrap();

    synapse.shutdown();
    synapse.state().merge(object(json!({ "path": "/a" })));

    assert!(log.borrow().is_empty());
    assert_eq!(synapse.state().listener_count(), 0);
    assert!(synapse.emit("INCREMENT").is_ok());
    assert_eq!(synapse.scheduler().pending(), 0);
}

#[test]
fn dev_tools_follow_config() {
    let mut map = std::collections::BTreeMap::new();
    map.insert("enable_dev_tools".to_string(), "true".to_string());
    let config = Config::from_map(&map);

    let synapse = Synapse::builder()
        .initializer(|_| object(json!({ "count": 0 })))
        .signal_processor(app_processor(Rc::default()))
        .config(&config)
        .build();

    let tools = synapse.dev_tools().unwrap();
    tools.emit_json(r#"["INCREMENT", "INCREMENT"]"#).unwrap();
    let snapshot: Value = serde_json::from_str(&tools.snapshot_json().unwrap()).unwrap();
    assert_eq!(snapshot, json!({ "count": 2 }));

    tools.emit_json(r#"[["RESET", null]]"#).unwrap();
    assert_eq!(tools.state()["count"], json!(0));
    assert!(matches!(
        tools.emit_json(r#"["RESET", null]"#),
        Err(SynapseError::InvalidSignalShape(_))
    ));
}
