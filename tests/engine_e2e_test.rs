//! End-to-end engine tests: scheduling, store invariants, and the
//! publisher boundary, all without touching a network.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use suri_config::SuriConfig;
use suri_core::{ExecutionResult, WidgetId, WidgetInstance};
use suri_http::{HttpManager, HttpMethod, HttpResponse};
use suri_scheduler::{ChannelPublisher, LogPublisher, WidgetEngine};
use suri_store::{InMemoryResultStore, ResultStore};

fn engine_with(
    http: HttpManager,
) -> (
    Arc<WidgetEngine>,
    Arc<InMemoryResultStore>,
    tokio::sync::mpsc::UnboundedReceiver<(WidgetId, String)>,
) {
    let store = Arc::new(InMemoryResultStore::new());
    let (publisher, updates) = ChannelPublisher::new();
    let engine = Arc::new(WidgetEngine::new(
        &SuriConfig::default(),
        Arc::new(http),
        store.clone(),
        Arc::new(publisher),
    ));
    (engine, store, updates)
}

/// Wait for the registration tick's payload to land in the store
async fn wait_first_payload(store: &InMemoryResultStore, id: &WidgetId) -> String {
    for _ in 0..250 {
        if let Some(payload) = store.get(id).await {
            return payload;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("widget {} never produced a first payload", id);
}

/// Tick manually, waiting out any run still holding the instance's claim
async fn run_exclusive(engine: &WidgetEngine, id: WidgetId) -> ExecutionResult {
    for _ in 0..250 {
        match engine.run_once(id).await {
            Ok(result) => return result,
            Err(suri_scheduler::EngineError::AlreadyRunning(_)) => {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Err(e) => panic!("unexpected engine error: {}", e),
        }
    }
    panic!("widget {} stayed busy", id);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scheduled_widget_ticks_repeatedly() {
    let (engine, _store, mut updates) = engine_with(HttpManager::offline());

    let script = r#"
function run() {
    if (SURI_PREVIOUS === "") {
        return "1";
    }
    return String(Number(JSON.parse(SURI_PREVIOUS)) + 1);
}"#;
    let instance = WidgetInstance::new("counter", script, Duration::from_millis(100));
    let id = engine.register(instance).unwrap();

    // The publisher must see a strictly increasing counter, one payload per
    // completed tick, in completion order.
    let mut seen = Vec::new();
    while seen.len() < 3 {
        let (update_id, payload) = tokio::time::timeout(Duration::from_secs(5), updates.recv())
            .await
            .expect("timed out waiting for published payloads")
            .expect("publisher channel closed");
        assert_eq!(update_id, id);
        seen.push(payload);
    }

    assert_eq!(seen, vec!["1", "2", "3"]);
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_integer_config_counter_scenario() {
    // Header declares COUNT with default 0; the instance configures it to 5.
    let script = "\
// COUNT::Count::INTEGER::0
function run() {
    if (SURI_PREVIOUS === \"\") {
        return String(Number(COUNT));
    }
    return String(Number(JSON.parse(SURI_PREVIOUS)) + 1);
}";

    let (engine, store, _updates) = engine_with(HttpManager::offline());

    // With the configured value, the counter starts at 5
    let mut config = HashMap::new();
    config.insert("COUNT".to_string(), "5".to_string());
    let configured =
        WidgetInstance::new("configured", script, Duration::from_secs(3600)).with_config(config);
    let id = engine.register(configured).unwrap();

    assert_eq!(wait_first_payload(&store, &id).await, "5");
    let second = run_exclusive(&engine, id).await;
    assert_eq!(
        second,
        ExecutionResult::Success {
            payload: "6".to_string()
        }
    );

    // Without configuration, the declared default applies
    let defaulted = WidgetInstance::new("defaulted", script, Duration::from_secs(3600));
    let default_id = engine.register(defaulted).unwrap();

    assert_eq!(wait_first_payload(&store, &default_id).await, "0");
    let second = run_exclusive(&engine, default_id).await;
    assert_eq!(
        second,
        ExecutionResult::Success {
            payload: "1".to_string()
        }
    );

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_previous_payload_round_trip_through_engine() {
    let (engine, store, _updates) = engine_with(HttpManager::offline());

    // Echoes the previous payload back as its own output
    let script = r#"
function run() {
    if (SURI_PREVIOUS === "") {
        return "{\"items\": [\"a\", \"b\"], \"total\": 2}";
    }
    return SURI_PREVIOUS;
}"#;
    let instance = WidgetInstance::new("echo", script, Duration::from_secs(3600));
    let id = engine.register(instance).unwrap();

    let first = wait_first_payload(&store, &id).await;
    let parsed: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(parsed["total"], 2);

    // The second run's SURI_PREVIOUS is exactly the first run's output
    let second = run_exclusive(&engine, id).await;
    assert_eq!(
        second,
        ExecutionResult::Success {
            payload: first.clone()
        }
    );
    assert_eq!(store.get(&id).await, Some(first));

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_widget_fetches_through_call_proxy() {
    let mut http = HttpManager::offline();
    http.add_mock(
        HttpMethod::Get,
        "http://build.internal/api/status",
        HttpResponse {
            status: 200,
            body: "{\"failed\": 0, \"passing\": 12}".to_string(),
        },
    );

    let (engine, store, _updates) = engine_with(http);

    let script = "\
// STATUS_URL::Status endpoint::STRING::http://build.internal/api/status
function run() {
    var body = call(STATUS_URL, null, null, null);
    if (body === null) {
        return null;
    }
    var status = JSON.parse(body);
    return JSON.stringify({ok: status.failed === 0});
}";
    let instance = WidgetInstance::new("build-status", script, Duration::from_secs(3600));
    let id = engine.register(instance).unwrap();

    assert_eq!(wait_first_payload(&store, &id).await, "{\"ok\":true}");

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failing_widget_keeps_last_published_payload() {
    let (engine, store, _updates) = engine_with(HttpManager::offline());

    // Succeeds once, then every later tick faults
    let script = r#"
function run() {
    if (SURI_PREVIOUS === "") {
        return "{\"healthy\": true}";
    }
    throw new Error("upstream went away");
}"#;
    let instance = WidgetInstance::new("flaky", script, Duration::from_secs(3600));
    let id = engine.register(instance).unwrap();

    assert_eq!(wait_first_payload(&store, &id).await, "{\"healthy\": true}");

    for _ in 0..3 {
        let result = run_exclusive(&engine, id).await;
        assert!(result.is_failure());
        // Stale-but-valid: the last success remains visible
        assert_eq!(store.get(&id).await.as_deref(), Some("{\"healthy\": true}"));
    }

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_publisher_sees_only_successes() {
    let (engine, store, mut updates) = engine_with(HttpManager::offline());

    let script = r#"
function run() {
    if (SURI_PREVIOUS === "") {
        return "\"only-payload\"";
    }
    return null;
}"#;
    let instance = WidgetInstance::new("one-shot", script, Duration::from_secs(3600));
    let id = engine.register(instance).unwrap();

    assert_eq!(wait_first_payload(&store, &id).await, "\"only-payload\"");

    // NoChange ticks must not publish
    for _ in 0..3 {
        assert_eq!(run_exclusive(&engine, id).await, ExecutionResult::NoChange);
    }

    let (_, payload) = updates.recv().await.unwrap();
    assert_eq!(payload, "\"only-payload\"");
    assert!(updates.try_recv().is_err());

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_independent_instances_do_not_share_state() {
    let (engine, store, _updates) = engine_with(HttpManager::offline());

    let script = "\
// SEED::Seed::STRING::x
function run() {
    if (SURI_PREVIOUS === \"\") {
        return JSON.stringify(SEED);
    }
    return JSON.stringify(JSON.parse(SURI_PREVIOUS) + SEED);
}";

    let mut config_a = HashMap::new();
    config_a.insert("SEED".to_string(), "a".to_string());
    let mut config_b = HashMap::new();
    config_b.insert("SEED".to_string(), "b".to_string());

    let a = engine
        .register(WidgetInstance::new("a", script, Duration::from_secs(3600)).with_config(config_a))
        .unwrap();
    let b = engine
        .register(WidgetInstance::new("b", script, Duration::from_secs(3600)).with_config(config_b))
        .unwrap();

    assert_eq!(wait_first_payload(&store, &a).await, "\"a\"");
    assert_eq!(wait_first_payload(&store, &b).await, "\"b\"");

    run_exclusive(&engine, a).await;
    run_exclusive(&engine, a).await;
    run_exclusive(&engine, b).await;

    assert_eq!(store.get(&a).await.as_deref(), Some("\"aaa\""));
    assert_eq!(store.get(&b).await.as_deref(), Some("\"bb\""));

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_log_publisher_engine_smoke() {
    // Same wiring the CLI uses when payload streaming is not needed
    let store = Arc::new(InMemoryResultStore::new());
    let engine = WidgetEngine::new(
        &SuriConfig::default(),
        Arc::new(HttpManager::offline()),
        store.clone(),
        Arc::new(LogPublisher::new()),
    );

    let script = r#"function run() { return "[1, 2, 3]"; }"#;
    let id = engine
        .register(WidgetInstance::new("smoke", script, Duration::from_secs(3600)))
        .unwrap();

    assert_eq!(wait_first_payload(&store, &id).await, "[1, 2, 3]");

    engine.shutdown().await;
}
