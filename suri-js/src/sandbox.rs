//! Script execution sandbox
//!
//! Each run builds a fresh Boa context on a dedicated OS thread and awaits
//! its result under the configured wall-clock budget. A run that overruns
//! the budget is abandoned: the scheduling task stops listening, so nothing
//! the runaway thread eventually produces can be observed or stored. The
//! interpreter's loop and recursion limits bound how long an abandoned
//! thread can keep spinning.

use crate::bindings::{install_bindings, RUN_FUNCTION};
use crate::proxy::{self, CallProxy};
use boa_engine::{property::PropertyKey, Context as BoaContext, JsString, JsValue, Source};
use std::sync::Arc;
use suri_config::SandboxConfig;
use suri_core::{redact_sensitive, ExecutionContext, ExecutionResult, FailureKind};
use suri_http::HttpClient;
use tracing::{debug, warn};

/// Executes widget scripts with a restricted capability surface
pub struct Sandbox {
    config: SandboxConfig,
    http: Arc<dyn HttpClient>,
}

impl Sandbox {
    /// Create a sandbox sharing one HTTP client across runs
    pub fn new(config: SandboxConfig, http: Arc<dyn HttpClient>) -> Self {
        Self { config, http }
    }

    /// Execute one script body against its per-run context.
    ///
    /// Always resolves to exactly one [`ExecutionResult`]; script faults of
    /// every kind are caught at this boundary.
    pub async fn execute(&self, script: &str, execution: ExecutionContext) -> ExecutionResult {
        let budget = self.config.execution_budget;
        let (tx, rx) = tokio::sync::oneshot::channel();

        let proxy = CallProxy::new(
            self.http.clone(),
            tokio::runtime::Handle::current(),
            execution
                .sensitive_values()
                .iter()
                .map(|value| value.to_string())
                .collect(),
        );

        let script = script.to_string();
        let config = self.config.clone();
        let widget_id = execution.widget_id;

        let spawned = std::thread::Builder::new()
            .name(format!("suri-run-{}", widget_id))
            .spawn(move || {
                let result = run_script(&script, &execution, proxy, &config);
                // The receiver is gone if the run was abandoned; the result
                // is discarded with the thread.
                let _ = tx.send(result);
            });

        if let Err(e) = spawned {
            warn!("Failed to spawn sandbox thread for widget {}: {}", widget_id, e);
            return ExecutionResult::failure(
                FailureKind::ScriptFault,
                format!("failed to spawn sandbox thread: {}", e),
            );
        }

        match tokio::time::timeout(budget, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => ExecutionResult::failure(
                FailureKind::ScriptFault,
                "sandbox thread terminated before producing a result",
            ),
            Err(_) => {
                warn!(
                    "Widget {} exceeded its {:?} execution budget, abandoning run",
                    widget_id, budget
                );
                ExecutionResult::failure(
                    FailureKind::Timeout,
                    format!("execution exceeded its {:?} budget and was abandoned", budget),
                )
            }
        }
    }
}

/// Synchronous execution of one script on the sandbox thread
fn run_script(
    script: &str,
    execution: &ExecutionContext,
    proxy: CallProxy,
    config: &SandboxConfig,
) -> ExecutionResult {
    let mut context = BoaContext::default();
    context
        .runtime_limits_mut()
        .set_loop_iteration_limit(config.loop_iteration_limit);
    context
        .runtime_limits_mut()
        .set_recursion_limit(config.recursion_limit);

    // The proxy is visible to native callbacks for exactly this run
    let _guard = proxy::install(proxy);

    if let Err(e) = install_bindings(&mut context, execution) {
        return fault(execution, format!("failed to install bindings: {}", e));
    }

    debug!("Evaluating script for widget {}", execution.widget_id);
    if let Err(e) = context.eval(Source::from_bytes(script)) {
        return fault(execution, e.to_string());
    }

    let run_value = match context
        .global_object()
        .get(PropertyKey::from(JsString::from(RUN_FUNCTION)), &mut context)
    {
        Ok(value) => value,
        Err(e) => return fault(execution, e.to_string()),
    };

    let Some(run_fn) = run_value.as_callable() else {
        return fault(
            execution,
            format!("script does not define a {}() function", RUN_FUNCTION),
        );
    };

    match run_fn.call(&JsValue::undefined(), &[], &mut context) {
        Ok(value) => interpret_return(value, &mut context, execution),
        Err(e) => fault(execution, e.to_string()),
    }
}

/// Map the script's return value onto the result contract: `null`,
/// `undefined`, and the empty string signal no change; any other string
/// must be JSON text; everything else is invalid output.
fn interpret_return(
    value: JsValue,
    context: &mut BoaContext,
    execution: &ExecutionContext,
) -> ExecutionResult {
    if value.is_null_or_undefined() {
        return ExecutionResult::NoChange;
    }

    if !value.is_string() {
        return ExecutionResult::failure(
            FailureKind::InvalidOutput,
            format!("{}() must return a string or null", RUN_FUNCTION),
        );
    }

    let text = match value.to_string(context) {
        Ok(js_string) => js_string.to_std_string_escaped(),
        Err(e) => return fault(execution, e.to_string()),
    };

    if text.is_empty() {
        return ExecutionResult::NoChange;
    }

    match serde_json::from_str::<serde_json::Value>(&text) {
        // The payload is kept byte-exact as the script produced it
        Ok(_) => ExecutionResult::Success { payload: text },
        Err(e) => ExecutionResult::failure(
            FailureKind::InvalidOutput,
            redact_sensitive(
                &format!("{}() returned text that is not JSON: {}", RUN_FUNCTION, e),
                &execution.variables,
            ),
        ),
    }
}

fn fault(execution: &ExecutionContext, message: String) -> ExecutionResult {
    ExecutionResult::failure(
        FailureKind::ScriptFault,
        redact_sensitive(&message, &execution.variables),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::{Duration, Instant};
    use suri_core::{parse_declarations, resolve_variables, StaticGlobalConfig, WidgetId};
    use suri_http::{HttpManager, HttpMethod, HttpResponse};

    fn sandbox() -> Sandbox {
        Sandbox::new(SandboxConfig::default(), Arc::new(HttpManager::offline()))
    }

    fn context_for(script: &str, config: HashMap<String, String>, previous: &str) -> ExecutionContext {
        let declarations = parse_declarations(script).unwrap();
        let variables = resolve_variables(&declarations, &config, &StaticGlobalConfig::empty());
        ExecutionContext::new(WidgetId::new(), variables, previous.to_string())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_string_json_return_is_success() {
        let script = r#"function run() { return JSON.stringify({value: 42}); }"#;
        let result = sandbox().execute(script, context_for(script, HashMap::new(), "")).await;

        assert_eq!(
            result,
            ExecutionResult::Success {
                payload: "{\"value\":42}".to_string()
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_null_and_empty_return_are_no_change() {
        for script in [
            "function run() { return null; }",
            "function run() { }",
            "function run() { return \"\"; }",
        ] {
            let result = sandbox().execute(script, context_for(script, HashMap::new(), "")).await;
            assert_eq!(result, ExecutionResult::NoChange, "script: {}", script);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_non_json_string_is_invalid_output() {
        let script = r#"function run() { return "not json at all"; }"#;
        let result = sandbox().execute(script, context_for(script, HashMap::new(), "")).await;

        assert!(
            matches!(result, ExecutionResult::Failure { kind: FailureKind::InvalidOutput, .. })
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_non_string_return_is_invalid_output() {
        let script = "function run() { return 42; }";
        let result = sandbox().execute(script, context_for(script, HashMap::new(), "")).await;

        assert!(
            matches!(result, ExecutionResult::Failure { kind: FailureKind::InvalidOutput, .. })
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_uncaught_throw_is_script_fault() {
        let script = r#"function run() { throw new Error("boom"); }"#;
        let result = sandbox().execute(script, context_for(script, HashMap::new(), "")).await;

        match result {
            ExecutionResult::Failure { kind, message } => {
                assert_eq!(kind, FailureKind::ScriptFault);
                assert!(message.contains("boom"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_run_function_is_script_fault() {
        let script = "var x = 1;";
        let result = sandbox().execute(script, context_for(script, HashMap::new(), "")).await;

        assert!(matches!(
            result,
            ExecutionResult::Failure { kind: FailureKind::ScriptFault, .. }
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_syntax_error_is_script_fault() {
        let script = "function run( { return null; }";
        let result = sandbox().execute(script, context_for(script, HashMap::new(), "")).await;

        assert!(matches!(
            result,
            ExecutionResult::Failure { kind: FailureKind::ScriptFault, .. }
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_variables_and_previous_payload_are_bound() {
        let script = "\
// GREETING::Greeting::STRING::hello
function run() { return JSON.stringify({greeting: GREETING, previous: SURI_PREVIOUS}); }";
        let result = sandbox()
            .execute(script, context_for(script, HashMap::new(), "{\"old\":true}"))
            .await;

        assert_eq!(
            result,
            ExecutionResult::Success {
                payload: "{\"greeting\":\"hello\",\"previous\":\"{\\\"old\\\":true}\"}".to_string()
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_secret_never_appears_in_fault_message() {
        let script = "\
// TOKEN::Api token::SECRET::
function run() { throw new Error(\"auth failed for \" + TOKEN); }";
        let mut config = HashMap::new();
        config.insert("TOKEN".to_string(), "tok-sensitive-42".to_string());

        let result = sandbox().execute(script, context_for(script, config, "")).await;

        match result {
            ExecutionResult::Failure { kind, message } => {
                assert_eq!(kind, FailureKind::ScriptFault);
                assert!(!message.contains("tok-sensitive-42"), "leaked: {}", message);
                assert!(message.contains("***"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_call_binding_returns_mocked_body() {
        let mut manager = HttpManager::offline();
        manager.add_mock(
            HttpMethod::Get,
            "http://ci.local/status",
            HttpResponse {
                status: 200,
                body: "{\"green\":true}".to_string(),
            },
        );
        let sandbox = Sandbox::new(SandboxConfig::default(), Arc::new(manager));

        let script = r#"
function run() {
    var data = call("http://ci.local/status", null, null, null);
    if (data === null) {
        return null;
    }
    return data;
}"#;
        let result = sandbox.execute(script, context_for(script, HashMap::new(), "")).await;

        assert_eq!(
            result,
            ExecutionResult::Success {
                payload: "{\"green\":true}".to_string()
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_call_returns_null_to_script() {
        // No mock registered: every call fails at the transport layer
        let script = r#"
function run() {
    var data = call("http://nowhere.local/", null, null, null);
    return data === null ? null : data;
}"#;
        let result = sandbox().execute(script, context_for(script, HashMap::new(), "")).await;

        assert_eq!(result, ExecutionResult::NoChange);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_infinite_loop_resolves_to_timeout() {
        let config = SandboxConfig {
            execution_budget: Duration::from_millis(200),
            ..SandboxConfig::default()
        };
        let sandbox = Sandbox::new(config, Arc::new(HttpManager::offline()));

        let script = "function run() { while (true) {} }";
        let started = Instant::now();
        let result = sandbox.execute(script, context_for(script, HashMap::new(), "")).await;

        assert!(matches!(
            result,
            ExecutionResult::Failure { kind: FailureKind::Timeout, .. }
        ));
        // The scheduling task was released at the budget, not when the
        // interpreter's backstop eventually fired
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
