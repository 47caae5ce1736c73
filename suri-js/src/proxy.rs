//! The outbound call proxy, the only network-capable primitive visible
//! inside the sandbox
//!
//! The proxy is created for one run and discarded with it. It bridges the
//! synchronous script world to the async HTTP client through a runtime
//! handle; this is safe because scripts execute on a dedicated OS thread,
//! never on a runtime worker.

use std::cell::RefCell;
use std::sync::Arc;
use suri_http::HttpClient;
use tracing::debug;

thread_local! {
    /// Proxy for the run currently executing on this sandbox thread
    static ACTIVE_PROXY: RefCell<Option<CallProxy>> = const { RefCell::new(None) };
}

/// Per-run handle performing HTTP requests on a script's behalf.
///
/// Transport failures, non-success statuses, and malformed arguments all
/// collapse into `None`; the script's own null-checking convention decides
/// what happens next.
#[derive(Clone)]
pub struct CallProxy {
    client: Arc<dyn HttpClient>,
    handle: tokio::runtime::Handle,
    redactions: Vec<String>,
}

impl CallProxy {
    /// Create a proxy scoped to a single run. `redactions` carries the
    /// run's sensitive resolved values so no diagnostic line can echo them.
    pub fn new(
        client: Arc<dyn HttpClient>,
        handle: tokio::runtime::Handle,
        redactions: Vec<String>,
    ) -> Self {
        Self {
            client,
            handle,
            redactions,
        }
    }

    /// Perform one HTTP request. GET without a body, POST with one.
    pub fn call(&self, url: &str, header: Option<(&str, &str)>, body: Option<&str>) -> Option<String> {
        let result = self
            .handle
            .block_on(self.client.call_http(url, header, body));

        match result {
            Ok(response) if response.is_success() => Some(response.body),
            Ok(response) => {
                debug!("Outbound call answered with status {}", response.status);
                None
            }
            Err(e) => {
                debug!("Outbound call failed: {}", self.redact(&e.to_string()));
                None
            }
        }
    }

    fn redact(&self, message: &str) -> String {
        let mut redacted = message.to_string();
        for value in self.redactions.iter().filter(|v| !v.is_empty()) {
            redacted = redacted.replace(value.as_str(), suri_core::redact::REDACTED);
        }
        redacted
    }
}

/// Guard clearing the thread's active proxy when the run ends
pub(crate) struct ProxyGuard;

impl Drop for ProxyGuard {
    fn drop(&mut self) {
        ACTIVE_PROXY.with(|slot| *slot.borrow_mut() = None);
    }
}

/// Install the proxy for the run executing on this thread
pub(crate) fn install(proxy: CallProxy) -> ProxyGuard {
    ACTIVE_PROXY.with(|slot| *slot.borrow_mut() = Some(proxy));
    ProxyGuard
}

/// Run `f` against the thread's active proxy, if a run is in progress
pub(crate) fn with_active<F, T>(f: F) -> Option<T>
where
    F: FnOnce(&CallProxy) -> T,
{
    ACTIVE_PROXY.with(|slot| slot.borrow().as_ref().map(f))
}
