//! Global bindings installed into a script's Boa context
//!
//! Exactly three things are visible to a script: its resolved variables,
//! the previous payload, and the `call` function. All of them are installed
//! here; nothing else is registered.

use crate::proxy;
use boa_engine::property::Attribute;
use boa_engine::{Context, JsNativeError, JsResult, JsString, JsValue, NativeFunction};
use suri_core::ExecutionContext;
use tracing::trace;

/// Binding carrying the last successful payload into the script
pub const PREVIOUS_PAYLOAD_BINDING: &str = "SURI_PREVIOUS";

/// Name of the network capability function
pub const CALL_BINDING: &str = "call";

/// The single entry point a script must define
pub const RUN_FUNCTION: &str = "run";

/// Install the resolved variables, the previous payload, and the call
/// capability as global bindings.
pub fn install_bindings(context: &mut Context, execution: &ExecutionContext) -> JsResult<()> {
    for variable in &execution.variables {
        trace!("Binding variable {}", variable.name);
        context.register_global_property(
            JsString::from(variable.name.as_str()),
            JsString::from(variable.value.as_str()),
            Attribute::all(),
        )?;
    }

    context.register_global_property(
        JsString::from(PREVIOUS_PAYLOAD_BINDING),
        JsString::from(execution.previous_payload.as_str()),
        Attribute::all(),
    )?;

    context.register_global_callable(
        JsString::from(CALL_BINDING),
        4,
        NativeFunction::from_fn_ptr(call_native),
    )?;

    Ok(())
}

/// Native implementation behind the script-visible `call` function.
///
/// Signature inside the script: `call(url, headerName, headerValue, body)`.
/// Returns the response body text or `null`; it never throws for transport
/// problems, only for a non-string URL.
fn call_native(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let url = match args.first() {
        Some(value) if value.is_string() => value.to_string(context)?.to_std_string_escaped(),
        _ => {
            return Err(JsNativeError::typ()
                .with_message("call: url must be a string")
                .into())
        }
    };

    let header_name = optional_string(args.get(1), context)?;
    let header_value = optional_string(args.get(2), context)?;
    let body = optional_string(args.get(3), context)?;

    let header = match (header_name.as_deref(), header_value.as_deref()) {
        (Some(name), Some(value)) => Some((name, value)),
        _ => None,
    };

    let outcome = proxy::with_active(|active| active.call(&url, header, body.as_deref()));

    match outcome.flatten() {
        Some(response_body) => Ok(JsValue::from(JsString::from(response_body))),
        None => Ok(JsValue::null()),
    }
}

/// `null` and `undefined` mean "not given"; anything else is coerced to a
/// string the way scripts expect.
fn optional_string(arg: Option<&JsValue>, context: &mut Context) -> JsResult<Option<String>> {
    match arg {
        None => Ok(None),
        Some(value) if value.is_null_or_undefined() => Ok(None),
        Some(value) => Ok(Some(value.to_string(context)?.to_std_string_escaped())),
    }
}
