//! Sensitive-value redaction for diagnostic output
//!
//! Failure messages can contain a resolved secret verbatim, e.g. when a
//! script interpolates a token into an error string. Every message that
//! reaches a log line or an operator surface passes through here first.

use crate::variables::ResolvedVariable;

/// Replacement marker for redacted values
pub const REDACTED: &str = "***";

/// Replace every occurrence of a sensitive resolved value with [`REDACTED`].
///
/// Empty values are skipped; replacing the empty string would corrupt the
/// message.
pub fn redact_sensitive(message: &str, variables: &[ResolvedVariable]) -> String {
    let mut redacted = message.to_string();
    for variable in variables.iter().filter(|v| v.sensitive && !v.value.is_empty()) {
        redacted = redacted.replace(&variable.value, REDACTED);
    }
    redacted
}
