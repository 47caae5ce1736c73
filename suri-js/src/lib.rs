//! JavaScript execution sandbox for Suri widget scripts
//!
//! Scripts run in a Boa context with a deliberately minimal surface: the
//! resolved configuration variables, the previous payload, and the `call`
//! network primitive. Nothing else from the host environment is reachable.
//! Each run happens on a dedicated OS thread so the scheduler can abandon
//! it at the wall-clock budget.

pub mod bindings;
pub mod proxy;
pub mod sandbox;

pub use bindings::{CALL_BINDING, PREVIOUS_PAYLOAD_BINDING, RUN_FUNCTION};
pub use proxy::CallProxy;
pub use sandbox::Sandbox;
