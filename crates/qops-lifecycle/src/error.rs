//! Per-unit supervisor failures, collected and surfaced without aborting
//! the batch they occurred in.

use crate::state::ServiceState;

#[derive(Debug, Clone, thiserror::Error)]
pub enum LifecycleError {
    #[error("lifecycle {op} failed for unit {name}: {message}")]
    OperationFailed {
        name: String,
        op: &'static str,
        message: String,
    },
    #[error("unit {name} did not reach the active state within {deadline_secs}s")]
    DeadlineExceeded { name: String, deadline_secs: u64 },
    #[error("invalid service state transition for {name}: {from:?} -> {to:?}")]
    InvalidTransition {
        name: String,
        from: ServiceState,
        to: ServiceState,
    },
}
