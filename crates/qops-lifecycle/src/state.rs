//! Per-service state machine the lifecycle manager drives after an
//! artifact change.

use crate::error::LifecycleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    Absent,
    Loaded,
    Started,
    Active,
    Failed,
}

/// Explicit match arms per legal edge, `false` otherwise. Any state may
/// fall back to `Failed`, and `Failed` recovers through `Loaded` after a
/// reload.
pub fn is_transition_allowed(from: ServiceState, to: ServiceState) -> bool {
    use ServiceState::*;

    if from == to {
        return true;
    }

    match (from, to) {
        (Absent, Loaded) => true,
        (Loaded, Started) => true,
        (Started, Active) => true,
        (_, Failed) => true,
        (Failed, Loaded) => true,
        _ => false,
    }
}

pub fn transition(
    name: &str,
    from: ServiceState,
    to: ServiceState,
) -> Result<ServiceState, LifecycleError> {
    if !is_transition_allowed(from, to) {
        return Err(LifecycleError::InvalidTransition {
            name: name.to_string(),
            from,
            to,
        });
    }
    Ok(to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_the_normal_startup_flow() {
        assert!(is_transition_allowed(ServiceState::Absent, ServiceState::Loaded));
        assert!(is_transition_allowed(ServiceState::Loaded, ServiceState::Started));
        assert!(is_transition_allowed(ServiceState::Started, ServiceState::Active));
    }

    #[test]
    fn any_state_can_fail() {
        assert!(is_transition_allowed(ServiceState::Started, ServiceState::Failed));
        assert!(is_transition_allowed(ServiceState::Active, ServiceState::Failed));
    }

    #[test]
    fn failed_recovers_via_loaded() {
        assert!(is_transition_allowed(ServiceState::Failed, ServiceState::Loaded));
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        assert!(!is_transition_allowed(ServiceState::Absent, ServiceState::Active));
        let err = transition("web", ServiceState::Absent, ServiceState::Active).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    }

    #[test]
    fn self_transition_is_always_allowed() {
        assert!(is_transition_allowed(ServiceState::Active, ServiceState::Active));
    }
}
