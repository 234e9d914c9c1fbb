pub mod error;
pub mod manager;
pub mod state;
pub mod supervisor;

pub use error::LifecycleError;
pub use manager::LifecycleManager;
pub use state::{is_transition_allowed, transition, ServiceState};
pub use supervisor::{LaunchdSupervisor, SupervisorClient, SystemdSupervisor, UnitStatus};
