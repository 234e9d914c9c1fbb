//! Core types shared across the quad-ops reconciliation pipeline.

pub mod config;
pub mod fingerprint;
pub mod model;
pub mod validation;

pub use config::*;
pub use fingerprint::*;
pub use model::*;
pub use validation::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::TypeId;

    #[test]
    fn crate_root_reexports_model_types() {
        let _ = TypeId::of::<ServiceSpec>();
        let _ = TypeId::of::<Artifact>();
        let _ = TypeId::of::<ChangeStatus>();
    }

    #[test]
    fn crate_root_reexports_config_loader() {
        let config: Result<DaemonConfig, ConfigError> =
            load_daemon_config(std::path::Path::new("/nonexistent/quad-ops.toml"));
        assert!(config.is_err());
    }
}
