//! Per-service/per-project error taxonomy.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("dependency cycle in project {project}: {nodes:?}")]
    Cycle { project: String, nodes: Vec<String> },
    #[error("service {service} in project {project} references unknown secret {secret}")]
    UnknownSecret {
        project: String,
        service: String,
        secret: String,
    },
    #[error("service {service} in project {project} has invalid environment key {key}")]
    InvalidEnvKey {
        project: String,
        service: String,
        key: String,
    },
    #[error("service {service} in project {project} has an environment value larger than 128 KiB for key {key}")]
    EnvValueTooLarge {
        project: String,
        service: String,
        key: String,
    },
    #[error("service {service} in project {project} declares build with an empty context")]
    EmptyBuildContext { project: String, service: String },
    #[error("service {service} in project {project} declares an empty init-containers label")]
    EmptyInitLabel { project: String, service: String },
    #[error("service {service} in project {project} references unknown init container {child}")]
    UnknownInitContainer {
        project: String,
        service: String,
        child: String,
    },
    #[error("service {service} in project {project} secret {secret} has a path escaping the project directory")]
    UnsafeSecretPath {
        project: String,
        service: String,
        secret: String,
    },
    #[error("network {network} in project {project} is external and also declares a driver")]
    ExternalDriverConflict { project: String, network: String },
    #[error("service {service} in project {project} references undeclared network {network}")]
    UnknownNetwork {
        project: String,
        service: String,
        network: String,
    },
}

/// One project's spec-processing outcome: either every spec or none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSpecResult {
    pub project: String,
    pub specs: Vec<qops_core::ServiceSpec>,
    pub errors: Vec<SpecError>,
}

impl ProjectSpecResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
