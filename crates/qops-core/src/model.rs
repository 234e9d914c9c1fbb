//! Core data model shared across the reconciliation pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Reverse-DNS prefix that discriminates managed units from everything else
/// the host supervisor knows about.
pub const FQ_PREFIX: &str = "dev.trly.quad-ops";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    Keep,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_reference")]
    pub reference: String,
    #[serde(default)]
    pub compose_dir: String,
    #[serde(default = "default_cleanup_policy")]
    pub cleanup_policy: CleanupPolicy,
}

fn default_reference() -> String {
    "main".to_string()
}

fn default_cleanup_policy() -> CleanupPolicy {
    CleanupPolicy::Delete
}

impl RepositoryConfig {
    /// `name` must be filesystem-safe: non-empty, no path separators, no `..`.
    pub fn is_name_filesystem_safe(&self) -> bool {
        !self.name.is_empty()
            && self.name != "."
            && self.name != ".."
            && !self.name.contains('/')
            && !self.name.contains('\\')
    }
}

/// The normalized in-memory result of parsing one repository's compose
/// files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub repo_name: String,
    pub services: BTreeMap<String, ComposeService>,
    pub networks: BTreeMap<String, ComposeNetwork>,
    pub volumes: BTreeMap<String, ComposeVolume>,
    pub secrets: BTreeMap<String, ComposeSecret>,
    pub configs: BTreeMap<String, ComposeConfig>,
    /// Verbatim `x-*` extension fields at the project level.
    pub extensions: BTreeMap<String, ExtensionValue>,
}

impl Project {
    pub fn new(name: impl Into<String>, repo_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo_name: repo_name.into(),
            services: BTreeMap::new(),
            networks: BTreeMap::new(),
            volumes: BTreeMap::new(),
            secrets: BTreeMap::new(),
            configs: BTreeMap::new(),
            extensions: BTreeMap::new(),
        }
    }
}

/// Free-form tagged-variant tree for compose extension fields (`x-*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionValue {
    Scalar(String),
    Sequence(Vec<ExtensionValue>),
    Mapping(BTreeMap<String, ExtensionValue>),
}

impl ExtensionValue {
    pub fn as_mapping(&self) -> Option<&BTreeMap<String, ExtensionValue>> {
        match self {
            ExtensionValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            ExtensionValue::Scalar(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub host_ip: Option<String>,
    pub host_port: Option<u16>,
    pub container_port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountType {
    Bind,
    Volume,
    Tmpfs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    pub source: String,
    pub target: String,
    pub mount_type: MountType,
    pub readonly: bool,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSecretRef {
    pub source_secret: String,
    pub mount_target: Option<String>,
    pub env_var_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    No,
    Always,
    OnFailure,
    UnlessStopped,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy::No
    }
}

/// One compose `services.<name>` entry before spec processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ComposeService {
    pub image: Option<String>,
    pub build_context: Option<String>,
    pub command: Vec<String>,
    pub working_dir: Option<String>,
    pub user: Option<String>,
    pub environment: Vec<(String, Option<String>)>,
    pub env_files: Vec<PathBuf>,
    pub ports: Vec<PortMapping>,
    pub mounts: Vec<Mount>,
    pub networks: Option<Vec<NetworkAttachment>>,
    pub depends_on: Vec<String>,
    pub restart: RestartPolicy,
    pub secrets: Vec<ServiceSecretRef>,
    pub labels: BTreeMap<String, String>,
    pub extensions: BTreeMap<String, ExtensionValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAttachment {
    pub network: String,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ComposeNetwork {
    pub external: bool,
    pub driver: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ComposeVolume {
    pub external: bool,
    pub driver: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeSecret {
    pub file: Option<PathBuf>,
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeConfig {
    pub file: Option<PathBuf>,
    pub external: bool,
}

/// The platform-neutral description of one runnable unit: the processor's
/// output and the renderers' input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub fq_name: String,
    pub project: String,
    pub repo_name: String,
    pub service_name: String,
    pub kind: SpecKind,
    pub image: Option<String>,
    pub build_context: Option<String>,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub working_dir: Option<String>,
    pub user: Option<String>,
    pub env: Vec<(String, Option<String>)>,
    pub ports: Vec<PortMapping>,
    pub mounts: Vec<Mount>,
    pub networks: Vec<NetworkAttachment>,
    pub depends: Vec<String>,
    pub restart: RestartPolicy,
    pub init_containers: Vec<String>,
    pub secrets_refs: Vec<ServiceSecretRef>,
    pub labels: BTreeMap<String, String>,
    pub extensions: BTreeMap<String, ExtensionValue>,
    pub one_shot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecKind {
    Container,
    Volume,
    Network,
    Image,
    Build,
    Secret,
}

impl SpecKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SpecKind::Container => "container",
            SpecKind::Volume => "volume",
            SpecKind::Network => "network",
            SpecKind::Image => "image",
            SpecKind::Build => "build",
            SpecKind::Secret => "secret",
        }
    }

    /// The filename extension the systemd renderer uses for this kind.
    pub fn unit_extension(self) -> &'static str {
        match self {
            SpecKind::Container => "container",
            SpecKind::Volume => "volume",
            SpecKind::Network => "network",
            SpecKind::Image => "image",
            SpecKind::Build => "build",
            SpecKind::Secret => "container",
        }
    }
}

pub fn fq_name(project: &str, service: &str) -> String {
    format!("{FQ_PREFIX}.{project}.{service}")
}

pub fn fq_name_suffixed(project: &str, service: &str, suffix: &str) -> String {
    format!("{FQ_PREFIX}.{project}.{service}-{suffix}")
}

/// A file the system writes to the supervisor's unit directory. `hash` is
/// the fingerprint of `bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub rel_path: String,
    pub bytes: Vec<u8>,
    pub hash: String,
    pub service_fq_name: Option<String>,
    pub kind: SpecKind,
    pub owning_repo: String,
}

impl Artifact {
    pub fn is_service_artifact(&self) -> bool {
        self.service_fq_name.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Created,
    Updated,
    Unchanged,
    Removed,
    OrphanedKeep,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceChange {
    pub fq_name: String,
    pub rel_path: String,
    pub status: ChangeStatus,
}
