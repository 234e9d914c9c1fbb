//! Daemon configuration.
//!
//! This module owns only the struct and its TOML (de)serialization;
//! constructing it from CLI flags is the binary's job.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::RepositoryConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    pub quadlet_dir: PathBuf,
    pub repository_dir: PathBuf,
    #[serde(default)]
    pub user_mode: bool,
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] toml::ser::Error),
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("duplicate repository name: {0}")]
    DuplicateRepository(String),
    #[error("repository name is not filesystem-safe: {0}")]
    UnsafeRepositoryName(String),
    #[error("quadlet_dir must not be empty")]
    EmptyQuadletDir,
    #[error("repository_dir must not be empty")]
    EmptyRepositoryDir,
}

pub fn load_daemon_config(path: &Path) -> Result<DaemonConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: DaemonConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

pub fn save_daemon_config(config: &DaemonConfig, path: &Path) -> Result<(), ConfigError> {
    config.validate()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    let raw = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    fs::write(path, raw).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

impl DaemonConfig {
    /// Structural validation only: the invariants this struct itself must
    /// uphold before being handed to the reconciler.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quadlet_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyQuadletDir);
        }
        if self.repository_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRepositoryDir);
        }
        let mut seen = std::collections::HashSet::new();
        for repo in &self.repositories {
            if !repo.is_name_filesystem_safe() {
                return Err(ConfigError::UnsafeRepositoryName(repo.name.clone()));
            }
            if !seen.insert(repo.name.clone()) {
                return Err(ConfigError::DuplicateRepository(repo.name.clone()));
            }
        }
        Ok(())
    }
}
