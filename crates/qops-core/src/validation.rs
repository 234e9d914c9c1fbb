//! Structural validation for config/model types, split from `config.rs` so
//! new data types can opt in without growing a god-module.

use std::collections::HashSet;

use crate::config::{ConfigError, DaemonConfig};
use crate::model::RepositoryConfig;

pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

impl Validate for RepositoryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_name_filesystem_safe() {
            return Err(ConfigError::UnsafeRepositoryName(self.name.clone()));
        }
        if self.url.is_empty() {
            return Err(ConfigError::UnsafeRepositoryName(format!(
                "{} (empty url)",
                self.name
            )));
        }
        Ok(())
    }
}

impl Validate for DaemonConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        DaemonConfig::validate(self)?;
        let mut seen = HashSet::new();
        for repo in &self.repositories {
            repo.validate()?;
            if !seen.insert(repo.name.clone()) {
                return Err(ConfigError::DuplicateRepository(repo.name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CleanupPolicy;
    use std::path::PathBuf;

    fn sample_repo(name: &str, url: &str) -> RepositoryConfig {
        RepositoryConfig {
            name: name.to_string(),
            url: url.to_string(),
            reference: "main".to_string(),
            compose_dir: String::new(),
            cleanup_policy: CleanupPolicy::Delete,
        }
    }

    #[test]
    fn repository_config_rejects_empty_url() {
        let repo = sample_repo("svc-a", "");
        assert!(matches!(
            repo.validate(),
            Err(ConfigError::UnsafeRepositoryName(_))
        ));
    }

    #[test]
    fn daemon_config_validate_matches_inherent_validate() {
        let config = DaemonConfig {
            quadlet_dir: PathBuf::from("/etc/containers/systemd"),
            repository_dir: PathBuf::from("/var/lib/quad-ops/repos"),
            user_mode: false,
            repositories: vec![sample_repo("svc-a", "https://example.com/a.git")],
            verbose: false,
        };
        assert!(Validate::validate(&config).is_ok());
        assert!(config.validate().is_ok());
    }
}
