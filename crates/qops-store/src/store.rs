//! Artifact store: owns a single base directory, exposes
//! `List`/`Write`/`Delete`, and composes them into `Reconcile`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use qops_core::{fingerprint, Artifact, ChangeStatus, CleanupPolicy, ServiceChange, FQ_PREFIX};

use crate::discover::discover_managed_paths;
use crate::error::StoreError;

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;

pub type PerPathResult = Vec<(String, Result<(), StoreError>)>;

#[derive(Debug, Default)]
pub struct ChangeSet {
    pub changes: Vec<ServiceChange>,
    pub errors: Vec<StoreError>,
}

pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn ensure_base_dir(&self) -> Result<(), StoreError> {
        if self.base_dir.exists() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| StoreError::new("create_dir", self.base_dir.clone(), e))?;
        set_mode(&self.base_dir, DEFAULT_DIR_MODE)
            .map_err(|e| StoreError::new("chmod", self.base_dir.clone(), e))
    }

    /// Enumerate the base directory, reading and hashing each managed file.
    pub fn list(&self) -> Result<Vec<Artifact>, StoreError> {
        let paths = discover_managed_paths(&self.base_dir)?;
        let mut artifacts = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes =
                std::fs::read(&path).map_err(|e| StoreError::new("read", path.clone(), e))?;
            let rel_path = path
                .strip_prefix(&self.base_dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            let hash = fingerprint(&bytes);
            let (service_fq_name, kind) = classify(&rel_path);
            artifacts.push(Artifact {
                rel_path,
                bytes,
                hash,
                service_fq_name,
                kind,
                owning_repo: String::new(),
            });
        }
        Ok(artifacts)
    }

    /// Write every artifact using write-to-temp-then-rename. Failures are
    /// collected per path; unrelated writes still proceed.
    pub fn write(&self, desired: &[Artifact]) -> PerPathResult {
        let mut results = Vec::with_capacity(desired.len());
        if let Err(e) = self.ensure_base_dir() {
            for artifact in desired {
                results.push((artifact.rel_path.clone(), Err(e.clone_shallow())));
            }
            return results;
        }

        for artifact in desired {
            let result = self.write_one(artifact);
            results.push((artifact.rel_path.clone(), result));
        }
        self.fsync_dir(&self.base_dir);
        results
    }

    fn write_one(&self, artifact: &Artifact) -> Result<(), StoreError> {
        let final_path = self.base_dir.join(&artifact.rel_path);
        let parent = final_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_dir.clone());
        std::fs::create_dir_all(&parent)
            .map_err(|e| StoreError::new("create_dir", parent.clone(), e))?;
        set_mode(&parent, DEFAULT_DIR_MODE)
            .map_err(|e| StoreError::new("chmod", parent.clone(), e))?;

        let tmp_path = parent.join(format!(".{}.tmp-{}", temp_stem(&final_path), artifact.hash));
        let write_result = (|| -> Result<(), StoreError> {
            std::fs::write(&tmp_path, &artifact.bytes)
                .map_err(|e| StoreError::new("write", tmp_path.clone(), e))?;
            set_mode(&tmp_path, DEFAULT_FILE_MODE)
                .map_err(|e| StoreError::new("chmod", tmp_path.clone(), e))?;
            std::fs::rename(&tmp_path, &final_path)
                .map_err(|e| StoreError::new("rename", final_path.clone(), e))
        })();

        if write_result.is_err() {
            let _ = std::fs::remove_file(&tmp_path);
        }
        write_result
    }

    /// Delete artifacts by relative path. Missing files are not an error.
    pub fn delete(&self, paths: &[String]) -> PerPathResult {
        let mut results = Vec::with_capacity(paths.len());
        for rel_path in paths {
            let full_path = self.base_dir.join(rel_path);
            let result = match std::fs::remove_file(&full_path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StoreError::new("remove", full_path.clone(), e)),
            };
            results.push((rel_path.clone(), result));
        }
        self.fsync_dir(&self.base_dir);
        results
    }

    /// Compose `List`/`Write`/`Delete` into a single reconciliation pass
    /// against the desired artifact set.
    pub fn reconcile(
        &self,
        desired: &[Artifact],
        cleanup_policy_by_project: &BTreeMap<String, CleanupPolicy>,
    ) -> ChangeSet {
        let mut change_set = ChangeSet::default();

        let current = match self.list() {
            Ok(current) => current,
            Err(e) => {
                change_set.errors.push(e);
                return change_set;
            }
        };
        let current_by_path: BTreeMap<&str, &Artifact> =
            current.iter().map(|a| (a.rel_path.as_str(), a)).collect();
        let desired_by_path: BTreeMap<&str, &Artifact> =
            desired.iter().map(|a| (a.rel_path.as_str(), a)).collect();

        let mut to_write = Vec::new();
        for artifact in desired {
            let status = match current_by_path.get(artifact.rel_path.as_str()) {
                Some(existing) if existing.hash == artifact.hash => ChangeStatus::Unchanged,
                Some(_) => ChangeStatus::Updated,
                None => ChangeStatus::Created,
            };
            if status != ChangeStatus::Unchanged {
                to_write.push(artifact.clone());
            }
            change_set.changes.push(ServiceChange {
                fq_name: artifact.service_fq_name.clone().unwrap_or_default(),
                rel_path: artifact.rel_path.clone(),
                status,
            });
        }

        let mut to_delete = Vec::new();
        for artifact in &current {
            if desired_by_path.contains_key(artifact.rel_path.as_str()) {
                continue;
            }
            let project = project_of(&artifact.rel_path);
            let policy = project
                .and_then(|p| cleanup_policy_by_project.get(p))
                .copied()
                .unwrap_or(CleanupPolicy::Keep);
            let (status, should_delete) = match policy {
                CleanupPolicy::Delete => (ChangeStatus::Removed, true),
                CleanupPolicy::Keep => (ChangeStatus::OrphanedKeep, false),
            };
            if should_delete {
                to_delete.push(artifact.rel_path.clone());
            }
            change_set.changes.push(ServiceChange {
                fq_name: artifact.service_fq_name.clone().unwrap_or_default(),
                rel_path: artifact.rel_path.clone(),
                status,
            });
        }

        for (path, result) in self.write(&to_write) {
            if let Err(e) = result {
                change_set.errors.push(e);
                if let Some(change) = change_set.changes.iter_mut().find(|c| c.rel_path == path) {
                    change.status = ChangeStatus::Failed;
                }
            }
        }
        for (path, result) in self.delete(&to_delete) {
            if let Err(e) = result {
                change_set.errors.push(e);
                if let Some(change) = change_set.changes.iter_mut().find(|c| c.rel_path == path) {
                    change.status = ChangeStatus::Failed;
                }
            }
        }

        change_set
    }

    fn fsync_dir(&self, dir: &Path) {
        if let Ok(handle) = std::fs::File::open(dir) {
            let _ = handle.sync_all();
        }
    }
}

fn temp_stem(final_path: &Path) -> String {
    final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string())
}

/// Recover `(service_fq_name, kind)` from a relative path produced by a
/// renderer. Drop-ins (`<unit>.<ext>.d/override.conf`) carry no service fq
/// name, mirroring the convention the renderers emit them with.
fn classify(rel_path: &str) -> (Option<String>, qops_core::SpecKind) {
    use qops_core::SpecKind;

    if rel_path.contains(".d/") {
        return (None, SpecKind::Container);
    }
    let Some(dot) = rel_path.rfind('.') else {
        return (None, SpecKind::Container);
    };
    let (stem, ext) = rel_path.split_at(dot);
    let ext = &ext[1..];
    let kind = match ext {
        "container" => SpecKind::Container,
        "volume" => SpecKind::Volume,
        "network" => SpecKind::Network,
        "image" => SpecKind::Image,
        "build" => SpecKind::Build,
        "plist" => SpecKind::Container,
        _ => SpecKind::Container,
    };
    (Some(stem.to_string()), kind)
}

/// The `<project>` segment of a `<prefix>.<project>.<rest>` relative path.
fn project_of(rel_path: &str) -> Option<&str> {
    let rest = rel_path.strip_prefix(FQ_PREFIX)?.strip_prefix('.')?;
    rest.split('.').next()
}

impl StoreError {
    fn clone_shallow(&self) -> Self {
        Self::new(
            self.op,
            self.path.clone(),
            std::io::Error::new(self.cause.kind(), self.cause.to_string()),
        )
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
