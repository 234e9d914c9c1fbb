//! One full pass from repository state to running supervisor state: sync,
//! load, process, render, reconcile the artifact directory, then drive the
//! supervisor over the resulting change set.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use qops_compose::load_projects;
use qops_core::{
    Artifact, ChangeStatus, CleanupPolicy, DaemonConfig, Project, RepositoryConfig, FQ_PREFIX,
};
use qops_git::{GitCli, SyncPool};
use qops_lifecycle::LifecycleManager;
use qops_render::{PlatformRenderer, RenderError};
use qops_spec::{parse_env_file, process_project, EnvFileContents};
use qops_store::ArtifactStore;

use crate::report::Report;

pub struct Reconciler {
    config: DaemonConfig,
    git: GitCli,
    pool: SyncPool,
    renderer: Box<dyn PlatformRenderer>,
    store: ArtifactStore,
    lifecycle: LifecycleManager,
    busy: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        config: DaemonConfig,
        renderer: Box<dyn PlatformRenderer>,
        lifecycle: LifecycleManager,
    ) -> Self {
        let store = ArtifactStore::new(config.quadlet_dir.clone());
        Self {
            config,
            git: GitCli::default(),
            pool: SyncPool::default(),
            renderer,
            store,
            lifecycle,
            busy: Mutex::new(()),
        }
    }

    /// Run one reconciliation, queueing behind any pass already in flight.
    /// Overlapping passes are forbidden; this entry point waits its turn.
    pub fn reconcile(&self, force: bool) -> Report {
        let _guard = self.busy.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.run(force)
    }

    /// Run one reconciliation unless a pass is already in flight, in which
    /// case return `None` instead of waiting.
    pub fn try_reconcile(&self, force: bool) -> Option<Report> {
        let guard = self.busy.try_lock().ok()?;
        let report = self.run(force);
        drop(guard);
        Some(report)
    }

    fn run(&self, force: bool) -> Report {
        let mut report = Report::default();

        let repos: Vec<(RepositoryConfig, PathBuf)> = self
            .config
            .repositories
            .iter()
            .map(|repo| (repo.clone(), self.config.repository_dir.join(&repo.name)))
            .collect();

        report.sync_results = self.pool.sync_all(&self.git, &repos);
        for sync in &report.sync_results {
            if sync.success {
                tracing::info!(repo = %sync.repo, changed = sync.changed, "repository synced");
            } else {
                tracing::warn!(
                    repo = %sync.repo,
                    error = sync.err.as_deref().unwrap_or("unknown"),
                    "repository sync failed, using previous checkout"
                );
            }
        }

        let host_env: HashMap<String, String> = std::env::vars().collect();
        let mut specs = Vec::new();
        let mut ordered_fq_names = Vec::new();
        let mut policy_by_project: BTreeMap<String, CleanupPolicy> = BTreeMap::new();

        for (repo, repo_dir) in &repos {
            let compose_dir = if repo.compose_dir.is_empty() {
                repo_dir.clone()
            } else {
                repo_dir.join(&repo.compose_dir)
            };
            if !compose_dir.is_dir() {
                continue;
            }

            let loaded = match load_projects(&compose_dir, &repo.name, &host_env) {
                Ok(loaded) => loaded,
                Err(error) => {
                    tracing::warn!(repo = %repo.name, %error, "compose discovery failed");
                    continue;
                }
            };

            for project in loaded {
                let parsed = match project.result {
                    Ok(parsed) => parsed,
                    Err(error) => {
                        tracing::warn!(project = %project.project_name, %error, "project failed to parse");
                        report
                            .project_errors
                            .entry(project.project_name.clone())
                            .or_default()
                            .push(error.to_string());
                        policy_by_project
                            .insert(project.project_name.clone(), CleanupPolicy::Keep);
                        continue;
                    }
                };

                let env_files = match read_env_files(&parsed, &project.dir) {
                    Ok(env_files) => env_files,
                    Err(errors) => {
                        report
                            .project_errors
                            .entry(parsed.name.clone())
                            .or_default()
                            .extend(errors);
                        policy_by_project.insert(parsed.name.clone(), CleanupPolicy::Keep);
                        continue;
                    }
                };

                let result = process_project(&parsed, &project.dir, &env_files);
                if !result.is_success() {
                    tracing::warn!(
                        project = %result.project,
                        errors = result.errors.len(),
                        "project failed spec processing, discarding all of its specs"
                    );
                    report
                        .project_errors
                        .entry(result.project.clone())
                        .or_default()
                        .extend(result.errors.iter().map(|e| e.to_string()));
                    policy_by_project.insert(result.project, CleanupPolicy::Keep);
                    continue;
                }

                policy_by_project.insert(result.project.clone(), repo.cleanup_policy);
                ordered_fq_names.extend(result.specs.iter().map(|s| s.fq_name.clone()));
                specs.extend(result.specs);
            }
        }

        let (artifacts, render_errors) = self.renderer.render(&specs);
        let desired = self.discard_render_failed_projects(
            artifacts,
            &render_errors,
            &specs,
            &mut report,
            &mut policy_by_project,
        );

        // Units about to lose their artifact are stopped while the file is
        // still on disk; failures here are logged, never fatal.
        let doomed = self.predict_removals(&desired, &policy_by_project);
        if !doomed.is_empty() {
            for (unit, result) in self.lifecycle.stop_many(&doomed) {
                if let Err(error) = result {
                    tracing::warn!(%unit, %error, "best-effort stop of removed unit failed");
                }
            }
        }

        let change_set = self.store.reconcile(&desired, &policy_by_project);
        report.changes = change_set.changes;
        report.store_errors = change_set.errors;

        let needs_reload = force
            || !doomed.is_empty()
            || report.changes.iter().any(|c| {
                matches!(
                    c.status,
                    ChangeStatus::Created | ChangeStatus::Updated | ChangeStatus::Removed
                )
            });
        if needs_reload {
            if let Err(error) = self.lifecycle.reload() {
                report.lifecycle_errors.push(error);
            }
            report
                .lifecycle_errors
                .extend(self.lifecycle.apply(&report.changes, &ordered_fq_names, force));
        }

        report
    }

    /// A renderer refusal fails the whole owning project: its artifacts are
    /// withheld from the desired set and its on-disk state left untouched.
    fn discard_render_failed_projects(
        &self,
        artifacts: Vec<Artifact>,
        render_errors: &[RenderError],
        specs: &[qops_core::ServiceSpec],
        report: &mut Report,
        policy_by_project: &mut BTreeMap<String, CleanupPolicy>,
    ) -> Vec<Artifact> {
        if render_errors.is_empty() {
            return artifacts;
        }

        let mut failed_projects = BTreeSet::new();
        for error in render_errors {
            let RenderError::MissingImageOrBuild { fq_name } = error;
            let Some(spec) = specs.iter().find(|s| &s.fq_name == fq_name) else {
                continue;
            };
            report
                .project_errors
                .entry(spec.project.clone())
                .or_default()
                .push(error.to_string());
            policy_by_project.insert(spec.project.clone(), CleanupPolicy::Keep);
            failed_projects.insert(spec.project.clone());
        }

        artifacts
            .into_iter()
            .filter(|artifact| {
                !failed_projects
                    .iter()
                    .any(|project| belongs_to_project(&artifact.rel_path, project))
            })
            .collect()
    }

    /// Managed service artifacts on disk that this pass will delete: present
    /// now, absent from the desired set, and owned by a delete-policy project.
    fn predict_removals(
        &self,
        desired: &[Artifact],
        policy_by_project: &BTreeMap<String, CleanupPolicy>,
    ) -> Vec<String> {
        let current = match self.store.list() {
            Ok(current) => current,
            Err(error) => {
                tracing::debug!(%error, "artifact directory not readable yet");
                return Vec::new();
            }
        };
        let desired_paths: BTreeSet<&str> = desired.iter().map(|a| a.rel_path.as_str()).collect();

        current
            .iter()
            .filter(|artifact| !desired_paths.contains(artifact.rel_path.as_str()))
            .filter_map(|artifact| {
                let fq_name = artifact.service_fq_name.as_deref()?;
                let project = project_of_fq(fq_name)?;
                match policy_by_project.get(project) {
                    Some(CleanupPolicy::Delete) => {
                        Some(self.lifecycle.unit_name(fq_name, &artifact.rel_path))
                    }
                    _ => None,
                }
            })
            .collect()
    }
}

fn belongs_to_project(rel_path: &str, project: &str) -> bool {
    rel_path
        .strip_prefix(FQ_PREFIX)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.strip_prefix(project))
        .is_some_and(|rest| rest.starts_with('.'))
}

fn project_of_fq(fq_name: &str) -> Option<&str> {
    fq_name
        .strip_prefix(FQ_PREFIX)?
        .strip_prefix('.')?
        .split('.')
        .next()
}

/// Read every `env_file` a project references, keyed the way the compose
/// document spelled the path. A missing or unreadable file fails the
/// project.
fn read_env_files(project: &Project, project_dir: &Path) -> Result<EnvFileContents, Vec<String>> {
    let mut contents = EnvFileContents::new();
    let mut errors = Vec::new();

    for (service_name, service) in &project.services {
        for path in &service.env_files {
            let key = path.to_string_lossy().into_owned();
            if contents.contains_key(&key) {
                continue;
            }
            let abs = if path.is_absolute() {
                path.clone()
            } else {
                project_dir.join(path)
            };
            match std::fs::read_to_string(&abs) {
                Ok(text) => {
                    contents.insert(key, parse_env_file(&text));
                }
                Err(error) => errors.push(format!(
                    "service {service_name}: env_file {} unreadable: {error}",
                    abs.display()
                )),
            }
        }
    }

    if errors.is_empty() {
        Ok(contents)
    } else {
        Err(errors)
    }
}
