//! The reconciler's return value: everything that happened in one pass,
//! with every collected error, rather than the first one encountered.

use std::collections::BTreeMap;
use std::fmt;

use qops_core::{ChangeStatus, ServiceChange};
use qops_git::SyncResult;
use qops_lifecycle::LifecycleError;
use qops_store::StoreError;

#[derive(Debug, Default)]
pub struct Report {
    pub sync_results: Vec<SyncResult>,
    /// Projects that failed to parse or to process, with every error each
    /// produced. A failed project contributes zero artifacts.
    pub project_errors: BTreeMap<String, Vec<String>>,
    pub changes: Vec<ServiceChange>,
    pub store_errors: Vec<StoreError>,
    pub lifecycle_errors: Vec<LifecycleError>,
}

impl Report {
    /// True iff every repo synced, every project processed, every artifact
    /// was written and every lifecycle action succeeded. Drives the exit
    /// status of a one-shot reconciliation.
    pub fn success(&self) -> bool {
        self.sync_results.iter().all(|r| r.success)
            && self.project_errors.is_empty()
            && self.store_errors.is_empty()
            && self.lifecycle_errors.is_empty()
            && self
                .changes
                .iter()
                .all(|c| c.status != ChangeStatus::Failed)
    }

    pub fn count(&self, status: ChangeStatus) -> usize {
        self.changes.iter().filter(|c| c.status == status).count()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sync in &self.sync_results {
            if sync.success {
                let state = if sync.changed { "changed" } else { "up to date" };
                writeln!(f, "repo {}: {state}", sync.repo)?;
            } else {
                writeln!(
                    f,
                    "repo {}: sync failed: {}",
                    sync.repo,
                    sync.err.as_deref().unwrap_or("unknown error")
                )?;
            }
        }

        for (project, errors) in &self.project_errors {
            for error in errors {
                writeln!(f, "project {project}: {error}")?;
            }
        }

        for change in &self.changes {
            if change.fq_name.is_empty() {
                continue;
            }
            let status = match change.status {
                ChangeStatus::Created => "created",
                ChangeStatus::Updated => "updated",
                ChangeStatus::Unchanged => "unchanged",
                ChangeStatus::Removed => "removed",
                ChangeStatus::OrphanedKeep => "orphaned (kept)",
                ChangeStatus::Failed => "failed",
            };
            writeln!(f, "service {}: {status}", change.fq_name)?;
        }

        for error in &self.store_errors {
            writeln!(f, "artifact error: {error}")?;
        }
        for error in &self.lifecycle_errors {
            writeln!(f, "lifecycle error: {error}")?;
        }

        writeln!(
            f,
            "{} created, {} updated, {} unchanged, {} removed",
            self.count(ChangeStatus::Created),
            self.count(ChangeStatus::Updated),
            self.count(ChangeStatus::Unchanged),
            self.count(ChangeStatus::Removed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(fq: &str, status: ChangeStatus) -> ServiceChange {
        ServiceChange {
            fq_name: fq.to_string(),
            rel_path: format!("{fq}.container"),
            status,
        }
    }

    #[test]
    fn empty_report_is_a_success() {
        assert!(Report::default().success());
    }

    #[test]
    fn any_project_error_fails_the_report() {
        let mut report = Report::default();
        report
            .project_errors
            .entry("svc-a".to_string())
            .or_default()
            .push("dependency cycle".to_string());
        assert!(!report.success());
    }

    #[test]
    fn failed_change_fails_the_report() {
        let mut report = Report::default();
        report.changes.push(change("p.web", ChangeStatus::Failed));
        assert!(!report.success());
    }

    #[test]
    fn display_summarizes_counts_and_services() {
        let mut report = Report::default();
        report.changes.push(change("p.web", ChangeStatus::Created));
        report.changes.push(change("p.db", ChangeStatus::Unchanged));
        let rendered = report.to_string();
        assert!(rendered.contains("service p.web: created"));
        assert!(rendered.contains("1 created, 0 updated, 1 unchanged, 0 removed"));
    }
}
