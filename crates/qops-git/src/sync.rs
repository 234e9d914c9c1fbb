//! Clone/fetch/checkout a single configured repository.

use std::path::{Path, PathBuf};

use qops_core::RepositoryConfig;

use crate::command::GitCli;
use crate::error::GitError;
use crate::repo::{discover_repo, head_sha, RepoHandle};

/// Outcome of syncing one repository, reported back to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub repo: String,
    pub success: bool,
    pub head_before: Option<String>,
    pub head_after: Option<String>,
    pub changed: bool,
    pub err: Option<String>,
}

impl SyncResult {
    fn changed(repo: &str, before: Option<String>, after: String) -> Self {
        let changed = before.as_deref() != Some(after.as_str());
        Self {
            repo: repo.to_string(),
            success: true,
            head_before: before,
            head_after: Some(after),
            changed,
            err: None,
        }
    }

    fn failed(repo: &str, before: Option<String>, err: GitError) -> Self {
        Self {
            repo: repo.to_string(),
            success: false,
            head_before: before,
            head_after: None,
            changed: false,
            err: Some(err.to_string()),
        }
    }
}

/// Clone `config` into `dest_dir` if absent, otherwise fetch and fast-forward
/// (or force-reset/checkout) onto `config.reference`. `dest_dir` is the
/// repository's own working tree root, typically `repositoryDir/<name>`.
pub fn sync_repository(git: &GitCli, config: &RepositoryConfig, dest_dir: &Path) -> SyncResult {
    match sync_repository_inner(git, config, dest_dir) {
        Ok((before, after)) => SyncResult::changed(&config.name, before, after),
        Err((before, err)) => SyncResult::failed(&config.name, before, err),
    }
}

fn sync_repository_inner(
    git: &GitCli,
    config: &RepositoryConfig,
    dest_dir: &Path,
) -> Result<(Option<String>, String), (Option<String>, GitError)> {
    if !dest_dir.join(".git").exists() {
        clone_fresh(git, config, dest_dir).map_err(|err| (None, err))?;
        let repo = discover_repo(dest_dir, git).map_err(|err| (None, err))?;
        let after = head_sha(&repo, git).map_err(|err| (None, err))?;
        return Ok((None, after));
    }

    let repo = discover_repo(dest_dir, git).map_err(|err| (None, err))?;
    let before = head_sha(&repo, git).ok();

    fetch(&repo, git).map_err(|err| (before.clone(), err))?;
    checkout_reference(&repo, git, &config.reference).map_err(|err| (before.clone(), err))?;

    let after = head_sha(&repo, git).map_err(|err| (before.clone(), err))?;
    Ok((before, after))
}

fn clone_fresh(git: &GitCli, config: &RepositoryConfig, dest_dir: &Path) -> Result<(), GitError> {
    if let Some(parent) = dest_dir.parent() {
        std::fs::create_dir_all(parent).map_err(|source| GitError::WorkdirSetup {
            dir: parent.to_path_buf(),
            source,
        })?;
    }
    let cwd = dest_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let dest_name = dest_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.name.clone());

    git.run(
        &cwd,
        ["clone", "--origin", "origin", config.url.as_str(), dest_name.as_str()],
    )?;

    let repo = discover_repo(dest_dir, git)?;
    checkout_reference(&repo, git, &config.reference)?;
    Ok(())
}

fn fetch(repo: &RepoHandle, git: &GitCli) -> Result<(), GitError> {
    git.run(&repo.root, ["fetch", "--prune", "origin"])?;
    Ok(())
}

/// `reference` may be a branch, a tag or a detached commit SHA; each is
/// resolved against `origin` before checkout so a stale local branch never
/// shadows the upstream ref.
fn checkout_reference(repo: &RepoHandle, git: &GitCli, reference: &str) -> Result<(), GitError> {
    if git
        .run(
            &repo.root,
            ["show-ref", "--verify", "--quiet", &format!("refs/remotes/origin/{reference}")],
        )
        .is_ok()
    {
        git.run(&repo.root, ["checkout", "--detach", &format!("origin/{reference}")])?;
        return Ok(());
    }

    if git
        .run(&repo.root, ["show-ref", "--verify", "--quiet", &format!("refs/tags/{reference}")])
        .is_ok()
    {
        git.run(&repo.root, ["checkout", "--detach", reference])?;
        return Ok(());
    }

    git.run(&repo.root, ["checkout", "--detach", reference])?;
    Ok(())
}
