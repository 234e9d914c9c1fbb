//! Bounded-concurrency fan-out for syncing many repositories at once.
//! Each repo's working tree is mutated only by its own syncer worker, so
//! repos can run in parallel with no shared mutable state.

use std::path::PathBuf;

use qops_core::RepositoryConfig;

use crate::command::GitCli;
use crate::sync::{sync_repository, SyncResult};

#[derive(Debug, Clone, Copy)]
pub struct SyncPool {
    max_concurrency: usize,
}

impl SyncPool {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Sync every repository, running at most `max_concurrency` at a time.
    /// Order of the returned results matches `repos`.
    pub fn sync_all(
        &self,
        git: &GitCli,
        repos: &[(RepositoryConfig, PathBuf)],
    ) -> Vec<SyncResult> {
        let mut results = vec![None; repos.len()];

        std::thread::scope(|scope| {
            for chunk in repos.chunks(self.max_concurrency.min(repos.len().max(1))) {
                let offset = chunk_offset(repos, chunk);
                let mut handles = Vec::with_capacity(chunk.len());
                for (index, (config, dest)) in chunk.iter().enumerate() {
                    let git = git.clone();
                    handles.push((
                        offset + index,
                        scope.spawn(move || sync_repository(&git, config, dest)),
                    ));
                }
                for (index, handle) in handles {
                    results[index] = Some(handle.join().unwrap_or_else(|_| SyncResult {
                        repo: repos[index].0.name.clone(),
                        success: false,
                        head_before: None,
                        head_after: None,
                        changed: false,
                        err: Some("sync worker thread panicked".to_string()),
                    }));
                }
            }
        });

        results.into_iter().map(|r| r.expect("every slot filled")).collect()
    }
}

fn chunk_offset<T>(whole: &[T], chunk: &[T]) -> usize {
    (chunk.as_ptr() as usize - whole.as_ptr() as usize) / std::mem::size_of::<T>()
}

impl Default for SyncPool {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qops_core::CleanupPolicy;
    use std::fs;
    use std::process::Command;

    fn run_git(cwd: &std::path::Path, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .expect("spawn git");
        assert!(output.status.success());
    }

    fn init_upstream(tmp: &std::path::Path, name: &str) -> PathBuf {
        let upstream = tmp.join(name);
        fs::create_dir_all(&upstream).unwrap();
        run_git(&upstream, &["init", "--initial-branch=main"]);
        fs::write(upstream.join("README.md"), "v1\n").unwrap();
        run_git(&upstream, &["add", "README.md"]);
        run_git(
            &upstream,
            &[
                "-c", "user.name=Test", "-c", "user.email=test@example.com",
                "commit", "-m", "init",
            ],
        );
        upstream
    }

    #[test]
    fn sync_all_preserves_input_order_and_syncs_every_repo() {
        let tmp = tempfile::tempdir().unwrap();
        let up_a = init_upstream(tmp.path(), "up-a");
        let up_b = init_upstream(tmp.path(), "up-b");

        let repos = vec![
            (
                RepositoryConfig {
                    name: "svc-a".to_string(),
                    url: up_a.to_str().unwrap().to_string(),
                    reference: "main".to_string(),
                    compose_dir: String::new(),
                    cleanup_policy: CleanupPolicy::Delete,
                },
                tmp.path().join("work").join("svc-a"),
            ),
            (
                RepositoryConfig {
                    name: "svc-b".to_string(),
                    url: up_b.to_str().unwrap().to_string(),
                    reference: "main".to_string(),
                    compose_dir: String::new(),
                    cleanup_policy: CleanupPolicy::Delete,
                },
                tmp.path().join("work").join("svc-b"),
            ),
        ];

        let pool = SyncPool::new(2);
        let results = pool.sync_all(&GitCli::default(), &repos);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].repo, "svc-a");
        assert_eq!(results[1].repo, "svc-b");
        assert!(results.iter().all(|r| r.success), "{results:?}");
    }
}
