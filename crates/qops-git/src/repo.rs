//! Locating a repository's working tree root and reading its HEAD, the
//! two facts the syncer needs to decide whether anything changed.

use std::path::{Path, PathBuf};

use crate::command::GitCli;
use crate::error::GitError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHandle {
    pub root: PathBuf,
}

pub fn discover_repo(start_path: &Path, git: &GitCli) -> Result<RepoHandle, GitError> {
    let inside = match git.run(start_path, ["rev-parse", "--is-inside-work-tree"]) {
        Ok(answer) => answer == "true",
        Err(GitError::Failed { .. }) => false,
        Err(err) => return Err(err),
    };

    if !inside {
        return Err(GitError::NotARepository {
            path: start_path.to_path_buf(),
        });
    }

    let root = git.run(start_path, ["rev-parse", "--show-toplevel"])?;
    Ok(RepoHandle {
        root: PathBuf::from(root),
    })
}

pub fn head_sha(repo: &RepoHandle, git: &GitCli) -> Result<String, GitError> {
    git.run(&repo.root, ["rev-parse", "HEAD"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn non_repository_directory_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let err = discover_repo(tmp.path(), &GitCli::default()).unwrap_err();
        assert!(matches!(err, GitError::NotARepository { .. }));
    }

    #[test]
    fn discover_from_a_subdirectory_finds_the_tree_root() {
        let tmp = tempfile::tempdir().unwrap();
        let status = Command::new("git")
            .args(["init", "--initial-branch=main"])
            .current_dir(tmp.path())
            .output()
            .expect("spawn git");
        assert!(status.status.success());
        let nested = tmp.path().join("sub").join("dir");
        std::fs::create_dir_all(&nested).unwrap();

        let repo = discover_repo(&nested, &GitCli::default()).unwrap();
        assert_eq!(
            repo.root.canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }
}
