//! Failures from driving the host `git` binary, labelled by subcommand
//! and working tree so a per-repo sync result can surface them directly.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git {op} could not start in {dir}: {source}")]
    Spawn {
        op: String,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("git {op} failed in {dir} (status {status:?}): {stderr}")]
    Failed {
        op: String,
        dir: PathBuf,
        status: Option<i32>,
        stderr: String,
    },
    #[error("could not prepare working tree directory {dir}: {source}")]
    WorkdirSetup {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("path is not inside a git repository: {path}")]
    NotARepository { path: PathBuf },
}
