//! Thin driver for the host `git` binary. Every repository operation in
//! the sync path funnels through here, so a failure always names the
//! subcommand and the working tree it ran against.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::GitError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCli {
    binary: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("git"),
        }
    }
}

impl GitCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run a git subcommand in `cwd` and return its trimmed stdout. The
    /// sync path only ever reads single-line answers (SHAs, ref names,
    /// yes/no probes), so output is decoded lossily and whitespace-trimmed
    /// here rather than at every call site.
    pub fn run<I, S>(&self, cwd: &Path, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.binary);
        command.current_dir(cwd);

        let mut op = String::from("git");
        for (index, arg) in args.into_iter().enumerate() {
            if index == 0 {
                op = arg.as_ref().to_string_lossy().into_owned();
            }
            command.arg(arg.as_ref());
        }

        let output = command.output().map_err(|source| GitError::Spawn {
            op: op.clone(),
            dir: cwd.to_path_buf(),
            source,
        })?;

        if !output.status.success() {
            return Err(GitError::Failed {
                op,
                dir: cwd.to_path_buf(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_returns_trimmed_stdout() {
        let tmp = tempfile::tempdir().unwrap();
        let git = GitCli::default();
        let out = git.run(tmp.path(), ["--version"]).unwrap();
        assert!(out.starts_with("git version"), "{out}");
        assert!(!out.ends_with('\n'));
    }

    #[test]
    fn failure_names_the_subcommand_and_working_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let git = GitCli::default();

        let err = git.run(tmp.path(), ["rev-parse", "HEAD"]).unwrap_err();
        match err {
            GitError::Failed { op, dir, .. } => {
                assert_eq!(op, "rev-parse");
                assert_eq!(dir, tmp.path());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_binary_reports_spawn_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let git = GitCli::new("/nonexistent/git-binary");

        let err = git.run(tmp.path(), ["status"]).unwrap_err();
        assert!(matches!(err, GitError::Spawn { ref op, .. } if op == "status"));
    }
}
