//! Artifact store error taxonomy. The store never
//! panics; every filesystem failure becomes an `IOError` that the caller
//! can collect and continue past.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
#[error("artifact store {op} failed for {path}: {cause}")]
pub struct StoreError {
    pub op: &'static str,
    pub path: PathBuf,
    #[source]
    pub cause: std::io::Error,
}

impl StoreError {
    pub fn new(op: &'static str, path: impl Into<PathBuf>, cause: std::io::Error) -> Self {
        Self {
            op,
            path: path.into(),
            cause,
        }
    }
}
