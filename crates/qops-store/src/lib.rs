//! Owns the artifact output directory and reconciles it against a desired
//! set of rendered artifacts.

pub mod discover;
pub mod error;
pub mod store;

pub use discover::discover_managed_paths;
pub use error::StoreError;
pub use store::{ArtifactStore, ChangeSet, PerPathResult};
