//! Platform renderer trait.
//!
//! A renderer is pure and deterministic: the same slice of specs always
//! produces byte-identical artifacts, in a stable order, with no filesystem
//! or supervisor access.

use qops_core::{Artifact, ServiceSpec};

use crate::error::RenderError;

pub trait PlatformRenderer: Send + Sync {
    fn render(&self, specs: &[ServiceSpec]) -> (Vec<Artifact>, Vec<RenderError>);
}
