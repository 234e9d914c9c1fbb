//! Renderer-side error taxonomy.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("service spec {fq_name} has neither an image nor a build reference")]
    MissingImageOrBuild { fq_name: String },
}
