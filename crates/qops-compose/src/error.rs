use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("failed to read compose file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse compose file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{path}: undefined variable '{name}' referenced without a default")]
    UndefinedVariable { path: PathBuf, name: String },
    #[error("{path}: unterminated variable reference")]
    UnterminatedVariable { path: PathBuf },
}
