use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerankError {
    /// Invalid weights, unknown layer name, bad threshold. Always fatal;
    /// rejected before any scoring runs.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bad input rows (out-of-range score, gene outside the universe).
    /// Recorded in diagnostics and excluded, never fatal to a run.
    #[error("Data error: {0}")]
    Data(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GenerankError>;
