#[derive(Debug, thiserror::Error)]
pub enum OpenRagError {
    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported {kind} '{name}'. Supported: {supported}")]
    UnsupportedProvider { kind: &'static str, name: String, supported: String },

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OpenRagError>;
