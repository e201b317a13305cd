use thiserror::Error;

/// Main error type for Deep Search
#[derive(Error, Debug)]
pub enum DeepSearchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("{0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Engine error: {0}")]
    EngineError(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("A submission is in progress")]
    Busy,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
