use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Authentication failed after token refresh: {0}")]
    Auth(String),

    #[error("Write conflict persisted after all retries (status {status}): {body}")]
    ConflictExhausted { status: u16, body: String },

    #[error("Remote API error {status}: {body}")]
    RemoteApi { status: u16, body: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown metadata field: {0}")]
    UnknownField(String),

    #[error("Unsupported locale: {0}")]
    UnknownLocale(String),
}

pub type Result<T> = std::result::Result<T, LocflowError>;
