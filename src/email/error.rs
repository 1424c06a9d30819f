use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Email configuration error: {0}")]
    ConfigError(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Mandrill rejected the request with status {status}: {body}")]
    ProviderRejection { status: u16, body: String },

    /// Reserved for checks run by `Mandrill::validate` before a send.
    #[error("Message validation failed: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml_edit::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EmailError {
    /// Transport failures are never retried; callers should stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EmailError::Transport(_))
    }
}
