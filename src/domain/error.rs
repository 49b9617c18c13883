use thiserror::Error;

/// WalletGuard unified error type
#[derive(Error, Debug)]
pub enum WalletGuardError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Session manager is already initialized")]
    AlreadyInitialized,

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),
}

pub type WalletGuardResult<T> = Result<T, WalletGuardError>;
