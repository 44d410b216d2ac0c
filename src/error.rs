use thiserror::Error;

/// Main error type for Callweave operations
#[derive(Error, Debug)]
pub enum CallweaveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Malformed IR: {0}")]
    MalformedIr(String),

    #[error("Symbol id collision: {id} declared in both {first} and {second}")]
    IdCollision {
        id: String,
        first: String,
        second: String,
    },

    #[error("Deadline exceeded after {0:.1}s")]
    DeadlineExceeded(f64),
}

pub type Result<T> = std::result::Result<T, CallweaveError>;
