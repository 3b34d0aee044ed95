use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid master file: {0}")]
    InvalidMasterFile(String),
    #[error("history entry {0} not found")]
    NotFound(i64),
    #[error("invalid expiry '{0}', expected YYMMDD")]
    InvalidExpiry(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
