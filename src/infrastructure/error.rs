use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Notification error: {0}")]
    Notification(String),
}
