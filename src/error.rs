use thiserror::Error;

#[derive(Error, Debug)]
pub enum JoinError {
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<sqlx::Error> for JoinError {
    fn from(err: sqlx::Error) -> Self {
        JoinError::Database(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JoinError>;
