use std::time::Duration;

/// Engine-level errors
///
/// These surface only at collaborator seams (repositories, oracles, providers).
/// The recommendation pipeline converts every one of them into a local default
/// before anything reaches the caller.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Circuit open for {0}")]
    CircuitOpen(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// True for Postgres foreign-key violations (SQLSTATE 23503)
    ///
    /// A rating written against an outfit id that was never saved lands here.
    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            EngineError::Database(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some("23503")
            }
            _ => false,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
