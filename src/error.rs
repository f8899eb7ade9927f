use thiserror::Error;

#[derive(Error, Debug)]
pub enum RevenueError {
    #[error("Revenue source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid jitter factor {0}: must be between 0.0 and 1.0")]
    InvalidJitter(f64),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Store request failed (status {status}): {message}")]
    Store { status: u16, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "remote")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RevenueError {
    /// Collapses any failure to obtain raw text into `SourceUnavailable`.
    pub fn into_unavailable(self) -> Self {
        match self {
            RevenueError::SourceUnavailable(_) => self,
            other => RevenueError::SourceUnavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RevenueError>;
