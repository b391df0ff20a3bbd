use thiserror::Error;

pub type Result<T> = std::result::Result<T, PilotError>;

#[derive(Debug, Error)]
pub enum PilotError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for PilotError {
    fn from(err: reqwest::Error) -> Self {
        PilotError::Network(err.to_string())
    }
}

impl PilotError {
    /// HTTP status of an API-level failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            PilotError::Api { status, .. } => Some(*status),
            PilotError::Network(_) => None,
        }
    }
}
