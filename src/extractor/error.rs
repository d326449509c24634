use axum::http::StatusCode;
use thiserror::Error;

/// Failure of a single extraction, as seen by API clients
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ExtractionError {
    #[error("URL is required")]
    InvalidInput,

    #[error("No video information found")]
    NotFound,

    #[error("Failed to process video: {0}")]
    ExtractionFailed(String),

    #[error("Video processing service unavailable")]
    ServiceUnavailable,
}

impl ExtractionError {
    /// Convert error to the HTTP status code returned to the client
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExtractionError::InvalidInput | ExtractionError::ServiceUnavailable => {
                StatusCode::BAD_REQUEST
            }
            ExtractionError::NotFound => StatusCode::NOT_FOUND,
            ExtractionError::ExtractionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure reported by a [`MetadataSource`](super::MetadataSource)
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum SourceError {
    /// The extraction capability could not be started at all
    #[error("extractor unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Failed(String),
}

impl From<SourceError> for ExtractionError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::Unavailable(_) => ExtractionError::ServiceUnavailable,
            SourceError::Failed(message) => ExtractionError::ExtractionFailed(message),
        }
    }
}
