use axum::{
    response::{IntoResponse, Response},
    Json,
    http::{header, HeaderValue, StatusCode},
};
use serde::Serialize;

pub const URL_REQUIRED: &str = "URL is required";

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to reach {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP error! status: {status}")]
    Fetch { status: u16 },

    #[error("Could not extract text content from the URL.")]
    EmptyContent,

    #[error("{0}")]
    Configuration(String),

    #[error("API quota exceeded. Please try again later.")]
    QuotaExceeded { retry_after_secs: Option<u64> },

    #[error("Summarization failed: {0}")]
    Upstream(String),

    #[error("{0}")]
    ClientRequest(String),
}

/// How a failure is presented to whoever sent the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    ClientRequest,
    RateLimited,
    InternalFailure,
}

impl Outcome {
    pub fn status_code(self) -> StatusCode {
        match self {
            Outcome::ClientRequest => StatusCode::BAD_REQUEST,
            Outcome::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Outcome::InternalFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl PipelineError {
    pub fn missing_url() -> Self {
        PipelineError::ClientRequest(URL_REQUIRED.to_string())
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            PipelineError::ClientRequest(_) | PipelineError::EmptyContent => Outcome::ClientRequest,
            PipelineError::QuotaExceeded { .. } => Outcome::RateLimited,
            PipelineError::Transport { .. }
            | PipelineError::Fetch { .. }
            | PipelineError::Configuration(_)
            | PipelineError::Upstream(_) => Outcome::InternalFailure,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.outcome().status_code()
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            PipelineError::QuotaExceeded { retry_after_secs: Some(secs) } => Some(*secs),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
