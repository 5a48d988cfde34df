use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors, one variant per pipeline stage
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Prompt optimization failed: {0}")]
    Extraction(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector search failed: {0}")]
    Search(String),

    #[error("Vector search returned no matches")]
    NoMatches,

    #[error("Processing recommendations failed: {0}")]
    Synthesis(String),
}

impl AppError {
    /// Stage label used in logs
    pub fn stage(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Extraction(_) => "extraction",
            AppError::Embedding(_) => "embedding",
            AppError::Search(_) | AppError::NoMatches => "search",
            AppError::Synthesis(_) => "synthesis",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Malformed completion envelopes. Each variant keeps the raw body.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    #[error("API error: {error}")]
    ProviderError { error: String, body: String },

    #[error("no choices in response: {body}")]
    MissingChoices { body: String },

    #[error("empty choices in response: {body}")]
    EmptyChoices { body: String },

    #[error("invalid message format: {body}")]
    MissingMessage { body: String },

    #[error("invalid content format: {body}")]
    NonStringContent { body: String },

    #[error("failed to parse AI response: {reason}, body: {body}")]
    Undecodable { reason: String, body: String },
}

impl From<EnvelopeError> for AppError {
    fn from(err: EnvelopeError) -> Self {
        AppError::Synthesis(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
