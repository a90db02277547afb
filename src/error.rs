use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid quiz configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("Generation failed: {0}")]
    GenerationTransport(String),

    #[error("Malformed AI response: {0}")]
    ResponseFormat(String),

    #[error("Image resolution failed: {0}")]
    ImageResolution(String),

    #[error("Reference file rejected: {0}")]
    FileIngestion(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

impl Error {
    /// Stable machine-readable tag for the error body.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::ConfigurationInvalid(_) => "configuration_invalid",
            Error::GenerationTransport(_) => "generation_transport",
            Error::ResponseFormat(_) => "response_format",
            Error::ImageResolution(_) => "image_resolution",
            Error::FileIngestion(_) => "file_ingestion",
            Error::Conflict(_) => "conflict",
            Error::BadRequest(_) => "bad_request",
            Error::NotFound(_) => "not_found",
            Error::Validation(_) => "validation",
            Error::Json(_) => "json",
            Error::Internal(_) => "internal",
            Error::Multipart(_) => "multipart",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let kind = self.kind();
        let (status, error_message) = match self {
            Error::ConfigurationInvalid(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Error::GenerationTransport(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Quiz generation failed: {}", msg),
            ),
            Error::ResponseFormat(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("AI response could not be processed: {}", msg),
            ),
            Error::ImageResolution(msg) => (StatusCode::BAD_GATEWAY, msg),
            Error::FileIngestion(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg),
            Error::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Multipart(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Error::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message, "kind": kind }));
        (status, body).into_response()
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::GenerationTransport(err.to_string())
    }
}
