use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quire_core::{QuireError, StoreError};
use serde_json::json;

/// Error returned by API handlers.
///
/// Bodies carry a human-readable message only. Transport and storage
/// failures are logged and answered with a generic message.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Quire(QuireError),
}

impl From<QuireError> for ApiError {
    fn from(e: QuireError) -> Self {
        ApiError::Quire(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Quire(QuireError::Store(e))
    }
}

fn status_of(e: &QuireError) -> StatusCode {
    match e {
        QuireError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        QuireError::SiteNotFound(_) | QuireError::NoFeedsFound(_) => StatusCode::NOT_FOUND,
        QuireError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        QuireError::HttpStatus { .. } | QuireError::HttpError(_) => StatusCode::BAD_GATEWAY,
        QuireError::HtmlParseError(_) | QuireError::FeedParseError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_of(e: &QuireError) -> String {
    match e {
        _ if e.is_user_facing() => e.to_string(),
        QuireError::InvalidUrl(_) => e.to_string(),
        QuireError::Timeout { .. } => "The site took too long to respond".to_string(),
        QuireError::HttpStatus { status, .. } => format!("The site responded with HTTP {status}"),
        QuireError::HttpError(_) => "The site could not be reached".to_string(),
        QuireError::HtmlParseError(_) | QuireError::FeedParseError(_) => "The page could not be parsed".to_string(),
        _ => "Internal server error".to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Quire(e) => {
                let status = status_of(e);
                if status.is_server_error() {
                    tracing::error!(error = %e, "request failed");
                } else {
                    tracing::debug!(error = %e, "request rejected");
                }
                (status, message_of(e))
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
