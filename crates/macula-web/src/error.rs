//! JSON error responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use macula_core::MaculaError;
use serde::Serialize;
use tracing::error;

/// An error body of the form `{"message": ..., "error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub error: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    error: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error: error.into(),
        }
    }

    pub fn unauthorized(error: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", error)
    }

    /// Replace the headline of a server-side failure, leaving client errors alone.
    pub fn on_failure(mut self, message: &str) -> Self {
        if self.status.is_server_error() {
            self.message = message.to_string();
        }
        self
    }
}

impl From<MaculaError> for ApiError {
    fn from(err: MaculaError) -> Self {
        let (status, message, detail) = match &err {
            MaculaError::Validation(msg) => (StatusCode::BAD_REQUEST, "Invalid request", msg.clone()),
            MaculaError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "Unauthorized", msg.clone()),
            MaculaError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", msg.clone()),
            MaculaError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", msg.clone()),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                other.to_string(),
            ),
        };
        Self::new(status, message, detail)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "Invalid request", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), error = %self.error, "{}", self.message);
        }
        let body = Json(ErrorBody {
            message: &self.message,
            error: &self.error,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macula_db::DbError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (MaculaError::validation("Image is empty"), StatusCode::BAD_REQUEST),
            (MaculaError::unauthorized("no session"), StatusCode::UNAUTHORIZED),
            (MaculaError::NotFound("Analysis not found: 4".into()), StatusCode::NOT_FOUND),
            (MaculaError::Conflict("Username already exists".into()), StatusCode::CONFLICT),
            (MaculaError::classification("HTTP 503"), StatusCode::INTERNAL_SERVER_ERROR),
            (MaculaError::heatmap("renderer crashed"), StatusCode::INTERNAL_SERVER_ERROR),
            (
                MaculaError::Storage(DbError::Constraint("confidence above 100".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_failure_headline_only_for_server_errors() {
        let err = ApiError::from(MaculaError::classification("HTTP 503")).on_failure("Analysis failed");
        assert_eq!(err.message, "Analysis failed");
        assert_eq!(err.error, "Classification failed: HTTP 503");

        let err = ApiError::from(MaculaError::validation("Image is empty")).on_failure("Analysis failed");
        assert_eq!(err.message, "Invalid request");
        assert_eq!(err.error, "Image is empty");
    }
}
