//! Client-facing errors.
//!
//! Every failure leaves the server as a fixed message in `{"error": ...}`. The underlying
//! cause stays in the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors returned by the location endpoints.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The store could not be read.
    #[error("Failed to fetch locations")]
    FetchFailed(#[source] pottysnitch_core::Error),

    /// The submission could not be persisted.
    #[error("Failed to save location")]
    SaveFailed(#[source] pottysnitch_core::Error),

    /// The request body was not an acceptable submission.
    #[error("Invalid location payload")]
    MalformedInput(#[source] pottysnitch_core::Error),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::FetchFailed(_) | Self::SaveFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MalformedInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pottysnitch_core::Error;

    #[test]
    fn test_status_mapping() {
        let io = || Error::from(std::io::Error::other("disk full"));

        assert_eq!(
            ApiError::FetchFailed(io()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::SaveFailed(io()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::MalformedInput(Error::invalid_submission("bad")).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_message_hides_cause() {
        let err = ApiError::SaveFailed(Error::corrupt_store("/srv/data/locations.json", "eof"));
        assert_eq!(err.to_string(), "Failed to save location");
    }
}
