//! Error envelope shared by all handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reconcile_core::IdentityError;
use serde::Serialize;

use crate::config::Environment;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Failure returned by a handler.
#[derive(Debug)]
pub enum ApiError {
    /// 400: the caller sent something unusable.
    BadRequest(String),
    /// 500: `details` is only populated in development.
    Internal {
        message: String,
        details: Option<String>,
    },
}

impl ApiError {
    pub fn internal(details: impl ToString, environment: Environment) -> Self {
        Self::Internal {
            message: "Internal server error".to_string(),
            details: environment
                .exposes_error_details()
                .then(|| details.to_string()),
        }
    }

    pub fn from_identity(err: IdentityError, environment: Environment) -> Self {
        match err {
            IdentityError::InvalidFragment(reason) => Self::BadRequest(reason.to_string()),
            IdentityError::StoreUnavailable(reason) => Self::internal(reason, environment),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            Self::BadRequest(message) => ErrorDetail {
                message,
                details: None,
            },
            Self::Internal { message, details } => ErrorDetail { message, details },
        };
        (status, Json(ErrorBody { error: detail })).into_response()
    }
}
