//! Mapping from [`AppError`] to HTTP responses.

use crate::error::AppError;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Body of every error response: `{"error": {"code", "message"}}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Wrapper to make AppError usable as an axum error response.
#[derive(Debug)]
pub struct ApiErr(pub AppError);

impl ApiErr {
    fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::TeamExists { .. } | AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::PrExists { .. }
            | AppError::PrMerged { .. }
            | AppError::NotAssigned { .. }
            | AppError::NoCandidate { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Database { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            err if err.is_internal() => "Internal server error".to_string(),
            AppError::InvalidInput { message, .. } => message.clone(),
            err => err.to_string(),
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        if self.0.is_internal() {
            log::error!("[http] {}", self.0);
        } else {
            log::debug!("[http] Request rejected: {}", self.0);
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.0.code(),
                message: self.message(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<QueryRejection> for ApiErr {
    fn from(rejection: QueryRejection) -> Self {
        Self(AppError::invalid_input(rejection.body_text()))
    }
}
