use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app_error::{AppError, ErrorCode};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        tracing::error!(error = ?self, "Request failed");

        match self {
            AppError::Database(_) => {
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError, None)
            }
            AppError::Unauthorized => {
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, None)
            }
            AppError::RateLimited => {
                error_resp(StatusCode::TOO_MANY_REQUESTS, ErrorCode::RateLimited, None)
            }
            AppError::InvalidInput(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, Some(msg))
            }
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            AppError::UpgradeRequired(msg) => {
                error_resp(StatusCode::FORBIDDEN, ErrorCode::UpgradeRequired, Some(msg))
            }
            AppError::NoActiveSubscription => {
                let msg = AppError::NoActiveSubscription.to_string();
                error_resp(
                    StatusCode::BAD_REQUEST,
                    ErrorCode::NoActiveSubscription,
                    Some(msg),
                )
            }
            AppError::CustomerIdNotFound => {
                let msg = AppError::CustomerIdNotFound.to_string();
                error_resp(
                    StatusCode::BAD_REQUEST,
                    ErrorCode::CustomerIdNotFound,
                    Some(msg),
                )
            }
            AppError::CheckoutCreationFailed => error_resp(
                StatusCode::BAD_GATEWAY,
                ErrorCode::CheckoutCreationFailed,
                None,
            ),
            AppError::PortalCreationFailed => error_resp(
                StatusCode::BAD_GATEWAY,
                ErrorCode::PortalCreationFailed,
                None,
            ),
            AppError::MissingEventMetadata(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::MissingEventMetadata,
                None,
            ),
            AppError::SignatureVerification(msg) => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::SignatureVerification,
                Some(msg),
            ),
            AppError::Internal(_) => {
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError, None)
            }
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
