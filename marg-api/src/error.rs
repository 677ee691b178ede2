use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use marg_booking::BookingError;
use marg_catalog::CatalogError;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    GoneError(String),
    BadGatewayError(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::GoneError(msg) => (StatusCode::GONE, msg),
            AppError::BadGatewayError(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let msg = err.to_string();
        match err {
            BookingError::Validation(_) => AppError::ValidationError(msg),
            BookingError::NotFound(_) => AppError::NotFoundError(msg),
            BookingError::SeatUnavailable(_) => AppError::ConflictError(msg),
            BookingError::HoldExpired(_) => AppError::GoneError(msg),
            BookingError::AlreadyValidated(_)
            | BookingError::AlreadyIssued(_)
            | BookingError::PaymentRequired(_)
            | BookingError::InvalidTransition { .. } => AppError::ConflictError(msg),
            BookingError::Payment(_) => AppError::BadGatewayError(msg),
            BookingError::Store(_) => AppError::InternalServerError(msg),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let msg = err.to_string();
        match err {
            CatalogError::Validation(_) => AppError::ValidationError(msg),
            CatalogError::NotFound(_) => AppError::NotFoundError(msg),
        }
    }
}
