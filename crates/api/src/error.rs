//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::CoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed consumer identity.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Resource not found.
    NotFound(String),
    /// Engine error.
    Core(CoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(msg) => error_body(StatusCode::UNAUTHORIZED, &msg),
            ApiError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, &msg),
            ApiError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, &msg),
            ApiError::Core(err) => core_error_to_response(err),
        }
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "error": message });
    (status, axum::Json(body)).into_response()
}

fn core_error_to_response(err: CoreError) -> Response {
    match &err {
        CoreError::ProductNotFound(_)
        | CoreError::OrderNotFound(_)
        | CoreError::CartLineNotFound(_) => error_body(StatusCode::NOT_FOUND, &err.to_string()),

        CoreError::InvalidQuantity | CoreError::EmptyCart => {
            error_body(StatusCode::BAD_REQUEST, &err.to_string())
        }

        // Conflicts carry the live value so the caller can retry with a
        // corrected request.
        CoreError::InsufficientStock { available, .. } => {
            let body = serde_json::json!({
                "error": err.to_string(),
                "available": available,
            });
            (StatusCode::CONFLICT, axum::Json(body)).into_response()
        }

        CoreError::PriceChanged { live, .. } => {
            let body = serde_json::json!({
                "error": err.to_string(),
                "live_price_cents": live.cents(),
            });
            (StatusCode::CONFLICT, axum::Json(body)).into_response()
        }

        CoreError::InvalidTransition {
            current, allowed, ..
        } => {
            let body = serde_json::json!({
                "error": err.to_string(),
                "current": current,
                "allowed": allowed,
            });
            (StatusCode::CONFLICT, axum::Json(body)).into_response()
        }

        CoreError::ProductInvalid { .. } => {
            error_body(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string())
        }

        CoreError::CheckoutRejected { problems } => {
            let body = serde_json::json!({
                "error": err.to_string(),
                "problems": problems,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response()
        }

        // Store failures stay opaque to the caller.
        CoreError::Store(store_err) => {
            tracing::error!(error = %store_err, "store failure");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Core(err)
    }
}
