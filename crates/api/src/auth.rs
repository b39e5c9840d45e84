//! Consumer identity extraction.
//!
//! The upstream identity provider authenticates every request and injects
//! the consumer id as a header; this extractor trusts it without
//! re-verifying credentials.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use common::ConsumerId;

use crate::error::ApiError;

/// Header carrying the authenticated consumer id.
pub const CONSUMER_HEADER: &str = "x-consumer-id";

/// The authenticated consumer making the request.
#[derive(Debug, Clone, Copy)]
pub struct Consumer(pub ConsumerId);

impl<S: Send + Sync> FromRequestParts<S> for Consumer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(CONSUMER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<ConsumerId>().ok())
            .ok_or_else(|| {
                ApiError::Unauthorized(format!("Missing or invalid {CONSUMER_HEADER} header"))
            })?;
        Ok(Consumer(id))
    }
}
