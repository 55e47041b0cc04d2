//! Extractors whose rejections use the API error envelope.

use axum::extract::{FromRequestParts, Path, rejection::PathRejection};

use crate::error::ApiError;

/// [`Path`] that rejects unparsable segments as `{"error": ...}` with 400.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct Ids<T>(pub T);

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}
