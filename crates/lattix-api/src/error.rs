//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use lattix_core::{error::ErrorKind, store::DomainError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unprocessable: {0}")]
  Unprocessable(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error by the domain error behind it, if any.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + DomainError + Send + Sync + 'static,
  {
    let classified = err.domain().map(|d| (d.kind(), d.to_string()));
    match classified {
      Some((ErrorKind::NotFound, message)) => Self::NotFound(message),
      Some((ErrorKind::Conflict, message)) => Self::Conflict(message),
      Some((ErrorKind::Invalid, message)) => Self::Unprocessable(message),
      None => Self::Store(Box::new(err)),
    }
  }
}

impl From<lattix_core::Error> for ApiError {
  fn from(err: lattix_core::Error) -> Self { Self::from_store(err) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_owned()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if matches!(self, ApiError::Unauthorized) {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn domain_errors_map_to_statuses() {
    let cases = [
      (lattix_core::Error::UserNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
      (lattix_core::Error::StepLocked(Uuid::nil()), StatusCode::CONFLICT),
      (
        lattix_core::Error::StepAlreadyCompleted(Uuid::nil()),
        StatusCode::CONFLICT,
      ),
      (lattix_core::Error::EmptyRoadmap, StatusCode::UNPROCESSABLE_ENTITY),
      (
        lattix_core::Error::UnknownTimezone("Nowhere".into()),
        StatusCode::UNPROCESSABLE_ENTITY,
      ),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }

  #[test]
  fn opaque_backend_errors_are_500() {
    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct Opaque;

    impl DomainError for Opaque {
      fn domain(&self) -> Option<&lattix_core::Error> { None }
    }

    let res = ApiError::from_store(Opaque).into_response();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn unauthorized_sets_challenge() {
    let res = ApiError::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
  }
}
