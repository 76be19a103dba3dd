//! Shared-secret bearer auth for scheduler-triggered endpoints.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{FromRef, FromRequestParts},
  http::{HeaderMap, header, request::Parts},
};

use crate::error::ApiError;

/// The secret accepted on `POST /reminders/check`.
#[derive(Clone)]
pub struct CronAuth {
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub secret_hash: String,
}

/// Zero-size marker: present in the handler means the bearer token matched.
pub struct CronAuthorized;

/// Verify `Authorization: Bearer <secret>` against the configured hash.
pub fn verify_bearer(headers: &HeaderMap, auth: &CronAuth) -> Result<(), ApiError> {
  let token = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or(ApiError::Unauthorized)?;

  let parsed_hash =
    PasswordHash::new(&auth.secret_hash).map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(token.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)
}

impl<S> FromRequestParts<S> for CronAuthorized
where
  Arc<CronAuth>: FromRef<S>,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &S,
  ) -> Result<Self, Self::Rejection> {
    let auth = Arc::<CronAuth>::from_ref(state);
    verify_bearer(&parts.headers, &auth)?;
    Ok(CronAuthorized)
  }
}

#[cfg(test)]
mod tests {
  use argon2::{PasswordHasher, password_hash::SaltString};
  use axum::{body::Body, http::Request};
  use rand_core::OsRng;

  use super::*;

  fn cron_auth(secret: &str) -> Arc<CronAuth> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(secret.as_bytes(), &salt)
      .unwrap()
      .to_string();
    Arc::new(CronAuth { secret_hash: hash })
  }

  async fn extract(
    req: Request<Body>,
    state: &Arc<CronAuth>,
  ) -> Result<CronAuthorized, ApiError> {
    let (mut parts, _) = req.into_parts();
    CronAuthorized::from_request_parts(&mut parts, state).await
  }

  #[tokio::test]
  async fn correct_secret() {
    let state = cron_auth("tick");
    let req = Request::builder()
      .header(header::AUTHORIZATION, "Bearer tick")
      .body(Body::empty())
      .unwrap();
    assert!(extract(req, &state).await.is_ok());
  }

  #[tokio::test]
  async fn wrong_secret() {
    let state = cron_auth("tick");
    let req = Request::builder()
      .header(header::AUTHORIZATION, "Bearer tock")
      .body(Body::empty())
      .unwrap();
    assert!(matches!(extract(req, &state).await, Err(ApiError::Unauthorized)));
  }

  #[tokio::test]
  async fn missing_header() {
    let state = cron_auth("tick");
    let req = Request::builder().body(Body::empty()).unwrap();
    assert!(matches!(extract(req, &state).await, Err(ApiError::Unauthorized)));
  }

  #[tokio::test]
  async fn wrong_scheme() {
    let state = cron_auth("tick");
    let req = Request::builder()
      .header(header::AUTHORIZATION, "Basic dGljaw==")
      .body(Body::empty())
      .unwrap();
    assert!(matches!(extract(req, &state).await, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn malformed_hash_rejects_everything() {
    let auth = CronAuth { secret_hash: "not-a-phc-string".into() };
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, "Bearer tick".parse().unwrap());
    assert!(verify_bearer(&headers, &auth).is_err());
  }
}
