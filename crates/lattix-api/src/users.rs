//! Handlers for `/users` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/users` | Body: `{"email":"…","display_name":"…"}` |
//! | `GET`    | `/users/{id}` | 404 if not found |
//! | `DELETE` | `/users/{id}` | Account cleanup, cascades |
//! | `PUT`    | `/users/{id}/reminders` | Body: `{"enabled":true,"time":"08:00","timezone":"Europe/Berlin"}` |
//! | `POST`   | `/users/{id}/testimonial` | Body: `{"state":"asked_first"}` |
//! | `GET`    | `/users/{id}/notifications` | Optional `?limit=<n>` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use lattix_core::{
  notification::NotificationLog,
  store::ProgressStore,
  testimonial::TestimonialState,
  user::{NewUser, ReminderSettings, User},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /users`
pub async fn create<S: ProgressStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
  if body.email.trim().is_empty() {
    return Err(ApiError::Unprocessable("email must not be blank".into()));
  }

  let user = store.create_user(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Get / delete ────────────────────────────────────────────────────────────

/// `GET /users/{id}`
pub async fn get_one<S: ProgressStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
  let user = store
    .get_user(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(Json(user))
}

/// `DELETE /users/{id}`
pub async fn delete_one<S: ProgressStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if store.delete_user(id).await.map_err(ApiError::from_store)? {
    tracing::info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("user {id} not found")))
  }
}

// ─── Reminders ───────────────────────────────────────────────────────────────

/// `PUT /users/{id}/reminders`
pub async fn update_reminders<S: ProgressStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ReminderSettings>,
) -> Result<Json<User>, ApiError> {
  let user = store
    .update_reminder_settings(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(user))
}

// ─── Testimonial ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TestimonialBody {
  pub state: TestimonialState,
}

/// `POST /users/{id}/testimonial`
pub async fn transition_testimonial<S: ProgressStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<TestimonialBody>,
) -> Result<Json<User>, ApiError> {
  let user = store
    .transition_testimonial(id, body.state)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(user))
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NotificationParams {
  pub limit: Option<usize>,
}

/// `GET /users/{id}/notifications[?limit=<n>]`
pub async fn notifications<S: ProgressStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<NotificationParams>,
) -> Result<Json<Vec<NotificationLog>>, ApiError> {
  if store.get_user(id).await.map_err(ApiError::from_store)?.is_none() {
    return Err(ApiError::NotFound(format!("user {id} not found")));
  }

  let logs = store
    .list_notifications(id, params.limit)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(logs))
}
