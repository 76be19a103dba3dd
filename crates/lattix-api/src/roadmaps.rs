//! Handlers for roadmap endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/roadmaps` | Body: `{"user_id":"…","title":"…","content_ids":["…"]}` |
//! | `GET`  | `/roadmaps/{id}` | 404 if not found |
//! | `POST` | `/roadmaps/{id}/steps/{step_id}/complete` | 409 if locked or already completed |
//! | `PUT`  | `/roadmaps/{id}/steps/{step_id}/plan` | Body: `{"situation":"…","trigger":"…","action":"…"}` |
//! | `GET`  | `/users/{id}/roadmap` | The user's current roadmap; 404 if none |
//! | `GET`  | `/users/{id}/roadmaps` | Newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use lattix_core::{
  progression::StepCompletion,
  roadmap::{NewRoadmap, Progress, Roadmap, RoadmapStep, RoadmapView, StepPlan},
  store::ProgressStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;

/// A roadmap view with its derived fields spelled out for clients.
#[derive(Debug, Serialize)]
pub struct RoadmapResponse {
  #[serde(flatten)]
  pub view:         RoadmapView,
  pub current_step: Option<Uuid>,
  pub progress:     Progress,
}

impl From<RoadmapView> for RoadmapResponse {
  fn from(view: RoadmapView) -> Self {
    Self {
      current_step: view.current_step().map(|s| s.step_id),
      progress: view.progress(),
      view,
    }
  }
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /roadmaps`
pub async fn create<S: ProgressStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewRoadmap>,
) -> Result<impl IntoResponse, ApiError> {
  let view = store.create_roadmap(body).await.map_err(ApiError::from_store)?;
  tracing::info!(
    user_id = %view.roadmap.user_id,
    roadmap_id = %view.roadmap.roadmap_id,
    steps = view.steps.len(),
    "roadmap created"
  );
  Ok((StatusCode::CREATED, Json(RoadmapResponse::from(view))))
}

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /roadmaps/{id}`
pub async fn get_one<S: ProgressStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RoadmapResponse>, ApiError> {
  let view = store
    .get_roadmap(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("roadmap {id} not found")))?;
  Ok(Json(view.into()))
}

/// `GET /users/{id}/roadmap`
pub async fn current<S: ProgressStore>(
  State(store): State<Arc<S>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<RoadmapResponse>, ApiError> {
  let view = store
    .current_roadmap(user_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("user {user_id} has no current roadmap"))
    })?;
  Ok(Json(view.into()))
}

/// `GET /users/{id}/roadmaps`
pub async fn list<S: ProgressStore>(
  State(store): State<Arc<S>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Roadmap>>, ApiError> {
  let roadmaps = store
    .list_roadmaps(user_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(roadmaps))
}

// ─── Progression ─────────────────────────────────────────────────────────────

/// `POST /roadmaps/{id}/steps/{step_id}/complete`
pub async fn complete_step<S: ProgressStore>(
  State(store): State<Arc<S>>,
  Path((roadmap_id, step_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<StepCompletion>, ApiError> {
  let completion = store
    .complete_step(roadmap_id, step_id)
    .await
    .map_err(|e| {
      tracing::warn!(%roadmap_id, %step_id, error = %e, "step completion rejected");
      ApiError::from_store(e)
    })?;

  tracing::info!(
    %roadmap_id,
    %step_id,
    unlocked = ?completion.unlocked.as_ref().map(|s| s.step_id),
    finished = completion.roadmap_finished,
    "step completed"
  );
  Ok(Json(completion))
}

/// `PUT /roadmaps/{id}/steps/{step_id}/plan`
pub async fn commit_plan<S: ProgressStore>(
  State(store): State<Arc<S>>,
  Path((roadmap_id, step_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<StepPlan>,
) -> Result<Json<RoadmapStep>, ApiError> {
  let step = store
    .commit_plan(roadmap_id, step_id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(step))
}
