//! Async HTTP client wrapping the Lattix JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use lattix_core::{
  notification::NotificationLog,
  progression::StepCompletion,
  roadmap::{NewRoadmap, Roadmap, RoadmapStep, RoadmapView, StepPlan},
  testimonial::TestimonialState,
  user::{NewUser, ReminderSettings, User},
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use uuid::Uuid;

/// Connection settings for the Lattix API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Counts returned by `POST /api/reminders/check`.
#[derive(Debug, Deserialize)]
pub struct ReminderRunSummary {
  pub checked: usize,
  pub due:     usize,
  pub sent:    usize,
  pub skipped: usize,
  pub failed:  usize,
}

/// Async HTTP client for the Lattix JSON REST API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// Send `req`, turning a non-success status into an error carrying the
  /// server's `{"error": …}` message.
  async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }

    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| v["error"].as_str().map(str::to_owned))
      .unwrap_or_else(|| status.to_string());
    Err(anyhow!("{what} → {status}: {message}"))
  }

  async fn json<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
    self
      .send(req, what)
      .await?
      .json()
      .await
      .with_context(|| format!("deserialising response to {what}"))
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  /// `POST /api/users`
  pub async fn create_user(&self, input: &NewUser) -> Result<User> {
    self
      .json(self.client.post(self.url("/users")).json(input), "POST /users")
      .await
  }

  /// `GET /api/users/{id}`
  pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
    self
      .json(self.client.get(self.url(&format!("/users/{user_id}"))), "GET /users/{id}")
      .await
  }

  /// `DELETE /api/users/{id}`
  pub async fn delete_user(&self, user_id: Uuid) -> Result<()> {
    self
      .send(
        self.client.delete(self.url(&format!("/users/{user_id}"))),
        "DELETE /users/{id}",
      )
      .await?;
    Ok(())
  }

  /// `PUT /api/users/{id}/reminders`
  pub async fn update_reminders(
    &self,
    user_id: Uuid,
    settings: &ReminderSettings,
  ) -> Result<User> {
    self
      .json(
        self
          .client
          .put(self.url(&format!("/users/{user_id}/reminders")))
          .json(settings),
        "PUT /users/{id}/reminders",
      )
      .await
  }

  /// `POST /api/users/{id}/testimonial`
  pub async fn transition_testimonial(
    &self,
    user_id: Uuid,
    state: TestimonialState,
  ) -> Result<User> {
    self
      .json(
        self
          .client
          .post(self.url(&format!("/users/{user_id}/testimonial")))
          .json(&json!({ "state": state })),
        "POST /users/{id}/testimonial",
      )
      .await
  }

  /// `GET /api/users/{id}/notifications[?limit=<n>]`
  pub async fn notifications(
    &self,
    user_id: Uuid,
    limit: Option<usize>,
  ) -> Result<Vec<NotificationLog>> {
    let mut req = self
      .client
      .get(self.url(&format!("/users/{user_id}/notifications")));
    if let Some(limit) = limit {
      req = req.query(&[("limit", limit)]);
    }
    self.json(req, "GET /users/{id}/notifications").await
  }

  // ── Roadmaps ──────────────────────────────────────────────────────────────

  /// `GET /api/users/{id}/roadmap`; `None` if the user has no roadmap.
  pub async fn current_roadmap(&self, user_id: Uuid) -> Result<Option<RoadmapView>> {
    let resp = self
      .client
      .get(self.url(&format!("/users/{user_id}/roadmap")))
      .send()
      .await
      .context("GET /users/{id}/roadmap failed")?;

    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !resp.status().is_success() {
      return Err(anyhow!("GET /users/{{id}}/roadmap → {}", resp.status()));
    }
    resp.json().await.map(Some).context("deserialising roadmap")
  }

  /// `GET /api/users/{id}/roadmaps`
  pub async fn list_roadmaps(&self, user_id: Uuid) -> Result<Vec<Roadmap>> {
    self
      .json(
        self.client.get(self.url(&format!("/users/{user_id}/roadmaps"))),
        "GET /users/{id}/roadmaps",
      )
      .await
  }

  /// `POST /api/roadmaps`
  pub async fn create_roadmap(&self, input: &NewRoadmap) -> Result<RoadmapView> {
    self
      .json(self.client.post(self.url("/roadmaps")).json(input), "POST /roadmaps")
      .await
  }

  /// `POST /api/roadmaps/{id}/steps/{step_id}/complete`
  pub async fn complete_step(
    &self,
    roadmap_id: Uuid,
    step_id: Uuid,
  ) -> Result<StepCompletion> {
    self
      .json(
        self.client.post(
          self.url(&format!("/roadmaps/{roadmap_id}/steps/{step_id}/complete")),
        ),
        "POST /roadmaps/{id}/steps/{step_id}/complete",
      )
      .await
  }

  /// `PUT /api/roadmaps/{id}/steps/{step_id}/plan`
  pub async fn commit_plan(
    &self,
    roadmap_id: Uuid,
    step_id: Uuid,
    plan: &StepPlan,
  ) -> Result<RoadmapStep> {
    self
      .json(
        self
          .client
          .put(self.url(&format!("/roadmaps/{roadmap_id}/steps/{step_id}/plan")))
          .json(plan),
        "PUT /roadmaps/{id}/steps/{step_id}/plan",
      )
      .await
  }

  // ── Reminders ─────────────────────────────────────────────────────────────

  /// `POST /api/reminders/check`
  pub async fn check_reminders(&self, secret: &str) -> Result<ReminderRunSummary> {
    self
      .json(
        self.client.post(self.url("/reminders/check")).bearer_auth(secret),
        "POST /reminders/check",
      )
      .await
  }
}
