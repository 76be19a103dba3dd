//! Client session: the API client plus the roadmap cache, kept coherent with
//! the server by the mutations made through it.

use anyhow::{Result, anyhow};
use chrono::{TimeDelta, Utc};
use lattix_core::{
  cache::RoadmapCache,
  progression::StepCompletion,
  roadmap::{NewRoadmap, RoadmapStep, RoadmapView, StepPlan},
};
use uuid::Uuid;

use crate::client::ApiClient;

/// How long a fetched roadmap is trusted before it is fetched again.
const CACHE_TTL_MINUTES: i64 = 5;

pub struct Session {
  pub client: ApiClient,
  cache:      RoadmapCache,
}

impl Session {
  pub fn new(client: ApiClient) -> Self {
    Self { client, cache: RoadmapCache::new(TimeDelta::minutes(CACHE_TTL_MINUTES)) }
  }

  /// The user's current roadmap, from the cache when fresh.
  pub async fn current_roadmap(&mut self, user_id: Uuid) -> Result<Option<RoadmapView>> {
    let now = Utc::now();
    if let Some(view) = self.cache.get(user_id, now) {
      tracing::debug!(%user_id, "roadmap cache hit");
      return Ok(Some(view.clone()));
    }

    let view = self.client.current_roadmap(user_id).await?;
    if let Some(view) = &view {
      self.cache.insert(user_id, view.clone(), now);
    }
    Ok(view)
  }

  pub async fn create_roadmap(&mut self, input: &NewRoadmap) -> Result<RoadmapView> {
    let view = self.client.create_roadmap(input).await?;
    self.cache.insert(input.user_id, view.clone(), Utc::now());
    Ok(view)
  }

  /// Complete `step_id`, or the current step of the current roadmap when
  /// `step_id` is `None`.
  pub async fn complete_step(
    &mut self,
    user_id: Uuid,
    step_id: Option<Uuid>,
  ) -> Result<StepCompletion> {
    let (roadmap_id, step_id) = self.resolve_step(user_id, step_id).await?;
    let completion = self.client.complete_step(roadmap_id, step_id).await;
    match completion {
      Ok(completion) => {
        self.cache.apply_completion(user_id, &completion);
        Ok(completion)
      }
      Err(e) => {
        // The cached view may be what made us pick a stale step.
        self.cache.invalidate_user(user_id);
        Err(e)
      }
    }
  }

  pub async fn commit_plan(
    &mut self,
    user_id: Uuid,
    step_id: Option<Uuid>,
    plan: &StepPlan,
  ) -> Result<RoadmapStep> {
    let (roadmap_id, step_id) = self.resolve_step(user_id, step_id).await?;
    let step = self.client.commit_plan(roadmap_id, step_id, plan).await?;
    self.cache.apply_step(user_id, &step);
    Ok(step)
  }

  /// Delete the account, then sign out: nothing cached survives it.
  pub async fn delete_user(&mut self, user_id: Uuid) -> Result<()> {
    self.client.delete_user(user_id).await?;
    self.sign_out();
    Ok(())
  }

  pub fn sign_out(&mut self) { self.cache.clear(); }

  async fn resolve_step(
    &mut self,
    user_id: Uuid,
    step_id: Option<Uuid>,
  ) -> Result<(Uuid, Uuid)> {
    let view = self
      .current_roadmap(user_id)
      .await?
      .ok_or_else(|| anyhow!("user {user_id} has no current roadmap"))?;

    let step = match step_id {
      Some(id) => view.step(id),
      None => view.current_step(),
    }
    .ok_or_else(|| match step_id {
      Some(id) => anyhow!("step {id} is not part of the current roadmap"),
      None => anyhow!("the current roadmap has no unlocked step"),
    })?;

    Ok((view.roadmap.roadmap_id, step.step_id))
  }
}
