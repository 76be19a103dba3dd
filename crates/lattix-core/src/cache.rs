//! Client-side cache of each user's current roadmap.
//!
//! The cache mirrors server state and is only ever refreshed or dropped at
//! explicit points:
//!
//! - [`RoadmapCache::invalidate_user`] after a mutation whose response does
//!   not carry the new state,
//! - [`RoadmapCache::apply_completion`] / [`RoadmapCache::apply_step`] after a
//!   mutation whose response does,
//! - [`RoadmapCache::clear`] on sign-out,
//! - expiry after the configured TTL.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::{
  progression::StepCompletion,
  roadmap::{RoadmapStatus, RoadmapStep, RoadmapView},
};

#[derive(Debug, Clone)]
struct Entry {
  view:       RoadmapView,
  fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RoadmapCache {
  ttl:     TimeDelta,
  entries: HashMap<Uuid, Entry>,
}

impl RoadmapCache {
  pub fn new(ttl: TimeDelta) -> Self {
    Self { ttl, entries: HashMap::new() }
  }

  /// The cached view for `user_id`, if present and younger than the TTL.
  pub fn get(&self, user_id: Uuid, now: DateTime<Utc>) -> Option<&RoadmapView> {
    self
      .entries
      .get(&user_id)
      .filter(|e| now - e.fetched_at < self.ttl)
      .map(|e| &e.view)
  }

  pub fn insert(&mut self, user_id: Uuid, view: RoadmapView, now: DateTime<Utc>) {
    self.entries.insert(user_id, Entry { view, fetched_at: now });
  }

  pub fn invalidate_user(&mut self, user_id: Uuid) {
    self.entries.remove(&user_id);
  }

  pub fn clear(&mut self) { self.entries.clear(); }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  /// Fold a completion result into the cached view.
  ///
  /// If the cached view is for a different roadmap, the entry is dropped
  /// instead.
  pub fn apply_completion(&mut self, user_id: Uuid, completion: &StepCompletion) {
    let applied = self.apply_step(user_id, &completion.completed)
      && completion
        .unlocked
        .as_ref()
        .is_none_or(|step| self.apply_step(user_id, step));

    if !applied {
      self.invalidate_user(user_id);
      return;
    }

    if completion.roadmap_finished
      && let Some(entry) = self.entries.get_mut(&user_id)
    {
      entry.view.roadmap.status = RoadmapStatus::Completed;
    }
  }

  /// Replace one step in the cached view. Returns `false` (and drops the
  /// entry) if the step does not belong to the cached roadmap.
  pub fn apply_step(&mut self, user_id: Uuid, step: &RoadmapStep) -> bool {
    let Some(entry) = self.entries.get_mut(&user_id) else {
      return false;
    };

    match entry.view.steps.iter_mut().find(|s| s.step_id == step.step_id) {
      Some(slot) => {
        *slot = step.clone();
        true
      }
      None => {
        self.entries.remove(&user_id);
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::roadmap::{Roadmap, StepStatus};

  fn view(user_id: Uuid) -> RoadmapView {
    let roadmap_id = Uuid::new_v4();
    let steps = (1..=2)
      .map(|order| RoadmapStep {
        step_id: Uuid::new_v4(),
        roadmap_id,
        order,
        status: if order == 1 { StepStatus::Unlocked } else { StepStatus::Locked },
        content_id: format!("c{order}"),
        plan: None,
        unlocked_at: None,
        completed_at: None,
      })
      .collect();
    RoadmapView::new(
      Roadmap {
        roadmap_id,
        user_id,
        title: "Models".into(),
        status: RoadmapStatus::Active,
        created_at: Utc::now(),
      },
      steps,
    )
  }

  #[test]
  fn entries_expire_after_ttl() {
    let mut cache = RoadmapCache::new(TimeDelta::minutes(5));
    let user = Uuid::new_v4();
    let t0 = Utc::now();
    cache.insert(user, view(user), t0);

    assert!(cache.get(user, t0 + TimeDelta::minutes(4)).is_some());
    assert!(cache.get(user, t0 + TimeDelta::minutes(5)).is_none());
  }

  #[test]
  fn invalidate_and_clear() {
    let mut cache = RoadmapCache::new(TimeDelta::hours(1));
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let now = Utc::now();
    cache.insert(a, view(a), now);
    cache.insert(b, view(b), now);

    cache.invalidate_user(a);
    assert!(cache.get(a, now).is_none());
    assert!(cache.get(b, now).is_some());

    cache.clear();
    assert!(cache.is_empty());
  }

  #[test]
  fn completion_updates_cached_steps() {
    let mut cache = RoadmapCache::new(TimeDelta::hours(1));
    let user = Uuid::new_v4();
    let now = Utc::now();
    let v = view(user);

    let mut completed = v.steps[0].clone();
    completed.status = StepStatus::Completed;
    let mut unlocked = v.steps[1].clone();
    unlocked.status = StepStatus::Unlocked;
    cache.insert(user, v, now);

    cache.apply_completion(user, &StepCompletion {
      completed,
      unlocked: Some(unlocked),
      roadmap_finished: false,
    });

    let cached = cache.get(user, now).unwrap();
    assert_eq!(cached.steps[0].status, StepStatus::Completed);
    assert_eq!(cached.current_step().map(|s| s.order), Some(2));
  }

  #[test]
  fn completion_for_another_roadmap_drops_entry() {
    let mut cache = RoadmapCache::new(TimeDelta::hours(1));
    let user = Uuid::new_v4();
    let now = Utc::now();
    cache.insert(user, view(user), now);

    let foreign = view(user).steps[0].clone();
    cache.apply_completion(user, &StepCompletion {
      completed:        foreign,
      unlocked:         None,
      roadmap_finished: false,
    });
    assert!(cache.get(user, now).is_none());
  }
}
