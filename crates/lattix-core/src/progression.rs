//! Step-unlock progression.
//!
//! Completing a step is a two-part transition: the step itself moves to
//! `completed` and the step with the next-higher `order` moves from `locked`
//! to `unlocked`. Both parts belong to one atomic unit; a backend applies a
//! [`CompletionPlan`] inside a single transaction and fails the whole
//! operation if either write does not land.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  roadmap::{RoadmapStep, StepStatus},
};

// ─── Plan ────────────────────────────────────────────────────────────────────

/// The writes required to complete one step, decided from a consistent
/// snapshot of the roadmap's steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPlan {
  /// The step moving `unlocked → completed`.
  pub step_id:          Uuid,
  /// The successor moving `locked → unlocked`, if there is one and it is
  /// still locked.
  pub unlock:           Option<Uuid>,
  /// Every step of the roadmap is completed once this plan is applied.
  pub finishes_roadmap: bool,
}

/// Decide what completing `step_id` does to `steps` (all steps of a single
/// roadmap, in any order).
///
/// Fails with [`Error::StepNotFound`] if the step is not part of `steps`,
/// [`Error::StepLocked`] if it has not been unlocked yet, and
/// [`Error::StepAlreadyCompleted`] if it is already completed. None of these
/// cases produce any writes.
pub fn plan_completion(
  roadmap_id: Uuid,
  steps: &[RoadmapStep],
  step_id: Uuid,
) -> Result<CompletionPlan> {
  let step = steps
    .iter()
    .find(|s| s.step_id == step_id)
    .ok_or(Error::StepNotFound { roadmap_id, step_id })?;

  match step.status {
    StepStatus::Locked => return Err(Error::StepLocked(step_id)),
    StepStatus::Completed => return Err(Error::StepAlreadyCompleted(step_id)),
    StepStatus::Unlocked => {}
  }

  let successor = steps
    .iter()
    .filter(|s| s.order > step.order)
    .min_by_key(|s| s.order);

  let unlock = successor
    .filter(|s| s.status == StepStatus::Locked)
    .map(|s| s.step_id);

  let finishes_roadmap = steps
    .iter()
    .all(|s| s.step_id == step_id || s.status == StepStatus::Completed);

  Ok(CompletionPlan { step_id, unlock, finishes_roadmap })
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// The result of a successful completion, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCompletion {
  pub completed:        RoadmapStep,
  /// The successor that was unlocked by this completion.
  pub unlocked:         Option<RoadmapStep>,
  pub roadmap_finished: bool,
}
