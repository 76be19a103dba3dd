//! Roadmaps and their steps: the ordered learning path assigned to a user.
//!
//! A roadmap owns an ordered list of steps. Each step gates the next: only the
//! step following a completed one may be unlocked, and steps never move
//! backwards through their statuses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Statuses ────────────────────────────────────────────────────────────────

/// Lifecycle of a single step: `locked → unlocked → completed`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StepStatus {
  Locked,
  Unlocked,
  Completed,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RoadmapStatus {
  #[default]
  Active,
  /// Every step has been completed.
  Completed,
  /// Replaced by a newer roadmap for the same user.
  Archived,
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// The user's implementation intention for a step: in `situation`, when
/// `trigger` happens, do `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPlan {
  pub situation: String,
  pub trigger:   String,
  pub action:    String,
}

impl StepPlan {
  /// Trim every field and reject blanks.
  pub fn normalized(self) -> Result<Self> {
    fn field(value: String, name: &'static str) -> Result<String> {
      let trimmed = value.trim();
      if trimmed.is_empty() {
        return Err(Error::EmptyPlanField(name));
      }
      Ok(trimmed.to_owned())
    }

    Ok(Self {
      situation: field(self.situation, "situation")?,
      trigger:   field(self.trigger, "trigger")?,
      action:    field(self.action, "action")?,
    })
  }
}

// ─── Step ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapStep {
  pub step_id:      Uuid,
  pub roadmap_id:   Uuid,
  /// 1-based position; unique within the roadmap.
  pub order:        u32,
  pub status:       StepStatus,
  /// Reference to the knowledge-content item this step teaches.
  pub content_id:   String,
  pub plan:         Option<StepPlan>,
  pub unlocked_at:  Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
}

// ─── Roadmap ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roadmap {
  pub roadmap_id: Uuid,
  pub user_id:    Uuid,
  pub title:      String,
  pub status:     RoadmapStatus,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::ProgressStore::create_roadmap`].
///
/// Steps are ordered `1..=N` following the order of `content_ids`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoadmap {
  pub user_id:     Uuid,
  pub title:       String,
  pub content_ids: Vec<String>,
}

/// Completion counts for a roadmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
  pub completed: usize,
  pub total:     usize,
}

impl Progress {
  pub fn is_finished(&self) -> bool {
    self.total > 0 && self.completed == self.total
  }
}

/// A roadmap together with its steps, sorted by `order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapView {
  pub roadmap: Roadmap,
  pub steps:   Vec<RoadmapStep>,
}

impl RoadmapView {
  /// Build a view, sorting `steps` by order.
  pub fn new(roadmap: Roadmap, mut steps: Vec<RoadmapStep>) -> Self {
    steps.sort_by_key(|s| s.order);
    Self { roadmap, steps }
  }

  /// The lowest-order unlocked step, i.e. what the user is working on now.
  pub fn current_step(&self) -> Option<&RoadmapStep> {
    self.steps.iter().find(|s| s.status == StepStatus::Unlocked)
  }

  pub fn step(&self, step_id: Uuid) -> Option<&RoadmapStep> {
    self.steps.iter().find(|s| s.step_id == step_id)
  }

  pub fn progress(&self) -> Progress {
    Progress {
      completed: self
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Completed)
        .count(),
      total:     self.steps.len(),
    }
  }
}
