//! Error types for `lattix-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::testimonial::TestimonialState;

#[derive(Debug, Error)]
pub enum Error {
  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("a user with email {0:?} already exists")]
  EmailTaken(String),

  #[error("roadmap not found: {0}")]
  RoadmapNotFound(Uuid),

  #[error("step {step_id} not found in roadmap {roadmap_id}")]
  StepNotFound { roadmap_id: Uuid, step_id: Uuid },

  #[error("step {0} is still locked")]
  StepLocked(Uuid),

  #[error("step {0} is already completed")]
  StepAlreadyCompleted(Uuid),

  /// The completion of `step_id` was rolled back because its successor could
  /// not be unlocked.
  #[error("failed to unlock step {successor_id} after completing {step_id}: {reason}")]
  SuccessorUnlockFailed {
    step_id:      Uuid,
    successor_id: Uuid,
    reason:       String,
  },

  #[error("testimonial state cannot move from {from} to {to}")]
  InvalidTestimonialTransition {
    from: TestimonialState,
    to:   TestimonialState,
  },

  #[error("a roadmap needs at least one step")]
  EmptyRoadmap,

  #[error("plan field `{0}` must not be blank")]
  EmptyPlanField(&'static str),

  #[error("invalid reminder time {0:?}, expected HH:MM")]
  InvalidReminderTime(String),

  #[error("unknown timezone: {0:?}")]
  UnknownTimezone(String),
}

/// Coarse classification used by transport layers to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  /// The request is well-formed but conflicts with the current state.
  Conflict,
  /// The request itself is malformed.
  Invalid,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::UserNotFound(_)
      | Self::RoadmapNotFound(_)
      | Self::StepNotFound { .. } => ErrorKind::NotFound,
      Self::EmailTaken(_)
      | Self::StepLocked(_)
      | Self::StepAlreadyCompleted(_)
      | Self::SuccessorUnlockFailed { .. }
      | Self::InvalidTestimonialTransition { .. } => ErrorKind::Conflict,
      Self::EmptyRoadmap
      | Self::EmptyPlanField(_)
      | Self::InvalidReminderTime(_)
      | Self::UnknownTimezone(_) => ErrorKind::Invalid,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
