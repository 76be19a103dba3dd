//! The `ProgressStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `lattix-store-sqlite`).
//! Higher layers (`lattix-api`, `lattix-server`) depend on this abstraction,
//! not on any concrete backend. Each method is a typed repository operation
//! with its pre- and post-conditions stated on the method.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Error,
  notification::{NewNotificationLog, NotificationLog},
  progression::StepCompletion,
  roadmap::{NewRoadmap, Roadmap, RoadmapStep, RoadmapView, StepPlan},
  testimonial::TestimonialState,
  user::{NewUser, ReminderSettings, User},
};

// ─── Domain error access ─────────────────────────────────────────────────────

/// Gives higher layers access to the domain error behind a backend error, so
/// they can tell "not found" or "conflict" apart from an I/O failure without
/// knowing the backend.
pub trait DomainError {
  fn domain(&self) -> Option<&Error>;
}

impl DomainError for Error {
  fn domain(&self) -> Option<&Error> { Some(self) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Lattix progression store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ProgressStore: Send + Sync {
  type Error: std::error::Error + DomainError + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user with default reminder preferences and testimonial state
  /// `not_asked`.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by UUID. Returns `None` if not found.
  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Account cleanup: delete the user together with their roadmaps, steps
  /// and notification logs. Returns `false` if the user did not exist.
  fn delete_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Replace a user's reminder settings.
  ///
  /// The time and timezone are validated before anything is written. A
  /// missing timezone keeps the current one. `last_sent` is untouched.
  fn update_reminder_settings(
    &self,
    user_id: Uuid,
    settings: ReminderSettings,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Move the user's testimonial state to `to`.
  ///
  /// Fails with `InvalidTestimonialTransition` if the transition is not in
  /// the table. The write is conditional on the state that was validated.
  fn transition_testimonial(
    &self,
    user_id: Uuid,
    to: TestimonialState,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Users with reminders enabled and a reminder time set.
  fn list_reminder_candidates(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Stamp `reminder_last_sent`.
  fn record_reminder_sent(
    &self,
    user_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Roadmaps ──────────────────────────────────────────────────────────

  /// Create a roadmap whose first step is unlocked and the rest locked.
  ///
  /// Any earlier roadmap of the same user that is not archived becomes
  /// archived in the same transaction.
  fn create_roadmap(
    &self,
    input: NewRoadmap,
  ) -> impl Future<Output = Result<RoadmapView, Self::Error>> + Send + '_;

  fn get_roadmap(
    &self,
    roadmap_id: Uuid,
  ) -> impl Future<Output = Result<Option<RoadmapView>, Self::Error>> + Send + '_;

  /// The user's most recent roadmap that is not archived.
  fn current_roadmap(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<RoadmapView>, Self::Error>> + Send + '_;

  /// All roadmaps of a user, newest first.
  fn list_roadmaps(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Roadmap>, Self::Error>> + Send + '_;

  // ── Progression ───────────────────────────────────────────────────────

  /// Complete a step and unlock its successor as one atomic unit.
  ///
  /// On success the step is `completed` and the next-higher-order step, if it
  /// was locked, is `unlocked`. On any failure, including a failed unlock,
  /// nothing is written.
  fn complete_step(
    &self,
    roadmap_id: Uuid,
    step_id: Uuid,
  ) -> impl Future<Output = Result<StepCompletion, Self::Error>> + Send + '_;

  /// Attach (or replace) the plan on a step that is not locked.
  fn commit_plan(
    &self,
    roadmap_id: Uuid,
    step_id: Uuid,
    plan: StepPlan,
  ) -> impl Future<Output = Result<RoadmapStep, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  /// Append a notification log entry.
  fn log_notification(
    &self,
    input: NewNotificationLog,
  ) -> impl Future<Output = Result<NotificationLog, Self::Error>> + Send + '_;

  /// A user's notification history, newest first.
  fn list_notifications(
    &self,
    user_id: Uuid,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<NotificationLog>, Self::Error>> + Send + '_;
}
