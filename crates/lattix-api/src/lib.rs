//! JSON REST API for Lattix.
//!
//! Exposes an axum [`Router`] backed by any
//! [`lattix_core::store::ProgressStore`], plus the reminder dispatch job that
//! an external scheduler triggers through `POST /reminders/check`. TLS and
//! user authentication are the caller's responsibility; only the scheduler
//! endpoint checks a bearer secret.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", lattix_api::api_router(store.clone(), notifier, cron_auth))
//! ```

pub mod auth;
pub mod error;
pub mod reminders;
pub mod roadmaps;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  extract::FromRef,
  routing::{get, post, put},
};
use lattix_core::store::ProgressStore;

pub use auth::{CronAuth, CronAuthorized};
pub use error::ApiError;
pub use reminders::{
  LogNotifier, Notifier, ReminderRunSummary, dispatch_due_reminders,
};

// ─── Reminder state ──────────────────────────────────────────────────────────

/// State for the scheduler endpoint: the store, the push channel and the
/// shared-secret check.
pub struct ReminderState<S, N> {
  pub store:    Arc<S>,
  pub notifier: Arc<N>,
  pub cron:     Arc<CronAuth>,
}

// Manual impl: `derive(Clone)` would require `S: Clone` and `N: Clone`.
impl<S, N> Clone for ReminderState<S, N> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      notifier: Arc::clone(&self.notifier),
      cron:     Arc::clone(&self.cron),
    }
  }
}

impl<S, N> FromRef<ReminderState<S, N>> for Arc<CronAuth> {
  fn from_ref(state: &ReminderState<S, N>) -> Self { Arc::clone(&state.cron) }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N>(
  store: Arc<S>,
  notifier: Arc<N>,
  cron: CronAuth,
) -> Router<()>
where
  S: ProgressStore + 'static,
  N: Notifier + 'static,
{
  let progress = Router::new()
    // Users
    .route("/users", post(users::create::<S>))
    .route("/users/{id}", get(users::get_one::<S>).delete(users::delete_one::<S>))
    .route("/users/{id}/reminders", put(users::update_reminders::<S>))
    .route("/users/{id}/testimonial", post(users::transition_testimonial::<S>))
    .route("/users/{id}/roadmap", get(roadmaps::current::<S>))
    .route("/users/{id}/roadmaps", get(roadmaps::list::<S>))
    .route("/users/{id}/notifications", get(users::notifications::<S>))
    // Roadmaps
    .route("/roadmaps", post(roadmaps::create::<S>))
    .route("/roadmaps/{id}", get(roadmaps::get_one::<S>))
    .route(
      "/roadmaps/{id}/steps/{step_id}/complete",
      post(roadmaps::complete_step::<S>),
    )
    .route(
      "/roadmaps/{id}/steps/{step_id}/plan",
      put(roadmaps::commit_plan::<S>),
    )
    .with_state(Arc::clone(&store));

  let reminders = Router::new()
    .route("/reminders/check", post(reminders::check::<S, N>))
    .with_state(ReminderState { store, notifier, cron: Arc::new(cron) });

  progress.merge(reminders)
}
