//! The reminder dispatch job and its HTTP trigger.
//!
//! An external scheduler calls `POST /reminders/check` on a fixed interval
//! (more often than the reminder window is wide). Each call evaluates every
//! candidate user once against the reminder predicate and hands due
//! reminders to a [`Notifier`].

use std::{convert::Infallible, future::Future};

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use lattix_core::{
  notification::{NewNotificationLog, NotificationStatus, ReminderMessage},
  reminder::should_send_reminder,
  store::ProgressStore,
  user::User,
};
use serde::Serialize;

use crate::{ReminderState, auth::CronAuthorized, error::ApiError};

// ─── Notifier ────────────────────────────────────────────────────────────────

/// A push channel that can deliver a [`ReminderMessage`].
pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send(
    &self,
    message: &ReminderMessage,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Delivers reminders as structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  type Error = Infallible;

  async fn send(&self, message: &ReminderMessage) -> Result<(), Infallible> {
    tracing::info!(
      user_id = %message.user_id,
      step_id = %message.step_id,
      content_id = %message.content_id,
      title = %message.title,
      body = %message.body,
      "reminder delivered"
    );
    Ok(())
  }
}

// ─── Job ─────────────────────────────────────────────────────────────────────

/// Counts from one pass of [`dispatch_due_reminders`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderRunSummary {
  /// Candidates evaluated.
  pub checked: usize,
  /// Candidates whose reminder was due.
  pub due:     usize,
  pub sent:    usize,
  /// Due, but the current step has no plan to remind about.
  pub skipped: usize,
  pub failed:  usize,
}

enum Outcome {
  Sent,
  Skipped,
  Failed,
}

/// Evaluate every reminder candidate at `now` and deliver the due ones.
///
/// Only a failure to list candidates aborts the run; per-user failures are
/// logged and counted.
pub async fn dispatch_due_reminders<S, N>(
  store: &S,
  notifier: &N,
  now: DateTime<Utc>,
) -> Result<ReminderRunSummary, S::Error>
where
  S: ProgressStore,
  N: Notifier,
{
  let candidates = store.list_reminder_candidates().await?;
  let mut summary = ReminderRunSummary::default();

  for user in candidates {
    summary.checked += 1;

    match should_send_reminder(&user.reminders, now) {
      Ok(true) => summary.due += 1,
      Ok(false) => continue,
      Err(e) => {
        tracing::warn!(user_id = %user.user_id, error = %e, "unreadable reminder preferences");
        summary.failed += 1;
        let logged = store
          .log_notification(NewNotificationLog {
            user_id: user.user_id,
            step_id: None,
            status:  NotificationStatus::Failed,
            detail:  Some(e.to_string()),
          })
          .await;
        if let Err(e) = logged {
          tracing::warn!(user_id = %user.user_id, error = %e, "failed to log notification");
        }
        continue;
      }
    }

    match remind_user(store, notifier, &user, now).await {
      Ok(Outcome::Sent) => summary.sent += 1,
      Ok(Outcome::Skipped) => summary.skipped += 1,
      Ok(Outcome::Failed) => summary.failed += 1,
      Err(e) => {
        tracing::warn!(user_id = %user.user_id, error = %e, "reminder failed");
        summary.failed += 1;
      }
    }
  }

  tracing::info!(
    checked = summary.checked,
    due = summary.due,
    sent = summary.sent,
    skipped = summary.skipped,
    failed = summary.failed,
    "reminder run finished"
  );
  Ok(summary)
}

async fn remind_user<S, N>(
  store: &S,
  notifier: &N,
  user: &User,
  now: DateTime<Utc>,
) -> Result<Outcome, S::Error>
where
  S: ProgressStore,
  N: Notifier,
{
  let view = store.current_roadmap(user.user_id).await?;
  let step = view.as_ref().and_then(|v| v.current_step());

  let Some((step, plan)) = step.and_then(|s| s.plan.as_ref().map(|p| (s, p))) else {
    let detail = match step {
      Some(_) => "current step has no plan",
      None => "no current step",
    };
    store
      .log_notification(NewNotificationLog {
        user_id: user.user_id,
        step_id: step.map(|s| s.step_id),
        status:  NotificationStatus::Skipped,
        detail:  Some(detail.to_owned()),
      })
      .await?;
    return Ok(Outcome::Skipped);
  };

  let message = ReminderMessage::for_plan(
    user.user_id,
    step.step_id,
    &step.content_id,
    &plan.trigger,
    &plan.action,
  );

  match notifier.send(&message).await {
    Ok(()) => {
      store
        .log_notification(NewNotificationLog {
          user_id: user.user_id,
          step_id: Some(step.step_id),
          status:  NotificationStatus::Sent,
          detail:  None,
        })
        .await?;
      store.record_reminder_sent(user.user_id, now).await?;
      Ok(Outcome::Sent)
    }
    Err(e) => {
      tracing::warn!(user_id = %user.user_id, error = %e, "push delivery failed");
      store
        .log_notification(NewNotificationLog {
          user_id: user.user_id,
          step_id: Some(step.step_id),
          status:  NotificationStatus::Failed,
          detail:  Some(e.to_string()),
        })
        .await?;
      Ok(Outcome::Failed)
    }
  }
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// `POST /reminders/check`; requires `Authorization: Bearer <secret>`.
pub async fn check<S, N>(
  _: CronAuthorized,
  State(state): State<ReminderState<S, N>>,
) -> Result<Json<ReminderRunSummary>, ApiError>
where
  S: ProgressStore,
  N: Notifier,
{
  let summary = dispatch_due_reminders(&*state.store, &*state.notifier, Utc::now())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(summary))
}
