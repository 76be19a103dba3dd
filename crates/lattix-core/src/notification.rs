//! Reminder delivery records and the message handed to a push channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

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
pub enum NotificationStatus {
  Sent,
  Failed,
  /// The reminder was due but there was nothing to remind about.
  Skipped,
}

/// One append-only entry in a user's notification history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLog {
  pub log_id:     Uuid,
  pub user_id:    Uuid,
  pub step_id:    Option<Uuid>,
  pub status:     NotificationStatus,
  pub detail:     Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::ProgressStore::log_notification`]; `created_at`
/// is set by the store.
#[derive(Debug, Clone)]
pub struct NewNotificationLog {
  pub user_id: Uuid,
  pub step_id: Option<Uuid>,
  pub status:  NotificationStatus,
  pub detail:  Option<String>,
}

/// What a push channel is asked to deliver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderMessage {
  pub user_id:    Uuid,
  pub step_id:    Uuid,
  pub content_id: String,
  pub title:      String,
  pub body:       String,
}

impl ReminderMessage {
  /// Compose the reminder text from a step's plan trigger and action.
  pub fn for_plan(
    user_id: Uuid,
    step_id: Uuid,
    content_id: &str,
    trigger: &str,
    action: &str,
  ) -> Self {
    Self {
      user_id,
      step_id,
      content_id: content_id.to_owned(),
      title: "Time to practice".to_owned(),
      body: format!("When {trigger}, {action}."),
    }
  }
}
