//! Users and their reminder preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::testimonial::TestimonialState;

pub const DEFAULT_TIMEZONE: &str = "UTC";

/// When and where a user wants their daily reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPreferences {
  pub enabled:   bool,
  /// Local wall-clock time, `HH:MM`.
  pub time:      Option<String>,
  /// IANA timezone name, e.g. `America/New_York`.
  pub timezone:  String,
  pub last_sent: Option<DateTime<Utc>>,
}

impl Default for ReminderPreferences {
  fn default() -> Self {
    Self {
      enabled:   false,
      time:      None,
      timezone:  DEFAULT_TIMEZONE.to_owned(),
      last_sent: None,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:           Uuid,
  pub email:             String,
  pub display_name:      Option<String>,
  pub created_at:        DateTime<Utc>,
  pub reminders:         ReminderPreferences,
  pub testimonial_state: TestimonialState,
}

/// Input to [`crate::store::ProgressStore::create_user`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
  pub email:        String,
  pub display_name: Option<String>,
}

/// Replacement reminder settings. `last_sent` is owned by the reminder job and
/// is not accepted from callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderSettings {
  pub enabled:  bool,
  pub time:     Option<String>,
  pub timezone: Option<String>,
}
